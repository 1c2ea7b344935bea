//! Background work started by [`AppCommand`](crate::core::app::AppCommand)s.
//!
//! Each executor runs on its own task and reports back only through the
//! action dispatcher.

pub mod context_loader;
pub mod model_loader;
