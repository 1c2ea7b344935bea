//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: the interaction loop that turns terminal events into app
//!   actions and runs background work.
//! - [`renderer`], [`transcript`] and [`title`]: view composition for the
//!   three screens.
//! - [`picker`]: selection state shared by the model table and the context
//!   browser.
//!
//! This layer presents and captures interaction state, while [`crate::core`]
//! owns conversation logic and navigation.

pub mod chat_loop;
pub mod picker;
pub mod renderer;
pub mod title;
pub mod transcript;
