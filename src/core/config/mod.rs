pub mod data;
pub mod io;

pub use data::{resolve_host, Config};
pub use io::ConfigError;
