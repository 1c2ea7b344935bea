//! ollama-tui is a terminal chat client for models served by a local Ollama
//! instance.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation session, the screen navigator, context
//!   loading and streaming orchestration.
//! - [`ui`] renders the terminal interface and runs the interactive event loop
//!   that drives user input and display updates.
//! - [`api`] defines the wire payloads and the model catalog client.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which resolves the server address and
//! dispatches into [`ui::chat_loop`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
