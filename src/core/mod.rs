pub mod app;
pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod context;
pub mod message;
pub mod navigator;
pub mod session;
