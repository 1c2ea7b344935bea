//! Terminal event loop for the chat client.
//!
//! The loop owns the terminal, turns key presses into [`AppAction`]s, applies
//! them to the shared [`App`] and runs the resulting commands on background
//! tasks. Nothing outside this module touches the terminal directly.
//!
//! [`AppAction`]: crate::core::app::AppAction

mod event_loop;
mod executors;
mod keybindings;
mod lifecycle;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::app::App;

pub use event_loop::run_chat;

/// Shared handle to the application state used by the loop and its tasks.
#[derive(Clone)]
pub struct AppHandle {
    inner: Arc<Mutex<App>>,
}

impl AppHandle {
    pub fn new(inner: Arc<Mutex<App>>) -> Self {
        Self { inner }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&App) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut App) -> R) -> R {
        let mut guard = self.inner.lock().await;
        f(&mut guard)
    }
}
