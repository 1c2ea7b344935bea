use std::path::PathBuf;
use std::time::Duration;

use crate::api::models::{CatalogError, ModelDescriptor};
use crate::core::chat_stream::StreamParams;
use crate::core::navigator::{Navigator, Screen};
use crate::core::session::StreamRequest;
use crate::ui::picker::PickerItem;

pub mod actions;
pub mod browser;
pub mod ui_state;


pub use actions::{
    apply_action, apply_actions, AppAction, AppActionContext, AppActionDispatcher,
    AppActionEnvelope, AppCommand, ContextRequestKind,
};
pub use browser::ContextBrowserState;
pub use ui_state::{ActivityKind, UiState};

/// Connection details shared by every request the app issues.
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub client: reqwest::Client,
    pub base_url: String,
    /// Bound on each model list request.
    pub catalog_timeout: Duration,
    /// Root of the context browser.
    pub browse_root: PathBuf,
}

pub struct App {
    pub server: ServerContext,
    pub navigator: Navigator,
    pub ui: UiState,
}

impl App {
    /// Build the app from the startup catalog query result.
    pub fn new(server: ServerContext, startup: Result<Vec<ModelDescriptor>, CatalogError>) -> Self {
        let mut app = Self {
            server,
            navigator: Navigator::start(startup),
            ui: UiState::new(),
        };
        app.sync_model_picker();
        app
    }

    pub fn current_screen(&self) -> &Screen {
        self.navigator.current()
    }

    pub fn request_exit(&mut self) {
        self.navigator.shutdown();
        self.ui.exit_requested = true;
    }

    pub fn active_stream_id(&self) -> Option<u64> {
        self.navigator
            .session()
            .and_then(|session| session.active_stream_id())
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.active_stream_id() == Some(stream_id)
    }

    pub fn is_streaming(&self) -> bool {
        self.navigator
            .session()
            .map(|session| session.is_streaming())
            .unwrap_or(false)
    }

    pub fn build_stream_params(&self, request: StreamRequest) -> StreamParams {
        StreamParams {
            client: self.server.client.clone(),
            base_url: self.server.base_url.clone(),
            model: request.model,
            api_messages: request.api_messages,
            cancel_token: request.cancel_token,
            stream_id: request.stream_id,
        }
    }

    /// Rebuild the model table rows from the navigator's catalog.
    pub fn sync_model_picker(&mut self) {
        let items = self
            .navigator
            .catalog()
            .iter()
            .map(|model| PickerItem {
                id: model.name.clone(),
                label: model.name.clone(),
            })
            .collect();
        self.ui.model_picker.set_items(items);
    }

    #[cfg(test)]
    pub fn new_test_app(startup: Result<Vec<ModelDescriptor>, CatalogError>) -> Self {
        Self::new(
            ServerContext {
                client: reqwest::Client::new(),
                base_url: "http://127.0.0.1:11434".to_string(),
                catalog_timeout: Duration::from_secs(5),
                browse_root: std::env::temp_dir(),
            },
            startup,
        )
    }
}
