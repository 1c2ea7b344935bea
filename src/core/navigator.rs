//! Screen stack for the Models / Chat / Error flow.
//!
//! The navigator owns the catalog snapshot and the single conversation
//! session. Screens never reach for either directly; the app hands them what
//! they need from here.

use tracing::{debug, info};

use crate::api::models::{CatalogError, ModelDescriptor};
use crate::core::session::ConversationSession;

pub const NO_MODELS_MESSAGE: &str =
    "No models found. Pull a model with 'ollama pull <model_name>'";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Models,
    Chat { model: String },
    Error { message: String },
}

#[derive(Debug)]
pub struct Navigator {
    stack: Vec<Screen>,
    catalog: Vec<ModelDescriptor>,
    session: Option<ConversationSession>,
}

impl Navigator {
    /// Initial screen from the startup catalog query.
    pub fn start(result: Result<Vec<ModelDescriptor>, CatalogError>) -> Self {
        let mut navigator = Self {
            stack: Vec::new(),
            catalog: Vec::new(),
            session: None,
        };

        match result {
            Err(err) => {
                info!(error = %err, "Model server unavailable at startup");
                navigator.stack.push(Screen::Error {
                    message: err.to_string(),
                });
            }
            Ok(models) if models.len() == 1 => {
                let model = models[0].name.clone();
                info!(model = %model, "Single model installed, opening chat directly");
                navigator.catalog = models;
                navigator.open_chat(model);
            }
            Ok(models) => {
                info!(count = models.len(), "Showing model catalog");
                navigator.catalog = models;
                navigator.stack.push(Screen::Models);
            }
        }
        navigator
    }

    pub fn current(&self) -> &Screen {
        // The stack is seeded in `start` and `back` never pops the last entry.
        self.stack.last().unwrap_or(&Screen::Models)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn catalog(&self) -> &[ModelDescriptor] {
        &self.catalog
    }

    pub fn session(&self) -> Option<&ConversationSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut ConversationSession> {
        self.session.as_mut()
    }

    pub fn can_go_back(&self) -> bool {
        self.stack.len() > 1
    }

    fn open_chat(&mut self, model: String) {
        self.session = Some(ConversationSession::new(model.clone()));
        self.stack.push(Screen::Chat { model });
    }

    /// Open a chat with a catalog entry. Only valid from the Models screen.
    pub fn select_model(&mut self, name: &str) -> bool {
        if *self.current() != Screen::Models {
            return false;
        }
        if !self.catalog.iter().any(|m| m.name == name) {
            debug!(model = name, "Ignoring selection of unknown model");
            return false;
        }
        info!(model = name, "Opening chat");
        self.open_chat(name.to_string());
        true
    }

    /// Swap the catalog for a fresh query result, staying on the Models screen.
    ///
    /// An error or an empty catalog pushes an Error screen above Models.
    pub fn refresh_loaded(&mut self, result: Result<Vec<ModelDescriptor>, CatalogError>) {
        match result {
            Ok(models) if !models.is_empty() => {
                debug!(count = models.len(), "Model catalog refreshed");
                self.catalog = models;
            }
            Ok(_) => {
                self.catalog.clear();
                self.push_error(NO_MODELS_MESSAGE.to_string());
            }
            Err(err) => {
                self.catalog.clear();
                self.push_error(err.to_string());
            }
        }
    }

    pub fn push_error(&mut self, message: String) {
        info!(message = %message, "Showing error screen");
        self.stack.push(Screen::Error { message });
    }

    /// Leave the chat for the catalog. The session is discarded and any
    /// in-flight stream is cancelled.
    pub fn list_models(&mut self) -> bool {
        if !matches!(self.current(), Screen::Chat { .. }) {
            return false;
        }
        self.end_session();
        self.stack.pop();
        self.stack.push(Screen::Models);
        info!("Switched from chat to model catalog");
        true
    }

    pub fn back(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        if let Some(Screen::Chat { .. }) = self.stack.pop() {
            self.end_session();
        }
        debug!(depth = self.stack.len(), "Navigated back");
        true
    }

    /// Cancel whatever is in flight before the process exits.
    pub fn shutdown(&mut self) {
        self.end_session();
    }

    fn end_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.interrupt();
        }
    }
}
