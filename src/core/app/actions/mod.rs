mod context;
mod input;
mod navigation;
mod streaming;

use std::path::PathBuf;

use tokio::sync::mpsc;

use super::App;
use crate::api::models::{CatalogError, ModelDescriptor};
use crate::core::chat_stream::StreamParams;
use crate::core::context::{ContextBundle, ContextError};

#[derive(Debug)]
pub enum AppAction {
    AppendResponseChunk {
        content: String,
        stream_id: u64,
    },
    StreamErrored {
        message: String,
        stream_id: u64,
    },
    StreamCompleted {
        stream_id: u64,
    },
    CancelStreaming,
    SubmitMessage {
        message: String,
    },
    ClearStatus,
    InsertIntoInput {
        text: String,
    },
    ScrollTranscript {
        lines: i32,
    },
    ScrollTranscriptPage {
        up: bool,
    },
    PickerMoveUp,
    PickerMoveDown,
    PickerMoveToStart,
    PickerMoveToEnd,
    PickerApplySelection,
    ListModels,
    RefreshModels,
    ModelsLoaded {
        result: Result<Vec<ModelDescriptor>, CatalogError>,
    },
    NavigateBack,
    Quit,
    OpenContextBrowser,
    CloseContextBrowser,
    BrowserMoveUp,
    BrowserMoveDown,
    BrowserActivate,
    BrowserAttachCurrentDir,
    BrowserParent,
    ContextLoaded {
        session_id: u64,
        result: Result<ContextBundle, ContextError>,
    },
    ClearContext,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppActionContext {
    pub term_width: u16,
    pub term_height: u16,
}

pub struct AppActionEnvelope {
    pub action: AppAction,
    pub context: AppActionContext,
}

#[derive(Clone)]
pub struct AppActionDispatcher {
    tx: mpsc::UnboundedSender<AppActionEnvelope>,
}

impl AppActionDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<AppActionEnvelope>) -> Self {
        Self { tx }
    }

    pub fn dispatch_many<I>(&self, actions: I, ctx: AppActionContext)
    where
        I: IntoIterator<Item = AppAction>,
    {
        for action in actions.into_iter() {
            let _ = self.tx.send(AppActionEnvelope {
                action,
                context: ctx,
            });
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRequestKind {
    File,
    Directory,
}

pub enum AppCommand {
    SpawnStream(StreamParams),
    LoadModels,
    LoadContext {
        path: PathBuf,
        kind: ContextRequestKind,
        session_id: u64,
    },
}

pub fn apply_actions(
    app: &mut App,
    envelopes: impl IntoIterator<Item = AppActionEnvelope>,
) -> Vec<AppCommand> {
    let mut commands = Vec::new();
    for envelope in envelopes {
        if let Some(cmd) = apply_action(app, envelope.action, envelope.context) {
            commands.push(cmd);
        }
    }
    commands
}

pub fn apply_action(app: &mut App, action: AppAction, ctx: AppActionContext) -> Option<AppCommand> {
    match action {
        AppAction::AppendResponseChunk { .. }
        | AppAction::StreamErrored { .. }
        | AppAction::StreamCompleted { .. }
        | AppAction::CancelStreaming
        | AppAction::SubmitMessage { .. } => streaming::handle_streaming_action(app, action, ctx),

        AppAction::ClearStatus
        | AppAction::InsertIntoInput { .. }
        | AppAction::ScrollTranscript { .. }
        | AppAction::ScrollTranscriptPage { .. } => input::handle_input_action(app, action, ctx),

        AppAction::PickerMoveUp
        | AppAction::PickerMoveDown
        | AppAction::PickerMoveToStart
        | AppAction::PickerMoveToEnd
        | AppAction::PickerApplySelection
        | AppAction::ListModels
        | AppAction::RefreshModels
        | AppAction::ModelsLoaded { .. }
        | AppAction::NavigateBack
        | AppAction::Quit => navigation::handle_navigation_action(app, action, ctx),

        AppAction::OpenContextBrowser
        | AppAction::CloseContextBrowser
        | AppAction::BrowserMoveUp
        | AppAction::BrowserMoveDown
        | AppAction::BrowserActivate
        | AppAction::BrowserAttachCurrentDir
        | AppAction::BrowserParent
        | AppAction::ContextLoaded { .. }
        | AppAction::ClearContext => context::handle_context_action(app, action, ctx),
    }
}
