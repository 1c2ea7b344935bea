use std::path::PathBuf;

use tracing::{debug, info};

use super::{App, AppAction, AppActionContext, AppCommand, ContextRequestKind};
use crate::core::app::{ActivityKind, ContextBrowserState};
use crate::core::context::{ContextBundle, ContextError};
use crate::core::navigator::Screen;

pub(super) fn handle_context_action(
    app: &mut App,
    action: AppAction,
    _ctx: AppActionContext,
) -> Option<AppCommand> {
    match action {
        AppAction::OpenContextBrowser => {
            open_browser(app);
            None
        }
        AppAction::CloseContextBrowser => {
            app.ui.context_browser = None;
            None
        }
        AppAction::BrowserMoveUp => {
            if let Some(browser) = app.ui.context_browser.as_mut() {
                browser.picker.move_up();
            }
            None
        }
        AppAction::BrowserMoveDown => {
            if let Some(browser) = app.ui.context_browser.as_mut() {
                browser.picker.move_down();
            }
            None
        }
        AppAction::BrowserActivate => activate_selection(app),
        AppAction::BrowserAttachCurrentDir => {
            let dir = app
                .ui
                .context_browser
                .as_ref()
                .map(|browser| browser.current_dir().to_path_buf())?;
            request_load(app, dir, ContextRequestKind::Directory)
        }
        AppAction::BrowserParent => {
            let result = match app.ui.context_browser.as_mut() {
                Some(browser) => browser.go_to_parent().map(|_| ()),
                None => Ok(()),
            };
            if let Err(err) = result {
                app.ui.set_status(format!("Failed to open directory: {err}"));
            }
            None
        }
        AppAction::ContextLoaded { session_id, result } => {
            handle_context_loaded(app, session_id, result);
            None
        }
        AppAction::ClearContext => {
            let cleared = app
                .navigator
                .session_mut()
                .and_then(|session| session.clear_context());
            if let Some(bundle) = cleared {
                debug!(label = %bundle.label, "Pending context discarded");
                app.ui.set_status("Context cleared");
            }
            None
        }
        _ => unreachable!("non-context action routed to context handler"),
    }
}

fn open_browser(app: &mut App) {
    if !matches!(app.current_screen(), Screen::Chat { .. }) {
        return;
    }
    match ContextBrowserState::open(app.server.browse_root.clone()) {
        Ok(browser) => app.ui.context_browser = Some(browser),
        Err(err) => app.ui.set_status(format!("Failed to open directory: {err}")),
    }
}

fn activate_selection(app: &mut App) -> Option<AppCommand> {
    let browser = app.ui.context_browser.as_mut()?;
    let entry = browser.selected_entry()?.clone();
    if entry.is_dir {
        if let Err(err) = browser.enter(entry.path) {
            app.ui.set_status(format!("Failed to open directory: {err}"));
        }
        return None;
    }
    request_load(app, entry.path, ContextRequestKind::File)
}

fn request_load(app: &mut App, path: PathBuf, kind: ContextRequestKind) -> Option<AppCommand> {
    app.ui.context_browser = None;
    let session_id = app.navigator.session().map(|session| session.id())?;
    app.ui.begin_activity(ActivityKind::ContextLoad);
    app.ui.set_status(format!("Loading {}...", path.display()));
    Some(AppCommand::LoadContext {
        path,
        kind,
        session_id,
    })
}

fn handle_context_loaded(
    app: &mut App,
    session_id: u64,
    result: Result<ContextBundle, ContextError>,
) {
    app.ui.end_activity(ActivityKind::ContextLoad);
    let Some(session) = app
        .navigator
        .session_mut()
        .filter(|session| session.id() == session_id)
    else {
        debug!(session_id, "Chat closed before its context finished loading");
        app.ui.clear_status();
        return;
    };
    match result {
        Ok(bundle) => {
            info!(label = %bundle.label, bytes = bundle.payload.len(), "Context attached");
            let status = format!("Context loaded: {}", bundle.label);
            session.set_context(bundle);
            app.ui.set_status(status);
        }
        Err(err) => {
            app.ui.set_status(format!("Failed to load context: {err}"));
        }
    }
}
