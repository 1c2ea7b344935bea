use tracing::debug;

use super::{App, AppAction, AppActionContext, AppCommand};
use crate::api::models::{CatalogError, ModelDescriptor};
use crate::core::app::ActivityKind;
use crate::core::navigator::Screen;

pub(super) fn handle_navigation_action(
    app: &mut App,
    action: AppAction,
    _ctx: AppActionContext,
) -> Option<AppCommand> {
    match action {
        AppAction::PickerMoveUp
        | AppAction::PickerMoveDown
        | AppAction::PickerMoveToStart
        | AppAction::PickerMoveToEnd => {
            if *app.current_screen() != Screen::Models {
                return None;
            }
            let picker = &mut app.ui.model_picker;
            match action {
                AppAction::PickerMoveUp => picker.move_up(),
                AppAction::PickerMoveDown => picker.move_down(),
                AppAction::PickerMoveToStart => picker.move_to_start(),
                _ => picker.move_to_end(),
            }
            None
        }
        AppAction::PickerApplySelection => {
            apply_model_selection(app);
            None
        }
        AppAction::ListModels => list_models(app),
        AppAction::RefreshModels => refresh_models(app),
        AppAction::ModelsLoaded { result } => {
            handle_models_loaded(app, result);
            None
        }
        AppAction::NavigateBack => {
            navigate_back(app);
            None
        }
        AppAction::Quit => {
            app.request_exit();
            None
        }
        _ => unreachable!("non-navigation action routed to navigation handler"),
    }
}

fn apply_model_selection(app: &mut App) {
    if *app.current_screen() != Screen::Models {
        return;
    }
    let Some(name) = app.ui.model_picker.selected_id().map(str::to_string) else {
        return;
    };
    if app.navigator.select_model(&name) {
        app.ui.reset_chat();
        app.ui.clear_status();
    }
}

fn list_models(app: &mut App) -> Option<AppCommand> {
    if !app.navigator.list_models() {
        return None;
    }
    app.ui.reset_chat();
    app.ui.clear_status();
    app.sync_model_picker();
    refresh_models(app)
}

fn refresh_models(app: &mut App) -> Option<AppCommand> {
    if *app.current_screen() != Screen::Models {
        return None;
    }
    app.ui.begin_activity(ActivityKind::ModelRequest);
    app.ui.set_status("Refreshing models...");
    Some(AppCommand::LoadModels)
}

fn handle_models_loaded(app: &mut App, result: Result<Vec<ModelDescriptor>, CatalogError>) {
    app.ui.end_activity(ActivityKind::ModelRequest);
    if *app.current_screen() != Screen::Models {
        debug!("Discarding model list for a screen that is no longer shown");
        return;
    }
    app.ui.clear_status();
    app.navigator.refresh_loaded(result);
    app.sync_model_picker();
}

fn navigate_back(app: &mut App) {
    if !matches!(app.current_screen(), Screen::Error { .. }) {
        return;
    }
    if app.navigator.back() {
        app.sync_model_picker();
    }
}
