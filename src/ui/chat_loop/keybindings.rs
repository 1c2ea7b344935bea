//! Key resolution per screen.
//!
//! Keys are turned into [`AppAction`]s here so the reducer never sees raw
//! terminal events. Anything that is plain text editing goes straight to the
//! input box instead.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::app::{App, AppAction};
use crate::core::navigator::Screen;

#[derive(Debug)]
pub enum KeyResult {
    Dispatch(Vec<AppAction>),
    EditInput,
    Ignored,
}

fn dispatch(action: AppAction) -> KeyResult {
    KeyResult::Dispatch(vec![action])
}

pub fn resolve_key(app: &App, key: &KeyEvent) -> KeyResult {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('c')) {
        return dispatch(AppAction::Quit);
    }

    match app.current_screen() {
        Screen::Models => resolve_models_key(key),
        Screen::Error { .. } => resolve_error_key(key),
        Screen::Chat { .. } if app.ui.context_browser.is_some() => resolve_browser_key(key),
        Screen::Chat { .. } => resolve_chat_key(app, key),
    }
}

fn resolve_models_key(key: &KeyEvent) -> KeyResult {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => dispatch(AppAction::PickerMoveUp),
        KeyCode::Down | KeyCode::Char('j') => dispatch(AppAction::PickerMoveDown),
        KeyCode::Home => dispatch(AppAction::PickerMoveToStart),
        KeyCode::End => dispatch(AppAction::PickerMoveToEnd),
        KeyCode::Enter => dispatch(AppAction::PickerApplySelection),
        KeyCode::Char('r') => dispatch(AppAction::RefreshModels),
        KeyCode::Char('q') => dispatch(AppAction::Quit),
        _ => KeyResult::Ignored,
    }
}

fn resolve_error_key(key: &KeyEvent) -> KeyResult {
    match key.code {
        KeyCode::Char('b') => dispatch(AppAction::NavigateBack),
        KeyCode::Char('q') => dispatch(AppAction::Quit),
        _ => KeyResult::Ignored,
    }
}

fn resolve_browser_key(key: &KeyEvent) -> KeyResult {
    match key.code {
        KeyCode::Up => dispatch(AppAction::BrowserMoveUp),
        KeyCode::Down => dispatch(AppAction::BrowserMoveDown),
        KeyCode::Enter => dispatch(AppAction::BrowserActivate),
        KeyCode::Tab => dispatch(AppAction::BrowserAttachCurrentDir),
        KeyCode::Backspace => dispatch(AppAction::BrowserParent),
        KeyCode::Esc => dispatch(AppAction::CloseContextBrowser),
        _ => KeyResult::Ignored,
    }
}

fn resolve_chat_key(app: &App, key: &KeyEvent) -> KeyResult {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let streaming = app.is_streaming();

    match key.code {
        KeyCode::Char('l') if ctrl => return dispatch(AppAction::ListModels),
        KeyCode::Char('o') if ctrl => return dispatch(AppAction::OpenContextBrowser),
        KeyCode::Char('x') if ctrl => return dispatch(AppAction::ClearContext),
        KeyCode::PageUp => return dispatch(AppAction::ScrollTranscriptPage { up: true }),
        KeyCode::PageDown => return dispatch(AppAction::ScrollTranscriptPage { up: false }),
        KeyCode::Up if key.modifiers.contains(KeyModifiers::SHIFT) => {
            return dispatch(AppAction::ScrollTranscript { lines: 1 })
        }
        KeyCode::Down if key.modifiers.contains(KeyModifiers::SHIFT) => {
            return dispatch(AppAction::ScrollTranscript { lines: -1 })
        }
        KeyCode::Esc if streaming => return dispatch(AppAction::CancelStreaming),
        _ => {}
    }

    // The input box is inert while a response streams in.
    if streaming {
        return KeyResult::Ignored;
    }

    match key.code {
        KeyCode::Enter
            if !key
                .modifiers
                .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
        {
            let message = app.ui.get_input_text();
            if message.trim().is_empty() {
                KeyResult::Ignored
            } else {
                dispatch(AppAction::SubmitMessage { message })
            }
        }
        KeyCode::Esc => KeyResult::Ignored,
        _ => KeyResult::EditInput,
    }
}
