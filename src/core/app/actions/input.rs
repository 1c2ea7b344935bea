use super::{App, AppAction, AppActionContext, AppCommand};
use crate::core::navigator::Screen;

/// Lines taken up by everything on the chat screen except the transcript.
const CHAT_CHROME_HEIGHT: u16 = 8;

pub(super) fn handle_input_action(
    app: &mut App,
    action: AppAction,
    ctx: AppActionContext,
) -> Option<AppCommand> {
    match action {
        AppAction::ClearStatus => {
            app.ui.clear_status();
            None
        }
        AppAction::InsertIntoInput { text } => {
            insert_into_input(app, &text);
            None
        }
        AppAction::ScrollTranscript { lines } => {
            scroll_by(app, lines);
            None
        }
        AppAction::ScrollTranscriptPage { up } => {
            let page = ctx.term_height.saturating_sub(CHAT_CHROME_HEIGHT).max(1) as i32;
            scroll_by(app, if up { page } else { -page });
            None
        }
        _ => unreachable!("non-input action routed to input handler"),
    }
}

fn insert_into_input(app: &mut App, text: &str) {
    let accepts_input = matches!(app.current_screen(), Screen::Chat { .. })
        && app.ui.context_browser.is_none()
        && !app.is_streaming();
    if accepts_input {
        app.ui.textarea_mut().insert_str(text);
    }
}

/// Positive values move towards older lines.
fn scroll_by(app: &mut App, lines: i32) {
    let amount = lines.unsigned_abs().min(u16::MAX as u32) as u16;
    if lines >= 0 {
        app.ui.scroll_up(amount);
    } else {
        app.ui.scroll_down(amount);
    }
}
