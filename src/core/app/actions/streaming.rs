use tracing::{debug, info, warn};

use super::{App, AppAction, AppActionContext, AppCommand};

pub(super) fn handle_streaming_action(
    app: &mut App,
    action: AppAction,
    _ctx: AppActionContext,
) -> Option<AppCommand> {
    match action {
        AppAction::AppendResponseChunk { content, stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            append_response_chunk(app, stream_id, &content);
            None
        }
        AppAction::StreamErrored { message, stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            handle_stream_error(app, stream_id, &message);
            None
        }
        AppAction::StreamCompleted { stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            finalize_stream(app, stream_id);
            None
        }
        AppAction::CancelStreaming => {
            cancel_current_stream(app);
            None
        }
        AppAction::SubmitMessage { message } => spawn_stream_for_message(app, message),
        _ => unreachable!("non-streaming action routed to streaming handler"),
    }
}

fn spawn_stream_for_message(app: &mut App, message: String) -> Option<AppCommand> {
    let session = app.navigator.session_mut()?;
    let request = match session.submit(&message) {
        Ok(request) => request,
        Err(err) => {
            debug!(reason = %err, "Submission ignored");
            return None;
        }
    };

    info!(
        stream_id = request.stream_id,
        model = %request.model,
        messages = request.api_messages.len(),
        "Submitting message"
    );
    app.ui.clear_input();
    app.ui.clear_status();
    app.ui.begin_streaming();
    Some(AppCommand::SpawnStream(app.build_stream_params(request)))
}

fn append_response_chunk(app: &mut App, stream_id: u64, chunk: &str) {
    if chunk.is_empty() {
        return;
    }
    if let Some(session) = app.navigator.session_mut() {
        session.apply_chunk(stream_id, chunk);
    }
}

fn handle_stream_error(app: &mut App, stream_id: u64, message: &str) {
    warn!(stream_id, error = %message, "Chat stream failed");
    if let Some(session) = app.navigator.session_mut() {
        session.fail(stream_id, message);
    }
    app.ui.end_streaming();
}

fn finalize_stream(app: &mut App, stream_id: u64) {
    debug!(stream_id, "Chat stream completed");
    if let Some(session) = app.navigator.session_mut() {
        session.complete(stream_id);
    }
    app.ui.end_streaming();
}

fn cancel_current_stream(app: &mut App) {
    let interrupted = app
        .navigator
        .session_mut()
        .map(|session| session.interrupt())
        .unwrap_or(false);
    if interrupted {
        app.ui.end_streaming();
        app.ui.set_status("Response interrupted");
    }
}
