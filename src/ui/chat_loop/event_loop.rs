use std::{
    error::Error,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use ratatui::crossterm::event::{self, Event, KeyEventKind};
use ratatui::prelude::Size;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::core::app::{
    apply_actions, App, AppAction, AppActionContext, AppActionDispatcher, AppActionEnvelope,
    AppCommand,
};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::ui::renderer::ui;

use super::executors::context_loader::spawn_context_loader;
use super::executors::model_loader::spawn_model_loader;
use super::keybindings::{resolve_key, KeyResult};
use super::lifecycle::{restore_terminal, setup_terminal, SharedTerminal};
use super::AppHandle;

const MAX_FPS: u64 = 60;
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
}

fn action_context(term_size: Size) -> AppActionContext {
    AppActionContext {
        term_width: term_size.width,
        term_height: term_size.height,
    }
}

async fn is_exit_requested(app: &AppHandle) -> bool {
    app.read(|app| app.ui.exit_requested).await
}

async fn current_terminal_size(terminal: &SharedTerminal) -> Size {
    let terminal_guard = terminal.lock().await;
    terminal_guard.size().unwrap_or_default()
}

async fn try_draw_frame(
    app: &AppHandle,
    terminal: &SharedTerminal,
    request_redraw: &mut bool,
    last_draw: &mut Instant,
    frame_duration: Duration,
) -> io::Result<()> {
    if !*request_redraw {
        return Ok(());
    }

    let now = Instant::now();
    if now.duration_since(*last_draw) < frame_duration {
        return Ok(());
    }

    let mut terminal_guard = terminal.lock().await;
    (app.update(|app| terminal_guard.draw(|f| ui(f, app))).await)?;
    *last_draw = now;
    *request_redraw = false;
    Ok(())
}

struct EventProcessingOutcome {
    events_processed: bool,
    request_redraw: bool,
}

async fn process_ui_events(
    app: &AppHandle,
    event_rx: &mut mpsc::UnboundedReceiver<UiEvent>,
    dispatcher: &AppActionDispatcher,
    term_size: Size,
) -> EventProcessingOutcome {
    let mut outcome = EventProcessingOutcome {
        events_processed: false,
        request_redraw: false,
    };

    while let Ok(ev) = event_rx.try_recv() {
        outcome.events_processed = true;
        match ev {
            UiEvent::Crossterm(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if route_keyboard_event(app, dispatcher, key, term_size).await {
                    outcome.request_redraw = true;
                }
            }
            UiEvent::Crossterm(Event::Paste(text)) => {
                handle_paste_event(dispatcher, term_size, &text);
                outcome.request_redraw = true;
            }
            UiEvent::Crossterm(Event::Resize(_, _)) => {
                outcome.request_redraw = true;
            }
            UiEvent::Crossterm(_) => {}
        }
    }

    outcome
}

/// Returns whether the key changed anything worth redrawing.
async fn route_keyboard_event(
    app: &AppHandle,
    dispatcher: &AppActionDispatcher,
    key: event::KeyEvent,
    term_size: Size,
) -> bool {
    match app.read(|app| resolve_key(app, &key)).await {
        KeyResult::Dispatch(actions) => {
            dispatcher.dispatch_many(actions, action_context(term_size));
            true
        }
        KeyResult::EditInput => {
            app.update(|app| {
                app.ui.textarea_mut().input(tui_textarea::Input::from(key));
            })
            .await;
            true
        }
        KeyResult::Ignored => false,
    }
}

pub(crate) fn sanitize_pasted_text(text: &str) -> String {
    let without_crlf = text.replace("\r\n", "\n");
    let without_cr = without_crlf.replace('\r', "\n");
    let expanded_tabs = without_cr.replace('\t', "    ");
    expanded_tabs
        .chars()
        .filter(|&c| c == '\n' || !c.is_control())
        .collect()
}

fn handle_paste_event(dispatcher: &AppActionDispatcher, term_size: Size, text: &str) {
    let sanitized_text = sanitize_pasted_text(text);
    if sanitized_text.is_empty() {
        return;
    }
    dispatcher.dispatch_many(
        [AppAction::InsertIntoInput {
            text: sanitized_text,
        }],
        action_context(term_size),
    );
}

/// Turn queued stream messages into actions, merging consecutive chunks.
///
/// Messages for any stream other than `current_stream_id` are dropped here;
/// the reducer repeats the check for anything that slips through.
fn process_stream_updates(
    dispatcher: &AppActionDispatcher,
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    term_size: Size,
    current_stream_id: Option<u64>,
) -> bool {
    let mut received_any = false;
    let mut coalesced_chunks = String::new();
    let mut followup_actions = Vec::new();
    let mut chunk_stream_id = None;

    while let Ok((message, msg_stream_id)) = rx.try_recv() {
        if Some(msg_stream_id) != current_stream_id {
            debug!(stream_id = msg_stream_id, "Dropping message from stale stream");
            continue;
        }

        match message {
            StreamMessage::Chunk(content) => {
                coalesced_chunks.push_str(&content);
                chunk_stream_id = Some(msg_stream_id);
            }
            StreamMessage::Error(err) => {
                followup_actions.push(AppAction::StreamErrored {
                    message: err,
                    stream_id: msg_stream_id,
                });
            }
            StreamMessage::End => followup_actions.push(AppAction::StreamCompleted {
                stream_id: msg_stream_id,
            }),
        }

        received_any = true;
    }

    if !received_any {
        return false;
    }

    let mut actions = Vec::with_capacity(1 + followup_actions.len());
    if let Some(stream_id) = chunk_stream_id {
        if !coalesced_chunks.is_empty() {
            actions.push(AppAction::AppendResponseChunk {
                content: coalesced_chunks,
                stream_id,
            });
        }
    }
    actions.extend(followup_actions);

    if !actions.is_empty() {
        dispatcher.dispatch_many(actions, action_context(term_size));
    }

    true
}

async fn drain_action_queue(
    app: &AppHandle,
    dispatcher: &AppActionDispatcher,
    stream_service: &ChatStreamService,
    action_rx: &mut mpsc::UnboundedReceiver<AppActionEnvelope>,
) -> bool {
    let mut pending = Vec::new();
    while let Ok(envelope) = action_rx.try_recv() {
        pending.push(envelope);
    }

    if pending.is_empty() {
        return false;
    }

    let commands = app.update(|app| apply_actions(app, pending)).await;
    for cmd in commands {
        match cmd {
            AppCommand::SpawnStream(params) => {
                stream_service.spawn_stream(params);
            }
            AppCommand::LoadModels => {
                let server = app.read(|app| app.server.clone()).await;
                spawn_model_loader(
                    dispatcher.clone(),
                    server.client,
                    server.base_url,
                    server.catalog_timeout,
                );
            }
            AppCommand::LoadContext {
                path,
                kind,
                session_id,
            } => {
                spawn_context_loader(dispatcher.clone(), path, kind, session_id);
            }
        }
    }
    true
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

/// Run the interactive client until the user quits.
pub async fn run_chat(app: App) -> Result<(), Box<dyn Error>> {
    let app = AppHandle::new(Arc::new(Mutex::new(app)));
    let terminal = setup_terminal()?;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = spawn_event_reader(event_tx);

    let result = main_loop(&app, &terminal, event_rx).await;

    event_reader_handle.abort();
    // Cancels any stream still in flight when the loop exits on an error.
    app.update(|app| app.navigator.shutdown()).await;
    restore_terminal(&terminal).await?;
    info!("Chat loop finished");

    result
}

async fn main_loop(
    app: &AppHandle,
    terminal: &SharedTerminal,
    mut event_rx: mpsc::UnboundedReceiver<UiEvent>,
) -> Result<(), Box<dyn Error>> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<AppActionEnvelope>();
    let action_dispatcher = AppActionDispatcher::new(action_tx);
    let (stream_service, mut rx) = ChatStreamService::new();

    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;
    let mut indicator_visible = false;
    let mut last_indicator_frame = Instant::now() - frame_duration;

    loop {
        if is_exit_requested(app).await {
            return Ok(());
        }

        try_draw_frame(
            app,
            terminal,
            &mut request_redraw,
            &mut last_draw,
            frame_duration,
        )
        .await?;

        let term_size = current_terminal_size(terminal).await;

        let event_outcome =
            process_ui_events(app, &mut event_rx, &action_dispatcher, term_size).await;
        if event_outcome.request_redraw {
            request_redraw = true;
        }

        let current_stream_id = app.read(|app| app.active_stream_id()).await;
        let received_any =
            process_stream_updates(&action_dispatcher, &mut rx, term_size, current_stream_id);
        if received_any {
            request_redraw = true;
        }

        if app.read(|app| app.ui.status_expired(STATUS_TIMEOUT)).await {
            action_dispatcher.dispatch_many([AppAction::ClearStatus], action_context(term_size));
        }

        let actions_applied =
            drain_action_queue(app, &action_dispatcher, &stream_service, &mut action_rx).await;
        if actions_applied {
            request_redraw = true;
        }

        let indicator_now = app.read(|app| app.ui.is_activity_indicator_visible()).await;
        if indicator_now != indicator_visible {
            indicator_visible = indicator_now;
            request_redraw = true;
            if !indicator_now {
                last_indicator_frame = Instant::now() - frame_duration;
            }
        }

        if indicator_now {
            let now = Instant::now();
            if now.duration_since(last_indicator_frame) >= frame_duration {
                request_redraw = true;
                last_indicator_frame = now;
            }
        }

        let idle = !event_outcome.events_processed && !received_any && !request_redraw;
        if idle {
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
    }
}
