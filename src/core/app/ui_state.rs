use std::time::{Duration, Instant};

use tui_textarea::TextArea;

use crate::core::app::browser::ContextBrowserState;
use crate::ui::picker::PickerState;

/// Background activity being performed in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    /// Streaming a chat response from the model server.
    ChatStream,

    /// Fetching the list of installed models.
    ModelRequest,

    /// Reading a file or directory for context.
    ContextLoad,
}

#[derive(Debug, Clone)]
pub struct UiState {
    textarea: TextArea<'static>,
    pub status: Option<String>,
    pub status_set_at: Option<Instant>,
    pub model_picker: PickerState,
    pub context_browser: Option<ContextBrowserState>,
    /// Transcript scroll position counted in lines up from the newest line.
    pub scroll_from_bottom: u16,
    pub activity_indicator: Option<ActivityKind>,
    pub pulse_start: Instant,
    pub exit_requested: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        let mut state = Self {
            textarea: TextArea::default(),
            status: None,
            status_set_at: None,
            model_picker: PickerState::new("Models", Vec::new(), 0),
            context_browser: None,
            scroll_from_bottom: 0,
            activity_indicator: None,
            pulse_start: Instant::now(),
            exit_requested: false,
        };
        state.configure_textarea();
        state
    }

    pub(crate) fn configure_textarea(&mut self) {
        self.textarea.set_cursor_line_style(ratatui::style::Style::default());
        self.textarea
            .set_placeholder_text("Type a message, Enter to send");
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    pub fn textarea_mut(&mut self) -> &mut TextArea<'static> {
        &mut self.textarea
    }

    pub fn get_input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn get_textarea_line_count(&self) -> usize {
        self.textarea.lines().len()
    }

    pub fn clear_input(&mut self) {
        self.textarea = TextArea::default();
        self.configure_textarea();
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
        self.status_set_at = Some(Instant::now());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
        self.status_set_at = None;
    }

    /// A status is stale once it has been shown for `ttl` with nothing running.
    pub fn status_expired(&self, ttl: Duration) -> bool {
        match self.status_set_at {
            Some(set_at) => self.activity_indicator.is_none() && set_at.elapsed() >= ttl,
            None => false,
        }
    }

    pub fn begin_activity(&mut self, kind: ActivityKind) {
        self.activity_indicator = Some(kind);
        self.pulse_start = Instant::now();
    }

    pub fn end_activity(&mut self, kind: ActivityKind) {
        if self.activity_indicator == Some(kind) {
            self.activity_indicator = None;
        }
    }

    pub fn is_activity_indicator_visible(&self) -> bool {
        self.activity_indicator.is_some()
    }

    pub fn begin_streaming(&mut self) {
        self.scroll_from_bottom = 0;
        self.begin_activity(ActivityKind::ChatStream);
    }

    pub fn end_streaming(&mut self) {
        self.end_activity(ActivityKind::ChatStream);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    /// Keep the scroll position within the transcript that was just laid out.
    pub fn clamp_scroll(&mut self, max_scroll: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.min(max_scroll);
    }

    /// Clear everything that belongs to a single chat.
    pub fn reset_chat(&mut self) {
        self.clear_input();
        self.context_browser = None;
        self.scroll_from_bottom = 0;
        self.end_streaming();
    }
}
