//! Conversation state for one chat with one model.
//!
//! A session is either idle or waiting on exactly one stream. Deltas from the
//! stream are applied to the assistant placeholder appended at submit time;
//! anything tagged with another stream id is dropped.

use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::ChatMessage;
use crate::core::chat_stream::next_stream_id;
use crate::core::context::ContextBundle;
use crate::core::message::Message;

#[derive(Debug)]
enum SessionState {
    Idle,
    Streaming {
        stream_id: u64,
        placeholder_index: usize,
        cancel_token: CancellationToken,
    },
}

/// Submissions the session declines. Both are benign and never shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    EmptySubmission,
    ConcurrentSubmission,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::EmptySubmission => write!(f, "nothing to send"),
            SubmitError::ConcurrentSubmission => {
                write!(f, "a response is still streaming")
            }
        }
    }
}

impl StdError for SubmitError {}

/// Everything needed to start the stream for an accepted submission.
#[derive(Debug)]
pub struct StreamRequest {
    pub stream_id: u64,
    pub cancel_token: CancellationToken,
    pub model: String,
    pub api_messages: Vec<ChatMessage>,
}

/// Prompt actually sent when context is attached. Only `user_text` is kept
/// in the transcript.
pub fn compose_prompt(bundle: &ContextBundle, user_text: &str) -> String {
    format!(
        "{}\n{}\n\nBased on this, respond to: {}",
        bundle.explanation(),
        bundle.payload,
        user_text
    )
}

/// Final content of an assistant message whose stream failed. Whatever had
/// already arrived stays visible ahead of the notice.
pub fn render_failure_notice(partial: &str, cause: &str) -> String {
    let cause = cause.trim();
    if partial.is_empty() {
        format!("[Error: {cause}]")
    } else {
        format!("{partial}\n\n[Response interrupted: {cause}]")
    }
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct ConversationSession {
    id: u64,
    model: String,
    messages: Vec<Message>,
    pending_context: Option<ContextBundle>,
    state: SessionState,
}

impl ConversationSession {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            model: model.into(),
            messages: Vec::new(),
            pending_context: None,
            state: SessionState::Idle,
        }
    }

    /// Process-unique id, so results started for one chat never land in another.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_context(&self) -> Option<&ContextBundle> {
        self.pending_context.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state, SessionState::Streaming { .. })
    }

    pub fn active_stream_id(&self) -> Option<u64> {
        match self.state {
            SessionState::Streaming { stream_id, .. } => Some(stream_id),
            SessionState::Idle => None,
        }
    }

    /// Attach context for the next turn, returning whatever it replaces.
    pub fn set_context(&mut self, bundle: ContextBundle) -> Option<ContextBundle> {
        self.pending_context.replace(bundle)
    }

    pub fn clear_context(&mut self) -> Option<ContextBundle> {
        self.pending_context.take()
    }

    /// Record a user turn and prepare the stream that answers it.
    ///
    /// On success the history has grown by a user message and an empty
    /// assistant placeholder, the pending context is consumed, and the
    /// session is streaming. The returned messages cover the history before
    /// the placeholder, with the last user turn expanded by any context.
    pub fn submit(&mut self, user_text: &str) -> Result<StreamRequest, SubmitError> {
        if self.is_streaming() {
            return Err(SubmitError::ConcurrentSubmission);
        }
        if user_text.trim().is_empty() {
            return Err(SubmitError::EmptySubmission);
        }

        let outgoing = match self.pending_context.take() {
            Some(bundle) => {
                debug!(label = %bundle.label, "Merging context into outgoing prompt");
                compose_prompt(&bundle, user_text)
            }
            None => user_text.to_string(),
        };

        let mut api_messages: Vec<ChatMessage> = self
            .messages
            .iter()
            .filter(|msg| !(msg.is_assistant() && msg.content.is_empty()))
            .map(Message::to_api_message)
            .collect();
        api_messages.push(Message::user(outgoing).to_api_message());

        self.messages.push(Message::user(user_text));
        self.messages.push(Message::assistant(String::new()));

        let stream_id = next_stream_id();
        let cancel_token = CancellationToken::new();
        self.state = SessionState::Streaming {
            stream_id,
            placeholder_index: self.messages.len() - 1,
            cancel_token: cancel_token.clone(),
        };

        Ok(StreamRequest {
            stream_id,
            cancel_token,
            model: self.model.clone(),
            api_messages,
        })
    }

    fn placeholder_for(&mut self, stream_id: u64) -> Option<&mut Message> {
        match self.state {
            SessionState::Streaming {
                stream_id: active,
                placeholder_index,
                ..
            } if active == stream_id => self.messages.get_mut(placeholder_index),
            _ => None,
        }
    }

    /// Append a delta to the placeholder. Returns false for stale streams.
    pub fn apply_chunk(&mut self, stream_id: u64, chunk: &str) -> bool {
        match self.placeholder_for(stream_id) {
            Some(placeholder) => {
                placeholder.content.push_str(chunk);
                true
            }
            None => false,
        }
    }

    /// The stream finished normally; the placeholder content is final.
    pub fn complete(&mut self, stream_id: u64) -> bool {
        if self.active_stream_id() != Some(stream_id) {
            return false;
        }
        self.state = SessionState::Idle;
        true
    }

    /// The stream failed; the placeholder becomes a failure notice.
    pub fn fail(&mut self, stream_id: u64, cause: &str) -> bool {
        let Some(placeholder) = self.placeholder_for(stream_id) else {
            return false;
        };
        placeholder.content = render_failure_notice(&placeholder.content, cause);
        self.state = SessionState::Idle;
        true
    }

    /// Stop the in-flight stream, keeping the partial answer as final.
    pub fn interrupt(&mut self) -> bool {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Streaming {
                stream_id,
                cancel_token,
                ..
            } => {
                debug!(stream_id, "Interrupting chat stream");
                cancel_token.cancel();
                true
            }
            SessionState::Idle => false,
        }
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        if let SessionState::Streaming { cancel_token, .. } = &self.state {
            cancel_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ContextKind;
    use crate::core::message::TranscriptRole;

    fn file_bundle(label: &str, payload: &str) -> ContextBundle {
        ContextBundle {
            label: label.to_string(),
            payload: payload.to_string(),
            kind: ContextKind::File,
        }
    }

    fn run_stream(session: &mut ConversationSession, text: &str, chunks: &[&str]) -> u64 {
        let request = session.submit(text).expect("submit accepted");
        for chunk in chunks {
            assert!(session.apply_chunk(request.stream_id, chunk));
        }
        request.stream_id
    }

    #[test]
    fn each_session_gets_its_own_id() {
        let first = ConversationSession::new("llama3");
        let second = ConversationSession::new("llama3");
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn submit_appends_user_and_placeholder_before_any_delta() {
        let mut session = ConversationSession::new("llama3");
        let request = session.submit("Hello").expect("submit");

        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0], Message::user("Hello"));
        assert_eq!(session.messages()[1], Message::assistant(""));
        assert!(session.is_streaming());
        assert_eq!(session.active_stream_id(), Some(request.stream_id));
        assert_eq!(request.model, "llama3");
        assert_eq!(
            request.api_messages,
            vec![ChatMessage {
                role: "user".to_string(),
                content: "Hello".to_string()
            }]
        );
    }

    #[test]
    fn empty_submission_is_ignored() {
        let mut session = ConversationSession::new("llama3");
        assert_eq!(
            session.submit("   \n").unwrap_err(),
            SubmitError::EmptySubmission
        );
        assert!(session.messages().is_empty());
        assert!(!session.is_streaming());
    }

    #[test]
    fn submit_while_streaming_leaves_history_untouched() {
        let mut session = ConversationSession::new("llama3");
        let first = session.submit("one").expect("submit");
        let before = session.messages().to_vec();

        assert_eq!(
            session.submit("two").unwrap_err(),
            SubmitError::ConcurrentSubmission
        );
        assert_eq!(session.messages(), before.as_slice());
        assert_eq!(session.active_stream_id(), Some(first.stream_id));
    }

    #[test]
    fn final_content_is_independent_of_chunk_boundaries() {
        let text = "The quick brown fox jumps over the lazy dog.";
        let chunkings: Vec<Vec<&str>> = vec![
            vec![text],
            vec!["The quick ", "brown fox ", "jumps over the lazy dog."],
            text.split_inclusive(' ').collect(),
            vec!["", "The quick brown fox jumps over the lazy dog", "", "."],
        ];

        for chunks in chunkings {
            let mut session = ConversationSession::new("llama3");
            let stream_id = run_stream(&mut session, "go", &chunks);
            assert!(session.complete(stream_id));
            assert_eq!(session.messages()[1].content, text);
            assert!(!session.is_streaming());
        }
    }

    #[test]
    fn failure_keeps_partial_text_and_returns_to_idle() {
        let mut session = ConversationSession::new("llama3");
        let stream_id = run_stream(&mut session, "greet", &["Hel", "lo, ", "world"]);

        assert!(session.fail(stream_id, "connection reset"));

        let last = session.messages().last().expect("assistant message");
        assert_eq!(last.role, TranscriptRole::Assistant);
        assert!(last.content.starts_with("Hello, world"));
        assert!(last.content.contains("[Response interrupted: connection reset]"));
        assert!(!session.is_streaming());

        session.submit("again").expect("session accepts new turns");
        assert_eq!(session.messages().len(), 4);
    }

    #[test]
    fn failure_without_partial_text_shows_only_the_error() {
        let mut session = ConversationSession::new("llama3");
        let request = session.submit("hi").expect("submit");
        session.fail(request.stream_id, " API Error: model not found ");
        assert_eq!(
            session.messages()[1].content,
            "[Error: API Error: model not found]"
        );
    }

    #[test]
    fn stale_stream_events_are_ignored() {
        let mut session = ConversationSession::new("llama3");
        let first = session.submit("one").expect("submit");
        session.interrupt();
        let second = session.submit("two").expect("submit");

        assert!(!session.apply_chunk(first.stream_id, "late"));
        assert!(!session.complete(first.stream_id));
        assert!(!session.fail(first.stream_id, "late"));
        assert!(session.apply_chunk(second.stream_id, "fresh"));
        assert_eq!(session.messages()[3].content, "fresh");
        assert!(first.cancel_token.is_cancelled());
    }

    #[test]
    fn interrupt_keeps_partial_answer() {
        let mut session = ConversationSession::new("llama3");
        let request = session.submit("hi").expect("submit");
        session.apply_chunk(request.stream_id, "partial");

        assert!(session.interrupt());
        assert!(!session.interrupt());
        assert_eq!(session.messages()[1].content, "partial");
        assert!(request.cancel_token.is_cancelled());
    }

    #[test]
    fn context_is_sent_once_and_not_stored() {
        let mut session = ConversationSession::new("llama3");
        session.set_context(file_bundle("notes.txt", "alpha beta"));

        let request = session.submit("summarize").expect("submit");
        let outgoing = &request.api_messages.last().expect("user turn").content;
        assert_eq!(
            outgoing,
            "The following is the content of the file 'notes.txt':\nalpha beta\n\nBased on this, respond to: summarize"
        );
        assert_eq!(session.messages()[0].content, "summarize");
        assert!(session.pending_context().is_none());

        session.complete(request.stream_id);
        let followup = session.submit("and now?").expect("submit");
        assert!(followup
            .api_messages
            .iter()
            .all(|msg| !msg.content.contains("alpha beta")));
    }

    #[test]
    fn history_is_resent_and_empty_placeholders_skipped() {
        let mut session = ConversationSession::new("llama3");
        let first = run_stream(&mut session, "one", &["uno"]);
        session.complete(first);
        let second = session.submit("two").expect("submit");
        session.interrupt();
        drop(second);

        let third = session.submit("three").expect("submit");
        let roles: Vec<(&str, &str)> = third
            .api_messages
            .iter()
            .map(|m| (m.role.as_str(), m.content.as_str()))
            .collect();
        assert_eq!(
            roles,
            vec![
                ("user", "one"),
                ("assistant", "uno"),
                ("user", "two"),
                ("user", "three"),
            ]
        );
    }

    #[test]
    fn new_context_replaces_pending_context() {
        let mut session = ConversationSession::new("llama3");
        assert!(session.set_context(file_bundle("a.txt", "a")).is_none());
        let replaced = session.set_context(file_bundle("b.txt", "b"));
        assert_eq!(replaced.map(|b| b.label), Some("a.txt".to_string()));
        assert_eq!(
            session.pending_context().map(|b| b.label.as_str()),
            Some("b.txt")
        );
    }

    #[test]
    fn dropping_a_streaming_session_cancels_its_stream() {
        let mut session = ConversationSession::new("llama3");
        let request = session.submit("hi").expect("submit");
        drop(session);
        assert!(request.cancel_token.is_cancelled());
    }
}
