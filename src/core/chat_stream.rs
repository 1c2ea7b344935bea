use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ChatMessage, ChatRequest, ChatResponse};
use crate::utils::url::construct_api_url;

/// One event on the delta channel. Every stream ends with exactly one
/// `End` or one `Error`, unless it is cancelled, in which case nothing more
/// is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id tagging every message a stream produces.
pub fn next_stream_id() -> u64 {
    NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed)
}

const CLOSED_EARLY: &str = "The server closed the connection before the response finished.";
const MALFORMED_LINE: &str = "The server sent a response line that is not valid UTF-8.";

fn handle_stream_line(
    line: &str,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) -> bool {
    if line.is_empty() {
        return false;
    }

    match serde_json::from_str::<ChatResponse>(line) {
        Ok(response) => handle_stream_response(response, tx, stream_id),
        Err(_) => {
            let _ = tx.send((StreamMessage::Error(format_api_error(line)), stream_id));
            true
        }
    }
}

/// Forward one decoded line. Returns true once the stream has ended.
fn handle_stream_response(
    response: ChatResponse,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) -> bool {
    if let Some(error) = response.error {
        let _ = tx.send((StreamMessage::Error(format_api_error(&error)), stream_id));
        return true;
    }
    if let Some(message) = response.message {
        if !message.content.is_empty() {
            let _ = tx.send((StreamMessage::Chunk(message.content), stream_id));
        }
    }
    if response.done {
        let _ = tx.send((StreamMessage::End, stream_id));
        return true;
    }
    false
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error: <empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return format!("API Error: {summary}");
            }
        }
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            return format!("API Error:\n{pretty_json}");
        }
    }

    format!("API Error: {trimmed}")
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub model: String,
    pub api_messages: Vec<ChatMessage>,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Run one streaming request on its own task. The task stops at the next
    /// await point once `params.cancel_token` is cancelled.
    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                base_url,
                model,
                api_messages,
                cancel_token,
                stream_id,
            } = params;

            debug!(
                stream_id,
                model = %model,
                messages = api_messages.len(),
                "Starting chat stream"
            );

            let request = ChatRequest {
                model,
                messages: api_messages,
                stream: true,
            };

            tokio::select! {
                _ = run_stream(&client, &base_url, &request, &tx, stream_id, &cancel_token) => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "Chat stream cancelled");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn run_stream(
    client: &reqwest::Client,
    base_url: &str,
    request: &ChatRequest,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
    cancel_token: &CancellationToken,
) {
    let chat_url = construct_api_url(base_url, "api/chat");
    let response = match client.post(chat_url).json(request).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(stream_id, error = %e, "Chat request failed");
            let _ = tx.send((
                StreamMessage::Error(format!("Could not reach the model server: {e}")),
                stream_id,
            ));
            return;
        }
    };

    if !response.status().is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        let _ = tx.send((StreamMessage::Error(format_api_error(&error_text)), stream_id));
        return;
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        if cancel_token.is_cancelled() {
            return;
        }

        let chunk_bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(stream_id, error = %e, "Chat stream interrupted");
                let _ = tx.send((
                    StreamMessage::Error(format!("Connection lost while streaming: {e}")),
                    stream_id,
                ));
                return;
            }
        };
        buffer.extend_from_slice(&chunk_bytes);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let should_end = match std::str::from_utf8(&buffer[..newline_pos]) {
                Ok(line) => handle_stream_line(line.trim(), tx, stream_id),
                Err(e) => {
                    warn!(stream_id, error = %e, "Invalid UTF-8 in stream");
                    let _ = tx.send((
                        StreamMessage::Error(MALFORMED_LINE.to_string()),
                        stream_id,
                    ));
                    true
                }
            };
            buffer.drain(..=newline_pos);
            if should_end {
                return;
            }
        }
    }

    // A final line may arrive without its trailing newline. One that does not
    // decode was cut off by the close.
    let tail = std::str::from_utf8(&buffer).map(str::trim).unwrap_or_default();
    if let Ok(response) = serde_json::from_str::<ChatResponse>(tail) {
        if handle_stream_response(response, tx, stream_id) {
            return;
        }
    } else if !tail.is_empty() {
        debug!(stream_id, bytes = tail.len(), "Discarding truncated stream line");
    }

    let _ = tx.send((StreamMessage::Error(CLOSED_EARLY.to_string()), stream_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::spawn_http_server;
    use tokio::time::{timeout, Duration};

    const NDJSON: &str = "application/x-ndjson";

    fn params(base_url: String, stream_id: u64) -> StreamParams {
        StreamParams {
            client: reqwest::Client::new(),
            base_url,
            model: "llama3".to_string(),
            api_messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            cancel_token: CancellationToken::new(),
            stream_id,
        }
    }

    async fn collect_until_terminal(
        rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    ) -> Vec<StreamMessage> {
        let mut messages = Vec::new();
        loop {
            let (message, _) = timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("stream should finish")
                .expect("channel open");
            let terminal = !matches!(message, StreamMessage::Chunk(_));
            messages.push(message);
            if terminal {
                return messages;
            }
        }
    }

    #[test]
    fn stream_line_forwards_content_and_done() {
        let (service, mut rx) = ChatStreamService::new();
        let chunk = r#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        let done = r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true}"#;

        assert!(!handle_stream_line(chunk, &service.tx, 7));
        assert_eq!(
            rx.try_recv().expect("chunk"),
            (StreamMessage::Chunk("Hel".to_string()), 7)
        );

        assert!(handle_stream_line(done, &service.tx, 7));
        assert_eq!(rx.try_recv().expect("end"), (StreamMessage::End, 7));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stream_line_routes_server_errors() {
        let (service, mut rx) = ChatStreamService::new();
        assert!(handle_stream_line(
            r#"{"error":"model 'nope' not found"}"#,
            &service.tx,
            3
        ));
        assert_eq!(
            rx.try_recv().expect("error"),
            (
                StreamMessage::Error("API Error: model 'nope' not found".to_string()),
                3
            )
        );
    }

    #[test]
    fn stream_line_ignores_blank_lines() {
        let (service, mut rx) = ChatStreamService::new();
        assert!(!handle_stream_line("", &service.tx, 1));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn format_api_error_extracts_summary() {
        assert_eq!(
            format_api_error(r#"{"error":{"message":"model   overloaded"}}"#),
            "API Error: model overloaded"
        );
        assert_eq!(
            format_api_error(r#"{"status":"failed"}"#),
            "API Error:\n{\n  \"status\": \"failed\"\n}"
        );
        assert_eq!(format_api_error("  bad gateway "), "API Error: bad gateway");
        assert_eq!(format_api_error(""), "API Error: <empty>");
    }

    #[test]
    fn stream_ids_are_unique() {
        let a = next_stream_id();
        let b = next_stream_id();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn streams_deltas_in_order_until_done() {
        let (base_url, server) = spawn_http_server(
            "HTTP/1.1 200 OK",
            NDJSON,
            vec![
                "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n",
                "{\"message\":{\"role\":\"assistant\",\"content\":\"lo, \"},\"done\":false}\n{\"message\":{\"role\":\"assistant\",\"content\":\"wor",
                "ld\"},\"done\":false}\n",
                "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
            ],
        )
        .await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(base_url, 11));

        let messages = collect_until_terminal(&mut rx).await;
        assert_eq!(
            messages,
            vec![
                StreamMessage::Chunk("Hel".to_string()),
                StreamMessage::Chunk("lo, ".to_string()),
                StreamMessage::Chunk("world".to_string()),
                StreamMessage::End,
            ]
        );

        let (request_line, body) = server.await.expect("join").expect("request");
        assert!(request_line.starts_with("POST /api/chat "));
        let body: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[tokio::test]
    async fn connection_closed_before_done_is_a_failure() {
        let (base_url, _server) = spawn_http_server(
            "HTTP/1.1 200 OK",
            NDJSON,
            vec!["{\"message\":{\"role\":\"assistant\",\"content\":\"partial\"},\"done\":false}\n"],
        )
        .await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(base_url, 12));

        let messages = collect_until_terminal(&mut rx).await;
        assert_eq!(messages[0], StreamMessage::Chunk("partial".to_string()));
        assert_eq!(messages[1], StreamMessage::Error(CLOSED_EARLY.to_string()));
    }

    #[tokio::test]
    async fn line_cut_off_by_close_is_reported_as_closed_early() {
        let (base_url, _server) = spawn_http_server(
            "HTTP/1.1 200 OK",
            NDJSON,
            vec![
                "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n",
                "{\"message\":{\"role\":\"assist",
            ],
        )
        .await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(base_url, 14));

        let messages = collect_until_terminal(&mut rx).await;
        assert_eq!(
            messages,
            vec![
                StreamMessage::Chunk("Hel".to_string()),
                StreamMessage::Error(CLOSED_EARLY.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn final_line_without_newline_still_completes() {
        let (base_url, _server) = spawn_http_server(
            "HTTP/1.1 200 OK",
            NDJSON,
            vec![
                "{\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":false}\n",
                "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}",
            ],
        )
        .await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(base_url, 15));

        let messages = collect_until_terminal(&mut rx).await;
        assert_eq!(
            messages,
            vec![StreamMessage::Chunk("Hi".to_string()), StreamMessage::End]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_line_fails_the_stream() {
        let (base_url, _server) = spawn_http_server(
            "HTTP/1.1 200 OK",
            NDJSON,
            vec![
                &b"{\"message\":{\"role\":\"assistant\",\"content\":\"ok\"},\"done\":false}\n"[..],
                &b"{\"message\":{\"role\":\"assistant\",\"content\":\"\xff\xfe\"},\"done\":false}\n"[..],
                &b"{\"message\":{\"role\":\"assistant\",\"content\":\"later\"},\"done\":true}\n"[..],
            ],
        )
        .await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(base_url, 16));

        let messages = collect_until_terminal(&mut rx).await;
        assert_eq!(
            messages,
            vec![
                StreamMessage::Chunk("ok".to_string()),
                StreamMessage::Error(MALFORMED_LINE.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn non_success_status_reports_body() {
        let (base_url, _server) = spawn_http_server(
            "HTTP/1.1 404 Not Found",
            "application/json",
            vec!["{\"error\":\"model \\\"ghost\\\" not found, try pulling it first\"}"],
        )
        .await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(base_url, 13));

        let messages = collect_until_terminal(&mut rx).await;
        assert_eq!(
            messages,
            vec![StreamMessage::Error(
                "API Error: model \"ghost\" not found, try pulling it first".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn cancelled_stream_sends_nothing() {
        let (base_url, _server) = spawn_http_server(
            "HTTP/1.1 200 OK",
            NDJSON,
            vec!["{\"message\":{\"role\":\"assistant\",\"content\":\"late\"},\"done\":true}\n"],
        )
        .await;

        let (service, mut rx) = ChatStreamService::new();
        let params = params(base_url, 14);
        params.cancel_token.cancel();
        service.spawn_stream(params);

        let outcome = timeout(Duration::from_millis(300), rx.recv()).await;
        assert!(outcome.is_err(), "no message expected after cancellation");
    }
}
