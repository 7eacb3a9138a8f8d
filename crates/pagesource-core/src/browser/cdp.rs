//! Chrome DevTools Protocol WebSocket client.
//!
//! JSON-RPC 2.0 over a WebSocket: commands go out with auto-incremented ids
//! and are correlated back to their callers through oneshot channels; frames
//! without an id are events and are forwarded to an unbounded channel the
//! session drains. A background task owns the read half of the socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::CaptureError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>>;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// An event pushed by the browser (e.g. `Network.responseReceived`).
#[derive(Debug, Clone)]
pub struct CdpEvent {
    /// Event method name, domain-qualified.
    pub method: String,
    /// Event parameters as raw JSON.
    pub params: Value,
}

#[derive(Debug, Clone, serde::Serialize)]
struct CdpCommand {
    id: u64,
    method: String,
    params: Value,
}

/// A reply to a command, correlated by id.
#[derive(Debug, Clone)]
struct CdpResponse {
    result: Option<Value>,
    error: Option<CdpResponseError>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct CdpResponseError {
    code: i64,
    message: String,
    data: Option<String>,
}

/// An incoming WebSocket frame, classified.
enum CdpMessage {
    /// Reply to a pending command (frame carries an `id`).
    Response { id: u64, response: CdpResponse },
    /// Browser-initiated event (frame carries a `method`, no `id`).
    Event(CdpEvent),
}

pub(crate) struct CdpClient {
    next_id: AtomicU64,
    pending: PendingMap,
    writer: Mutex<WsSink>,
    event_rx: mpsc::UnboundedReceiver<CdpEvent>,
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a page target's WebSocket debugger URL
    /// (`ws://127.0.0.1:{port}/devtools/page/{target_id}`).
    pub(crate) async fn connect(ws_url: &str) -> Result<Self, CaptureError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url).await.map_err(|e| {
            CaptureError::ConnectionFailed {
                url: ws_url.to_string(),
                reason: e.to_string(),
            }
        })?;
        tracing::debug!(url = ws_url, "DevTools WebSocket connected");

        let (writer, reader) = ws_stream.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let pending_for_reader = Arc::clone(&pending);
        let reader_handle = tokio::spawn(async move {
            read_loop(reader, pending_for_reader, event_tx).await;
        });

        Ok(Self {
            next_id: AtomicU64::new(1),
            pending,
            writer: Mutex::new(writer),
            event_rx,
            _reader_handle: reader_handle,
        })
    }

    /// Send a command and wait for its reply with the default timeout.
    pub(crate) async fn send_command(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Value, CaptureError> {
        self.send_command_with_timeout(method, params, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    pub(crate) async fn send_command_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, CaptureError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let cmd = CdpCommand {
            id,
            method: method.to_string(),
            params,
        };
        let json = serde_json::to_string(&cmd).map_err(|e| CaptureError::Protocol {
            detail: format!("failed to serialize command: {e}"),
        })?;

        tracing::trace!(id, method, "sending CDP command");

        // Register before sending so a fast reply cannot slip past.
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        {
            let mut writer = self.writer.lock().await;
            writer
                .send(Message::Text(json))
                .await
                .map_err(|e| CaptureError::Protocol {
                    detail: format!("failed to send WebSocket message: {e}"),
                })?;
        }

        let response = tokio::time::timeout(timeout, rx)
            .await
            .map_err(|_| CaptureError::Timeout {
                method: method.to_string(),
                duration: timeout,
            })?
            .map_err(|_| CaptureError::Protocol {
                detail: "DevTools connection closed before reply".to_string(),
            })?;

        if let Some(err) = response.error {
            return Err(CaptureError::CdpError {
                code: err.code,
                message: err.message,
                data: err.data,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Receive the next event. `None` means the socket is gone.
    pub(crate) async fn recv_event(&mut self) -> Option<CdpEvent> {
        self.event_rx.recv().await
    }

    /// Enable a CDP domain (`Network`, `Page`, ...) so it starts emitting events.
    pub(crate) async fn enable_domain(&self, domain: &str) -> Result<(), CaptureError> {
        let method = format!("{domain}.enable");
        self.send_command(&method, serde_json::json!({})).await?;
        Ok(())
    }
}

/// Reads WebSocket frames until the socket closes, dispatching replies to
/// their pending oneshots and events to the event channel. On exit every
/// still-pending command is failed by dropping its sender.
async fn read_loop(mut reader: WsSource, pending: PendingMap, event_tx: mpsc::UnboundedSender<CdpEvent>) {
    while let Some(frame) = reader.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket read error, stopping reader");
                break;
            }
        };

        let text = match msg {
            Message::Text(t) => t,
            Message::Binary(b) => match String::from_utf8(b.to_vec()) {
                Ok(s) => s,
                Err(_) => continue,
            },
            Message::Close(_) => {
                tracing::debug!("WebSocket closed by browser");
                break;
            }
            _ => continue,
        };

        let json: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable CDP frame, skipping");
                continue;
            }
        };

        match classify_message(&json) {
            Some(CdpMessage::Response { id, response }) => {
                let sender = pending.lock().await.remove(&id);
                if let Some(sender) = sender {
                    let _ = sender.send(response);
                } else {
                    tracing::trace!(id, "reply for unknown command id");
                }
            }
            Some(CdpMessage::Event(event)) => {
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            None => {}
        }
    }

    // Fail all pending commands: dropping the senders wakes their callers
    // with a closed-channel error.
    pending.lock().await.clear();
}

/// Classifies a frame as a command reply (has `id`) or an event (has
/// `method` only). Frames with neither are dropped.
fn classify_message(json: &Value) -> Option<CdpMessage> {
    if let Some(id) = json.get("id").and_then(Value::as_u64) {
        return Some(CdpMessage::Response {
            id,
            response: CdpResponse {
                result: json.get("result").cloned(),
                error: json
                    .get("error")
                    .and_then(|e| serde_json::from_value(e.clone()).ok()),
            },
        });
    }
    let method = json.get("method")?.as_str()?.to_string();
    let params = json.get("params").cloned().unwrap_or(Value::Null);
    Some(CdpMessage::Event(CdpEvent { method, params }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_serialization() {
        let cmd = CdpCommand {
            id: 7,
            method: "Page.navigate".to_string(),
            params: serde_json::json!({ "url": "https://example.com" }),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["method"], "Page.navigate");
        assert_eq!(json["params"]["url"], "https://example.com");
    }

    #[test]
    fn classify_reply_with_result() {
        let json = serde_json::json!({
            "id": 1,
            "result": { "frameId": "abc123" }
        });
        match classify_message(&json) {
            Some(CdpMessage::Response { id, response }) => {
                assert_eq!(id, 1);
                assert_eq!(response.result.unwrap()["frameId"], "abc123");
                assert!(response.error.is_none());
            }
            _ => panic!("expected a response"),
        }
    }

    #[test]
    fn classify_reply_with_error() {
        let json = serde_json::json!({
            "id": 2,
            "error": { "code": -32602, "message": "Invalid params", "data": "missing 'url'" }
        });
        match classify_message(&json) {
            Some(CdpMessage::Response { response, .. }) => {
                let err = response.error.unwrap();
                assert_eq!(err.code, -32602);
                assert_eq!(err.message, "Invalid params");
                assert_eq!(err.data.as_deref(), Some("missing 'url'"));
            }
            _ => panic!("expected a response"),
        }
    }

    #[test]
    fn classify_event() {
        let json = serde_json::json!({
            "method": "Page.loadEventFired",
            "params": { "timestamp": 12345.678 }
        });
        match classify_message(&json) {
            Some(CdpMessage::Event(event)) => {
                assert_eq!(event.method, "Page.loadEventFired");
                assert_eq!(event.params["timestamp"], 12345.678);
            }
            _ => panic!("expected an event"),
        }
    }

    #[test]
    fn classify_event_without_params() {
        let json = serde_json::json!({ "method": "Page.domContentEventFired" });
        match classify_message(&json) {
            Some(CdpMessage::Event(event)) => assert_eq!(event.params, Value::Null),
            _ => panic!("expected an event"),
        }
    }

    #[test]
    fn frame_with_id_is_never_an_event() {
        let json = serde_json::json!({
            "id": 3,
            "method": "Page.navigate",
            "result": {}
        });
        assert!(matches!(
            classify_message(&json),
            Some(CdpMessage::Response { .. })
        ));
    }

    #[test]
    fn frame_with_neither_id_nor_method_is_dropped() {
        let json = serde_json::json!({ "params": { "foo": "bar" } });
        assert!(classify_message(&json).is_none());
    }

    #[test]
    fn error_payload_deserialization() {
        let err: CdpResponseError =
            serde_json::from_str(r#"{"code": -32601, "message": "Method not found"}"#).unwrap();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Method not found");
        assert!(err.data.is_none());
    }
}
