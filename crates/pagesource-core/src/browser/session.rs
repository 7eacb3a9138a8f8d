//! Page session: the scoped browser handle the capture collector drives.

use std::process::Child;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::error::CaptureError;

use super::cdp::{CdpClient, CdpEvent};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Kills the Chromium process on drop so teardown happens on every exit
/// path, including panics and cancelled futures.
pub(crate) struct ChildGuard(Child);

impl ChildGuard {
    pub(crate) fn new(child: Child) -> Self {
        Self(child)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// One live page target in a browser this process owns.
///
/// Holds the DevTools client, the child-process guard, and the temporary
/// profile directory; dropping the session tears all three down. `close`
/// additionally asks the browser to exit gracefully first.
pub struct BrowserSession {
    client: CdpClient,
    _child: ChildGuard,
    _profile: TempDir,
    closed: bool,
}

impl BrowserSession {
    pub(crate) async fn connect(
        ws_url: &str,
        child: ChildGuard,
        profile: TempDir,
    ) -> Result<Self, CaptureError> {
        let client = CdpClient::connect(ws_url).await?;
        Ok(Self {
            client,
            _child: child,
            _profile: profile,
            closed: false,
        })
    }

    /// Enable the Network and Page domains so response and lifecycle events
    /// start flowing. Must be called before `navigate` or early responses
    /// (the main document in particular) are missed.
    pub async fn enable_network(&self) -> Result<(), CaptureError> {
        self.client.enable_domain("Network").await?;
        self.client.enable_domain("Page").await?;
        Ok(())
    }

    /// Start navigating to `url`. Completion is observed through events,
    /// not through this call; only outright rejection (bad scheme, DNS
    /// failure) is reported here.
    pub async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
        let result = self
            .client
            .send_command("Page.navigate", json!({ "url": url }))
            .await?;
        if let Some(reason) = result.get("errorText").and_then(Value::as_str) {
            if !reason.is_empty() {
                return Err(CaptureError::NavigationFailed {
                    reason: reason.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Wait up to `timeout` for the next browser event. `Ok(None)` means no
    /// event arrived in time; an error means the DevTools connection is gone.
    pub async fn next_event(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<CdpEvent>, CaptureError> {
        match tokio::time::timeout(timeout, self.client.recv_event()).await {
            Ok(Some(event)) => Ok(Some(event)),
            Ok(None) => Err(CaptureError::Protocol {
                detail: "event stream closed during page load".to_string(),
            }),
            Err(_) => Ok(None),
        }
    }

    /// Retrieve the raw body of a previously observed response. Fails when
    /// the browser no longer holds the body (redirected away, evicted).
    pub async fn response_body(&self, request_id: &str) -> Result<Vec<u8>, CaptureError> {
        let result = self
            .client
            .send_command("Network.getResponseBody", json!({ "requestId": request_id }))
            .await?;
        let body = result
            .get("body")
            .and_then(Value::as_str)
            .ok_or_else(|| CaptureError::Protocol {
                detail: "Network.getResponseBody returned no body".to_string(),
            })?;

        if result
            .get("base64Encoded")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            B64.decode(body).map_err(|e| CaptureError::Protocol {
                detail: format!("invalid base64 response body: {e}"),
            })
        } else {
            Ok(body.as_bytes().to_vec())
        }
    }

    /// Graceful shutdown: ask the browser to exit, then let the guards
    /// reap whatever is left.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self
            .client
            .send_command_with_timeout("Browser.close", json!({}), CLOSE_TIMEOUT)
            .await;
    }
}
