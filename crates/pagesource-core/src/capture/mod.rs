//! Capture collector: drives one page load and buffers qualifying network
//! responses, then retrieves their bodies once the load has settled.
//!
//! Responses are buffered as handles during the load window and drained
//! only afterwards; retrieving a body mid-load races the browser's own
//! delivery of it. The buffer preserves arrival order, which the saver
//! depends on for deterministic dedup suffixes.

mod idle;

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::browser::{self, BrowserSession, CdpEvent, LaunchOptions};
use crate::config::PagesourceConfig;
use crate::error::CaptureError;
use crate::url_model::should_skip_url;

use idle::NetworkIdleTracker;

/// How long one event wait may block before re-checking quiescence.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A network response captured in full: observed URL, raw Content-Type
/// header value, and the response body byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResource {
    pub url: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// A qualifying response observed during the load window, before its body
/// is known to be retrievable.
#[derive(Debug)]
struct PendingResponse {
    request_id: String,
    url: String,
    content_type: String,
}

/// Progress notifications for the status display.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    LaunchingBrowser,
    Navigating { url: String },
    WaitingExtra { secs: u64 },
    Processing { count: usize },
}

impl fmt::Display for CaptureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureEvent::LaunchingBrowser => write!(f, "Launching browser..."),
            CaptureEvent::Navigating { url } => write!(f, "Navigating to {url}..."),
            CaptureEvent::WaitingExtra { secs } => {
                write!(f, "Waiting {secs}s for additional content...")
            }
            CaptureEvent::Processing { count } => write!(f, "Processing {count} responses..."),
        }
    }
}

/// Load `url` in a scoped headless browser and capture every qualifying
/// network response, in arrival order.
///
/// Fails when the browser cannot be launched or the page does not reach a
/// quiescent network state within the configured navigation timeout; the
/// browser session is torn down on every exit path. Individual responses
/// whose bodies are no longer retrievable are silently dropped.
pub async fn capture_page_resources(
    url: &str,
    wait_secs: u64,
    cfg: &PagesourceConfig,
    status_tx: &mpsc::Sender<CaptureEvent>,
) -> Result<Vec<CapturedResource>, CaptureError> {
    let _ = status_tx.send(CaptureEvent::LaunchingBrowser).await;
    let mut session = browser::launch(&LaunchOptions::from_config(cfg)).await?;

    let result = drive_capture(&mut session, url, wait_secs, cfg, status_tx).await;
    session.close().await;
    result
}

async fn drive_capture(
    session: &mut BrowserSession,
    url: &str,
    wait_secs: u64,
    cfg: &PagesourceConfig,
    status_tx: &mpsc::Sender<CaptureEvent>,
) -> Result<Vec<CapturedResource>, CaptureError> {
    // Subscribe before navigating so the main document's own response is
    // never missed.
    session.enable_network().await?;

    let mut tracker = NetworkIdleTracker::new(Duration::from_millis(cfg.settle_ms));
    let mut pending: Vec<PendingResponse> = Vec::new();

    let _ = status_tx
        .send(CaptureEvent::Navigating {
            url: url.to_string(),
        })
        .await;
    session.navigate(url).await?;

    let timeout = Duration::from_secs(cfg.navigation_timeout_secs);
    let deadline = Instant::now() + timeout;
    while !tracker.is_quiescent() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(CaptureError::LoadTimeout { duration: timeout });
        }
        let poll = remaining.min(EVENT_POLL_INTERVAL);
        if let Some(event) = session.next_event(poll).await? {
            handle_network_event(&event, &mut tracker, &mut pending);
        }
    }
    tracing::debug!(responses = pending.len(), "page load settled");

    // Optional extra window for lazy-loaded content; the subscription stays
    // active so late responses are still filtered and buffered.
    if wait_secs > 0 {
        let _ = status_tx
            .send(CaptureEvent::WaitingExtra { secs: wait_secs })
            .await;
        let window_end = Instant::now() + Duration::from_secs(wait_secs);
        loop {
            let remaining = window_end.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if let Some(event) = session
                .next_event(remaining.min(EVENT_POLL_INTERVAL))
                .await?
            {
                handle_network_event(&event, &mut tracker, &mut pending);
            }
        }
    }

    let _ = status_tx
        .send(CaptureEvent::Processing {
            count: pending.len(),
        })
        .await;

    let mut captured = Vec::with_capacity(pending.len());
    for response in pending {
        match session.response_body(&response.request_id).await {
            Ok(body) => captured.push(CapturedResource {
                url: response.url,
                content_type: response.content_type,
                body,
            }),
            // Expected for redirected or evicted responses; drop just this one.
            Err(err) => {
                tracing::debug!(url = %response.url, error = %err, "response body unavailable, dropping");
            }
        }
    }
    Ok(captured)
}

fn handle_network_event(
    event: &CdpEvent,
    tracker: &mut NetworkIdleTracker,
    pending: &mut Vec<PendingResponse>,
) {
    match event.method.as_str() {
        "Network.requestWillBeSent" => {
            if let Some(id) = request_id(&event.params) {
                tracker.request_started(id);
            }
        }
        "Network.loadingFinished" | "Network.loadingFailed" => {
            if let Some(id) = request_id(&event.params) {
                tracker.request_finished(id);
            }
        }
        "Network.responseReceived" => {
            tracker.touch();
            if let Some(response) = qualifying_response(&event.params) {
                pending.push(response);
            }
        }
        "Page.loadEventFired" => tracker.load_event_fired(),
        _ => {}
    }
}

fn request_id(params: &Value) -> Option<&str> {
    params.get("requestId").and_then(Value::as_str)
}

/// Extracts a `PendingResponse` from `Network.responseReceived` params if
/// the response qualifies: success status and a fetchable scheme.
fn qualifying_response(params: &Value) -> Option<PendingResponse> {
    let request_id = request_id(params)?;
    let response = params.get("response")?;
    let url = response.get("url")?.as_str()?;

    let status = response.get("status").and_then(Value::as_u64).unwrap_or(0);
    if !(200..=299).contains(&status) {
        return None;
    }
    if should_skip_url(url) {
        return None;
    }

    let content_type = response
        .get("headers")
        .and_then(Value::as_object)
        .and_then(|headers| {
            headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                .and_then(|(_, value)| value.as_str())
        })
        .unwrap_or("")
        .to_string();

    Some(PendingResponse {
        request_id: request_id.to_string(),
        url: url.to_string(),
        content_type,
    })
}
