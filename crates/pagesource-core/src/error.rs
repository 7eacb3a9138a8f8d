//! Error types for URL validation and the capture pipeline.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors that abort a whole capture: the browser could not be launched,
/// the DevTools channel broke, or the page never finished loading.
///
/// Per-resource failures (a body that can no longer be retrieved, a file
/// that cannot be written) are deliberately not represented here; they are
/// recovered locally and never abort the run.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The Chromium process could not be started.
    #[error("failed to launch browser: {reason}")]
    SpawnFailed { reason: String },

    /// Chromium started but its DevTools endpoint never exposed a page target.
    #[error("browser DevTools endpoint did not appear within {duration:?}")]
    EndpointTimeout { duration: Duration },

    /// Failed to establish the DevTools WebSocket connection.
    #[error("failed to connect to DevTools at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// Navigation was rejected by the browser (e.g. DNS failure, bad scheme).
    #[error("navigation failed: {reason}")]
    NavigationFailed { reason: String },

    /// The page did not reach a quiescent network state within the timeout.
    #[error("page did not finish loading within {duration:?}")]
    LoadTimeout { duration: Duration },

    /// A DevTools command returned an error response.
    #[error("CDP error {code}: {message}")]
    CdpError {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// A DevTools command timed out waiting for its response.
    #[error("CDP command '{method}' timed out after {duration:?}")]
    Timeout { method: String, duration: Duration },

    /// A protocol-level failure (serialization, unexpected frame, closed socket).
    #[error("CDP protocol error: {detail}")]
    Protocol { detail: String },
}

/// A user-supplied URL that cannot be captured from.
#[derive(Debug)]
pub struct UrlError {
    pub kind: UrlErrorKind,
}

#[derive(Debug)]
pub enum UrlErrorKind {
    /// The string does not parse as a URL at all.
    Unparseable { input: String },
    /// The URL parses but has no host to connect to.
    MissingHost { input: String },
    /// The URL has a scheme other than http/https.
    UnsupportedScheme { scheme: String },
}

impl UrlError {
    pub(crate) fn unparseable(input: &str) -> Self {
        Self {
            kind: UrlErrorKind::Unparseable {
                input: input.to_string(),
            },
        }
    }

    pub(crate) fn missing_host(input: &str) -> Self {
        Self {
            kind: UrlErrorKind::MissingHost {
                input: input.to_string(),
            },
        }
    }

    pub(crate) fn unsupported_scheme(scheme: &str) -> Self {
        Self {
            kind: UrlErrorKind::UnsupportedScheme {
                scheme: scheme.to_string(),
            },
        }
    }
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            UrlErrorKind::Unparseable { input } => {
                write!(f, "invalid URL: '{input}'")
            }
            UrlErrorKind::MissingHost { input } => {
                write!(f, "invalid URL: missing host in '{input}'")
            }
            UrlErrorKind::UnsupportedScheme { scheme } => {
                write!(f, "invalid URL scheme: '{scheme}' (must be http or https)")
            }
        }
    }
}

impl std::error::Error for UrlError {}
