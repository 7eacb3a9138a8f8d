//! Chromium discovery and headless launch.

use std::env;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use serde_json::Value;
use which::which;

use crate::config::PagesourceConfig;
use crate::error::CaptureError;

use super::session::{BrowserSession, ChildGuard};

/// Environment variable naming an explicit Chromium binary. Wins over the
/// config file's `browser_binary`.
pub const BROWSER_ENV_VAR: &str = "PAGESOURCE_BROWSER";

const ENDPOINT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit Chromium binary from the config file.
    pub binary: Option<PathBuf>,
    /// How long to wait for the DevTools endpoint to expose a page target.
    pub launch_timeout: Duration,
}

impl LaunchOptions {
    pub fn from_config(cfg: &PagesourceConfig) -> Self {
        Self {
            binary: cfg.browser_binary.as_ref().map(PathBuf::from),
            launch_timeout: Duration::from_secs(cfg.launch_timeout_secs),
        }
    }
}

/// Launch a headless Chromium with a throwaway profile and connect to its
/// first page target. The returned session kills the process and removes
/// the profile when dropped.
pub async fn launch(opts: &LaunchOptions) -> Result<BrowserSession, CaptureError> {
    let binary =
        find_browser_binary(opts.binary.as_deref()).ok_or_else(|| CaptureError::SpawnFailed {
            reason: format!(
                "no Chromium binary found (set {BROWSER_ENV_VAR} or browser_binary in config.toml)"
            ),
        })?;

    let port = pick_ephemeral_port().map_err(|e| CaptureError::SpawnFailed {
        reason: format!("could not reserve a debugging port: {e}"),
    })?;
    let profile = tempfile::tempdir().map_err(|e| CaptureError::SpawnFailed {
        reason: format!("could not create a profile directory: {e}"),
    })?;

    tracing::debug!(binary = %binary.display(), port, "launching headless Chromium");
    let child = Command::new(&binary)
        .arg("--headless=new")
        .arg("--disable-gpu")
        .arg(format!("--remote-debugging-port={port}"))
        .arg("--remote-debugging-address=127.0.0.1")
        .arg(format!("--user-data-dir={}", profile.path().display()))
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("about:blank")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| CaptureError::SpawnFailed {
            reason: format!("{}: {e}", binary.display()),
        })?;
    // From here on the guard kills the process on every early return.
    let guard = ChildGuard::new(child);

    let ws_url = wait_for_page_target(port, opts.launch_timeout).await?;
    BrowserSession::connect(&ws_url, guard, profile).await
}

/// Poll the DevTools HTTP endpoint until a `page` target with a WebSocket
/// debugger URL appears.
async fn wait_for_page_target(port: u16, timeout: Duration) -> Result<String, CaptureError> {
    let deadline = tokio::time::Instant::now() + timeout;
    let list_url = format!("http://127.0.0.1:{port}/json/list");

    while tokio::time::Instant::now() < deadline {
        if let Ok(resp) = reqwest::get(&list_url).await {
            if let Ok(targets) = resp.json::<Vec<Value>>().await {
                for target in &targets {
                    if target.get("type").and_then(Value::as_str) != Some("page") {
                        continue;
                    }
                    if let Some(ws) = target
                        .get("webSocketDebuggerUrl")
                        .and_then(Value::as_str)
                    {
                        return Ok(ws.to_string());
                    }
                }
            }
        }
        tokio::time::sleep(ENDPOINT_POLL_INTERVAL).await;
    }
    Err(CaptureError::EndpointTimeout { duration: timeout })
}

fn pick_ephemeral_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Locates a Chromium binary: env var, then config, then `$PATH` lookup of
/// well-known names, then absolute OS paths.
fn find_browser_binary(configured: Option<&Path>) -> Option<PathBuf> {
    if let Ok(raw) = env::var(BROWSER_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    for name in browser_binary_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_browser_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn browser_binary_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "chromium",
            "chromium-browser",
            "google-chrome-stable",
            "google-chrome",
        ]
    }
}

fn os_specific_browser_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
        ]
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        vec![
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
        ]
    }

    #[cfg(not(unix))]
    {
        Vec::new()
    }
}
