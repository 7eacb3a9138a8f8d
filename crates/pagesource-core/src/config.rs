use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/pagesource/config.toml`.
///
/// Every key is optional in the file; missing keys take the defaults below.
/// CLI flags override config values where both exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesourceConfig {
    /// Explicit path to a Chromium binary. The `PAGESOURCE_BROWSER`
    /// environment variable takes precedence over this at lookup time.
    #[serde(default)]
    pub browser_binary: Option<String>,
    /// Maximum seconds to wait for the page to reach a quiescent network state.
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    /// Network-idle settling interval in milliseconds: the page counts as
    /// loaded once the load event fired and no request has been in flight
    /// for this long.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Maximum seconds to wait for the browser's DevTools endpoint to appear.
    #[serde(default = "default_launch_timeout_secs")]
    pub launch_timeout_secs: u64,
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_settle_ms() -> u64 {
    500
}

fn default_launch_timeout_secs() -> u64 {
    10
}

impl Default for PagesourceConfig {
    fn default() -> Self {
        Self {
            browser_binary: None,
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_ms: default_settle_ms(),
            launch_timeout_secs: default_launch_timeout_secs(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pagesource")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PagesourceConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PagesourceConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: PagesourceConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = PagesourceConfig::default();
        assert!(cfg.browser_binary.is_none());
        assert_eq!(cfg.navigation_timeout_secs, 60);
        assert_eq!(cfg.settle_ms, 500);
        assert_eq!(cfg.launch_timeout_secs, 10);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = PagesourceConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: PagesourceConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.browser_binary, cfg.browser_binary);
        assert_eq!(parsed.navigation_timeout_secs, cfg.navigation_timeout_secs);
        assert_eq!(parsed.settle_ms, cfg.settle_ms);
        assert_eq!(parsed.launch_timeout_secs, cfg.launch_timeout_secs);
    }

    #[test]
    fn config_toml_partial_file_takes_defaults() {
        let toml = r#"
            navigation_timeout_secs = 120
        "#;
        let cfg: PagesourceConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.navigation_timeout_secs, 120);
        assert_eq!(cfg.settle_ms, 500);
        assert_eq!(cfg.launch_timeout_secs, 10);
        assert!(cfg.browser_binary.is_none());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            browser_binary = "/usr/bin/chromium"
            navigation_timeout_secs = 30
            settle_ms = 250
            launch_timeout_secs = 5
        "#;
        let cfg: PagesourceConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.browser_binary.as_deref(), Some("/usr/bin/chromium"));
        assert_eq!(cfg.navigation_timeout_secs, 30);
        assert_eq!(cfg.settle_ms, 250);
        assert_eq!(cfg.launch_timeout_secs, 5);
    }

    #[test]
    fn config_toml_empty_file_is_all_defaults() {
        let cfg: PagesourceConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.navigation_timeout_secs, 60);
        assert_eq!(cfg.settle_ms, 500);
    }
}
