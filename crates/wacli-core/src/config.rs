//! `wacli` configuration: store directory discovery, defaults, timeouts
//! (spec section 4.6 / 6).
//!
//! Layering is flag > env > file > built-in default, loaded the way the
//! teacher's `omega_core::config` layers `Config`: a `#[derive(Deserialize)]`
//! struct with per-field `#[serde(default = "...")]` functions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::WacliError;

/// Top-level `wacli` configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `wacli.db`, `session.db`, `media/`, and `LOCK`.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    /// Root timeout (seconds) for any bounded command. `sync --follow` is
    /// the one exception — it uses context cancellation only.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Quiescence window for `sync --once` (spec section 4.4).
    #[serde(default = "default_idle_exit_secs")]
    pub idle_exit_secs: u64,

    #[serde(default)]
    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            timeout_secs: default_timeout_secs(),
            idle_exit_secs: default_idle_exit_secs(),
            sync: SyncConfig::default(),
        }
    }
}

/// Sync-loop specific defaults, split out from the top-level struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_media_queue_capacity")]
    pub media_queue_capacity: usize,
    #[serde(default = "default_backfill_requests")]
    pub backfill_requests: u32,
    #[serde(default = "default_wait_per_request_secs")]
    pub wait_per_request_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            media_queue_capacity: default_media_queue_capacity(),
            backfill_requests: default_backfill_requests(),
            wait_per_request_secs: default_wait_per_request_secs(),
        }
    }
}

fn default_store_dir() -> String {
    resolve_default_store_dir()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_idle_exit_secs() -> u64 {
    30
}
fn default_media_queue_capacity() -> usize {
    256
}
fn default_backfill_requests() -> u32 {
    5
}
fn default_wait_per_request_secs() -> u64 {
    10
}

/// Resolve the OS-appropriate per-user default store directory via `dirs`,
/// honoring `XDG_DATA_HOME`/`HOME` as spec section 6 requires. Falls back to
/// `~/.wacli` if no data directory can be determined at all.
fn resolve_default_store_dir() -> String {
    dirs::data_dir()
        .map(|d| d.join("wacli").to_string_lossy().into_owned())
        .unwrap_or_else(|| "~/.wacli".to_string())
}

/// Expand a leading `~` to the user's home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

impl Config {
    /// Load configuration: TOML file (if present) overridden by environment
    /// variables, with built-in defaults underneath. CLI flags are applied
    /// on top of the returned `Config` by the caller (`flag > env > file >
    /// default`).
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, WacliError> {
        let mut cfg = match path {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content)
                    .map_err(|e| WacliError::InvalidArgument(format!("invalid config: {e}")))?
            }
            _ => Config::default(),
        };

        if let Ok(dir) = std::env::var("WACLI_STORE_DIR") {
            if !dir.is_empty() {
                cfg.store_dir = dir;
            }
        }
        if let Ok(secs) = std::env::var("WACLI_TIMEOUT_SECS") {
            if let Ok(v) = secs.parse() {
                cfg.timeout_secs = v;
            }
        }

        Ok(cfg)
    }

    pub fn store_dir_path(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.store_dir))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn idle_exit(&self) -> Duration {
        Duration::from_secs(self.idle_exit_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_nonempty_store_dir() {
        let cfg = Config::default();
        assert!(!cfg.store_dir.is_empty());
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.idle_exit_secs, 30);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let cfg = Config::load(Some(std::path::Path::new("/nonexistent/wacli.toml"))).unwrap();
        assert_eq!(cfg.timeout_secs, default_timeout_secs());
    }

    #[test]
    fn shellexpand_expands_home() {
        if let Some(home) = dirs::home_dir() {
            let expanded = shellexpand("~/foo");
            assert_eq!(expanded, home.join("foo").to_string_lossy());
        }
    }

    #[test]
    fn shellexpand_passes_through_absolute_paths() {
        assert_eq!(shellexpand("/tmp/foo"), "/tmp/foo");
    }
}
