//! Engine configuration.
//!
//! The surrounding dev server resolves its own config sources (files, env,
//! CLI) and hands the engine a ready [`EngineConfig`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration consumed by [`MockEngine`](crate::engine::MockEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Master switch; a disabled engine answers nothing
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Mock root directory; route files live directly under it,
    /// persisted state under `scenarios/` and `recordings/`
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Only requests whose path starts with this prefix are intercepted
    #[serde(default = "default_prefix")]
    pub url_prefix: String,

    /// Delay applied to matched routes that carry none of their own (ms)
    #[serde(default)]
    pub default_delay_ms: u64,

    /// Whether to watch the mock directory for changes
    #[serde(default = "default_true")]
    pub watch: bool,

    /// Poll interval for the directory watcher (ms)
    #[serde(default = "default_watch_interval")]
    pub watch_interval_ms: u64,

    /// Glob patterns for files the loader should skip, in addition to the
    /// built-in underscore-prefix rule
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Log matched requests at info level
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log unmatched intercepted requests at debug level
    #[serde(default = "default_true")]
    pub log_unmatched: bool,
}

fn default_true() -> bool {
    true
}

fn default_root() -> PathBuf {
    PathBuf::from("mock")
}

fn default_prefix() -> String {
    "/api".to_string()
}

fn default_watch_interval() -> u64 {
    500
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: default_root(),
            url_prefix: default_prefix(),
            default_delay_ms: 0,
            watch: true,
            watch_interval_ms: default_watch_interval(),
            ignore: Vec::new(),
            log_matches: true,
            log_unmatched: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.url_prefix.starts_with('/') {
            anyhow::bail!("url_prefix must start with '/': {:?}", self.url_prefix);
        }
        if self.watch_interval_ms == 0 {
            anyhow::bail!("watch_interval_ms must be greater than zero");
        }
        Ok(())
    }

    /// Directory holding persisted scenarios.
    pub fn scenarios_dir(&self) -> PathBuf {
        self.root.join("scenarios")
    }

    /// Directory holding persisted recordings.
    pub fn recordings_dir(&self) -> PathBuf {
        self.root.join("recordings")
    }
}
