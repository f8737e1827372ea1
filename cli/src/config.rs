//! Runtime configuration for the `dispatch` binary.
//!
//! Loaded from an optional YAML file; a missing file means defaults.
//!
//! # Example YAML
//!
//! ```yaml
//! log_level: debug
//! timeout_ms: 500
//! inventory:
//!   - localhost
//!   - example.com
//! ```

use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "dispatch.yml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    pub log_level: String,
    /// Upper bound for a single lookup or connection attempt.
    pub timeout_ms: u64,
    /// Hosts probed by `scan-all`.
    pub inventory: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            timeout_ms: 1000,
            inventory: Vec::new(),
        }
    }
}

impl DispatchConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open config '{}'", path.display()))?;
        let config = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config '{}'", path.display()))?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
