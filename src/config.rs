//! Settings - endpoints, timeouts, startup state

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::state::StateRequest;

pub const DEFAULT_PRIMARY_ENDPOINT: &str = "https://design-system-staging.9bitstudios.io";
pub const DEFAULT_SECONDARY_ENDPOINT: &str =
    "https://quantum-spatial-design-system-staging.rnrb2ynd5z.workers.dev";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_primary")]
    pub primary_endpoint: String,
    #[serde(default = "default_secondary")]
    pub secondary_endpoint: String,
    /// Bound on every remote token attempt
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Bound on the advisory capability round-trip
    #[serde(default = "default_capability_timeout_ms")]
    pub capability_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub probe_capabilities: bool,
    #[serde(default = "default_initial_state")]
    pub initial_state: String,
    #[serde(default = "default_selector")]
    pub css_selector: String,
}

fn default_primary() -> String { DEFAULT_PRIMARY_ENDPOINT.to_string() }
fn default_secondary() -> String { DEFAULT_SECONDARY_ENDPOINT.to_string() }
fn default_request_timeout_ms() -> u64 { 5000 }
fn default_capability_timeout_ms() -> u64 { 1500 }
fn default_true() -> bool { true }
fn default_initial_state() -> String { "auto".to_string() }
fn default_selector() -> String { ":root".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            primary_endpoint: default_primary(),
            secondary_endpoint: default_secondary(),
            request_timeout_ms: default_request_timeout_ms(),
            capability_timeout_ms: default_capability_timeout_ms(),
            probe_capabilities: true,
            initial_state: default_initial_state(),
            css_selector: default_selector(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Like `load`, but any failure is logged and defaults are used.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(?err, ?path, "failed to load settings; using defaults");
                Self::default()
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn capability_timeout(&self) -> Duration {
        Duration::from_millis(self.capability_timeout_ms)
    }

    pub fn initial_request(&self) -> StateRequest {
        StateRequest::parse(&self.initial_state)
    }
}
