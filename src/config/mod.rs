pub mod endpoint;
pub use endpoint::{load_persisted, parse_endpoint, EndpointError, EndpointSettings};

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

// Re-export existing config types
pub use crate::reachability::ReachabilityConfig;

/// Endpoint used when nothing else is configured
pub const DEFAULT_ENDPOINT: &str = "ws://itoilet/changes";

/// Complete client configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlushConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub reachability: ReachabilityConfig,
}

/// Endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_endpoint_url")]
    pub url: String,
    /// Where runtime endpoint changes are persisted
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

fn default_endpoint_url() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint_url(),
            state_file: None,
        }
    }
}

impl FlushConfig {
    /// Apply environment overrides (`FLUSHCAP_WS_URL`)
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var("FLUSHCAP_WS_URL") {
            self.endpoint.url = url;
        }
        self
    }

    /// Endpoint to start with: persisted state file, then configured URL.
    pub fn initial_endpoint(&self) -> Result<Url> {
        if let Some(url) = self.endpoint.state_file.as_deref().and_then(load_persisted) {
            return Ok(url);
        }
        parse_endpoint(&self.endpoint.url)
            .with_context(|| format!("Invalid endpoint URL '{}'", self.endpoint.url))
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<FlushConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: FlushConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Load the file named by `FLUSHCAP_CONFIG` if set, defaults otherwise.
/// Environment overrides are applied on top.
pub fn load_from_env() -> Result<FlushConfig> {
    let config = match std::env::var("FLUSHCAP_CONFIG") {
        Ok(path) => load_config(Path::new(&path))?,
        Err(_) => {
            warn!("FLUSHCAP_CONFIG not set, using default configuration");
            FlushConfig::default()
        }
    };
    Ok(config.apply_env())
}
