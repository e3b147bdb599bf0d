use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

/// Rejected endpoint values
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointError {
    Invalid(String),
    UnsupportedScheme(String),
    MissingHost,
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointError::Invalid(reason) => write!(f, "invalid endpoint URL: {}", reason),
            EndpointError::UnsupportedScheme(scheme) => {
                write!(f, "unsupported scheme '{}': expected 'ws'", scheme)
            }
            EndpointError::MissingHost => write!(f, "endpoint URL has no host"),
        }
    }
}

impl std::error::Error for EndpointError {}

/// Parse and validate an endpoint: `ws` scheme and a non-empty host
pub fn parse_endpoint(raw: &str) -> Result<Url, EndpointError> {
    let url = Url::parse(raw.trim()).map_err(|e| EndpointError::Invalid(e.to_string()))?;
    if url.scheme() != "ws" {
        return Err(EndpointError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(EndpointError::MissingHost);
    }
    Ok(url)
}

/// On-disk form of the persisted endpoint
#[derive(Debug, Serialize, Deserialize)]
struct PersistedEndpoint {
    url: String,
}

/// Read a previously persisted endpoint. Missing or invalid files yield None.
pub fn load_persisted(path: &Path) -> Option<Url> {
    let contents = std::fs::read_to_string(path).ok()?;
    let persisted: PersistedEndpoint = match toml::from_str(&contents) {
        Ok(p) => p,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable endpoint state file");
            return None;
        }
    };
    match parse_endpoint(&persisted.url) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring invalid persisted endpoint");
            None
        }
    }
}

fn persist(path: &Path, url: &Url) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).context("Failed to create endpoint state directory")?;
    }
    let contents = toml::to_string(&PersistedEndpoint {
        url: url.to_string(),
    })
    .context("Failed to serialize endpoint")?;
    std::fs::write(path, contents).context("Failed to write endpoint state file")?;
    Ok(())
}

/// The runtime-mutable endpoint URL.
///
/// Readers get the current value or a `watch` receiver that wakes on every
/// change. `set` only notifies when the value actually differs.
pub struct EndpointSettings {
    tx: watch::Sender<Url>,
    state_file: Option<PathBuf>,
}

impl EndpointSettings {
    pub fn new(initial: Url) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            state_file: None,
        }
    }

    /// Persist every accepted change to `path`
    pub fn with_state_file(mut self, path: PathBuf) -> Self {
        self.state_file = Some(path);
        self
    }

    pub fn current(&self) -> Url {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Url> {
        self.tx.subscribe()
    }

    /// Validate and apply a new endpoint.
    ///
    /// Returns Ok(true) if the value changed.
    pub fn set(&self, raw: &str) -> Result<bool, EndpointError> {
        let url = parse_endpoint(raw)?;
        let changed = self.tx.send_if_modified(|current| {
            if *current == url {
                false
            } else {
                *current = url.clone();
                true
            }
        });

        if changed {
            info!(url = %url, "Endpoint changed");
            if let Some(path) = &self.state_file {
                if let Err(e) = persist(path, &url) {
                    warn!(path = %path.display(), error = %e, "Failed to persist endpoint");
                }
            }
        }

        Ok(changed)
    }
}
