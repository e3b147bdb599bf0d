use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

/// Answers whether a `host:port` target can currently be reached
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self, target: &str) -> bool;
}

/// Probe that opens (and immediately drops) a TCP connection
#[derive(Clone, Debug)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn is_reachable(&self, target: &str) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(target = %target, error = %e, "TCP probe failed");
                false
            }
            Err(_) => {
                debug!(target = %target, timeout_ms = self.timeout.as_millis() as u64, "TCP probe timed out");
                false
            }
        }
    }
}

/// Probe target for the endpoint's host (`host:port`, default port by scheme)
pub fn host_target(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?;
    let port = url.port_or_known_default()?;
    Some(format!("{}:{}", host, port))
}
