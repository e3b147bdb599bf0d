use crate::reachability::probe::ReachabilityProbe;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Reachability sampling configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReachabilityConfig {
    /// `host:port` probed for general internet connectivity
    #[serde(default = "default_general_target")]
    pub general_target: String,
    /// Time between probes of each scope (milliseconds)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Upper bound for a single probe (milliseconds)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_general_target() -> String {
    "1.1.1.1:53".to_string()
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            general_target: default_general_target(),
            interval_ms: default_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

/// Which reachability signal changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReachabilityScope {
    /// The configured endpoint host
    Host,
    /// General internet connectivity
    General,
}

impl fmt::Display for ReachabilityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReachabilityScope::Host => write!(f, "host"),
            ReachabilityScope::General => write!(f, "general"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReachabilityEvent {
    pub scope: ReachabilityScope,
    pub reachable: bool,
}

pub type ReachabilitySender = mpsc::UnboundedSender<ReachabilityEvent>;
pub type ReachabilityReceiver = mpsc::UnboundedReceiver<ReachabilityEvent>;

/// Samples host and general reachability and reports every transition.
///
/// Each scope runs its own probe loop. The first observation is always
/// reported, later ones only when they differ from the previous one. No
/// debouncing is applied.
pub struct ReachabilityMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    config: ReachabilityConfig,
    events: Option<ReachabilitySender>,
    host_task: Option<JoinHandle<()>>,
    general_task: Option<JoinHandle<()>>,
}

impl ReachabilityMonitor {
    pub fn new(probe: Arc<dyn ReachabilityProbe>, config: ReachabilityConfig) -> Self {
        Self {
            probe,
            config,
            events: None,
            host_task: None,
            general_task: None,
        }
    }

    /// Start both probe loops. Must run inside a tokio runtime.
    ///
    /// Fails if already started or if a target is not `host:port`.
    pub fn start(&mut self, host_target: &str, events: ReachabilitySender) -> Result<()> {
        if self.is_running() {
            bail!("reachability monitor already started");
        }
        validate_target(host_target).context("Invalid host reachability target")?;
        validate_target(&self.config.general_target)
            .context("Invalid general reachability target")?;

        info!(
            host = %host_target,
            general = %self.config.general_target,
            interval_ms = self.config.interval_ms,
            "Starting reachability monitor"
        );

        self.general_task = Some(self.spawn_scope(
            ReachabilityScope::General,
            self.config.general_target.clone(),
            events.clone(),
        ));
        self.host_task = Some(self.spawn_scope(
            ReachabilityScope::Host,
            host_target.to_string(),
            events.clone(),
        ));
        self.events = Some(events);

        Ok(())
    }

    /// Point the host loop at a new target. The general loop is untouched.
    pub fn retarget_host(&mut self, host_target: &str) -> Result<()> {
        let Some(events) = self.events.clone() else {
            bail!("reachability monitor not started");
        };
        validate_target(host_target).context("Invalid host reachability target")?;

        if let Some(task) = self.host_task.take() {
            task.abort();
        }
        info!(host = %host_target, "Retargeting host reachability");
        self.host_task = Some(self.spawn_scope(
            ReachabilityScope::Host,
            host_target.to_string(),
            events,
        ));

        Ok(())
    }

    /// Stop both loops. Safe to call when not running.
    pub fn stop(&mut self) {
        let was_running = self.is_running();
        for task in [self.host_task.take(), self.general_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
        self.events = None;
        if was_running {
            info!("Reachability monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.events.is_some()
    }

    fn spawn_scope(
        &self,
        scope: ReachabilityScope,
        target: String,
        events: ReachabilitySender,
    ) -> JoinHandle<()> {
        let probe = Arc::clone(&self.probe);
        let period = Duration::from_millis(self.config.interval_ms.max(1));
        tokio::spawn(watch_scope(probe, scope, target, period, events))
    }
}

impl Drop for ReachabilityMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn watch_scope(
    probe: Arc<dyn ReachabilityProbe>,
    scope: ReachabilityScope,
    target: String,
    period: Duration,
    events: ReachabilitySender,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last: Option<bool> = None;

    loop {
        ticker.tick().await;

        let reachable = probe.is_reachable(&target).await;
        if last == Some(reachable) {
            continue;
        }

        info!(
            scope = %scope,
            target = %target,
            reachable = reachable,
            previous = ?last,
            "Reachability changed"
        );
        last = Some(reachable);

        if events.send(ReachabilityEvent { scope, reachable }).is_err() {
            debug!(scope = %scope, "Reachability receiver dropped, stopping probe loop");
            break;
        }
    }
}

/// Check that `target` looks like `host:port`
pub fn validate_target(target: &str) -> Result<()> {
    let Some((host, port)) = target.rsplit_once(':') else {
        bail!("'{}' is missing a port", target);
    };
    if host.is_empty() {
        bail!("'{}' is missing a host", target);
    }
    port.parse::<u16>()
        .with_context(|| format!("'{}' has an invalid port", target))?;
    Ok(())
}
