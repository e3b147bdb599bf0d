use anyhow::{Context, Result};
use chrono::Utc;
use flushcap::config::{self, EndpointSettings};
use flushcap::connection::WebSocketTransport;
use flushcap::reachability::{ReachabilityMonitor, TcpProbe};
use flushcap::state::StateStore;
use flushcap::status;
use flushcap::sync::SyncController;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flushcap=info".into()),
        )
        .init();

    info!("Flushcap starting...");

    let config = config::load_from_env().context("Failed to load configuration")?;
    let endpoint = config.initial_endpoint()?;
    info!(url = %endpoint, "Using endpoint");

    let mut settings = EndpointSettings::new(endpoint.clone());
    if let Some(path) = config.endpoint.state_file.clone() {
        settings = settings.with_state_file(path);
    }
    let settings = Arc::new(settings);

    let store = Arc::new(StateStore::new());

    // Callbacks run under the store lock, so the status view keeps its own copy of the flag
    let connected = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&connected);
    store.subscribe_connectivity(move |is_connected| {
        flag.store(is_connected, Ordering::SeqCst);
        info!(connected = is_connected, "Connectivity changed");
    });
    store.subscribe_state(move |snapshot| {
        let line = status::summary(snapshot, connected.load(Ordering::SeqCst), Utc::now());
        info!(status = %line, "Door status");
    });

    tokio::spawn(read_endpoint_edits(Arc::clone(&settings)));

    let probe = Arc::new(TcpProbe::new(Duration::from_millis(
        config.reachability.probe_timeout_ms,
    )));
    let monitor = ReachabilityMonitor::new(probe, config.reachability.clone());
    let controller = SyncController::new(store, Arc::new(WebSocketTransport::new()), endpoint);

    controller
        .run(monitor, settings.subscribe(), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Flushcap stopped");
    Ok(())
}

/// Replacement endpoint URLs, one per line on stdin
async fn read_endpoint_edits(settings: Arc<EndpointSettings>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match settings.set(&line) {
                Ok(true) => {}
                Ok(false) => info!(url = %line.trim(), "Endpoint unchanged"),
                Err(e) => warn!(input = %line.trim(), error = %e, "Rejected endpoint"),
            },
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
}
