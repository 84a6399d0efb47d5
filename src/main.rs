//! PetGuard Client - headless live monitor
//!
//! Main entry point: polls the backend, logs state changes and proximity
//! alerts until Ctrl-C.

use petguard_client::{
    alert_edge_detector::LogNotifier,
    state::{AppConfig, MonitorSession},
    stream_state::StateChange,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "petguard_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PetGuard client v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::from_env();
    tracing::info!(
        server_url = %config.server_url,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        health_interval_ms = config.health_interval.as_millis() as u64,
        download_dir = %config.download_dir.display(),
        "Configuration loaded"
    );

    let session = MonitorSession::new(config, LogNotifier)?;

    let subscription = session.state.subscribe(|change: &StateChange| match change {
        StateChange::Snapshot(snap) => tracing::debug!(
            timestamp = %snap.timestamp,
            detections = snap.detections.len(),
            has_human = snap.has_human(),
            has_cat = snap.has_cat(),
            is_recording = snap.is_recording,
            proximity_alert = snap.proximity_alert,
            beacon_distance = snap.beacon_distance,
            "Live snapshot"
        ),
        StateChange::Connectivity(connected) => {
            tracing::info!(connected = *connected, "Connectivity changed")
        }
        StateChange::Catalog(videos) => {
            for video in videos.iter() {
                tracing::info!(
                    filename = %video.filename,
                    size_bytes = video.size_bytes,
                    created_at = %video.created_at,
                    "Recorded video"
                );
            }
        }
    });

    session.start().await?;

    if let Err(e) = session.catalog.list().await {
        tracing::warn!(error = %e, "Initial catalog refresh failed");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    session.stop().await;
    session.state.unsubscribe(subscription);

    let stats = session.poller.stats();
    tracing::info!(
        issued = stats.issued,
        applied = stats.applied,
        stale = stats.stale,
        failed = stats.failed,
        alerts_fired = session.alerts.fired_count(),
        "PetGuard client stopped"
    );

    Ok(())
}
