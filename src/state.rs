//! Application state
//!
//! Configuration and the monitoring session that wires all components
//! around one shared `StreamState`.

use crate::alert_edge_detector::{AlertEdgeDetector, Notifier};
use crate::backend_client::{BackendClient, RequestTimeouts};
use crate::error::Result;
use crate::health_monitor::{HealthMonitor, DEFAULT_HEALTH_INTERVAL};
use crate::stream_poller::{StreamPoller, DEFAULT_POLL_INTERVAL};
use crate::stream_state::StreamState;
use crate::video_catalog::VideoCatalogClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default backend on the camera's local network
pub const DEFAULT_SERVER_URL: &str = "http://172.20.10.3:5001";

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Backend base URL
    pub server_url: String,
    /// Live-frame poll period
    pub poll_interval: Duration,
    /// Health probe period
    pub health_interval: Duration,
    /// Per-call HTTP timeouts
    pub timeouts: RequestTimeouts,
    /// Where downloaded videos land
    pub download_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            health_interval: DEFAULT_HEALTH_INTERVAL,
            timeouts: RequestTimeouts::default(),
            download_dir: std::env::temp_dir().join("petguard-videos"),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `PETGUARD_*` environment variables.
    /// Unparsable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            var(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        let t = defaults.timeouts;
        Self {
            server_url: var("PETGUARD_SERVER_URL").unwrap_or(defaults.server_url),
            poll_interval: millis("PETGUARD_POLL_INTERVAL_MS", defaults.poll_interval),
            health_interval: millis("PETGUARD_HEALTH_INTERVAL_MS", defaults.health_interval),
            timeouts: RequestTimeouts {
                live: millis("PETGUARD_LIVE_TIMEOUT_MS", t.live),
                detect: millis("PETGUARD_DETECT_TIMEOUT_MS", t.detect),
                health: millis("PETGUARD_HEALTH_TIMEOUT_MS", t.health),
                catalog: millis("PETGUARD_CATALOG_TIMEOUT_MS", t.catalog),
                download: millis("PETGUARD_DOWNLOAD_TIMEOUT_MS", t.download),
            },
            download_dir: var("PETGUARD_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
        }
    }
}

/// One monitoring session shared by the UI layer
pub struct MonitorSession {
    /// Application config
    pub config: AppConfig,
    /// BackendClient (HTTP adapter)
    pub client: Arc<BackendClient>,
    /// StreamState (single source of truth)
    pub state: Arc<StreamState>,
    /// AlertEdgeDetector
    pub alerts: Arc<AlertEdgeDetector>,
    /// StreamPoller (live frames)
    pub poller: Arc<StreamPoller>,
    /// HealthMonitor (connectivity)
    pub health: Arc<HealthMonitor>,
    /// VideoCatalogClient
    pub catalog: Arc<VideoCatalogClient>,
}

impl MonitorSession {
    /// Build all components. Fails only on an invalid server URL.
    pub fn new(config: AppConfig, notifier: impl Notifier + 'static) -> Result<Self> {
        let client = Arc::new(BackendClient::with_timeouts(
            &config.server_url,
            config.timeouts,
        )?);
        let alerts = Arc::new(AlertEdgeDetector::new(notifier));
        let state = Arc::new(StreamState::with_alerts(alerts.clone()));

        let poller = Arc::new(StreamPoller::new(client.clone(), state.clone()));
        let health = Arc::new(HealthMonitor::new(client.clone(), state.clone()));
        let catalog = Arc::new(VideoCatalogClient::new(
            client.clone(),
            state.clone(),
            config.download_dir.clone(),
        ));

        Ok(Self {
            config,
            client,
            state,
            alerts,
            poller,
            health,
            catalog,
        })
    }

    /// Start live polling and health probing with the configured periods
    pub async fn start(&self) -> Result<()> {
        self.poller.start(self.config.poll_interval).await?;
        if let Err(e) = self.health.start(self.config.health_interval).await {
            self.poller.stop().await;
            return Err(e);
        }

        tracing::info!(server_url = %self.client.base_url(), "Monitor session started");
        Ok(())
    }

    /// Stop both timers. After this returns StreamState no longer changes
    /// from either of them.
    pub async fn stop(&self) {
        self.poller.stop().await;
        self.health.stop().await;
        tracing::info!("Monitor session stopped");
    }

    /// Switch backend at runtime. Invalid URLs are rejected and the current
    /// one is kept.
    pub fn update_server_url(&self, server_url: &str) -> Result<()> {
        self.client.set_base_url(server_url)
    }
}
