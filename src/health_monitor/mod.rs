//! HealthMonitor - Backend liveness probe
//!
//! Probes GET /health on its own timer, independent of the frame cadence.
//! HTTP 200 sets connectivity true; anything else (timeout, refused
//! connection, other status) sets it false. Probe results go through the
//! same highest-sequence-wins gate as live frames, so a slow old probe cannot
//! overwrite a newer one.

use crate::backend_client::BackendClient;
use crate::error::{Error, Result};
use crate::request_gate::{RequestGate, RequestTicket};
use crate::stream_state::StreamState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Default probe period
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(5);

struct HealthProbe {
    client: Arc<BackendClient>,
    state: Arc<StreamState>,
    gate: RequestGate,
}

impl HealthProbe {
    async fn probe(&self, ticket: RequestTicket) -> bool {
        let healthy = match self.client.check_health().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    sequence = ticket.sequence,
                    error_code = e.error_code(),
                    error = %e,
                    "Health probe failed"
                );
                false
            }
        };

        match self.gate.commit(ticket, || self.state.set_connected(healthy)) {
            Ok(true) if healthy => tracing::info!("Backend reachable"),
            Ok(true) => tracing::warn!("Backend unreachable"),
            Ok(false) | Err(_) => {}
        }
        healthy
    }
}

/// HealthMonitor instance
pub struct HealthMonitor {
    probe: Arc<HealthProbe>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthMonitor {
    /// Create new HealthMonitor
    pub fn new(client: Arc<BackendClient>, state: Arc<StreamState>) -> Self {
        Self {
            probe: Arc::new(HealthProbe {
                client,
                state,
                gate: RequestGate::new("health_monitor"),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start probing every `period`; the first probe goes out immediately
    pub async fn start(&self, period: Duration) -> Result<()> {
        if period.is_zero() {
            return Err(Error::Validation("health interval must be > 0".to_string()));
        }

        let mut task = self.task.lock().await;
        if !self.probe.gate.open() {
            tracing::warn!("Health monitor already running");
            return Ok(());
        }

        tracing::info!(interval_ms = period.as_millis() as u64, "Starting health monitor");

        let probe = self.probe.clone();
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(ticket) = probe.gate.issue() else {
                    break;
                };
                let probe = probe.clone();
                tokio::spawn(async move {
                    probe.probe(ticket).await;
                });
            }

            tracing::info!("Health monitor stopped");
        }));

        Ok(())
    }

    /// Stop probing. Idempotent; in-flight probes no longer touch connectivity.
    pub async fn stop(&self) {
        self.probe.gate.close();

        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
            tracing::info!("Stopping health monitor");
        }
    }

    pub fn is_running(&self) -> bool {
        self.probe.gate.is_open()
    }

    /// Probe once right now (connection test). Returns what this probe saw.
    pub async fn probe_once(&self) -> bool {
        let ticket = self.probe.gate.issue_detached();
        self.probe.probe(ticket).await
    }

    pub fn is_connected(&self) -> bool {
        self.probe.state.is_connected()
    }
}
