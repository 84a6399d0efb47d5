//! StreamPoller - Periodic live-frame polling
//!
//! ## Responsibilities
//!
//! - Issue GET /stream/live on a fixed cadence (default 100ms)
//! - Tag every request with a sequence number and drop stale replies
//! - Decode and commit to StreamState (which runs proximity edge detection)
//!
//! Requests are spawned per tick, so a hung request never delays the next
//! one. Ordering is restored by `RequestGate`; `stop()` closes the gate so
//! nothing already in flight can commit afterwards.

use crate::backend_client::BackendClient;
use crate::error::{Error, Result};
use crate::frame_decoder::decode_frame;
use crate::models::{LiveFrameResponse, StreamSnapshot};
use crate::request_gate::{RequestGate, RequestTicket};
use crate::stream_state::StreamState;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Default poll period (~10 polls/sec)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Response counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollerStats {
    /// Requests issued
    pub issued: u64,
    /// Responses committed to StreamState
    pub applied: u64,
    /// Responses dropped as superseded or arriving after stop
    pub stale: u64,
    /// Network, HTTP or decode failures
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    issued: AtomicU64,
    applied: AtomicU64,
    stale: AtomicU64,
    failed: AtomicU64,
}

struct LivePipeline {
    client: Arc<BackendClient>,
    state: Arc<StreamState>,
    gate: RequestGate,
    counters: Counters,
}

impl LivePipeline {
    fn track(&self, ticket: RequestTicket) -> RequestTicket {
        self.counters.issued.fetch_add(1, Ordering::Relaxed);
        ticket
    }

    async fn run(&self, ticket: RequestTicket) -> Result<Arc<StreamSnapshot>> {
        let response = self.client.fetch_live_frame().await;
        let result = self.ingest(ticket, response);

        if let Err(e) = &result {
            tracing::debug!(
                sequence = ticket.sequence,
                error_code = e.error_code(),
                error = %e,
                "Live frame not applied"
            );
        }
        result
    }

    /// Decode outside any lock, then commit through the gate
    fn ingest(
        &self,
        ticket: RequestTicket,
        response: Result<LiveFrameResponse>,
    ) -> Result<Arc<StreamSnapshot>> {
        let snapshot = response.and_then(|resp| {
            let frame = decode_frame(&resp.frame)?;
            StreamSnapshot::from_live(resp, frame)
        });

        let snapshot = match snapshot {
            Ok(s) => s,
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let committed = self.gate.commit(ticket, || self.state.apply(snapshot));

        match &committed {
            Ok(_) => self.counters.applied.fetch_add(1, Ordering::Relaxed),
            Err(Error::StaleResponse { .. }) => self.counters.stale.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.counters.failed.fetch_add(1, Ordering::Relaxed),
        };
        committed
    }
}

/// StreamPoller instance
pub struct StreamPoller {
    pipeline: Arc<LivePipeline>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamPoller {
    /// Create new StreamPoller
    pub fn new(client: Arc<BackendClient>, state: Arc<StreamState>) -> Self {
        Self {
            pipeline: Arc::new(LivePipeline {
                client,
                state,
                gate: RequestGate::new("stream_poller"),
                counters: Counters::default(),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start polling every `period`. A second call while running is a no-op.
    pub async fn start(&self, period: Duration) -> Result<()> {
        if period.is_zero() {
            return Err(Error::Validation("poll interval must be > 0".to_string()));
        }

        let mut task = self.task.lock().await;
        if !self.pipeline.gate.open() {
            tracing::warn!("Stream poller already running");
            return Ok(());
        }

        tracing::info!(interval_ms = period.as_millis() as u64, "Starting stream poller");

        let pipeline = self.pipeline.clone();
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let Some(ticket) = pipeline.gate.issue() else {
                    break;
                };
                let ticket = pipeline.track(ticket);

                let request = pipeline.clone();
                tokio::spawn(async move {
                    request.run(ticket).await.ok();
                });
            }

            tracing::info!("Stream poller stopped");
        }));

        Ok(())
    }

    /// Stop polling. Idempotent; once this returns no response can change
    /// StreamState, including requests still in flight.
    pub async fn stop(&self) {
        self.pipeline.gate.close();

        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
            tracing::info!("Stopping stream poller");
        }
    }

    pub fn is_running(&self) -> bool {
        self.pipeline.gate.is_open()
    }

    /// One poll outside the timer. Competes on sequence with timer polls.
    pub async fn poll_once(&self) -> Result<Arc<StreamSnapshot>> {
        let ticket = self.pipeline.track(self.pipeline.gate.issue_detached());
        self.pipeline.run(ticket).await
    }

    pub fn stats(&self) -> PollerStats {
        let c = &self.pipeline.counters;
        PollerStats {
            issued: c.issued.load(Ordering::Relaxed),
            applied: c.applied.load(Ordering::Relaxed),
            stale: c.stale.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
        }
    }

    #[cfg(test)]
    fn issue_ticket(&self) -> RequestTicket {
        self.pipeline.track(self.pipeline.gate.issue_detached())
    }

    #[cfg(test)]
    fn ingest(
        &self,
        ticket: RequestTicket,
        response: Result<LiveFrameResponse>,
    ) -> Result<Arc<StreamSnapshot>> {
        self.pipeline.ingest(ticket, response)
    }
}
