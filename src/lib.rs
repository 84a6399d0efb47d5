//! PetGuard Client Library
//!
//! Live-state sync client for the PetGuard pet camera backend.
//!
//! ## Architecture (7 Components)
//!
//! 1. BackendClient - HTTP adapter with per-call timeouts
//! 2. FrameDecoder - base64 JPEG/PNG payload to RGBA bitmap
//! 3. StreamPoller - Periodic live-frame polling, stale reply discard
//! 4. StreamState - Single source of truth + observers
//! 5. AlertEdgeDetector - One notification per proximity episode
//! 6. HealthMonitor - Backend liveness probe
//! 7. VideoCatalogClient - List/download/delete recorded videos
//!
//! ## Design Principles
//!
//! - SSoT: StreamState is the single source of truth
//! - All state writes are serialized; reads only see committed snapshots
//! - Highest sequence wins; stop() invalidates everything in flight

pub mod alert_edge_detector;
pub mod backend_client;
pub mod error;
pub mod frame_decoder;
pub mod health_monitor;
pub mod models;
pub mod request_gate;
pub mod state;
pub mod stream_poller;
pub mod stream_state;
pub mod video_catalog;

pub use error::{Error, Result};
pub use state::{AppConfig, MonitorSession};
