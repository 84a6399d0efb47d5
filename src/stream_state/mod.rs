//! StreamState - Single source of truth for live state
//!
//! ## Responsibilities
//!
//! - Hold the current `StreamSnapshot`, connectivity flag and video catalog
//! - Replace them atomically and notify subscribers after the commit
//! - Subscriber registry (subscribe / unsubscribe)
//!
//! Writers are serialized by `write_order`, held across commit and
//! notification, so observers see changes in commit order. When an
//! `AlertEdgeDetector` is attached, every snapshot write feeds it the
//! previous/new proximity pair before observers run. Readers only take
//! the short `live` read lock and always get a fully committed value.

use crate::alert_edge_detector::{AlertAction, AlertEdgeDetector};
use crate::error::Result;
use crate::models::{detections_from_payload, DetectResponse, StreamSnapshot, VideoRecord};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Change delivered to observers
#[derive(Debug, Clone)]
pub enum StateChange {
    /// A new snapshot was committed
    Snapshot(Arc<StreamSnapshot>),
    /// Connectivity flipped
    Connectivity(bool),
    /// The video catalog was replaced
    Catalog(Arc<Vec<VideoRecord>>),
}

/// Observer of committed state changes
///
/// Called synchronously on the writing thread. Implementations may read the
/// state (`current()`, `is_connected()`, `videos()`) but must not subscribe,
/// unsubscribe or write from inside the callback.
pub trait StateObserver: Send + Sync {
    fn on_state_change(&self, change: &StateChange);
}

impl<F> StateObserver for F
where
    F: Fn(&StateChange) + Send + Sync,
{
    fn on_state_change(&self, change: &StateChange) {
        self(change)
    }
}

/// Handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

struct Subscription {
    id: SubscriptionId,
    observer: Arc<dyn StateObserver>,
}

struct LiveState {
    snapshot: Arc<StreamSnapshot>,
    connected: bool,
    videos: Arc<Vec<VideoRecord>>,
}

/// StreamState instance
pub struct StreamState {
    live: RwLock<LiveState>,
    observers: RwLock<Vec<Subscription>>,
    write_order: Mutex<()>,
    alerts: Option<Arc<AlertEdgeDetector>>,
}

impl StreamState {
    /// Create with the initial empty snapshot, disconnected, empty catalog
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Same as `new`, with proximity edges fed to `alerts` on every
    /// snapshot commit
    pub fn with_alerts(alerts: Arc<AlertEdgeDetector>) -> Self {
        Self::build(Some(alerts))
    }

    fn build(alerts: Option<Arc<AlertEdgeDetector>>) -> Self {
        Self {
            live: RwLock::new(LiveState {
                snapshot: Arc::new(StreamSnapshot::initial()),
                connected: false,
                videos: Arc::new(Vec::new()),
            }),
            observers: RwLock::new(Vec::new()),
            write_order: Mutex::new(()),
            alerts,
        }
    }

    fn read_live(&self) -> RwLockReadGuard<'_, LiveState> {
        self.live.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_live(&self) -> RwLockWriteGuard<'_, LiveState> {
        self.live.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn writer(&self) -> MutexGuard<'_, ()> {
        self.write_order
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Latest committed snapshot
    pub fn current(&self) -> Arc<StreamSnapshot> {
        self.read_live().snapshot.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.read_live().connected
    }

    /// Current local video catalog
    pub fn videos(&self) -> Arc<Vec<VideoRecord>> {
        self.read_live().videos.clone()
    }

    /// Replace the snapshot and notify observers
    pub fn apply(&self, snapshot: StreamSnapshot) -> Arc<StreamSnapshot> {
        self.commit(|_| snapshot)
    }

    /// Derive a new snapshot from the current one and commit it
    pub fn update(&self, f: impl FnOnce(&StreamSnapshot) -> StreamSnapshot) -> Arc<StreamSnapshot> {
        self.commit(f)
    }

    /// Every snapshot write goes through here: edge check on the
    /// (previous, next) proximity pair, commit, notification delivery,
    /// then observers.
    fn commit(&self, f: impl FnOnce(&StreamSnapshot) -> StreamSnapshot) -> Arc<StreamSnapshot> {
        let _writer = self.writer();

        let previous = self.current();
        let next = Arc::new(f(&previous));
        let action = self
            .alerts
            .as_ref()
            .map(|alerts| alerts.observe(previous.proximity_alert, next.proximity_alert));

        self.write_live().snapshot = next.clone();

        if let (Some(alerts), Some(AlertAction::Notify)) = (&self.alerts, action) {
            alerts.notify(next.beacon_distance);
        }
        self.notify(&StateChange::Snapshot(next.clone()));
        next
    }

    /// Apply a /detect result. Replaces detections, recording flag and
    /// current video; frame, proximity flag and beacon distance are kept.
    pub fn apply_detection(&self, result: &DetectResponse) -> Result<Arc<StreamSnapshot>> {
        let detections = detections_from_payload(result.detections.clone())?;

        Ok(self.update(|current| StreamSnapshot {
            detections,
            is_recording: result.is_recording,
            current_video_name: result.current_video.clone(),
            timestamp: result.timestamp.clone(),
            received_at: Some(Utc::now()),
            ..current.clone()
        }))
    }

    /// Set connectivity. Observers hear about it only when the value changes.
    pub fn set_connected(&self, connected: bool) -> bool {
        let _writer = self.writer();

        let changed = {
            let mut live = self.write_live();
            let changed = live.connected != connected;
            live.connected = connected;
            changed
        };

        if changed {
            self.notify(&StateChange::Connectivity(connected));
        }
        changed
    }

    /// Replace the whole video catalog
    pub fn set_videos(&self, videos: Vec<VideoRecord>) -> Arc<Vec<VideoRecord>> {
        let _writer = self.writer();

        let videos = Arc::new(videos);
        self.write_live().videos = videos.clone();

        self.notify(&StateChange::Catalog(videos.clone()));
        videos
    }

    /// Register an observer
    pub fn subscribe(&self, observer: impl StateObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        observers.push(Subscription {
            id,
            observer: Arc::new(observer),
        });

        tracing::debug!(subscription_id = %id.0, "Observer subscribed");
        id
    }

    /// Remove an observer. Waits for an in-progress notification to finish,
    /// so the observer is never called after this returns.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = observers.len();
        observers.retain(|s| s.id != id);

        let removed = observers.len() != before;
        if removed {
            tracing::debug!(subscription_id = %id.0, "Observer unsubscribed");
        }
        removed
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn notify(&self, change: &StateChange) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for sub in observers.iter() {
            sub.observer.on_state_change(change);
        }
    }
}

impl Default for StreamState {
    fn default() -> Self {
        Self::new()
    }
}
