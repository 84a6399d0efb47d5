//! AlertEdgeDetector - One notification per proximity episode
//!
//! Tracks the proximity flag across consecutive snapshots. Only the
//! false→true edge fires, and only from `Armed`; the detector stays `Fired`
//! for the rest of the true-run and re-arms when the flag drops.
//!
//! Delivery goes through the `Notifier` seam; the OS presentation layer is
//! outside this crate.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

const ALERT_TITLE: &str = "Warning!";
const ALERT_BODY: &str = "Someone is too close to the area! Check the camera now!";

/// Minimum trigger latency accepted by notification centers
const MIN_TRIGGER_DELAY: Duration = Duration::from_millis(100);

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertState {
    /// Ready to fire on the next false→true edge
    Armed,
    /// Already notified for the current true-run
    Fired,
}

/// What the caller must do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertAction {
    None,
    Notify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSound {
    Default,
}

/// Notification request handed to the OS collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityNotification {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub sound: NotificationSound,
    pub badge: u32,
    /// Trigger delay; the platform minimum, effectively immediate
    pub deliver_after: Duration,
    pub beacon_distance: f64,
    pub created_at: DateTime<Utc>,
}

impl ProximityNotification {
    pub fn new(beacon_distance: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: ALERT_TITLE.to_string(),
            body: ALERT_BODY.to_string(),
            sound: NotificationSound::Default,
            badge: 1,
            deliver_after: MIN_TRIGGER_DELAY,
            beacon_distance,
            created_at: Utc::now(),
        }
    }
}

/// Delivery seam to the host notification mechanism
pub trait Notifier: Send + Sync {
    fn deliver(&self, notification: &ProximityNotification) -> Result<()>;
}

/// Notifier that only logs
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, notification: &ProximityNotification) -> Result<()> {
        tracing::warn!(
            notification_id = %notification.id,
            beacon_distance = notification.beacon_distance,
            title = %notification.title,
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// Notifier forwarding into a channel, for a UI or OS bridge task
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<ProximityNotification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProximityNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn deliver(&self, notification: &ProximityNotification) -> Result<()> {
        self.tx
            .send(notification.clone())
            .map_err(|_| Error::Internal("notification receiver dropped".to_string()))
    }
}

/// Pure transition function over the previous/new flag pair
pub fn transition(state: AlertState, previous: bool, next: bool) -> (AlertState, AlertAction) {
    match (state, previous, next) {
        // false→true while armed: the one edge that fires
        (AlertState::Armed, false, true) => (AlertState::Fired, AlertAction::Notify),
        // true→true while armed means the run started before we were
        // watching (or the first poll already had it); no edge observed
        (AlertState::Armed, true, true) => (AlertState::Fired, AlertAction::None),
        (AlertState::Armed, _, false) => (AlertState::Armed, AlertAction::None),
        (AlertState::Fired, _, true) => (AlertState::Fired, AlertAction::None),
        (AlertState::Fired, _, false) => (AlertState::Armed, AlertAction::None),
    }
}

/// AlertEdgeDetector instance
pub struct AlertEdgeDetector {
    state: Mutex<AlertState>,
    notifier: Box<dyn Notifier>,
    fired: AtomicU64,
}

impl AlertEdgeDetector {
    /// Create an armed detector
    pub fn new(notifier: impl Notifier + 'static) -> Self {
        Self {
            state: Mutex::new(AlertState::Armed),
            notifier: Box::new(notifier),
            fired: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> AlertState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Notifications fired so far
    pub fn fired_count(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Feed one (previous, next) flag pair; updates the state and tells the
    /// caller whether to notify. Delivery is a separate step (`notify`) so
    /// the caller can commit the new snapshot first.
    pub fn observe(&self, previous: bool, next: bool) -> AlertAction {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = *state;
        let (next_state, action) = transition(current, previous, next);

        if next_state != current {
            tracing::debug!(from = ?current, to = ?next_state, "Alert state changed");
        }
        *state = next_state;
        action
    }

    /// Issue the notification request for a fired edge
    pub fn notify(&self, beacon_distance: f64) {
        let notification = ProximityNotification::new(beacon_distance);
        self.fired.fetch_add(1, Ordering::Relaxed);

        match self.notifier.deliver(&notification) {
            Ok(()) => tracing::info!(
                notification_id = %notification.id,
                beacon_distance = beacon_distance,
                "Proximity notification sent"
            ),
            Err(e) => tracing::error!(
                notification_id = %notification.id,
                error = %e,
                "Proximity notification failed"
            ),
        }
    }

    /// `observe` and, on an edge, `notify` in one call
    pub fn process(&self, previous: bool, next: bool, beacon_distance: f64) -> AlertAction {
        let action = self.observe(previous, next);
        if action == AlertAction::Notify {
            self.notify(beacon_distance);
        }
        action
    }
}
