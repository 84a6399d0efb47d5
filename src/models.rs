//! Shared models and types
//!
//! Wire types mirror the backend's JSON bodies field for field; domain types
//! (`Detection`, `StreamSnapshot`) are what the rest of the crate passes around.

use crate::error::{Error, Result};
use crate::frame_decoder::DecodedFrame;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Beacon distance reported when the backend has no reading ("unknown/far")
pub const UNKNOWN_BEACON_DISTANCE: f64 = 999.0;

/// Detection category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionClass {
    Human,
    Cat,
}

impl DetectionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionClass::Human => "human",
            DetectionClass::Cat => "cat",
        }
    }
}

/// Bounding box in frame pixel coordinates (x1, y1, x2, y2)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from(b: [f64; 4]) -> Self {
        Self {
            x1: b[0],
            y1: b[1],
            x2: b[2],
            y2: b[3],
        }
    }
}

/// Detection as sent by the backend: `{class, confidence, bbox[4]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionPayload {
    pub class: DetectionClass,
    pub confidence: f64,
    pub bbox: [f64; 4],
}

/// A single validated detection. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    category: DetectionClass,
    confidence: f64,
    bounding_box: BoundingBox,
}

impl Detection {
    pub fn new(category: DetectionClass, confidence: f64, bounding_box: BoundingBox) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::Decode(format!(
                "detection confidence {} outside [0, 1]",
                confidence
            )));
        }
        let b = bounding_box;
        if ![b.x1, b.y1, b.x2, b.y2].iter().all(|v| v.is_finite()) {
            return Err(Error::Decode("detection bbox is not finite".to_string()));
        }

        Ok(Self {
            category,
            confidence,
            bounding_box,
        })
    }

    pub fn category(&self) -> DetectionClass {
        self.category
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }
}

impl TryFrom<DetectionPayload> for Detection {
    type Error = Error;

    fn try_from(p: DetectionPayload) -> Result<Self> {
        Detection::new(p.class, p.confidence, p.bbox.into())
    }
}

/// Convert a wire detection list, failing on the first invalid entry
pub fn detections_from_payload(payload: Vec<DetectionPayload>) -> Result<Vec<Detection>> {
    payload.into_iter().map(Detection::try_from).collect()
}

/// GET /stream/live response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveFrameResponse {
    /// Base64 JPEG/PNG
    pub frame: String,
    pub detections: Vec<DetectionPayload>,
    pub is_recording: bool,
    #[serde(default)]
    pub current_video: Option<String>,
    #[serde(default)]
    pub proximity_alert: Option<bool>,
    #[serde(default)]
    pub beacon_distance: Option<f64>,
    pub timestamp: String,
}

/// POST /detect request body
#[derive(Debug, Clone, Serialize)]
pub struct DetectRequest {
    pub frame: String,
}

/// POST /detect response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub detections: Vec<DetectionPayload>,
    pub has_human: bool,
    pub has_cat: bool,
    pub both_detected: bool,
    pub is_recording: bool,
    #[serde(default)]
    pub current_video: Option<String>,
    pub timestamp: String,
}

/// GET /status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub is_recording: bool,
    pub both_detected: bool,
    #[serde(default)]
    pub current_video: Option<String>,
    #[serde(default)]
    pub detections: Vec<DetectionPayload>,
    pub timestamp: String,
}

/// GET /proximity/status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityStatus {
    #[serde(default = "unknown_distance")]
    pub distance: f64,
    #[serde(default)]
    pub rssi: Option<i32>,
    #[serde(default)]
    pub is_close: bool,
    #[serde(default)]
    pub alert_active: bool,
    #[serde(default)]
    pub recording: bool,
    #[serde(default)]
    pub beacon_mac: Option<String>,
    #[serde(default)]
    pub last_update: Option<f64>,
    #[serde(default)]
    pub time_since_update: Option<f64>,
    #[serde(default)]
    pub has_frame: bool,
    pub timestamp: String,
}

fn unknown_distance() -> f64 {
    UNKNOWN_BEACON_DISTANCE
}

/// GET/POST /config body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub confidence: f64,
    pub cooldown: f64,
}

/// POST /config request; absent fields are left unchanged server-side
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectionConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<f64>,
}

/// Recorded interaction video, keyed by filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub filename: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// ISO-8601, as sent by the server
    #[serde(rename = "created")]
    pub created_at: String,
    #[serde(rename = "url")]
    pub download_url: String,
}

impl VideoRecord {
    /// Parse `created_at`. The backend sends naive local timestamps
    /// (`2025-12-19T10:15:00.123456`); RFC 3339 is accepted as well.
    pub fn created(&self) -> Option<NaiveDateTime> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.created_at) {
            return Some(dt.naive_utc());
        }
        NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%dT%H:%M:%S%.f").ok()
    }
}

/// GET /videos response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideosResponse {
    pub videos: Vec<VideoRecord>,
    pub count: usize,
}

/// One atomically applied unit of live state
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSnapshot {
    pub detections: Vec<Detection>,
    pub is_recording: bool,
    pub current_video_name: Option<String>,
    pub proximity_alert: bool,
    pub beacon_distance: f64,
    pub timestamp: String,
    /// Decoded frame of the response this snapshot came from
    pub frame: Option<Arc<DecodedFrame>>,
    /// Local receive time
    pub received_at: Option<DateTime<Utc>>,
}

impl StreamSnapshot {
    /// Snapshot exposed before any poll has completed
    pub fn initial() -> Self {
        Self {
            detections: Vec::new(),
            is_recording: false,
            current_video_name: None,
            proximity_alert: false,
            beacon_distance: UNKNOWN_BEACON_DISTANCE,
            timestamp: String::new(),
            frame: None,
            received_at: None,
        }
    }

    /// Build from a live-frame response and its decoded frame. Missing
    /// proximity fields mean "no alert, distance unknown".
    pub fn from_live(response: LiveFrameResponse, frame: DecodedFrame) -> Result<Self> {
        let detections = detections_from_payload(response.detections)?;

        Ok(Self {
            detections,
            is_recording: response.is_recording,
            current_video_name: response.current_video,
            proximity_alert: response.proximity_alert.unwrap_or(false),
            beacon_distance: response.beacon_distance.unwrap_or(UNKNOWN_BEACON_DISTANCE),
            timestamp: response.timestamp,
            frame: Some(Arc::new(frame)),
            received_at: Some(Utc::now()),
        })
    }

    pub fn has_human(&self) -> bool {
        self.detections
            .iter()
            .any(|d| d.category() == DetectionClass::Human)
    }

    pub fn has_cat(&self) -> bool {
        self.detections
            .iter()
            .any(|d| d.category() == DetectionClass::Cat)
    }
}

impl Default for StreamSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}
