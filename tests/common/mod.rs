//! Shared fixtures for integration tests

#![allow(dead_code)]

use base64::Engine;
use petguard_client::backend_client::{BackendClient, RequestTimeouts};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

/// Small solid-color PNG, base64 encoded
pub fn png_base64(width: u32, height: u32) -> String {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 200]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// GET /stream/live body
pub fn live_body(timestamp: &str, proximity_alert: bool, beacon_distance: f64) -> Value {
    let current_video = if proximity_alert {
        Value::from("interaction_20251219_101500.mp4")
    } else {
        Value::Null
    };
    json!({
        "frame": png_base64(8, 6),
        "detections": [
            {"class": "cat", "confidence": 0.93, "bbox": [12.0, 20.0, 60.0, 70.0]},
            {"class": "human", "confidence": 0.81, "bbox": [100.0, 5.0, 180.0, 200.0]}
        ],
        "is_recording": proximity_alert,
        "current_video": current_video,
        "proximity_alert": proximity_alert,
        "beacon_distance": beacon_distance,
        "timestamp": timestamp
    })
}

/// GET /videos body
pub fn videos_body(names: &[&str]) -> Value {
    let videos: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
                "filename": name,
                "size": 1024,
                "created": "2025-12-19T10:15:00.123456",
                "url": format!("/videos/{}", name)
            })
        })
        .collect();
    json!({ "videos": videos, "count": names.len() })
}

pub fn client(uri: &str) -> Arc<BackendClient> {
    Arc::new(BackendClient::new(uri).unwrap())
}

pub fn client_with_timeouts(uri: &str, timeouts: RequestTimeouts) -> Arc<BackendClient> {
    Arc::new(BackendClient::with_timeouts(uri, timeouts).unwrap())
}

pub fn short_timeouts() -> RequestTimeouts {
    RequestTimeouts {
        live: Duration::from_millis(300),
        detect: Duration::from_millis(300),
        health: Duration::from_millis(200),
        catalog: Duration::from_millis(300),
        download: Duration::from_secs(2),
    }
}
