//! BackendClient - HTTP adapter for the PetGuard backend
//!
//! ## Responsibilities
//!
//! - Issue GET/POST/DELETE requests against the backend REST surface
//! - Per-call timeouts (live frames short, detection and downloads long)
//! - Map transport failures and HTTP statuses onto `Error`
//!
//! Timeouts are treated like any other failure; nothing here retries.

use crate::error::{Error, Result};
use crate::models::{
    DetectRequest, DetectResponse, DetectionConfig, DetectionConfigUpdate, LiveFrameResponse,
    ProximityStatus, ServerStatus, VideosResponse,
};
use base64::Engine;
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::RwLock;
use std::time::Duration;

/// Per-call timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeouts {
    /// GET /stream/live
    pub live: Duration,
    /// POST /detect and other heavier JSON calls
    pub detect: Duration,
    /// GET /health
    pub health: Duration,
    /// GET /videos, DELETE /videos/{filename}
    pub catalog: Duration,
    /// GET /videos/{filename}, whole body included
    pub download: Duration,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            live: Duration::from_secs(2),
            detect: Duration::from_secs(10),
            health: Duration::from_secs(5),
            catalog: Duration::from_secs(10),
            download: Duration::from_secs(60),
        }
    }
}

/// Backend HTTP client
pub struct BackendClient {
    http: reqwest::Client,
    base_url: RwLock<Url>,
    timeouts: RequestTimeouts,
}

impl BackendClient {
    /// Create new client with default timeouts
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeouts(base_url, RequestTimeouts::default())
    }

    /// Create new client with custom timeouts
    pub fn with_timeouts(base_url: &str, timeouts: RequestTimeouts) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: RwLock::new(base_url),
            timeouts,
        })
    }

    /// Current base URL
    pub fn base_url(&self) -> Url {
        self.base_url
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Point the client at another server. Invalid input leaves the old URL.
    pub fn set_base_url(&self, base_url: &str) -> Result<()> {
        let parsed = parse_base_url(base_url)?;
        *self
            .base_url
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = parsed;

        tracing::info!(base_url = %base_url, "Server URL updated");
        Ok(())
    }

    pub fn timeouts(&self) -> RequestTimeouts {
        self.timeouts
    }

    /// Absolute URL for a path below the base URL; segments are percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url();
        let base = url.to_string();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Base URL cannot hold a path: {}", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET /health. Ok only on HTTP 200.
    pub async fn check_health(&self) -> Result<()> {
        let url = self.endpoint(&["health"])?;
        let resp = self
            .http
            .get(url)
            .timeout(self.timeouts.health)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(Error::Server {
            status: status.as_u16(),
            body,
        })
    }

    /// GET /stream/live
    pub async fn fetch_live_frame(&self) -> Result<LiveFrameResponse> {
        let url = self.endpoint(&["stream", "live"])?;
        let resp = self
            .http
            .get(url)
            .timeout(self.timeouts.live)
            .send()
            .await?;

        read_json(ensure_success(resp, "live frame").await?).await
    }

    /// POST /detect with a JPEG frame
    pub async fn detect(&self, jpeg: &[u8]) -> Result<DetectResponse> {
        if jpeg.is_empty() {
            return Err(Error::Validation("frame is empty".to_string()));
        }

        let url = self.endpoint(&["detect"])?;
        let body = DetectRequest {
            frame: base64::engine::general_purpose::STANDARD.encode(jpeg),
        };

        let resp = self
            .http
            .post(url)
            .timeout(self.timeouts.detect)
            .json(&body)
            .send()
            .await?;

        read_json(ensure_success(resp, "detect").await?).await
    }

    /// GET /status
    pub async fn server_status(&self) -> Result<ServerStatus> {
        let url = self.endpoint(&["status"])?;
        let resp = self
            .http
            .get(url)
            .timeout(self.timeouts.detect)
            .send()
            .await?;

        read_json(ensure_success(resp, "status").await?).await
    }

    /// GET /proximity/status
    pub async fn proximity_status(&self) -> Result<ProximityStatus> {
        let url = self.endpoint(&["proximity", "status"])?;
        let resp = self
            .http
            .get(url)
            .timeout(self.timeouts.detect)
            .send()
            .await?;

        read_json(ensure_success(resp, "proximity status").await?).await
    }

    /// GET /config
    pub async fn detection_config(&self) -> Result<DetectionConfig> {
        let url = self.endpoint(&["config"])?;
        let resp = self
            .http
            .get(url)
            .timeout(self.timeouts.detect)
            .send()
            .await?;

        read_json(ensure_success(resp, "config").await?).await
    }

    /// POST /config; returns the values now in effect
    pub async fn update_detection_config(
        &self,
        update: &DetectionConfigUpdate,
    ) -> Result<DetectionConfig> {
        if let Some(confidence) = update.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(Error::Validation(format!(
                    "confidence {} outside [0, 1]",
                    confidence
                )));
            }
        }
        if let Some(cooldown) = update.cooldown {
            if !cooldown.is_finite() || cooldown < 0.0 {
                return Err(Error::Validation(format!("invalid cooldown {}", cooldown)));
            }
        }

        let url = self.endpoint(&["config"])?;
        let resp = self
            .http
            .post(url)
            .timeout(self.timeouts.detect)
            .json(update)
            .send()
            .await?;

        read_json(ensure_success(resp, "config update").await?).await
    }

    /// GET /videos
    pub async fn list_videos(&self) -> Result<VideosResponse> {
        let url = self.endpoint(&["videos"])?;
        let resp = self
            .http
            .get(url)
            .timeout(self.timeouts.catalog)
            .send()
            .await?;

        read_json(ensure_success(resp, "video list").await?).await
    }

    /// GET /videos/{filename}; the body is left unread for streaming
    pub async fn open_video(&self, filename: &str) -> Result<Response> {
        validate_filename(filename)?;
        let url = self.endpoint(&["videos", filename])?;
        let resp = self
            .http
            .get(url)
            .timeout(self.timeouts.download)
            .send()
            .await?;

        ensure_success(resp, filename).await
    }

    /// DELETE /videos/{filename}
    pub async fn delete_video(&self, filename: &str) -> Result<()> {
        validate_filename(filename)?;
        let url = self.endpoint(&["videos", filename])?;
        let resp = self
            .http
            .delete(url)
            .timeout(self.timeouts.catalog)
            .send()
            .await?;

        ensure_success(resp, filename).await?;
        Ok(())
    }
}

/// Accept only absolute http(s) URLs that can carry a path
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url.trim())
        .map_err(|e| Error::Config(format!("Invalid server URL '{}': {}", base_url, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "Unsupported URL scheme '{}'",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(Error::Config(format!("Invalid server URL '{}'", base_url)));
    }

    Ok(url)
}

/// Filenames are single path segments
pub fn validate_filename(filename: &str) -> Result<()> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
    {
        return Err(Error::Validation(format!(
            "invalid video filename '{}'",
            filename
        )));
    }
    Ok(())
}

async fn ensure_success(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(what.to_string()));
    }

    Err(Error::Server {
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
