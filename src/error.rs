//! Error handling for the PetGuard client

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection failure or timeout
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// Malformed JSON or invalid embedded payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// Server reports the resource as missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success status with a body
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    /// Response superseded by a newer request (or by stop); never surfaced to observers
    #[error("Stale response (sequence {sequence})")]
    StaleResponse { sequence: u64 },

    /// Video list could not be refreshed
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Video download failed in transit or while writing locally
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable code used as a structured log field
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NetworkUnreachable(_) => "NETWORK_UNREACHABLE",
            Error::Decode(_) => "DECODE_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Server { .. } => "SERVER_ERROR",
            Error::StaleResponse { .. } => "STALE_RESPONSE",
            Error::CatalogUnavailable(_) => "CATALOG_UNAVAILABLE",
            Error::TransferFailed(_) => "TRANSFER_FAILED",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Errors the live-frame path swallows: the snapshot stays as is and the
    /// next tick retries.
    pub fn is_absorbed(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::StaleResponse { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Decode(e.to_string())
        } else {
            // timeouts, refused connections, DNS and body read failures
            Error::NetworkUnreachable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Decode(format!("invalid base64 frame: {}", e))
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Decode(format!("invalid image payload: {}", e))
    }
}
