//! FrameDecoder - base64 image payload to bitmap
//!
//! Pure function, no state. The live endpoint sends the annotated frame as a
//! base64 JPEG (PNG is accepted too); the result is an RGBA8 bitmap the
//! rendering layer can draw directly.

use crate::error::{Error, Result};
use base64::Engine;
use image::ImageFormat;

/// Encoded format of the original payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Jpeg,
    Png,
}

impl FrameFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameFormat::Jpeg => "jpeg",
            FrameFormat::Png => "png",
        }
    }
}

/// Decoded frame, RGBA8 row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    pub rgba: Vec<u8>,
}

impl DecodedFrame {
    /// RGBA value at (x, y), None when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * 4;
        let px = self.rgba.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Decode a base64-encoded JPEG/PNG into a bitmap
pub fn decode_frame(encoded: &str) -> Result<DecodedFrame> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(Error::Decode("empty frame payload".to_string()));
    }

    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    decode_image_bytes(&bytes)
}

/// Decode raw JPEG/PNG bytes into a bitmap
pub fn decode_image_bytes(bytes: &[u8]) -> Result<DecodedFrame> {
    let format = match image::guess_format(bytes)? {
        ImageFormat::Jpeg => FrameFormat::Jpeg,
        ImageFormat::Png => FrameFormat::Png,
        other => {
            return Err(Error::Decode(format!(
                "unsupported frame format: {:?}",
                other
            )))
        }
    };

    let image = image::load_from_memory(bytes)?;
    let rgba = image.to_rgba8();

    Ok(DecodedFrame {
        width: rgba.width(),
        height: rgba.height(),
        format,
        rgba: rgba.into_raw(),
    })
}
