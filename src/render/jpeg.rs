// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
use anyhow::{Context, Result};
use image::codecs::jpeg;
use image::RgbImage;

use crate::render::FrameEncoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegEncoder {
    quality: u8,
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(80)
    }
}

impl JpegEncoder {
    /// `quality` is clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl FrameEncoder for JpegEncoder {
    fn content_type(&self) -> &str {
        "image/jpeg"
    }

    fn encode(&self, frame: &RgbImage) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(frame.as_raw().len() / 8);
        jpeg::JpegEncoder::new_with_quality(&mut buf, self.quality)
            .encode_image(frame)
            .with_context(|| format!("jpeg encoding failed for {}x{} frame", frame.width(), frame.height()))?;
        Ok(buf)
    }
}
