// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 渲染系统 (Rendering)
///
/// - Annotator:    在帧上绘制检测框、标签与风险信息
/// - FrameEncoder: 帧 → 压缩字节 (JPEG)
use anyhow::Result;
use image::RgbImage;

use crate::detection::DetectionSet;
use crate::risk::RiskAssessment;

pub mod jpeg;
pub mod overlay;

pub use jpeg::JpegEncoder;
pub use overlay::{load_font, overlay_lines, OverlayAnnotator};

/// Draws one frame's results in place. Shared by every stream session.
pub trait Annotator: Send + Sync {
    fn annotate(
        &self,
        frame: &mut RgbImage,
        detections: &DetectionSet,
        risk: &RiskAssessment,
        fps: Option<f64>,
    );
}

pub trait FrameEncoder: Send + Sync {
    /// MIME type written into each multipart part header.
    fn content_type(&self) -> &str;

    fn encode(&self, frame: &RgbImage) -> Result<Vec<u8>>;
}
