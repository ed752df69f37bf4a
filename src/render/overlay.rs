// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 检测框 + 标签 + 风险信息叠加

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::info;

use crate::detection::{Bbox, DetectionSet, LabelSet, Palette};
use crate::render::Annotator;
use crate::risk::RiskAssessment;

const BOX_THICKNESS: i32 = 2;
const LABEL_BAR_HEIGHT: i32 = 20;
const LABEL_SCALE: f32 = 16.0;
const LABEL_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

const STATUS_SCALE: f32 = 28.0;
const STATUS_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Baselines of the status lines.
const STATUS_BASELINES: [i32; 3] = [25, 45, 65];
const STATUS_X: i32 = 10;

pub fn load_font(path: impl AsRef<Path>) -> Result<FontVec> {
    let path = path.as_ref();
    let data = std::fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?;
    let font = FontVec::try_from_vec(data).map_err(|_| anyhow!("{} is not a usable font", path.display()))?;
    info!(path = %path.display(), "font loaded");
    Ok(font)
}

/// Status text shown once FPS is known; empty before that.
pub fn overlay_lines(risk: &RiskAssessment, fps: Option<f64>) -> Vec<String> {
    match fps {
        Some(fps) if fps > 0.0 => vec![
            format!("FPS: {:.2}", fps),
            format!("Incident Probability: {}%", risk.incident_probability()),
            format!("Accident Probability: {}%", risk.accident_probability()),
        ],
        _ => Vec::new(),
    }
}

/// Boxes, label bars and the status block.
///
/// Without a font the boxes and bars are still drawn; text is skipped.
pub struct OverlayAnnotator {
    labels: LabelSet,
    palette: Palette,
    font: Option<FontVec>,
}

impl OverlayAnnotator {
    pub fn new(labels: LabelSet, palette: Palette, font: Option<FontVec>) -> Self {
        Self {
            labels,
            palette,
            font,
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    fn draw_box(&self, frame: &mut RgbImage, bbox: &Bbox, color: Rgb<u8>) -> (i32, i32) {
        // edges beyond the margin are off-frame anyway; clipping keeps imageproc's i32 math in range
        let margin = BOX_THICKNESS + LABEL_BAR_HEIGHT;
        let max_x = i32::try_from(frame.width()).unwrap_or(i32::MAX - margin) + margin;
        let max_y = i32::try_from(frame.height()).unwrap_or(i32::MAX - margin) + margin;
        let left = bbox.left().clamp(-margin, max_x);
        let top = bbox.top().clamp(-margin, max_y);
        let width = bbox.right().clamp(-margin, max_x) - left;
        let height = bbox.bottom().clamp(-margin, max_y) - top;

        // OpenCV-style thickness: grow outward and inward by one pixel
        for t in 0..BOX_THICKNESS {
            let w = (width + 2 * t - 1).max(1) as u32;
            let h = (height + 2 * t - 1).max(1) as u32;
            draw_hollow_rect_mut(frame, Rect::at(left - t, top - t).of_size(w, h), color);
        }
        let bar_w = width.max(1) as u32;
        draw_filled_rect_mut(
            frame,
            Rect::at(left, top - LABEL_BAR_HEIGHT).of_size(bar_w, LABEL_BAR_HEIGHT as u32),
            color,
        );
        (left, top)
    }
}

impl Annotator for OverlayAnnotator {
    fn annotate(
        &self,
        frame: &mut RgbImage,
        detections: &DetectionSet,
        risk: &RiskAssessment,
        fps: Option<f64>,
    ) {
        for (j, det) in detections.iter().enumerate() {
            let color = Rgb(self.palette.color_for(det.class_id(), risk.is_near_miss(j)));
            let (left, top) = self.draw_box(frame, det.bbox(), color);

            if let Some(font) = &self.font {
                let text = self.labels.label(det.class_id(), j);
                draw_text_mut(
                    frame,
                    LABEL_COLOR,
                    left,
                    top - LABEL_BAR_HEIGHT + 2,
                    PxScale::from(LABEL_SCALE),
                    font,
                    &text,
                );
            }
        }

        let Some(font) = &self.font else {
            return;
        };
        for (line, baseline) in overlay_lines(risk, fps).iter().zip(STATUS_BASELINES) {
            draw_text_mut(
                frame,
                STATUS_COLOR,
                STATUS_X,
                baseline - (STATUS_SCALE * 0.8) as i32,
                PxScale::from(STATUS_SCALE),
                font,
                line,
            );
        }
    }
}
