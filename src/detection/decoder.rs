// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv5 风格输出解码
// 行格式: [cx, cy, w, h, objectness, class_0 .. class_{K-1}]

use anyhow::ensure;
use ndarray::{Array, ArrayView2, Axis, Ix2, IxDyn};
use thiserror::Error;

use crate::config::DetectionConfig;
use crate::detection::labels::LabelSet;
use crate::detection::types::{Bbox, Detection, DetectionSet};
use crate::non_max_suppression;

const OBJECTNESS: usize = 4;
const CLASS_OFFSET: usize = 5;

/// Contract violations in the raw detector output.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("raw tensor of shape {0:?} cannot be viewed as [rows, columns]")]
    Shape(Vec<usize>),
    #[error("raw tensor rows have {found} columns, expected {expected}")]
    RowWidth { expected: usize, found: usize },
    #[error("non-finite value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },
}

/// Converts one raw output tensor into filtered, de-duplicated detections.
///
/// Stateless apart from its thresholds, so one instance can be shared by every
/// stream session.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionDecoder {
    num_classes: usize,
    conf: f32,
    class_score: f32,
    nms_score: f32,
    iou: f32,
}

impl DetectionDecoder {
    pub fn new(num_classes: usize, config: &DetectionConfig) -> Self {
        Self {
            num_classes,
            conf: config.confidence_threshold,
            class_score: config.class_score_threshold,
            nms_score: config.nms_score_threshold,
            iou: config.nms_iou_threshold,
        }
    }

    /// Class count `K` implied by an output shape `[.., N, 5+K]`.
    pub fn classes_in_output(shape: &[usize]) -> Result<usize, DecodeError> {
        match shape.last() {
            Some(&cols) if shape.len() >= 2 && cols > CLASS_OFFSET => Ok(cols - CLASS_OFFSET),
            _ => Err(DecodeError::Shape(shape.to_vec())),
        }
    }

    /// Decoder sized by the model's output rather than the class list.
    /// The list may be longer than the model's classes but never shorter.
    pub fn for_model(
        output_shape: &[usize],
        labels: &LabelSet,
        config: &DetectionConfig,
    ) -> anyhow::Result<Self> {
        let num_classes = Self::classes_in_output(output_shape)?;
        ensure!(
            labels.len() >= num_classes,
            "class list has {} names but the model predicts {} classes",
            labels.len(),
            num_classes
        );
        Ok(Self::new(num_classes, config))
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Expected row length, `5 + K`.
    pub fn row_width(&self) -> usize {
        CLASS_OFFSET + self.num_classes
    }

    /// Decode a backend output, dropping leading batch axes of length 1
    /// (`[1, N, 5+K]` → `[N, 5+K]`).
    pub fn decode_dyn(
        &self,
        raw: &Array<f32, IxDyn>,
        frame_width: u32,
        frame_height: u32,
        input_width: u32,
        input_height: u32,
    ) -> Result<DetectionSet, DecodeError> {
        let mut view = raw.view();
        while view.ndim() > 2 && view.shape()[0] == 1 {
            view = view.index_axis_move(Axis(0), 0);
        }
        let view = view
            .into_dimensionality::<Ix2>()
            .map_err(|_| DecodeError::Shape(raw.shape().to_vec()))?;
        self.decode(view, frame_width, frame_height, input_width, input_height)
    }

    /// `frame_*` is the padded square frame the detector saw; `input_*` the
    /// detector's input resolution. Box coordinates in the result are in frame pixels.
    pub fn decode(
        &self,
        raw: ArrayView2<'_, f32>,
        frame_width: u32,
        frame_height: u32,
        input_width: u32,
        input_height: u32,
    ) -> Result<DetectionSet, DecodeError> {
        if raw.nrows() == 0 {
            return Ok(DetectionSet::default());
        }
        if raw.ncols() != self.row_width() {
            return Err(DecodeError::RowWidth {
                expected: self.row_width(),
                found: raw.ncols(),
            });
        }

        let x_factor = frame_width as f64 / input_width as f64;
        let y_factor = frame_height as f64 / input_height as f64;

        let mut candidates: Vec<Detection> = Vec::new();
        for (r, row) in raw.axis_iter(Axis(0)).enumerate() {
            if let Some(column) = row.iter().position(|v| !v.is_finite()) {
                return Err(DecodeError::NonFinite { row: r, column });
            }

            let objectness = row[OBJECTNESS];
            if objectness < self.conf {
                continue;
            }

            // 第一个最大值胜出
            let mut best: Option<(usize, f32)> = None;
            for (k, &score) in row.iter().skip(CLASS_OFFSET).enumerate() {
                if best.map_or(true, |(_, b)| score > b) {
                    best = Some((k, score));
                }
            }
            let Some((class_id, score)) = best else {
                continue;
            };
            if score <= self.class_score {
                continue;
            }

            let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
            let left = ((cx - 0.5 * w) * x_factor) as i32;
            let top = ((cy - 0.5 * h) * y_factor) as i32;
            let width = (w * x_factor) as i32;
            let height = (h * y_factor) as i32;

            candidates.push(Detection::new(
                class_id,
                objectness,
                Bbox::new(left, top, width, height),
            ));
        }

        non_max_suppression(&mut candidates, self.nms_score, self.iou);
        Ok(DetectionSet::new(candidates))
    }
}
