#![allow(clippy::type_complexity)]
// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 阈值与启动参数
pub mod detection; // 检测输出解码
pub mod input; // 视频输入
pub mod models; // 推理接口与 ONNX Runtime 后端
pub mod render; // 标注与 JPEG 编码
pub mod risk; // 近距离风险评估
pub mod server; // HTTP multipart 推流
pub mod stream; // 逐帧流水线

pub use crate::config::{Args, DetectionConfig};
pub use crate::detection::{Bbox, Detection, DetectionDecoder, DetectionSet, LabelSet, Palette};
pub use crate::models::{InferenceBackend, OrtBackend, OrtConfig, OrtEP};
pub use crate::risk::{DistanceMatrix, ProximityRiskAnalyzer, RiskAssessment};
pub use crate::stream::{FpsMeter, StreamingPipeline};

/// Class-agnostic greedy NMS.
///
/// Candidates whose confidence is not above `score_threshold` are dropped first.
/// The rest are ordered by confidence (descending, stable for ties) and kept
/// greedily: a box survives only if its IoU with every box already kept is
/// `<= iou_threshold`. Survivors stay in that descending order.
pub fn non_max_suppression(xs: &mut Vec<Detection>, score_threshold: f32, iou_threshold: f32) {
    xs.retain(|x| x.confidence() > score_threshold);
    xs.sort_by(|b1, b2| b2.confidence().total_cmp(&b1.confidence()));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = xs[prev_index].bbox().iou(xs[index].bbox());
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn det(left: i32, top: i32, w: i32, h: i32, conf: f32) -> Detection {
        Detection::new(0, conf, Bbox::new(left, top, w, h))
    }

    #[test]
    fn nms_keeps_highest_of_overlapping_pair() {
        let mut xs = vec![det(0, 0, 100, 100, 0.5), det(5, 5, 100, 100, 0.9)];
        non_max_suppression(&mut xs, 0.25, 0.45);
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].confidence(), 0.9);
    }

    #[test]
    fn nms_keeps_disjoint_boxes_in_confidence_order() {
        let mut xs = vec![
            det(0, 0, 10, 10, 0.5),
            det(100, 100, 10, 10, 0.7),
            det(300, 300, 10, 10, 0.6),
        ];
        non_max_suppression(&mut xs, 0.25, 0.45);
        let confs: Vec<f32> = xs.iter().map(|d| d.confidence()).collect();
        assert_eq!(confs, vec![0.7, 0.6, 0.5]);
    }

    #[test]
    fn nms_ties_keep_first_encountered() {
        let mut xs = vec![
            Detection::new(1, 0.8, Bbox::new(0, 0, 50, 50)),
            Detection::new(2, 0.8, Bbox::new(0, 0, 50, 50)),
        ];
        non_max_suppression(&mut xs, 0.25, 0.45);
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].class_id(), 1);
    }

    #[test]
    fn nms_score_threshold_is_strict() {
        let mut xs = vec![det(0, 0, 10, 10, 0.25), det(50, 50, 10, 10, 0.26)];
        non_max_suppression(&mut xs, 0.25, 0.45);
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].confidence(), 0.26);
    }

    #[test]
    fn nms_survivors_never_overlap_above_threshold() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let mut xs: Vec<Detection> = (0..40)
                .map(|_| {
                    det(
                        rng.gen_range(0..400),
                        rng.gen_range(0..400),
                        rng.gen_range(1..120),
                        rng.gen_range(1..120),
                        rng.gen_range(0.3..1.0),
                    )
                })
                .collect();
            non_max_suppression(&mut xs, 0.25, 0.45);
            for i in 0..xs.len() {
                for j in (i + 1)..xs.len() {
                    assert!(xs[i].bbox().iou(xs[j].bbox()) <= 0.45);
                    assert!(xs[i].confidence() >= xs[j].confidence());
                }
            }
        }
    }
}
