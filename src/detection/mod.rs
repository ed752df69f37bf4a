// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 检测系统 (Detection System)
///
/// 纯函数: 原始张量 → 过滤、去重后的检测集合
/// - decoder: 阈值过滤 + 类别无关 NMS
/// - labels:  类别名称与调色板
/// - types:   Bbox / Detection / DetectionSet
pub mod decoder;
pub mod labels;
pub mod types;

pub use decoder::{DecodeError, DetectionDecoder};
pub use labels::{LabelSet, Palette};
pub use types::{Bbox, Detection, DetectionSet};
