// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 风险评估 (Risk Assessment)
///
/// 每帧检测 → 距离矩阵 → 近距离标记 + 事故/事件概率
pub mod analyzer;
pub mod distance;

pub use analyzer::{ProximityRiskAnalyzer, RiskAssessment};
pub use distance::{DistanceMatrix, SENTINEL};
