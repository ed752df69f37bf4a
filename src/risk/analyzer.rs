// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 近距离 (near-miss) 风险评估

use crate::config::DetectionConfig;
use crate::detection::types::DetectionSet;
use crate::risk::distance::DistanceMatrix;

/// Per-frame risk result. Flags are indexed like the [`DetectionSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskAssessment {
    near_miss: Vec<bool>,
    incident_probability: u32,
    accident_probability: u32,
}

impl RiskAssessment {
    pub fn near_miss(&self) -> &[bool] {
        &self.near_miss
    }

    pub fn is_near_miss(&self, index: usize) -> bool {
        self.near_miss.get(index).copied().unwrap_or(false)
    }

    pub fn flagged(&self) -> usize {
        self.near_miss.iter().filter(|f| **f).count()
    }

    /// 0..=100
    pub fn incident_probability(&self) -> u32 {
        self.incident_probability
    }

    pub fn accident_probability(&self) -> u32 {
        self.accident_probability
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityRiskAnalyzer {
    near_miss_distance: f64,
}

impl Default for ProximityRiskAnalyzer {
    fn default() -> Self {
        Self::new(DetectionConfig::default().near_miss_distance)
    }
}

impl ProximityRiskAnalyzer {
    pub fn new(near_miss_distance: f64) -> Self {
        Self { near_miss_distance }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.near_miss_distance)
    }

    pub fn near_miss_distance(&self) -> f64 {
        self.near_miss_distance
    }

    pub fn assess(&self, detections: &DetectionSet) -> RiskAssessment {
        let matrix = DistanceMatrix::from_boxes(&detections.boxes());
        let near_miss = self.near_miss_flags(&matrix);

        let n = near_miss.len();
        let count = near_miss.iter().filter(|f| **f).count();
        let incident_probability = if n == 0 {
            0
        } else {
            ((count * 100) as f64 / n as f64).round_ties_even() as u32
        };
        let accident_probability = (incident_probability as f64 / 10.0).round_ties_even() as u32;

        RiskAssessment {
            near_miss,
            incident_probability,
            accident_probability,
        }
    }

    /// Sequential pass over the rows in index order.
    ///
    /// Row `i` with minimum `m` at `idx`: if `m` is under the threshold, `idx`
    /// (the nearest neighbour, not `i`) is flagged; otherwise flag `i` is
    /// cleared, even when an earlier row set it. The result depends on the
    /// iteration order and must stay a fold.
    pub fn near_miss_flags(&self, matrix: &DistanceMatrix) -> Vec<bool> {
        (0..matrix.len()).fold(vec![false; matrix.len()], |mut flags, i| {
            if let Some((idx, m)) = matrix.row_min(i) {
                if m < self.near_miss_distance {
                    flags[idx] = true;
                } else {
                    flags[i] = false;
                }
            }
            flags
        })
    }
}
