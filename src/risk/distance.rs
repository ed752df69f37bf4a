// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 检测框两两距离矩阵

use crate::detection::types::Bbox;

/// Diagonal / "no comparison" value. Larger than any real pixel distance.
pub const SENTINEL: f64 = 10_000.0;

/// Square `N x N` matrix of box distances for one frame.
///
/// Off-diagonal entries are symmetric; the diagonal holds [`SENTINEL`].
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    pub fn from_boxes(boxes: &[Bbox]) -> Self {
        let n = boxes.len();
        let mut data = vec![SENTINEL; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = boxes[i].distance(&boxes[j]);
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }
        Self { n, data }
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let n = rows.len();
        assert!(rows.iter().all(|r| r.len() == n), "matrix must be square");
        Self {
            n,
            data: rows.into_iter().flatten().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// `(argmin, min)` of row `i`; the first index wins ties.
    pub fn row_min(&self, i: usize) -> Option<(usize, f64)> {
        self.row(i)
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (j, d)| match best {
                Some((_, m)) if d >= m => best,
                _ => Some((j, d)),
            })
    }
}
