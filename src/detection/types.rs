// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 检测结果数据结构
/// Detection data structures

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bbox {
    // axis-aligned box in padded-frame pixels
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

impl Bbox {
    /// Negative sizes are clamped to zero.
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width: width.max(0),
            height: height.max(0),
        }
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Saturates at `i32::MAX` for boxes decoded from out-of-range output.
    pub fn right(&self) -> i32 {
        self.left.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.top.saturating_add(self.height)
    }

    /// `(left, top, width, height)` as a point in 4-D space.
    pub fn as_vector(&self) -> [f64; 4] {
        [
            self.left as f64,
            self.top as f64,
            self.width as f64,
            self.height as f64,
        ]
    }

    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }

    pub fn intersection_area(&self, another: &Bbox) -> f32 {
        let l = self.left.max(another.left);
        let r = self.right().min(another.right());
        let t = self.top.max(another.top);
        let b = self.bottom().min(another.bottom());
        r.saturating_sub(l).max(0) as f32 * b.saturating_sub(t).max(0) as f32
    }

    pub fn union(&self, another: &Bbox) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    /// Zero when the union is empty.
    pub fn iou(&self, another: &Bbox) -> f32 {
        let union = self.union(another);
        if union <= 0.0 {
            return 0.0;
        }
        self.intersection_area(another) / union
    }

    /// Euclidean distance between the two boxes taken as
    /// `(left, top, width, height)` vectors. Not a center-to-center distance.
    pub fn distance(&self, another: &Bbox) -> f64 {
        self.as_vector()
            .iter()
            .zip(another.as_vector().iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// 单个检测目标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    class_id: usize,
    confidence: f32,
    bbox: Bbox,
}

impl Detection {
    pub fn new(class_id: usize, confidence: f32, bbox: Bbox) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }

    pub fn class_id(&self) -> usize {
        self.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bbox(&self) -> &Bbox {
        &self.bbox
    }
}

/// Ordered detections for one frame.
///
/// The position of a detection is its identity for the frame: labels read
/// `"<class> - <index>"` and the risk flags are indexed the same way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Detection> {
        self.detections.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    pub fn boxes(&self) -> Vec<Bbox> {
        self.detections.iter().map(|d| d.bbox).collect()
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

impl From<Vec<Detection>> for DetectionSet {
    fn from(detections: Vec<Detection>) -> Self {
        Self::new(detections)
    }
}
