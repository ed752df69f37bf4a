// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 类别名称与调色板
//!
//! Loaded once at startup and handed to the components that need them.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

/// Ordered class names, addressed by class id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            bail!("label set is empty");
        }
        Ok(Self { names })
    }

    /// Parse a newline-delimited list, one name per class id. Each line is
    /// trimmed. Blank lines inside the list keep their slot so later ids do
    /// not shift; only trailing blank lines are dropped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut names: Vec<String> = text.lines().map(|line| line.trim().to_string()).collect();
        while names.last().is_some_and(|name| name.is_empty()) {
            names.pop();
        }
        Self::new(names)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read class list {}", path.display()))?;
        let labels =
            Self::parse(&text).with_context(|| format!("invalid class list {}", path.display()))?;
        info!(path = %path.display(), classes = labels.len(), "class list loaded");
        Ok(labels)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// `"<className> - <detectionIndex>"`. Unknown ids fall back to `#<id>`.
    pub fn label(&self, class_id: usize, detection_index: usize) -> String {
        match self.name(class_id) {
            Some(name) => format!("{} - {}", name, detection_index),
            None => format!("#{} - {}", class_id, detection_index),
        }
    }
}

/// Detection colours, indexed by `class_id % len`, plus the near-miss alert colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
    alert: [u8; 3],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                [0, 255, 255], // 青色
                [0, 255, 0],   // 绿色
                [255, 255, 0], // 黄色
                [0, 0, 255],   // 蓝色
            ],
            alert: [236, 85, 165], // 粉紫 (近距离告警)
        }
    }
}

impl Palette {
    pub fn new(colors: Vec<[u8; 3]>, alert: [u8; 3]) -> Result<Self> {
        if colors.is_empty() {
            bail!("palette needs at least one colour");
        }
        Ok(Self { colors, alert })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn class_color(&self, class_id: usize) -> [u8; 3] {
        self.colors[class_id % self.colors.len()]
    }

    pub fn alert(&self) -> [u8; 3] {
        self.alert
    }

    /// Alert colour overrides the class colour for flagged detections.
    pub fn color_for(&self, class_id: usize, near_miss: bool) -> [u8; 3] {
        if near_miss {
            self.alert
        } else {
            self.class_color(class_id)
        }
    }
}
