// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 图片目录输入: 按文件名顺序逐帧读取

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::RgbImage;
use tracing::{debug, info};

use crate::input::FrameSource;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Still images played back as a finite stream, in lexical file-name order.
pub struct ImageDirSource {
    name: String,
    pending: VecDeque<PathBuf>,
}

impl ImageDirSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("failed to list {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image_file(p))
            .collect();
        files.sort();
        info!(dir = %dir.display(), frames = files.len(), "image directory source opened");
        Ok(Self {
            name: dir.display().to_string(),
            pending: files.into(),
        })
    }

    /// A one-frame stream.
    pub fn single(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("{} is not a file", path.display());
        }
        Ok(Self {
            name: path.display().to_string(),
            pending: VecDeque::from([path.to_path_buf()]),
        })
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageDirSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        debug!(path = %path.display(), "reading frame");
        let frame = image::open(&path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgb8();
        Ok(Some(frame))
    }
}
