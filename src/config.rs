// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 启动参数与检测阈值配置
//!
//! All thresholds live in [`DetectionConfig`]; the decoder, the risk analyzer and
//! the pipeline read them from here and nowhere else.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::OrtEP;

/// 近距离风险监控参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Near-miss detection stream", long_about = None)]
pub struct Args {
    /// Video file (needs the `ffmpeg` feature) or a directory of still images
    #[arg(short, long, default_value = "vid 1.mp4")]
    pub source: PathBuf,

    /// ONNX model path
    #[arg(short, long, default_value = "best.onnx")]
    pub model: PathBuf,

    /// Newline-delimited class names
    #[arg(long, default_value = "classes.txt")]
    pub classes: PathBuf,

    /// JSON threshold file; written with defaults when missing
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// TTF/OTF font used for label text
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Listen address
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: IpAddr,

    /// Listen port
    #[arg(short, long, default_value_t = 5000)]
    pub port: u16,

    /// Use the CUDA execution provider
    #[arg(long)]
    pub cuda: bool,

    /// CUDA device id
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,

    /// Legacy backend word, `cuda` selects the accelerated backend
    #[arg(value_name = "BACKEND")]
    pub backend: Option<String>,
}

impl Args {
    /// Accelerated backend when `--cuda` or the positional `cuda` word is given.
    pub fn execution_provider(&self) -> OrtEP {
        let positional = self
            .backend
            .as_deref()
            .is_some_and(|b| b.eq_ignore_ascii_case("cuda"));
        if self.cuda || positional {
            OrtEP::CUDA(self.device_id)
        } else {
            OrtEP::CPU
        }
    }

    /// Thresholds from `--config`, or the built-in defaults.
    pub fn detection_config(&self) -> Result<DetectionConfig> {
        let config = match &self.config {
            Some(path) => DetectionConfig::load(path)?,
            None => DetectionConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// 检测与风险评估阈值
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    // === 解码 ===
    pub confidence_threshold: f32,  // objectness 下限 (含)
    pub class_score_threshold: f32, // 最大类别分数必须严格大于此值
    pub nms_score_threshold: f32,   // NMS 预过滤
    pub nms_iou_threshold: f32,     // NMS IoU 阈值

    // === 风险 ===
    pub near_miss_distance: f64, // 像素

    // === 推理输入 ===
    pub input_width: u32,
    pub input_height: u32,

    // === 流 ===
    pub fps_window: u32,
    pub jpeg_quality: u8,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.4,
            class_score_threshold: 0.25,
            nms_score_threshold: 0.25,
            nms_iou_threshold: 0.45,

            near_miss_distance: 89.0,

            input_width: 640,
            input_height: 640,

            fps_window: 30,
            jpeg_quality: 80,
        }
    }
}

impl DetectionConfig {
    /// Load from JSON. A missing file is created with the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "config file missing, writing defaults");
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("class_score_threshold", self.class_score_threshold),
            ("nms_score_threshold", self.nms_score_threshold),
            ("nms_iou_threshold", self.nms_iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must be within [0, 1], got {value}");
            }
        }
        if !(self.near_miss_distance > 0.0) {
            bail!(
                "near_miss_distance must be positive, got {}",
                self.near_miss_distance
            );
        }
        if self.input_width == 0 || self.input_height == 0 {
            bail!(
                "input size must be non-zero, got {}x{}",
                self.input_width,
                self.input_height
            );
        }
        if self.fps_window == 0 {
            bail!("fps_window must be non-zero");
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            bail!("jpeg_quality must be within 1..=100, got {}", self.jpeg_quality);
        }
        Ok(())
    }

    /// Print the active thresholds.
    pub fn print_summary(&self) {
        info!(
            conf = self.confidence_threshold,
            class_score = self.class_score_threshold,
            nms_score = self.nms_score_threshold,
            nms_iou = self.nms_iou_threshold,
            near_miss = self.near_miss_distance,
            input = %format!("{}x{}", self.input_width, self.input_height),
            "detection config"
        );
    }
}
