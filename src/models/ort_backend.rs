// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! ONNX Runtime 推理后端

use std::path::PathBuf;

use anyhow::{Context, Result};
use ndarray::{Array, Array4, IxDyn};
use ort::{
    execution_providers::{CPUExecutionProvider, CUDAExecutionProvider},
    session::{builder::GraphOptimizationLevel, Session},
};
use tracing::{info, warn};

use crate::models::InferenceBackend;

/// 执行设备
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrtEP {
    #[default]
    CPU,
    /// GPU 设备编号
    CUDA(i32),
}

#[derive(Debug, Clone)]
pub struct OrtConfig {
    pub f: PathBuf,
    pub ep: OrtEP,
    /// (height, width)
    pub image_size: (u32, u32),
}

pub struct OrtBackend {
    session: Session,
    ep: OrtEP,
    name: String,
    height: u32,
    width: u32,
}

impl OrtBackend {
    pub fn build(config: OrtConfig) -> Result<Self> {
        let provider = match config.ep {
            OrtEP::CUDA(device_id) => CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build(),
            OrtEP::CPU => CPUExecutionProvider::default().build(),
        };

        let session = Session::builder()?
            .with_execution_providers([provider])?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&config.f)
            .with_context(|| format!("failed to load model {}", config.f.display()))?;

        let name = config
            .f
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("onnx"));
        let (height, width) = config.image_size;

        let backend = Self {
            session,
            ep: config.ep,
            name,
            height,
            width,
        };
        backend.summary();
        Ok(backend)
    }

    pub fn summary(&self) {
        info!(
            model = %self.name,
            ep = ?self.ep,
            height = self.height,
            width = self.width,
            "onnx session ready"
        );
        if let OrtEP::CUDA(_) = self.ep {
            warn!("CUDA requested; onnxruntime may still fall back to CPU");
        }
    }
}

impl InferenceBackend for OrtBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn forward(&mut self, xs: Array4<f32>) -> Result<Array<f32, IxDyn>> {
        let shape = xs.shape().to_vec();
        let data = xs.into_raw_vec_and_offset().0;
        let input = ort::value::Value::from_array((shape.as_slice(), data.into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs![input])?;
        let (dims, ys) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = dims.iter().map(|d| (*d).max(0) as usize).collect();
        let ys = Array::from_shape_vec(IxDyn(&dims), ys.to_vec())
            .context("detector output does not match its reported shape")?;
        Ok(ys)
    }
}
