// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 推理接口与实现
///
/// ## 核心流程
/// ```text
/// 原始帧 → letterbox → 缩放/归一化 → [1,3,H,W]
///          ↓
///     InferenceBackend::forward
///          ↓
///     原始输出 [1, N, 5+K] → DetectionDecoder
/// ```
use anyhow::Result;
use ndarray::{Array, Array4, IxDyn};

pub mod ort_backend;
pub mod preprocess;

pub use ort_backend::{OrtBackend, OrtConfig, OrtEP};
pub use preprocess::{letterbox, prepare, to_input_tensor, Prepared};

/// 推理后端
///
/// Anything that turns an NCHW float tensor into the raw `[1, N, 5+K]` detector
/// output. Implemented by [`OrtBackend`]; tests provide scripted backends.
pub trait InferenceBackend: Send {
    fn name(&self) -> &str;

    /// (width, height) of the input tensor the backend expects.
    fn input_size(&self) -> (u32, u32);

    fn forward(&mut self, xs: Array4<f32>) -> Result<Array<f32, IxDyn>>;

    /// Run one throwaway inference so the first real frame is not slow.
    /// Returns the output shape, which carries the model's class count.
    fn warm_up(&mut self) -> Result<Vec<usize>> {
        let (w, h) = self.input_size();
        let ys = self.forward(Array4::zeros((1, 3, h as usize, w as usize)))?;
        Ok(ys.shape().to_vec())
    }
}
