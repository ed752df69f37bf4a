// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 推流系统 (Streaming)
///
/// - fps:       窗口帧率 + 会话状态
/// - multipart: multipart/x-mixed-replace 分帧
/// - pipeline:  单会话逐帧流水线 (可关闭的迭代器)
pub mod fps;
pub mod multipart;
pub mod pipeline;

pub use fps::{FpsMeter, StreamState};
pub use multipart::{frame_part, BOUNDARY, CONTENT_TYPE};
pub use pipeline::{
    shared_backend, FrameReport, Phase, SharedBackend, StreamContext, StreamingPipeline,
};
