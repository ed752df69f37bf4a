// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 近距离风险实时监控 (Near-miss Monitor)
///
/// 启动流程:
/// 1. 参数/阈值/类别/字体加载 (失败即退出)
/// 2. 构建 ONNX Runtime 后端并预热
/// 3. 启动 HTTP 服务, 每个 /video_feed 客户端一个独立会话
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nearmiss_rs::detection::{DetectionDecoder, LabelSet, Palette};
use nearmiss_rs::models::{InferenceBackend, OrtBackend, OrtConfig};
use nearmiss_rs::render::{load_font, JpegEncoder, OverlayAnnotator};
use nearmiss_rs::risk::ProximityRiskAnalyzer;
use nearmiss_rs::server::{self, path_source_factory, AppState};
use nearmiss_rs::stream::{shared_backend, StreamContext};
use nearmiss_rs::Args;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = args.detection_config()?;
    config.print_summary();

    let labels = LabelSet::load(&args.classes)?;
    let font = match &args.font {
        Some(path) => Some(load_font(path)?),
        None => {
            warn!("no --font given; boxes are drawn without label text");
            None
        }
    };

    let ep = args.execution_provider();
    info!(?ep, "selecting inference backend");
    let mut backend = OrtBackend::build(OrtConfig {
        f: args.model.clone(),
        ep,
        image_size: (config.input_height, config.input_width),
    })?;
    let output_shape = backend.warm_up().context("model warm-up failed")?;
    let decoder = DetectionDecoder::for_model(&output_shape, &labels, &config)
        .with_context(|| format!("model {} does not fit the class list", args.model.display()))?;
    info!(?output_shape, classes = decoder.num_classes(), "model output checked");

    if !args.source.exists() {
        warn!(source = %args.source.display(), "source does not exist yet; sessions will fail until it does");
    }

    let ctx = StreamContext {
        backend: shared_backend(backend),
        decoder,
        analyzer: ProximityRiskAnalyzer::from_config(&config),
        annotator: Arc::new(OverlayAnnotator::new(labels, Palette::default(), font)),
        encoder: Arc::new(JpegEncoder::new(config.jpeg_quality)),
        fps_window: config.fps_window,
    };
    let state = AppState {
        sources: path_source_factory(args.source.clone()),
        ctx,
    };

    server::run(state, args.bind, args.port)
}
