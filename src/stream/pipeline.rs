// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 逐帧流水线
//!
//! FETCH → INFER → DECODE → ASSESS → ANNOTATE → ENCODE → EMIT, one frame at a time.

use std::iter::FusedIterator;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use tracing::{debug, error, info};

use crate::detection::DetectionDecoder;
use crate::input::FrameSource;
use crate::models::{prepare, InferenceBackend};
use crate::render::{Annotator, FrameEncoder};
use crate::risk::ProximityRiskAnalyzer;
use crate::stream::fps::StreamState;
use crate::stream::multipart::frame_part;

/// One backend for the whole process; sessions take turns on it.
pub type SharedBackend = Arc<Mutex<Box<dyn InferenceBackend>>>;

pub fn shared_backend(backend: impl InferenceBackend + 'static) -> SharedBackend {
    Arc::new(Mutex::new(Box::new(backend)))
}

/// Everything a session needs besides its frame source. Cheap to clone.
#[derive(Clone)]
pub struct StreamContext {
    pub backend: SharedBackend,
    pub decoder: DetectionDecoder,
    pub analyzer: ProximityRiskAnalyzer,
    pub annotator: Arc<dyn Annotator>,
    pub encoder: Arc<dyn FrameEncoder>,
    pub fps_window: u32,
}

/// Per-frame summary, logged at debug level.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame_number: u64,
    pub detections: usize,
    pub near_miss: usize,
    pub incident_probability: u32,
    pub accident_probability: u32,
    pub fps: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Running,
    Ended,
}

/// Pull-based sequence of multipart parts for one stream session.
///
/// Ends (returns `None`) when the source is exhausted. A failing frame
/// yields its error once and then ends the session. The source is dropped
/// as soon as the session ends, on [`close`](Self::close), or when the
/// pipeline itself is dropped.
pub struct StreamingPipeline {
    source: Option<Box<dyn FrameSource>>,
    ctx: StreamContext,
    state: StreamState,
    phase: Phase,
    last_report: Option<FrameReport>,
}

impl StreamingPipeline {
    pub fn new(source: Box<dyn FrameSource>, ctx: StreamContext) -> Self {
        let state = StreamState::new(ctx.fps_window);
        Self {
            source: Some(source),
            ctx,
            state,
            phase: Phase::Init,
            last_report: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }

    /// Stop the session now and release the frame source.
    pub fn close(&mut self) {
        if self.phase != Phase::Ended {
            info!(frames = self.state.frames(), "stream session closed");
        }
        self.finish();
    }

    fn finish(&mut self) {
        self.phase = Phase::Ended;
        self.source = None;
    }

    fn lock_backend(&self) -> Result<MutexGuard<'_, Box<dyn InferenceBackend>>> {
        self.ctx
            .backend
            .lock()
            .map_err(|_| anyhow!("inference backend lock poisoned"))
    }

    fn process(&mut self, mut frame: RgbImage) -> Result<Vec<u8>> {
        let (input_w, input_h) = self.lock_backend()?.input_size();
        let prepared = prepare(&frame, input_w, input_h)?;
        let square = prepared.square_size;
        let raw = {
            let mut backend = self.lock_backend()?;
            backend
                .forward(prepared.tensor)
                .with_context(|| format!("inference failed on {}", backend.name()))?
        };

        let detections = self
            .ctx
            .decoder
            .decode_dyn(&raw, square, square, input_w, input_h)?;
        let risk = self.ctx.analyzer.assess(&detections);
        let (frame_number, fps) = self.state.on_frame(Instant::now());

        self.ctx.annotator.annotate(&mut frame, &detections, &risk, fps);
        let payload = self.ctx.encoder.encode(&frame)?;

        let report = FrameReport {
            frame_number,
            detections: detections.len(),
            near_miss: risk.flagged(),
            incident_probability: risk.incident_probability(),
            accident_probability: risk.accident_probability(),
            fps,
        };
        debug!(?report, "frame processed");
        self.last_report = Some(report);

        Ok(frame_part(self.ctx.encoder.content_type(), &payload))
    }
}

impl Iterator for StreamingPipeline {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.phase {
            Phase::Ended => return None,
            Phase::Init => {
                if let Some(source) = &self.source {
                    info!(source = source.name(), "stream session started");
                }
                self.phase = Phase::Running;
            }
            Phase::Running => {}
        }

        let source = self.source.as_mut()?;
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!(frames = self.state.frames(), fps = ?self.state.fps(), "End of stream");
                self.finish();
                return None;
            }
            Err(e) => {
                error!(error = %e, "frame source failed");
                self.finish();
                return Some(Err(e.context("frame source failed")));
            }
        };

        match self.process(frame) {
            Ok(part) => Some(Ok(part)),
            Err(e) => {
                error!(error = %e, frame = self.state.frames() + 1, "frame processing failed");
                self.finish();
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for StreamingPipeline {}

impl Drop for StreamingPipeline {
    fn drop(&mut self) {
        if self.phase == Phase::Running {
            debug!(frames = self.state.frames(), "stream session dropped mid-stream");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::detection::{Bbox, DetectionSet, LabelSet, Palette};
    use crate::render::{JpegEncoder, OverlayAnnotator};
    use crate::risk::RiskAssessment;
    use ndarray::{Array, Array4, IxDyn};

    struct Frames(Vec<RgbImage>);

    impl FrameSource for Frames {
        fn name(&self) -> &str {
            "frames"
        }

        fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            Ok(self.0.pop())
        }
    }

    /// One fixed detection per call, in a 64x64 input space.
    struct Fixed;

    impl InferenceBackend for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn input_size(&self) -> (u32, u32) {
            (64, 64)
        }

        fn forward(&mut self, _xs: Array4<f32>) -> Result<Array<f32, IxDyn>> {
            Ok(Array::from_shape_vec(
                IxDyn(&[1, 1, 6]),
                vec![32.0, 32.0, 16.0, 16.0, 0.9, 0.8],
            )?)
        }
    }

    /// Keeps the boxes it was asked to draw.
    #[derive(Default)]
    struct Boxes(Mutex<Vec<Bbox>>);

    impl Annotator for Boxes {
        fn annotate(&self, _: &mut RgbImage, detections: &DetectionSet, _: &RiskAssessment, _: Option<f64>) {
            self.0.lock().unwrap().extend(detections.boxes());
        }
    }

    fn ctx() -> StreamContext {
        ctx_with(Arc::new(Boxes::default()))
    }

    fn ctx_with(annotator: Arc<dyn Annotator>) -> StreamContext {
        let config = DetectionConfig::default();
        StreamContext {
            backend: shared_backend(Fixed),
            decoder: DetectionDecoder::new(1, &config),
            analyzer: ProximityRiskAnalyzer::from_config(&config),
            annotator,
            encoder: Arc::new(JpegEncoder::default()),
            fps_window: config.fps_window,
        }
    }

    #[test]
    fn runs_until_source_is_exhausted() {
        let frames = Frames(vec![RgbImage::new(128, 64); 3]);
        let mut pipeline = StreamingPipeline::new(Box::new(frames), ctx());
        assert_eq!(pipeline.phase(), Phase::Init);

        let parts: Vec<_> = pipeline.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(pipeline.phase(), Phase::Ended);
        assert!(pipeline.next().is_none());

        let report = pipeline.last_report().unwrap();
        assert_eq!(report.frame_number, 3);
        assert_eq!(report.detections, 1);
        assert_eq!(report.fps, None);
    }

    #[test]
    fn boxes_are_scaled_to_the_padded_frame() {
        // 128x64 frame → 128 square; factor 2 from the 64 input
        let boxes = Arc::new(Boxes::default());
        let frames = Frames(vec![RgbImage::new(128, 64)]);
        let mut pipeline = StreamingPipeline::new(Box::new(frames), ctx_with(boxes.clone()));
        pipeline.next().unwrap().unwrap();
        assert_eq!(pipeline.last_report().unwrap().detections, 1);
        // (32 - 8) * 2 = 48, 16 * 2 = 32
        assert_eq!(*boxes.0.lock().unwrap(), vec![Bbox::new(48, 48, 32, 32)]);
    }

    #[test]
    fn close_releases_the_source() {
        let frames = Frames(vec![RgbImage::new(8, 8); 5]);
        let mut pipeline = StreamingPipeline::new(Box::new(frames), ctx());
        assert!(pipeline.next().is_some());
        pipeline.close();
        assert_eq!(pipeline.phase(), Phase::Ended);
        assert!(pipeline.source.is_none());
        assert!(pipeline.next().is_none());
    }

    #[test]
    fn overlay_annotator_fits_the_pipeline() {
        let context = ctx_with(Arc::new(OverlayAnnotator::new(
            LabelSet::parse("car").unwrap(),
            Palette::default(),
            None,
        )));
        let frames = Frames(vec![RgbImage::new(64, 64)]);
        let parts: Vec<_> = StreamingPipeline::new(Box::new(frames), context)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
    }
}
