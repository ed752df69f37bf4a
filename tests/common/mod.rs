// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use image::{Rgb, RgbImage};
use ndarray::{Array, Array4, IxDyn};
use nearmiss_rs::config::DetectionConfig;
use nearmiss_rs::detection::{DetectionDecoder, DetectionSet};
use nearmiss_rs::input::FrameSource;
use nearmiss_rs::models::InferenceBackend;
use nearmiss_rs::render::{Annotator, JpegEncoder};
use nearmiss_rs::risk::{ProximityRiskAnalyzer, RiskAssessment};
use nearmiss_rs::stream::{shared_backend, StreamContext};

pub const INPUT: u32 = 64;
pub const CLASSES: usize = 2;

/// Row `[cx, cy, w, h, objectness, class scores..]` in input coordinates.
pub fn row(cx: f32, cy: f32, w: f32, h: f32, obj: f32, class: usize) -> Vec<f32> {
    let mut r = vec![cx, cy, w, h, obj];
    let mut scores = vec![0.0; CLASSES];
    scores[class] = 0.9;
    r.extend(scores);
    r
}

pub fn output(rows: Vec<Vec<f32>>) -> Array<f32, IxDyn> {
    let n = rows.len();
    let width = rows.first().map_or(5 + CLASSES, Vec::len);
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array::from_shape_vec(IxDyn(&[1, n, width]), flat).unwrap()
}

/// Replays queued outputs, then repeats `fallback`.
pub struct Scripted {
    queue: VecDeque<Array<f32, IxDyn>>,
    fallback: Array<f32, IxDyn>,
    pub calls: Arc<Mutex<usize>>,
}

impl Scripted {
    pub fn repeating(fallback: Array<f32, IxDyn>) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn then(mut self, out: Array<f32, IxDyn>) -> Self {
        self.queue.push_back(out);
        self
    }
}

impl InferenceBackend for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn input_size(&self) -> (u32, u32) {
        (INPUT, INPUT)
    }

    fn forward(&mut self, xs: Array4<f32>) -> Result<Array<f32, IxDyn>> {
        assert_eq!(xs.shape(), &[1, 3, INPUT as usize, INPUT as usize]);
        *self.calls.lock().unwrap() += 1;
        Ok(self.queue.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct Seen {
    pub detections: usize,
    pub near_miss: Vec<bool>,
    pub incident: u32,
    pub accident: u32,
    pub fps: Option<f64>,
}

/// Records what each frame would have been annotated with.
#[derive(Default, Clone)]
pub struct Recorder {
    pub frames: Arc<Mutex<Vec<Seen>>>,
}

impl Annotator for Recorder {
    fn annotate(
        &self,
        _frame: &mut RgbImage,
        detections: &DetectionSet,
        risk: &RiskAssessment,
        fps: Option<f64>,
    ) {
        self.frames.lock().unwrap().push(Seen {
            detections: detections.len(),
            near_miss: risk.near_miss().to_vec(),
            incident: risk.incident_probability(),
            accident: risk.accident_probability(),
            fps,
        });
    }
}

/// Never runs out of frames; raises `released` when dropped.
pub struct Endless {
    pub released: Arc<AtomicBool>,
}

impl Endless {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        (
            Self {
                released: released.clone(),
            },
            released,
        )
    }
}

impl FrameSource for Endless {
    fn name(&self) -> &str {
        "endless"
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(Some(RgbImage::from_pixel(64, 48, Rgb([10, 20, 30]))))
    }
}

impl Drop for Endless {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

pub fn context(backend: Scripted, recorder: &Recorder) -> StreamContext {
    let config = DetectionConfig::default();
    StreamContext {
        backend: shared_backend(backend),
        decoder: DetectionDecoder::new(CLASSES, &config),
        analyzer: ProximityRiskAnalyzer::from_config(&config),
        annotator: Arc::new(recorder.clone()),
        encoder: Arc::new(JpegEncoder::default()),
        fps_window: config.fps_window,
    }
}

/// `count` small frames named so lexical order is frame order.
pub fn write_frames(dir: &Path, count: usize) {
    write_sized_frames(dir, count, 64, 48);
}

pub fn write_sized_frames(dir: &Path, count: usize, width: u32, height: u32) {
    for i in 0..count {
        RgbImage::from_pixel(width, height, Rgb([(i % 255) as u8, 40, 80]))
            .save(dir.join(format!("frame_{:04}.png", i)))
            .unwrap();
    }
}

/// Split a multipart body into JPEG payloads.
pub fn payloads(body: &[u8]) -> Vec<Vec<u8>> {
    let header = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
    let mut out = Vec::new();
    let mut rest = body;
    while rest.starts_with(header) {
        rest = &rest[header.len()..];
        let end = rest
            .windows(2)
            .position(|w| w == [0xFF, 0xD9])
            .map(|p| p + 2)
            .expect("jpeg end marker");
        out.push(rest[..end].to_vec());
        assert_eq!(&rest[end..end + 2], b"\r\n");
        rest = &rest[end + 2..];
    }
    assert!(rest.is_empty(), "trailing bytes after last part");
    out
}
