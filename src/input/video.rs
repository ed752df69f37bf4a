// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! FFmpeg 视频文件输入
//!
//! 解码线程: 文件 → rgb24 帧 → 容量为 1 的通道 → next_frame()

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Frame, Input};
use image::RgbImage;
use tracing::{debug, info, warn};

use crate::input::FrameSource;

type FrameMsg = std::result::Result<RgbImage, String>;

/// Copies each decoded rgb24 frame out of FFmpeg and hands it to the reader.
struct ForwardFilter {
    tx: Sender<FrameMsg>,
    frames: usize,
    reader_closed: Arc<AtomicBool>,
}

impl FrameFilter for ForwardFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        debug!("decode thread started");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        // SAFETY: the frame is valid for the duration of this call and the
        // filter graph guarantees packed rgb24 in plane 0.
        let image = unsafe {
            let raw = frame.as_ptr();
            if raw.is_null() || frame.is_empty() || frame.is_corrupt() {
                return Ok(None);
            }
            let w = (*raw).width as usize;
            let h = (*raw).height as usize;
            let stride = (*raw).linesize[0] as usize;
            let plane = (*raw).data[0];
            if w == 0 || h == 0 || plane.is_null() || stride < w * 3 {
                return Ok(None);
            }

            let mut buf = Vec::with_capacity(w * h * 3);
            for y in 0..h {
                let row = std::slice::from_raw_parts(plane.add(y * stride), w * 3);
                buf.extend_from_slice(row);
            }
            RgbImage::from_raw(w as u32, h as u32, buf)
        };

        let Some(image) = image else {
            return Ok(None);
        };
        self.frames += 1;

        // reader gone: stop decoding
        if self.tx.send(Ok(image)).is_err() {
            self.reader_closed.store(true, Ordering::Release);
            return Err(String::from("frame reader closed"));
        }
        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        debug!(frames = self.frames, "decode thread finished");
    }
}

/// Video file decoded by FFmpeg on a background thread.
///
/// At most one decoded frame is buffered. Dropping the source closes the
/// channel, which makes the decode thread bail out on its next frame.
pub struct VideoFileSource {
    name: String,
    rx: Option<Receiver<FrameMsg>>,
    handle: Option<JoinHandle<()>>,
}

impl VideoFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(anyhow!("video source {} does not exist", path.display()));
        }
        let url = path.to_string_lossy().into_owned();
        let (tx, rx) = bounded::<FrameMsg>(1);

        let handle = std::thread::Builder::new()
            .name(String::from("video-decode"))
            .spawn(move || {
                if let Err(e) = run_decoder(&url, tx.clone()) {
                    warn!(source = %url, error = %e, "video decoding failed");
                    let _ = tx.send(Err(e));
                }
            })?;

        info!(source = %path.display(), "video source opened");
        Ok(Self {
            name: path.display().to_string(),
            rx: Some(rx),
            handle: Some(handle),
        })
    }
}

/// `Ok` for a clean end of file or a stop requested by the reader; `Err`
/// for anything FFmpeg reports while the reader is still listening.
fn run_decoder(url: &str, tx: Sender<FrameMsg>) -> std::result::Result<(), String> {
    let reader_closed = Arc::new(AtomicBool::new(false));
    let filter = ForwardFilter {
        tx,
        frames: 0,
        reader_closed: reader_closed.clone(),
    };
    let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
    let pipe = pipe.filter("forward", Box::new(filter));
    let out = create_null_output().add_frame_pipeline(pipe);

    let ctx = FfmpegContext::builder()
        .input(Input::new(url))
        .filter_descs(["format=rgb24"].into())
        .output(out)
        .build()
        .map_err(|e| format!("failed to build decoder: {}", e))?;

    let sch = ctx
        .start()
        .map_err(|e| format!("failed to start decoder: {}", e))?;
    decode_status(sch.wait(), reader_closed.load(Ordering::Acquire))
}

fn decode_status<E: std::fmt::Display>(
    status: std::result::Result<(), E>,
    reader_closed: bool,
) -> std::result::Result<(), String> {
    match status {
        Ok(()) => Ok(()),
        Err(_) if reader_closed => Ok(()),
        Err(e) => Err(format!("decoding stopped early: {}", e)),
    }
}

impl FrameSource for VideoFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(rx) = self.rx.as_ref() else {
            return Ok(None);
        };
        match rx.recv() {
            Ok(Ok(frame)) => Ok(Some(frame)),
            Ok(Err(e)) => {
                self.rx = None;
                Err(anyhow!(e))
            }
            // decode thread finished
            Err(_) => {
                self.rx = None;
                Ok(None)
            }
        }
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        // close the channel first so a blocked send returns
        drop(self.rx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(source = %self.name, "decode thread panicked");
            }
        }
        debug!(source = %self.name, "video source released");
    }
}
