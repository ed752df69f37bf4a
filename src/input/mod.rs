// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 视频输入系统 (Video Input System)
///
/// - FrameSource:    逐帧拉取接口 (阻塞)
/// - ImageDirSource: 图片目录 (按文件名顺序)
/// - VideoFileSource: FFmpeg 视频文件解码 (feature `ffmpeg`)
use std::path::Path;

use anyhow::Result;
use image::RgbImage;

pub mod image_dir;
#[cfg(feature = "ffmpeg")]
pub mod video;

pub use image_dir::ImageDirSource;
#[cfg(feature = "ffmpeg")]
pub use video::VideoFileSource;

/// 帧来源
///
/// Polled once per pipeline iteration. `Ok(None)` means the source is
/// exhausted; it is not an error. Resources are released on drop.
pub trait FrameSource: Send {
    fn name(&self) -> &str;

    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        (**self).next_frame()
    }
}

/// Open the right source for `path`: a directory of images, a single image,
/// or (with the `ffmpeg` feature) a video file.
pub fn open_source(path: &Path) -> Result<Box<dyn FrameSource>> {
    if path.is_dir() {
        return Ok(Box::new(ImageDirSource::open(path)?));
    }
    if image_dir::is_image_file(path) {
        return Ok(Box::new(ImageDirSource::single(path)?));
    }
    open_video(path)
}

#[cfg(feature = "ffmpeg")]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(VideoFileSource::open(path)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!(
        "{} looks like a video; rebuild with `--features ffmpeg` or pass an image directory",
        path.display()
    )
}
