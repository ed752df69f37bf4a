// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 预处理: 方形填充 (letterbox) + 缩放 + NCHW 归一化

use anyhow::{bail, Result};
use fast_image_resize as fr;
use image::{imageops, RgbImage};
use ndarray::Array4;

/// Pads `frame` into a zero-filled `max(w, h)` square, frame at the top-left.
///
/// Box coordinates decoded against the square map 1:1 onto the original frame.
pub fn letterbox(frame: &RgbImage) -> RgbImage {
    let side = frame.width().max(frame.height());
    if frame.width() == side && frame.height() == side {
        return frame.clone();
    }
    let mut square = RgbImage::new(side, side);
    imageops::replace(&mut square, frame, 0, 0);
    square
}

/// Resize (bilinear) to `width x height` and lay out as `[1, 3, H, W]`,
/// RGB channel order, values in `[0, 1]`.
pub fn to_input_tensor(image: &RgbImage, width: u32, height: u32) -> Result<Array4<f32>> {
    if image.width() == 0 || image.height() == 0 {
        bail!("cannot build input tensor from an empty {}x{} frame", image.width(), image.height());
    }

    let pixels = if image.width() == width && image.height() == height {
        image.as_raw().clone()
    } else {
        let src = fr::images::Image::from_vec_u8(
            image.width(),
            image.height(),
            image.as_raw().clone(),
            fr::PixelType::U8x3,
        )?;
        let mut dst = fr::images::Image::new(width, height, fr::PixelType::U8x3);
        let mut resizer = fr::Resizer::new();
        resizer.resize(
            &src,
            &mut dst,
            &fr::ResizeOptions::new()
                .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
        )?;
        dst.buffer().to_vec()
    };

    let (w, h) = (width as usize, height as usize);
    let mut ys = Array4::<f32>::zeros((1, 3, h, w));
    for (i, rgb) in pixels.chunks_exact(3).enumerate() {
        let (y, x) = (i / w, i % w);
        ys[[0, 0, y, x]] = rgb[0] as f32 / 255.0;
        ys[[0, 1, y, x]] = rgb[1] as f32 / 255.0;
        ys[[0, 2, y, x]] = rgb[2] as f32 / 255.0;
    }
    Ok(ys)
}

/// Detector input for one frame, plus the square size boxes are decoded against.
pub struct Prepared {
    pub tensor: Array4<f32>,
    pub square_size: u32,
}

pub fn prepare(frame: &RgbImage, input_width: u32, input_height: u32) -> Result<Prepared> {
    let square = letterbox(frame);
    let square_size = square.width();
    let tensor = to_input_tensor(&square, input_width, input_height)?;
    Ok(Prepared {
        tensor,
        square_size,
    })
}
