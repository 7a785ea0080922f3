use image::{DynamicImage, Rgba32FImage};

use crate::format::PixelFormat;
use crate::model::MipLevel;

/// Number of levels in a full chain down to 1x1: `floor(log2(max(w, h))) + 1`.
pub fn mip_level_count(width: u32, height: u32) -> usize {
    let m = width.max(height).max(1);
    (u32::BITS - m.leading_zeros()) as usize
}

/// Dimensions of the level below `(width, height)`.
pub fn next_mip_dims(width: u32, height: u32) -> (u32, u32) {
    ((width / 2).max(1), (height / 2).max(1))
}

/// 2x2 box filter. Odd edges clamp the sampling window to the last row/column.
pub fn box_downsample(src: &Rgba32FImage) -> Rgba32FImage {
    let (sw, sh) = src.dimensions();
    let (dw, dh) = next_mip_dims(sw, sh);
    Rgba32FImage::from_fn(dw, dh, |x, y| {
        let x0 = (x * 2).min(sw - 1);
        let x1 = (x * 2 + 1).min(sw - 1);
        let y0 = (y * 2).min(sh - 1);
        let y1 = (y * 2 + 1).min(sh - 1);
        let mut acc = [0f32; 4];
        for (sx, sy) in [(x0, y0), (x1, y0), (x0, y1), (x1, y1)] {
            let p = src.get_pixel(sx, sy);
            for c in 0..4 {
                acc[c] += p[c];
            }
        }
        image::Rgba(acc.map(|v| v * 0.25))
    })
}

/// Builds the full chain for one layer. `base` must already be in the format's
/// working precision; level 0 is encoded as-is.
pub fn generate_mip_chain(base: &DynamicImage, format: PixelFormat) -> Vec<MipLevel> {
    let (w, h) = (base.width(), base.height());
    let count = mip_level_count(w, h);
    let mut levels = Vec::with_capacity(count);
    levels.push(MipLevel {
        width: w,
        height: h,
        data: format.encode(base),
    });
    let mut current = base.clone();
    for _ in 1..count {
        let down = box_downsample(&current.to_rgba32f());
        // quantize each level before deriving the next one
        current = format.to_working(&DynamicImage::ImageRgba32F(down));
        levels.push(MipLevel {
            width: current.width(),
            height: current.height(),
            data: format.encode(&current),
        });
    }
    levels
}
