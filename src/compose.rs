//! Tile cropping and alpha-composited pasting

use crate::error::{AtlasError, Result};
use crate::index::Rect;
use image::{Rgba, RgbaImage};

/// Transparent color for page backgrounds
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Allocate a fully transparent canvas.
pub fn blank_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, TRANSPARENT)
}

/// Copy the exact pixels of `rect` out of `source`.
///
/// Fails instead of clamping when the rect reaches past the image edge.
pub fn crop_exact(source: &RgbaImage, rect: Rect, filename: &str) -> Result<RgbaImage> {
    let (sw, sh) = source.dimensions();
    let fits = rect.w > 0
        && rect.h > 0
        && rect.x.checked_add(rect.w).is_some_and(|r| r <= sw)
        && rect.y.checked_add(rect.h).is_some_and(|b| b <= sh);
    if !fits {
        return Err(AtlasError::TileOutOfBounds {
            filename: filename.to_string(),
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            source_size: (sw, sh),
        });
    }
    Ok(image::imageops::crop_imm(source, rect.x, rect.y, rect.w, rect.h).to_image())
}

/// Composite `tile` over `canvas` with its top-left corner at `(x, y)`.
///
/// Source-over blending; onto a transparent destination this reproduces
/// the tile's pixels exactly. Pixels falling outside the canvas are dropped.
pub fn paste_over(canvas: &mut RgbaImage, tile: &RgbaImage, x: u32, y: u32) {
    let (cw, ch) = canvas.dimensions();

    for (sy, row) in tile.rows().enumerate() {
        let dest_y = y + sy as u32;
        if dest_y >= ch {
            break;
        }
        for (sx, src) in row.enumerate() {
            let dest_x = x + sx as u32;
            if dest_x >= cw {
                break;
            }
            if src[3] == 0 {
                continue;
            }
            let dst = canvas.get_pixel(dest_x, dest_y);
            let out = if src[3] == 255 || dst[3] == 0 { *src } else { blend_over(src, dst) };
            canvas.put_pixel(dest_x, dest_y, out);
        }
    }
}

/// Porter-Duff "source over" for two partially transparent pixels.
fn blend_over(src: &Rgba<u8>, dst: &Rgba<u8>) -> Rgba<u8> {
    let src_a = src[3] as f32 / 255.0;
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a == 0.0 {
        return TRANSPARENT;
    }

    let channel = |s: u8, d: u8| -> u8 {
        let s = s as f32 / 255.0;
        let d = d as f32 / 255.0;
        let c = (s * src_a + d * dst_a * (1.0 - src_a)) / out_a;
        (c.clamp(0.0, 1.0) * 255.0).round() as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}
