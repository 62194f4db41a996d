use std::path::Path;

use image::{Rgba, RgbaImage, imageops::FilterType};

use crate::{
    foundation::{
        core::Rect,
        error::{PackError, PackResult},
        math::mul_div255_u8,
    },
    layout::LayoutSpec,
};

/// Opaque black; the packed canvas is never transparent.
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Decode an image file into straight-alpha RGBA8.
pub fn load_rgba(path: &Path) -> PackResult<RgbaImage> {
    let img = image::open(path).map_err(|e| PackError::decode(path, e.to_string()))?;
    Ok(img.to_rgba8())
}

/// Decode `path` and pack it, using the frame's own alpha channel as the alpha source.
pub fn pack_file(path: &Path, layout: &LayoutSpec) -> PackResult<RgbaImage> {
    let frame = load_rgba(path)?;
    Ok(pack(&frame, Some(&frame), layout))
}

/// Compose one opaque canvas from a color image and an optional alpha source.
///
/// Sources larger than their region are cropped from the top-left, smaller ones leave the rest of
/// the region black. Only the alpha source is ever resampled, and only when the layout scale is
/// below 1.
pub fn pack(color: &RgbaImage, alpha_source: Option<&RgbaImage>, layout: &LayoutSpec) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(layout.canvas_width, layout.canvas_height, BACKGROUND);

    copy_region(&mut canvas, color, layout.color, over_black);

    if let Some(src) = alpha_source {
        if layout.needs_alpha_resample() {
            if !layout.alpha.is_empty() {
                let resampled = image::imageops::resize(
                    src,
                    layout.alpha.width,
                    layout.alpha.height,
                    FilterType::Triangle,
                );
                copy_region(&mut canvas, &resampled, layout.alpha, alpha_to_gray);
            }
        } else {
            copy_region(&mut canvas, src, layout.alpha, alpha_to_gray);
        }
    }

    canvas
}

/// Straight-alpha `px` composited over opaque black.
fn over_black(px: [u8; 4]) -> [u8; 4] {
    let a = u16::from(px[3]);
    if a == 255 {
        return [px[0], px[1], px[2], 255];
    }
    [
        mul_div255_u8(u16::from(px[0]), a),
        mul_div255_u8(u16::from(px[1]), a),
        mul_div255_u8(u16::from(px[2]), a),
        255,
    ]
}

/// Alpha channel as opaque gray.
fn alpha_to_gray(px: [u8; 4]) -> [u8; 4] {
    [px[3], px[3], px[3], 255]
}

fn copy_region(canvas: &mut RgbaImage, src: &RgbaImage, rect: Rect, map: fn([u8; 4]) -> [u8; 4]) {
    let copy_w = rect
        .width
        .min(src.width())
        .min(canvas.width().saturating_sub(rect.x)) as usize;
    let copy_h = rect
        .height
        .min(src.height())
        .min(canvas.height().saturating_sub(rect.y)) as usize;
    if copy_w == 0 || copy_h == 0 {
        return;
    }

    let src_stride = src.width() as usize * 4;
    let dst_stride = canvas.width() as usize * 4;
    let src_raw = src.as_raw();
    let dst_raw: &mut [u8] = canvas;

    for row in 0..copy_h {
        let s_off = row * src_stride;
        let d_off = (rect.y as usize + row) * dst_stride + rect.x as usize * 4;
        let s = &src_raw[s_off..s_off + copy_w * 4];
        let d = &mut dst_raw[d_off..d_off + copy_w * 4];
        for (dp, sp) in d.chunks_exact_mut(4).zip(s.chunks_exact(4)) {
            dp.copy_from_slice(&map([sp[0], sp[1], sp[2], sp[3]]));
        }
    }
}
