// convert.rs — Conversions between host pixel buffers and RGBA f32 frames.
//
// The pipeline works on `Image<Vec4>` frames with channels in [0, 1] (the
// composite may exceed 1; nothing is clamped until it leaves the crate).
// Hosts usually hand over one of:
//   RGBA8 interleaved bytes  → `rgba8_to_frame` (÷255)
//   frame → RGBA8 bytes      → `frame_to_rgba8` (clamp, ×255, round)
//   frame → 0RGB u32         → `frame_to_0rgb`   (window presentation)
//
// Alpha is carried through unchanged on the way in; 0RGB drops it.

use glam::Vec4;

use crate::image::Image;

/// Convert interleaved RGBA8 bytes to a normalized RGBA f32 frame.
///
/// # Panics
/// Panics if `bytes.len() != width * height * 4`.
pub fn rgba8_to_frame(width: usize, height: usize, bytes: &[u8]) -> Image<Vec4> {
    assert_eq!(
        bytes.len(),
        width * height * 4,
        "RGBA8 buffer length ({}) must equal width * height * 4 ({})",
        bytes.len(),
        width * height * 4,
    );
    let data = bytes
        .chunks_exact(4)
        .map(|px| {
            Vec4::new(
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
                px[3] as f32 / 255.0,
            )
        })
        .collect();
    Image::from_vec(width, height, data)
}

#[inline]
fn unorm8(v: f32) -> u8 {
    // NaN clamps to 0 through the `as` cast.
    (v * 255.0).clamp(0.0, 255.0).round() as u8
}

/// Convert an RGBA f32 frame to interleaved RGBA8 bytes.
/// Values are clamped to [0, 1] and rounded.
pub fn frame_to_rgba8(src: &Image<Vec4>) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.width() * src.height() * 4);
    for y in 0..src.height() {
        for p in src.row(y) {
            out.extend_from_slice(&[unorm8(p.x), unorm8(p.y), unorm8(p.z), unorm8(p.w)]);
        }
    }
    out
}

/// Pack a frame into 0RGB `u32` words, one per pixel, row-major.
/// This is the layout minifb and most software framebuffers expect.
pub fn frame_to_0rgb(src: &Image<Vec4>) -> Vec<u32> {
    let mut out = Vec::with_capacity(src.width() * src.height());
    for y in 0..src.height() {
        out.extend(src.row(y).iter().map(|p| {
            ((unorm8(p.x) as u32) << 16) | ((unorm8(p.y) as u32) << 8) | unorm8(p.z) as u32
        }));
    }
    out
}

/// Broadcast a single-channel image into an RGBA frame (r = g = b = v, a = 1).
/// Handy for grayscale dirt masks.
pub fn gray_to_frame(src: &Image<f32>) -> Image<Vec4> {
    let mut dst = Image::new(src.width(), src.height());
    for (x, y, v) in src.pixels() {
        dst.set(x, y, Vec4::new(v, v, v, 1.0));
    }
    dst
}
