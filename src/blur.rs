// blur.rs — The four directional Gaussian blurs of the flare image.
//
// Each pass is a 1-D convolution along a fixed direction, evaluated with
// bilinear fetches at the fractional offsets of a `KernelTable`:
//
//   H  ──●──      horizontal, offsets × width.horizontal
//   V    │        vertical,   offsets × width.vertical
//   S    ╳        both diagonals, x stretched by width.slant; result × 0.5
//   B    ┼        both axes, unscaled 5-tap table; result × 0.5
//
// Chained H → V → S → B, each pass reads its predecessor's output. H then V
// is a classic separable Gaussian; S and B add the star-shaped streaks.
//
// BORDER HANDLING: Clamp (replicate edge pixels), identical to a GPU
// sampler with clamp-to-edge addressing.
//
// NEW RUST CONCEPTS:
// - Closures capturing by reference: each pass builds a `|coord| -> Vec4`
//   closure over `src` and hands it to `vertex::raster`.

use glam::{Vec2, Vec4};

use crate::config::LensFlareConfig;
use crate::image::{sample_bilinear, AddressMode, Image};
use crate::kernel::{KernelTable, KERNEL_5};
use crate::vertex::raster;

/// Constants shared by the H, V and S passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurParams {
    pub table: KernelTable,
    /// Entries of `table` used, centre included.
    pub taps: usize,
    pub horizontal: f32,
    pub vertical: f32,
    pub slant: f32,
}

impl BlurParams {
    pub fn from_config(cfg: &LensFlareConfig) -> Self {
        BlurParams {
            table: cfg.kernel(),
            taps: cfg.effective_taps(),
            horizontal: cfg.blur_width.horizontal,
            vertical: cfg.blur_width.vertical,
            slant: cfg.blur_width.slant,
        }
    }
}

#[inline]
fn texel(src: &Image<Vec4>) -> Vec2 {
    Vec2::new(1.0 / src.width() as f32, 1.0 / src.height() as f32)
}

#[inline]
fn fetch(src: &Image<Vec4>, uv: Vec2) -> Vec4 {
    sample_bilinear(src, uv, AddressMode::Clamp)
}

/// Mirrored 1-D blur along `step` (one unit of offset, in UV).
fn directional(src: &Image<Vec4>, coord: Vec2, table: &KernelTable, taps: usize, step: Vec2) -> Vec4 {
    let mut color = fetch(src, coord) * table.weights[0];
    for (o, w) in table.taps(taps).skip(1) {
        color += fetch(src, coord + step * o) * w;
        color += fetch(src, coord - step * o) * w;
    }
    color
}

/// Horizontal blur at one coordinate.
pub fn blur_h_pixel(src: &Image<Vec4>, coord: Vec2, p: &BlurParams) -> Vec4 {
    let px = texel(src);
    directional(src, coord, &p.table, p.taps, Vec2::new(p.horizontal * px.x, 0.0))
}

/// Vertical blur at one coordinate.
pub fn blur_v_pixel(src: &Image<Vec4>, coord: Vec2, p: &BlurParams) -> Vec4 {
    let px = texel(src);
    directional(src, coord, &p.table, p.taps, Vec2::new(0.0, p.vertical * px.y))
}

/// Diagonal blur at one coordinate: four taps per offset, halved.
pub fn blur_s_pixel(src: &Image<Vec4>, coord: Vec2, p: &BlurParams) -> Vec4 {
    let px = texel(src);
    let mut color = fetch(src, coord) * p.table.weights[0];
    for (o, w) in p.table.taps(p.taps).skip(1) {
        let a = o * p.slant * px.x;
        let b = o * px.y;
        color += fetch(src, coord + Vec2::new(a, b)) * w;
        color += fetch(src, coord - Vec2::new(a, b)) * w;
        color += fetch(src, coord + Vec2::new(-a, b)) * w;
        color += fetch(src, coord + Vec2::new(a, -b)) * w;
    }
    color * 0.5
}

/// Final cross blur at one coordinate: always the full 5-tap table.
pub fn blur_b_pixel(src: &Image<Vec4>, coord: Vec2) -> Vec4 {
    let px = texel(src);
    let mut color = fetch(src, coord) * KERNEL_5.weights[0];
    for (o, w) in KERNEL_5.taps(KERNEL_5.len()).skip(1) {
        color += fetch(src, coord + Vec2::new(0.0, o * px.y)) * w;
        color += fetch(src, coord - Vec2::new(0.0, o * px.y)) * w;
        color += fetch(src, coord + Vec2::new(o * px.x, 0.0)) * w;
        color += fetch(src, coord - Vec2::new(o * px.x, 0.0)) * w;
    }
    color * 0.5
}

pub fn blur_h(src: &Image<Vec4>, dst: &mut Image<Vec4>, p: &BlurParams) {
    raster(dst, |coord| blur_h_pixel(src, coord, p));
}

pub fn blur_v(src: &Image<Vec4>, dst: &mut Image<Vec4>, p: &BlurParams) {
    raster(dst, |coord| blur_v_pixel(src, coord, p));
}

pub fn blur_s(src: &Image<Vec4>, dst: &mut Image<Vec4>, p: &BlurParams) {
    raster(dst, |coord| blur_s_pixel(src, coord, p));
}

pub fn blur_b(src: &Image<Vec4>, dst: &mut Image<Vec4>) {
    raster(dst, |coord| blur_b_pixel(src, coord));
}
