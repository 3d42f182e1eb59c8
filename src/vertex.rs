// vertex.rs — Full-screen triangle and the per-pixel coordinate it produces.
//
// Every pass is drawn as one oversized triangle that covers the viewport:
//
//   id 0: tex (0,0)  pos (-1, 1)       (-1,1)●───────────●(3,1)
//   id 1: tex (0,2)  pos (-1,-3)             │ viewport │ ╱
//   id 2: tex (2,0)  pos ( 3, 1)             │        ╱
//                                            ├──────╱
//                                            │    ╱
//                                            │  ╱
//                                     (-1,-3)●╱
//
// The texture coordinate is rotated by π about (0.5, 0.5) before it reaches
// the pixel stage. That is a point reflection, so every pass reads its
// input flipped. The angle and its cos/sin are evaluated in f32 exactly as
// a shader would; sin(π) in f32 is not zero, and the resulting sub-ulp
// shear is part of the reference output.
//
// CPU RASTERIZATION:
// The rotation is affine, so interpolating the rotated vertex attribute
// over the triangle is identical to rotating the interpolated attribute.
// `pass_coord` therefore rotates the pixel-centre UV directly instead of
// doing barycentric interpolation.

use std::f32::consts::PI;

use glam::{Vec2, Vec4};

use crate::image::Image;

/// Flare rotation angle, in radians.
pub const FLARE_ROTATION: f32 = PI;

/// Number of vertices drawn per pass.
pub const VERTEX_COUNT: u32 = 3;

/// Output of the vertex stage for one vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullscreenVertex {
    /// Clip-space position (z = 0, w = 1 implied).
    pub position: Vec2,
    /// Rotated texture coordinate.
    pub tex: Vec2,
}

/// `(cos, sin)` of the flare rotation, evaluated in f32.
#[inline]
pub fn rotation() -> (f32, f32) {
    (FLARE_ROTATION.cos(), FLARE_ROTATION.sin())
}

/// Rotate a texture coordinate about (0.5, 0.5).
///
/// Row-vector convention: `t' = t × [[c, −s], [s, c]]`.
#[inline]
pub fn pre_rotate(tex: Vec2) -> Vec2 {
    let (c, s) = rotation();
    let t = tex - Vec2::splat(0.5);
    Vec2::new(t.x * c + t.y * s, -t.x * s + t.y * c) + Vec2::splat(0.5)
}

/// Vertex stage for draw index `id` (0, 1 or 2).
pub fn fullscreen_vertex(id: u32) -> FullscreenVertex {
    let tex = Vec2::new(
        if id == 2 { 2.0 } else { 0.0 },
        if id == 1 { 2.0 } else { 0.0 },
    );
    let position = tex * Vec2::new(2.0, -2.0) + Vec2::new(-1.0, 1.0);
    FullscreenVertex { position, tex: pre_rotate(tex) }
}

/// Coordinate the pixel stage sees at pixel `(x, y)` of a `width`×`height`
/// target.
#[inline]
pub fn pass_coord(x: usize, y: usize, width: usize, height: usize) -> Vec2 {
    pre_rotate(Vec2::new(
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    ))
}

/// Run a pixel function over every pixel of `dst`, row-major.
///
/// This is the CPU stand-in for "draw the full-screen triangle into this
/// render target": one call per pixel, no pixel reads `dst`.
pub fn raster<F>(dst: &mut Image<Vec4>, mut shade: F)
where
    F: FnMut(Vec2) -> Vec4,
{
    let (w, h) = dst.dimensions();
    for y in 0..h {
        let row = dst.row_mut(y);
        for (x, px) in row.iter_mut().enumerate() {
            *px = shade(pass_coord(x, y, w, h));
        }
    }
}
