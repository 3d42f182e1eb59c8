// flare.rs — Ghost and halo generation from the thresholded image.
//
// For each pixel, walk the vector from the pixel towards the screen centre
// and beyond, sampling the bright-pass image at evenly spaced steps:
//
//      coord ●──────→──────→──────→──────→   ghostVec = (c − coord)·1.5/n
//            g0     g1     g2     g3   ...   (wrapped into [0,1)²)
//
// Each ghost is weighted by how close its sample point lies to the centre,
// so ghosts fade out toward the rim. A single halo sample is taken a fixed
// 0.4 UV units along the same direction and weighted by a very sharp
// falloff, which turns it into a thin ring. Ghosts are tinted by a radial
// color ramp.

use glam::{Vec2, Vec4};

use crate::config::LensFlareConfig;
use crate::image::{sample_bilinear, wrap_unit, AddressMode, Image};
use crate::vertex::raster;

/// Screen centre in UV.
pub const CENTER: Vec2 = Vec2::new(0.5, 0.5);

/// Distance of the halo sample from the pixel, in UV units.
pub const HALO_WIDTH: f32 = 0.4;

/// |CENTER|, the normalizing radius of every distance term.
#[inline]
pub fn center_radius() -> f32 {
    CENTER.length()
}

/// Constants of the flare pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlareParams {
    pub ghost_count: u32,
    pub blur_strength: f32,
    pub halo_strength: f32,
    pub lens_color_level: f32,
}

impl FlareParams {
    pub fn from_config(cfg: &LensFlareConfig) -> Self {
        FlareParams {
            ghost_count: cfg.ghost_count,
            blur_strength: cfg.blur_strength,
            halo_strength: cfg.halo_strength,
            lens_color_level: cfg.lens_color_level,
        }
    }
}

/// Step between consecutive ghost samples.
#[inline]
pub fn ghost_vector(coord: Vec2, ghost_count: u32) -> Vec2 {
    (CENTER - coord) * (1.0 / (ghost_count as f32 / 1.5))
}

/// Falloff of a ghost sampled at `p`: 1.1⁴ at the centre, 0.2⁴ at the corners.
#[inline]
pub fn ghost_weight(p: Vec2) -> f32 {
    let d = (CENTER - p).length() / center_radius();
    (1.0 - d * 0.9 + 0.1).powf(4.0)
}

/// Falloff of the halo sampled at `p`.
#[inline]
pub fn halo_weight(p: Vec2) -> f32 {
    let d = (CENTER - p).length() / center_radius();
    (1.0 - d).powf(30.0)
}

/// Flare stage for one pixel.
pub fn flare_pixel(thres: &Image<Vec4>, ramp: &Image<Vec4>, coord: Vec2, p: &FlareParams) -> Vec4 {
    let d = (CENTER - coord).length() / center_radius();
    let color = sample_bilinear(ramp, Vec2::splat(d), AddressMode::Clamp);

    let ghost_vec = ghost_vector(coord, p.ghost_count);
    // Zero at the exact centre; the shader would divide by zero there.
    let halo_vec = ghost_vec.normalize_or_zero() * HALO_WIDTH;

    let mut ghosts = Vec4::ZERO;
    for i in 0..p.ghost_count {
        let offset = wrap_unit(coord + ghost_vec * i as f32);
        ghosts += sample_bilinear(thres, offset, AddressMode::Repeat) * ghost_weight(offset);
    }

    let halo_pos = wrap_unit(coord + halo_vec);
    let halo = sample_bilinear(thres, halo_pos, AddressMode::Repeat) * halo_weight(halo_pos);

    let level = p.lens_color_level;
    ghosts *= color * level + Vec4::splat(1.0 - level);

    ghosts * p.blur_strength + halo * p.halo_strength
}

/// Flare generation pass: `thres` → `dst`.
pub fn flare_pass(thres: &Image<Vec4>, ramp: &Image<Vec4>, dst: &mut Image<Vec4>, p: &FlareParams) {
    raster(dst, |coord| flare_pixel(thres, ramp, coord, p));
}
