// threshold.rs — Bright-pass: keep only pixels above a soft luminance knee.
//
//   mask  1 ┤            ╭──────
//           │          ╱
//           │        ╱
//         0 ┼──────╯
//           └─────lo────hi──────  luma
//
// The surviving color is pushed through a vibrance curve first so that
// weakly saturated highlights pick up color before they become flare.

use glam::{Vec2, Vec3, Vec4};

use crate::config::LensFlareConfig;
use crate::image::{sample_bilinear, AddressMode, Image};
use crate::vertex::raster;

/// Luma weights used for desaturation.
pub const LUMA: Vec3 = Vec3::new(0.22, 0.707, 0.071);

/// Precomputed per-frame constants of the threshold pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdParams {
    /// Lower knee edge, normalized.
    pub lo: f32,
    /// Upper knee edge, normalized and clamped to 1.
    pub hi: f32,
    /// `vibrance_balance · vibrance`.
    pub vibrance: Vec3,
}

impl ThresholdParams {
    pub fn from_config(cfg: &LensFlareConfig) -> Self {
        let t = cfg.threshold / 255.0;
        let half_knee = cfg.threshold_knee / 2.0 / 255.0;
        let lo = t - half_knee;
        let hi = (t + half_knee).min(1.0);
        ThresholdParams {
            lo,
            hi,
            vibrance: Vec3::from(cfg.vibrance_balance) * cfg.vibrance,
        }
    }
}

#[inline]
pub fn luma(rgb: Vec3) -> f32 {
    rgb.dot(LUMA)
}

/// Shader-style sign: 0 maps to 0 (unlike `f32::signum`).
#[inline]
fn sign(v: Vec3) -> Vec3 {
    Vec3::new(sign1(v.x), sign1(v.y), sign1(v.z))
}

#[inline]
fn sign1(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Knee mask for a luminance value.
#[inline]
pub fn knee_mask(l: f32, lo: f32, hi: f32) -> f32 {
    if hi <= lo {
        // Zero-width knee degenerates to a step.
        return if l >= hi { 1.0 } else { 0.0 };
    }
    ((l.clamp(lo, hi) - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Vibrance: extrapolate away from luma, less for already saturated colors.
#[inline]
pub fn vibrance(rgb: Vec3, coeff: Vec3) -> Vec3 {
    let l = luma(rgb);
    let sat = rgb.max_element() - rgb.min_element();
    let factor = Vec3::ONE + coeff * (Vec3::ONE - sign(coeff) * sat);
    Vec3::splat(l) + (rgb - Vec3::splat(l)) * factor
}

/// The threshold stage for one input color. Alpha of the input is ignored
/// and the output alpha is 1.
pub fn threshold_color(color: Vec4, p: &ThresholdParams) -> Vec4 {
    let rgb = color.truncate();
    let mask = knee_mask(luma(rgb), p.lo, p.hi);
    (vibrance(rgb, p.vibrance) * mask).extend(1.0)
}

/// Threshold pass: `src` → `dst`.
pub fn threshold_pass(src: &Image<Vec4>, dst: &mut Image<Vec4>, p: &ThresholdParams) {
    raster(dst, |coord: Vec2| {
        threshold_color(sample_bilinear(src, coord, AddressMode::Clamp), p)
    });
}
