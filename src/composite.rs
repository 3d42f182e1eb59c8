// composite.rs — Final blend of the blurred flare onto the original frame.

use glam::{Vec2, Vec4};

use crate::config::LensFlareConfig;
use crate::flare::CENTER;
use crate::image::{sample_bilinear, AddressMode, Image};
use crate::texture::LensTextures;
use crate::vertex::raster;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeParams {
    pub chromatic_aberration: f32,
    pub dirt_strength: f32,
    /// Drop the original frame and output the flare alone.
    pub flare_only: bool,
}

impl CompositeParams {
    pub fn from_config(cfg: &LensFlareConfig) -> Self {
        CompositeParams {
            chromatic_aberration: cfg.chromatic_aberration,
            dirt_strength: cfg.dirt_strength,
            flare_only: cfg.flare_only,
        }
    }
}

/// Lens modulation at `coord`: dirt + star + 0.5, all four channels.
#[inline]
pub fn lens_mod(textures: &LensTextures, coord: Vec2) -> Vec4 {
    sample_bilinear(textures.dirt(), coord, AddressMode::Clamp)
        + sample_bilinear(textures.star(), coord, AddressMode::Clamp)
        + Vec4::splat(0.5)
}

/// Composite stage for one pixel.
///
/// Red is fetched `ca` UV units further from the centre, blue `ca` closer,
/// green in place. The result is unclamped.
pub fn composite_pixel(
    flare: &Image<Vec4>,
    original: &Image<Vec4>,
    textures: &LensTextures,
    coord: Vec2,
    p: &CompositeParams,
) -> Vec4 {
    let dir = (CENTER - coord).normalize_or_zero();
    let ca = p.chromatic_aberration;
    let fetch = |uv: Vec2| sample_bilinear(flare, uv, AddressMode::Clamp);

    let lensflare = Vec4::new(
        fetch(coord + dir * -ca).x,
        fetch(coord).y,
        fetch(coord + dir * ca).z,
        1.0,
    );

    let ds = p.dirt_strength;
    let overlay = lensflare * (lens_mod(textures, coord) * ds + Vec4::splat(1.0 - ds));
    if p.flare_only {
        overlay
    } else {
        sample_bilinear(original, coord, AddressMode::Clamp) + overlay
    }
}

/// Composite pass: flare + original + lookup textures → `dst`.
pub fn composite_pass(
    flare: &Image<Vec4>,
    original: &Image<Vec4>,
    textures: &LensTextures,
    dst: &mut Image<Vec4>,
    p: &CompositeParams,
) {
    raster(dst, |coord| composite_pixel(flare, original, textures, coord, p));
}
