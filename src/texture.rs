// texture.rs — The three read-only lookup textures of the effect.
//
//   dirt  — full-screen lens dirt mask   (canonical 1920×1080)
//   star  — diffraction star mask        (canonical 1024×1024)
//   ramp  — 1-D ghost color gradient     (canonical 256×1)
//
// Decoding the assets is the host's business; this module only takes
// already-decoded RGBA frames. Any non-empty size is accepted since every
// fetch is a normalized-UV bilinear sample. Non-canonical sizes are
// logged because they usually mean the wrong asset was wired up.

use glam::Vec4;
use log::warn;

use crate::error::FlareError;
use crate::image::Image;

/// A decoded RGBA lookup texture.
pub type LookupTexture = Image<Vec4>;

pub const DIRT_SIZE: (usize, usize) = (1920, 1080);
pub const STAR_SIZE: (usize, usize) = (1024, 1024);
pub const RAMP_SIZE: (usize, usize) = (256, 1);

/// Dirt, star and color-ramp textures, shared read-only by every invocation.
#[derive(Debug, Clone)]
pub struct LensTextures {
    dirt: LookupTexture,
    star: LookupTexture,
    ramp: LookupTexture,
}

fn check(name: &'static str, tex: &LookupTexture, canonical: (usize, usize)) -> Result<(), FlareError> {
    if tex.is_empty() {
        return Err(FlareError::EmptyTexture { name });
    }
    if tex.dimensions() != canonical {
        warn!(
            "{name} texture is {}×{}, expected {}×{}",
            tex.width(),
            tex.height(),
            canonical.0,
            canonical.1
        );
    }
    Ok(())
}

impl LensTextures {
    /// Bundle the three textures.
    ///
    /// # Errors
    /// `FlareError::EmptyTexture` if any texture has zero width or height.
    pub fn new(dirt: LookupTexture, star: LookupTexture, ramp: LookupTexture) -> Result<Self, FlareError> {
        check("dirt", &dirt, DIRT_SIZE)?;
        check("star", &star, STAR_SIZE)?;
        check("ramp", &ramp, RAMP_SIZE)?;
        Ok(LensTextures { dirt, star, ramp })
    }

    /// 1×1 constant textures. Bilinear sampling of a 1×1 texture returns the
    /// texel everywhere, which makes closed-form testing easy.
    pub fn uniform(dirt: Vec4, star: Vec4, ramp: Vec4) -> Self {
        LensTextures {
            dirt: Image::filled(1, 1, dirt),
            star: Image::filled(1, 1, star),
            ramp: Image::filled(1, 1, ramp),
        }
    }

    /// All-black textures: lens modulation becomes the constant 0.5.
    pub fn black() -> Self {
        Self::uniform(Vec4::ZERO, Vec4::ZERO, Vec4::ZERO)
    }

    #[inline]
    pub fn dirt(&self) -> &LookupTexture {
        &self.dirt
    }

    #[inline]
    pub fn star(&self) -> &LookupTexture {
        &self.star
    }

    #[inline]
    pub fn ramp(&self) -> &LookupTexture {
        &self.ramp
    }
}

// ---------------------------------------------------------------------------
// Procedural stand-ins
// ---------------------------------------------------------------------------
// Hosts without the original PNG assets can still run the effect with these.
// They are deterministic so benches and demos are reproducible.

/// A cool-to-warm ramp: blue at the centre, orange at the rim.
pub fn procedural_ramp() -> LookupTexture {
    let (w, h) = RAMP_SIZE;
    let mut img = Image::new(w, h);
    for x in 0..w {
        let t = x as f32 / (w - 1) as f32;
        let c = Vec4::new(0.3, 0.5, 1.0, 1.0).lerp(Vec4::new(1.0, 0.6, 0.2, 1.0), t);
        img.set(x, 0, c);
    }
    img
}

/// A star mask: thin bright spokes radiating from the centre.
pub fn procedural_star(size: usize, spokes: u32) -> LookupTexture {
    let mut img = Image::new(size, size);
    let c = size as f32 * 0.5;
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - c;
            let dy = y as f32 + 0.5 - c;
            let r = (dx * dx + dy * dy).sqrt() / c;
            let a = dy.atan2(dx) * spokes as f32 * 0.5;
            let v = (a.cos().abs().powf(40.0) * (1.0 - r).max(0.0)).min(1.0);
            img.set(x, y, Vec4::new(v, v, v, 1.0));
        }
    }
    img
}

/// A dirt mask: soft blotches from a fixed linear congruential sequence.
pub fn procedural_dirt(width: usize, height: usize, blotches: usize) -> LookupTexture {
    let mut img = Image::filled(width, height, Vec4::new(0.0, 0.0, 0.0, 1.0));
    let mut state: u32 = 0x2545_F491;
    let mut next = move || {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (state >> 8) as f32 / (1u32 << 24) as f32
    };
    for _ in 0..blotches {
        let cx = next() * width as f32;
        let cy = next() * height as f32;
        let radius = 4.0 + next() * width.min(height) as f32 * 0.05;
        let strength = 0.1 + next() * 0.3;
        let x0 = (cx - radius).max(0.0) as usize;
        let x1 = ((cx + radius) as usize).min(width.saturating_sub(1));
        let y0 = (cy - radius).max(0.0) as usize;
        let y1 = ((cy + radius) as usize).min(height.saturating_sub(1));
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt() / radius;
                if d < 1.0 {
                    let p = img.get_mut(x, y);
                    let add = strength * (1.0 - d * d);
                    p.x = (p.x + add).min(1.0);
                    p.y = (p.y + add).min(1.0);
                    p.z = (p.z + add).min(1.0);
                }
            }
        }
    }
    img
}
