// config.rs — Effect tunables, defaults, and validation.
//
// `LensFlareConfig` is a plain value: build it (or deserialize it from
// JSON), call `validate()`, and hand it to a pipeline constructor. The
// pipeline keeps its own copy and never mutates it. Every field has a
// default so a partial JSON document like `{ "ghost_count": 5 }` is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, FlareError};
use crate::kernel::{GaussQuality, KernelTable};

/// Upper bound on `ghost_count`. The flare pass costs one bilinear fetch
/// per ghost per pixel.
pub const MAX_GHOSTS: u32 = 64;

/// Upper bound on `chromatic_aberration`, in UV units.
pub const MAX_CHROMATIC_ABERRATION: f32 = 0.08;

/// Upper bound on each `BlurWidth` component.
pub const MAX_BLUR_WIDTH: f32 = 100.0;

/// Per-direction blur widths, in multiples of the kernel offsets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlurWidth {
    pub horizontal: f32,
    pub vertical: f32,
    /// Horizontal stretch of the diagonal pass. Its vertical step is 1.
    pub slant: f32,
}

impl Default for BlurWidth {
    fn default() -> Self {
        BlurWidth { horizontal: 10.0, vertical: 10.0, slant: 15.0 }
    }
}

/// All tunables of the lens-flare effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LensFlareConfig {
    /// Number of ghost copies sampled along the centre vector.
    pub ghost_count: u32,
    /// Weight of the (colored) ghosts in the flare image.
    pub blur_strength: f32,
    /// Weight of the halo in the flare image.
    pub halo_strength: f32,
    /// How strongly the dirt/star textures modulate the flare. [0, 1].
    pub dirt_strength: f32,
    /// UV offset of the red and blue channels along the centre direction.
    pub chromatic_aberration: f32,
    /// Luminance threshold in 0–255 units.
    pub threshold: f32,
    /// Width of the soft transition around `threshold`, 0–255 units.
    pub threshold_knee: f32,
    pub vibrance: f32,
    /// Per-channel multiplier of `vibrance`.
    pub vibrance_balance: [f32; 3],
    /// Blend between white (0) and the color ramp (1) for the ghosts.
    pub lens_color_level: f32,
    pub blur_width: BlurWidth,
    pub quality: GaussQuality,
    /// Table entries used by the H, V and S passes, centre included.
    /// `None` uses the whole table.
    pub blur_taps: Option<usize>,
    /// Output the flare overlay without the original frame underneath.
    pub flare_only: bool,
}

impl Default for LensFlareConfig {
    fn default() -> Self {
        LensFlareConfig {
            ghost_count: 8,
            blur_strength: 0.15,
            halo_strength: 0.45,
            dirt_strength: 0.6,
            chromatic_aberration: 0.01,
            threshold: 250.0,
            threshold_knee: 50.0,
            vibrance: 10.0,
            vibrance_balance: [1.0, 1.0, 1.5],
            lens_color_level: 0.1,
            blur_width: BlurWidth::default(),
            quality: GaussQuality::Extended,
            blur_taps: None,
            flare_only: false,
        }
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}

impl LensFlareConfig {
    /// Check every tunable. Returns the first violation found.
    ///
    /// # Errors
    /// See [`ConfigError`] for the individual rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ghost_count == 0 {
            return Err(ConfigError::ZeroGhosts);
        }
        if self.ghost_count > MAX_GHOSTS {
            return Err(ConfigError::TooManyGhosts { count: self.ghost_count, max: MAX_GHOSTS });
        }

        in_range("blur_strength", self.blur_strength, 0.0, 1.0)?;
        in_range("halo_strength", self.halo_strength, 0.0, 1.0)?;
        in_range("chromatic_aberration", self.chromatic_aberration, 0.0, MAX_CHROMATIC_ABERRATION)?;
        in_range("vibrance", self.vibrance, -50.0, 50.0)?;
        in_range("vibrance_balance[0]", self.vibrance_balance[0], -10.0, 10.0)?;
        in_range("vibrance_balance[1]", self.vibrance_balance[1], -10.0, 10.0)?;
        in_range("vibrance_balance[2]", self.vibrance_balance[2], -10.0, 10.0)?;
        in_range("blur_width.horizontal", self.blur_width.horizontal, 0.0, MAX_BLUR_WIDTH)?;
        in_range("blur_width.vertical", self.blur_width.vertical, 0.0, MAX_BLUR_WIDTH)?;
        in_range("blur_width.slant", self.blur_width.slant, 0.0, MAX_BLUR_WIDTH)?;

        in_range("threshold", self.threshold, 0.0, 255.0)?;
        in_range("threshold_knee", self.threshold_knee, 0.0, 255.0)?;
        in_range("dirt_strength", self.dirt_strength, 0.0, 1.0)?;
        in_range("lens_color_level", self.lens_color_level, 0.0, 1.0)?;

        if let Some(taps) = self.blur_taps {
            let max = self.kernel().len();
            if taps == 0 || taps > max {
                return Err(ConfigError::BlurTaps { taps, max });
            }
        }
        Ok(())
    }

    /// Kernel table selected by `quality`.
    pub fn kernel(&self) -> KernelTable {
        KernelTable::for_quality(self.quality)
    }

    /// Entries of `kernel()` used by the H, V and S passes.
    pub fn effective_taps(&self) -> usize {
        let len = self.kernel().len();
        self.blur_taps.map_or(len, |t| t.min(len))
    }

    /// Parse a JSON document and validate it.
    ///
    /// # Errors
    /// `FlareError::ConfigParse` for malformed JSON or unknown fields,
    /// `FlareError::Config` when a value fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, FlareError> {
        let config: LensFlareConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FlareError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, FlareError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
