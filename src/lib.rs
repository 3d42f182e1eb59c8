// lens-flare: multi-pass pseudo lens flare
// CPU reference passes with a wgpu compute mirror
//
// Reference: Chapman, "Pseudo Lens Flare" (2013); linear-sampling Gaussian
// blur after Rákos, "Efficient Gaussian blur with linear sampling" (2010)

pub mod image;
pub mod convert;
pub mod kernel;
pub mod error;
pub mod config;
pub mod texture;
pub mod vertex;
pub mod threshold;
pub mod flare;
pub mod blur;
pub mod composite;
pub mod pipeline;
pub mod gpu;

pub use config::{BlurWidth, LensFlareConfig};
pub use error::{ConfigError, FlareError};
pub use kernel::GaussQuality;
pub use pipeline::LensFlarePipeline;
pub use texture::LensTextures;
