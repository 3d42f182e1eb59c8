// error.rs — Crate-level error types.
//
// Two layers:
//   ConfigError — a tunable is out of range; raised by `validate()`.
//   FlareError  — everything the CPU pipeline can report to its host.
// GPU initialisation has its own `gpu::device::GpuError`.

use thiserror::Error;

/// A configuration value failed validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("ghost_count must be at least 1")]
    ZeroGhosts,

    #[error("ghost_count {count} exceeds the maximum of {max}")]
    TooManyGhosts { count: u32, max: u32 },

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("blur_taps = {taps} must be in [1, {max}] for the selected quality")]
    BlurTaps { taps: usize, max: usize },
}

/// Errors reported by pipeline construction and invocation.
#[derive(Error, Debug)]
pub enum FlareError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported resolution {width}×{height} (each side must be in [1, {max}])")]
    UnsupportedResolution { width: usize, height: usize, max: usize },

    #[error("source frame is {got_width}×{got_height}, pipeline was built for {width}×{height}")]
    ResolutionMismatch {
        width: usize,
        height: usize,
        got_width: usize,
        got_height: usize,
    },

    #[error("lookup texture '{name}' is empty")]
    EmptyTexture { name: &'static str },

    #[error("invalid pass graph: {0}")]
    PassGraph(String),
}

pub type Result<T> = std::result::Result<T, FlareError>;
