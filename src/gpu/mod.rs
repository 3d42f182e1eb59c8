// gpu/mod.rs — wgpu compute mirror of the lens-flare passes.
//
// The CPU modules in the parent crate are the reference. Every pass here is
// the same arithmetic in WGSL (including the hand-written bilinear fetch),
// and `pipeline::tests` checks GPU output against the CPU pipeline.
//
//   device    — adapter selection, limits profile, workgroup size
//   image     — RGBA32F frame upload / readback
//   pipeline  — the eight passes as compute dispatches

pub mod device;
pub mod image;
pub mod pipeline;

pub use device::{DeviceProfile, GpuDevice, GpuError};
pub use pipeline::GpuLensFlarePipeline;
