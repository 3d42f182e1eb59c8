// gpu/device.rs — wgpu device abstraction.
//
// Responsibilities:
//   - Enumerate Vulkan adapters and select the best non-software one.
//   - Expose a `DeviceProfile` for running under reduced limits on a
//     development machine (catch violations before shipping to a weak GPU).
//   - Provide `WorkgroupSize` — a 2D workgroup configuration that is
//     validated against the active profile and baked into the shader.
//
// ADAPTER SELECTION:
// wgpu's default `request_adapter` uses power preference heuristics that
// may grab llvmpipe/softpipe (the software renderer appears as a valid
// Vulkan device). We enumerate explicitly and prefer anything that is not
// DeviceType::Cpu, falling back to the software adapter only when nothing
// else exists.
//
// DEVICE LIMITS:
// Under `Conservative` we request wgpu's downlevel defaults instead of the
// full defaults. wgpu validates every dispatch and texture size against the
// *requested* limits, so a pipeline that would not fit a low-end GPU fails
// on the development machine too.
//
// NEW RUST CONCEPTS:
// - `pollster::block_on` — runs an async fn to completion on the current
//   thread. wgpu's device/adapter API is async because on WebGPU it maps
//   to JS Promises, but for native Vulkan we just block.
// - `#[derive(thiserror::Error)]` — generates `Display` and `Error::source`
//   from the `#[error]` attributes.

use std::fmt;

use log::{debug, info, warn};
use thiserror::Error;

/// Hardware profile controlling device limits and default workgroup sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceProfile {
    /// Use wgpu's default limits. No artificial caps.
    Native,
    /// Downlevel limits (256 invocations, 2048² textures) and 8×8
    /// workgroups. Matches what mobile and older integrated GPUs offer.
    Conservative,
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProfile::Native => write!(f, "Native"),
            DeviceProfile::Conservative => write!(f, "Conservative (downlevel limits)"),
        }
    }
}

/// A workgroup size configuration for 2D compute dispatches.
///
/// The product x·y must not exceed the profile's
/// `max_compute_invocations_per_workgroup` limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
}

impl WorkgroupSize {
    /// Total invocations per workgroup (x * y).
    pub fn total(&self) -> u32 {
        self.x * self.y
    }

    /// Default workgroup size for a profile.
    ///
    /// - `Native`: 16×8 = 128 invocations, 4 warps on NVIDIA and 2 waves on
    ///   AMD. The 16-wide x dimension matches row-major texel order.
    /// - `Conservative`: 8×8 = 64 invocations.
    pub fn for_profile(profile: DeviceProfile) -> Self {
        match profile {
            DeviceProfile::Native => WorkgroupSize { x: 16, y: 8 },
            DeviceProfile::Conservative => WorkgroupSize { x: 8, y: 8 },
        }
    }

    /// Substitute the `{{WG_X}}` / `{{WG_Y}}` placeholders of a WGSL
    /// template.
    ///
    /// naga does not accept `override` expressions inside
    /// `@workgroup_size()`, so the size is baked into the source text.
    pub fn specialize(&self, template: &str) -> String {
        template
            .replace("{{WG_X}}", &self.x.to_string())
            .replace("{{WG_Y}}", &self.y.to_string())
    }

    /// Number of workgroups needed to cover a `width`×`height` image.
    ///
    /// Uses ceiling division; the shader must guard against out-of-bounds
    /// global IDs:
    /// ```wgsl
    /// if gid.x >= width || gid.y >= height { return; }
    /// ```
    pub fn dispatch_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width.div_ceil(self.x), height.div_ceil(self.y))
    }
}

impl fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{} ({} invocations)", self.x, self.y, self.total())
    }
}

/// Cached adapter information for logging and debugging.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor: u32,
    pub device: u32,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// The core GPU context: adapter, device, queue, and active profile.
///
/// Hold one `GpuDevice` for the lifetime of the application; it is
/// expensive to create (Vulkan instance + device initialization).
///
/// # Field drop order
/// Rust drops struct fields in declaration order (top → bottom).
/// `_instance` is declared last so the `wgpu::Instance` outlives `device`
/// and `queue`. Some Vulkan layers crash when the instance is destroyed
/// while device-level objects still reference it.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub profile: DeviceProfile,
    pub adapter_info: AdapterInfo,
    pub workgroup_size: WorkgroupSize,
    /// Keeps the `wgpu::Instance` alive until `device` and `queue` are
    /// dropped. Never accessed.
    _instance: wgpu::Instance,
}

impl GpuDevice {
    /// Create a `GpuDevice` on the best available Vulkan adapter with
    /// `DeviceProfile::Native` limits.
    ///
    /// # Errors
    /// Returns `Err` if no adapter is found or the device request fails.
    pub fn new() -> Result<Self, GpuError> {
        Self::new_with_profile(DeviceProfile::Native)
    }

    /// Create a `GpuDevice` with an explicit hardware profile.
    pub fn new_with_profile(profile: DeviceProfile) -> Result<Self, GpuError> {
        pollster::block_on(Self::init_async(profile))
    }

    async fn init_async(profile: DeviceProfile) -> Result<Self, GpuError> {
        let flags = if cfg!(debug_assertions) {
            // Validation layer in debug builds for shader error feedback.
            wgpu::InstanceFlags::VALIDATION
                | wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        } else {
            wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN,
            flags,
            ..Default::default()
        });

        // Tiered selection:
        //   DiscreteGpu / IntegratedGpu / VirtualGpu / Other  <- take first
        //   Cpu (llvmpipe)                                     <- last resort
        let mut adapters = instance.enumerate_adapters(wgpu::Backends::VULKAN);
        if adapters.is_empty() {
            return Err(GpuError::NoSuitableAdapter);
        }
        for a in &adapters {
            let info = a.get_info();
            debug!("Vulkan adapter: {} ({:?}, {:?})", info.name, info.backend, info.device_type);
        }

        let index = adapters
            .iter()
            .position(|a| a.get_info().device_type != wgpu::DeviceType::Cpu)
            .unwrap_or(0);
        let adapter = adapters.swap_remove(index);

        let raw_info = adapter.get_info();
        if raw_info.device_type == wgpu::DeviceType::Cpu {
            warn!("only a software adapter is available: {}", raw_info.name);
        }
        let adapter_info = AdapterInfo {
            name: raw_info.name.clone(),
            vendor: raw_info.vendor,
            device: raw_info.device,
            device_type: raw_info.device_type,
            backend: raw_info.backend,
        };

        let limits = limits_for_profile(profile);

        // wgpu 22: the tuple type must be spelled out for the inferencer.
        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("lens-flare"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(GpuError::DeviceRequest)?;

        let workgroup_size = WorkgroupSize::for_profile(profile);
        info!("GPU: {adapter_info}, profile {profile}, workgroup {workgroup_size}");

        Ok(GpuDevice {
            device,
            queue,
            profile,
            adapter_info,
            workgroup_size,
            _instance: instance,
        })
    }

    /// Override the default workgroup size, validating against the active
    /// profile.
    ///
    /// # Errors
    /// `GpuError::WorkgroupTooLarge` if x·y exceeds the profile's
    /// invocation limit.
    pub fn set_workgroup_size(&mut self, x: u32, y: u32) -> Result<(), GpuError> {
        let total = x * y;
        let max = max_invocations_for_profile(self.profile);
        if total == 0 || total > max {
            return Err(GpuError::WorkgroupTooLarge { total, max });
        }
        self.workgroup_size = WorkgroupSize { x, y };
        Ok(())
    }

    /// Dispatch dimensions covering a `img_w`×`img_h` image.
    pub fn dispatch_size(&self, img_w: u32, img_h: u32) -> (u32, u32) {
        self.workgroup_size.dispatch_size(img_w, img_h)
    }

    /// Largest 2D texture side the device was created with.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GpuDevice {{ adapter: {}, profile: {}, workgroup: {} }}",
            self.adapter_info, self.profile, self.workgroup_size
        )
    }
}

// ============================================================
// Limits helpers
// ============================================================

/// Build wgpu limits for the given profile.
fn limits_for_profile(profile: DeviceProfile) -> wgpu::Limits {
    match profile {
        DeviceProfile::Native => wgpu::Limits::default(),
        DeviceProfile::Conservative => wgpu::Limits::downlevel_defaults(),
    }
}

/// Maximum compute invocations per workgroup for the given profile.
fn max_invocations_for_profile(profile: DeviceProfile) -> u32 {
    limits_for_profile(profile).max_compute_invocations_per_workgroup
}

// ============================================================
// Error type
// ============================================================

/// Errors from GPU device initialization and GPU pipeline execution.
#[derive(Error, Debug)]
pub enum GpuError {
    /// No Vulkan adapter at all. Check that a Vulkan driver is installed and
    /// `vulkaninfo` lists a device.
    #[error("no Vulkan adapter found; ensure a Vulkan driver is installed and `vulkaninfo` lists a device")]
    NoSuitableAdapter,

    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("workgroup size {total} is outside the profile limit of 1..={max} invocations")]
    WorkgroupTooLarge { total: u32, max: u32 },

    #[error("buffer map failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("buffer map callback was dropped before it fired")]
    MapCallbackLost,

    #[error(transparent)]
    Flare(#[from] crate::error::FlareError),
}

// ============================================================
// Tests
// ============================================================
