// gpu/pipeline.rs — The eight lens-flare passes as wgpu compute dispatches.
//
// Mirrors `pipeline::LensFlarePipeline` pass for pass. The physical routing
// comes from the same `resolve_routes(&PASS_GRAPH)`, so the ping-pong
// assignment of WorkA / WorkB is identical on both paths.
//
//   process(source)
//     │
//     ├─ write source → Source texture            (staging copy)
//     ├─ encoder:
//     │    pass_through  Source       → OriginalCopy
//     │    threshold     Source       → WorkA
//     │    flare         WorkA (+ramp) → WorkB
//     │    blur_h/v/s/b  ping-pong …  → WorkB
//     │    composite     WorkB + OriginalCopy (+dirt, star) → Output
//     ├─ submit
//     └─ readback Output → Image<Vec4>
//
// Each pass is its own compute pass inside one command encoder. wgpu tracks
// the storage-write → sampled-read transition of every texture between
// passes and inserts the barrier, which is the full-frame dependency the
// passes need.
//
// PIPELINE LIFETIME
// ─────────────────
// Shader compilation, texture allocation and bind group creation all happen
// in `new`. `process` only uploads, encodes eight dispatches, and reads back.
//
// NEW WGPU / RUST CONCEPTS
// ─────────────────────────
// - One shader module, many entry points: each `ComputePipeline` picks its
//   entry point by name but they all share one explicit `BindGroupLayout`.
//   A binding an entry point never touches is still legal in the layout.
// - `#[repr(C)]` + `bytemuck::Pod` uniform: the Rust struct is uploaded as
//   raw bytes and must match the WGSL struct's std140-like layout.

use glam::Vec4;
use log::debug;
use wgpu::util::DeviceExt;

use crate::blur::BlurParams;
use crate::composite::CompositeParams;
use crate::config::LensFlareConfig;
use crate::error::FlareError;
use crate::flare::FlareParams;
use crate::gpu::device::{GpuDevice, GpuError};
use crate::gpu::image::GpuFrame;
use crate::image::Image;
use crate::kernel::{KernelTable, KERNEL_5};
use crate::pipeline::{check_resolution, resolve_routes, Buffer, PassRoute, PASS_GRAPH};
use crate::texture::LensTextures;
use crate::threshold::ThresholdParams;
use crate::vertex::rotation;

// ---------------------------------------------------------------------------
// Uniforms (must match `Params` in lensflare.wgsl exactly)
// ---------------------------------------------------------------------------

/// Layout:
///   offset   0: size (2×u32), ghost_count, taps
///   offset  16: rotation (2×f32), lo, hi
///   offset  32: vibrance   (vec4)
///   offset  48: strengths  (vec4: blur, halo, lens color level, dirt)
///   offset  64: widths     (vec4: h, v, s, chromatic aberration)
///   offset  80: flags      (vec4<u32>: flare_only)
///   offset  96: offsets     3 × vec4
///   offset 144: weights     3 × vec4
///   offset 192: box_offsets 2 × vec4
///   offset 224: box_weights 2 × vec4
///   total: 256 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct FlareUniforms {
    size: [u32; 2],
    ghost_count: u32,
    taps: u32,
    rotation: [f32; 2],
    lo: f32,
    hi: f32,
    vibrance: [f32; 4],
    strengths: [f32; 4],
    widths: [f32; 4],
    flags: [u32; 4],
    offsets: [[f32; 4]; 3],
    weights: [[f32; 4]; 3],
    box_offsets: [[f32; 4]; 2],
    box_weights: [[f32; 4]; 2],
}

/// Spread a table column over vec4 slots: `out[i / 4][i % 4] = values[i]`.
fn pack<const N: usize>(values: &[f32]) -> [[f32; 4]; N] {
    let mut out = [[0.0f32; 4]; N];
    for (i, &v) in values.iter().take(N * 4).enumerate() {
        out[i / 4][i % 4] = v;
    }
    out
}

impl FlareUniforms {
    fn new(config: &LensFlareConfig, width: u32, height: u32) -> Self {
        let t = ThresholdParams::from_config(config);
        let f = FlareParams::from_config(config);
        let b = BlurParams::from_config(config);
        let c = CompositeParams::from_config(config);
        let table: KernelTable = b.table;
        let (cos, sin) = rotation();

        FlareUniforms {
            size: [width, height],
            ghost_count: f.ghost_count,
            taps: b.taps as u32,
            rotation: [cos, sin],
            lo: t.lo,
            hi: t.hi,
            vibrance: t.vibrance.extend(0.0).to_array(),
            strengths: [f.blur_strength, f.halo_strength, f.lens_color_level, c.dirt_strength],
            widths: [b.horizontal, b.vertical, b.slant, c.chromatic_aberration],
            flags: [c.flare_only as u32, 0, 0, 0],
            offsets: pack(table.offsets),
            weights: pack(table.weights),
            box_offsets: pack(KERNEL_5.offsets),
            box_weights: pack(KERNEL_5.weights),
        }
    }
}

// ---------------------------------------------------------------------------
// GpuLensFlarePipeline
// ---------------------------------------------------------------------------

/// Index of a physical buffer in the pipeline's frame table.
fn frame_index(b: Buffer) -> usize {
    match b {
        Buffer::Source => 0,
        Buffer::OriginalCopy => 1,
        Buffer::WorkA => 2,
        Buffer::WorkB => 3,
        Buffer::Output => 4,
    }
}

/// One resolved pass, ready to dispatch.
struct GpuPass {
    route: PassRoute,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
}

/// Compiled GPU lens-flare pipeline for one frame resolution.
pub struct GpuLensFlarePipeline {
    passes: Vec<GpuPass>,
    /// Source, OriginalCopy, WorkA, WorkB, Output.
    frames: Vec<GpuFrame>,
    // Bind groups keep these alive; held so they are not dropped early.
    _lookup: [GpuFrame; 3],
    _params: wgpu::Buffer,
    width: u32,
    height: u32,
}

impl GpuLensFlarePipeline {
    /// Compile the shader, allocate every frame, upload the lookup
    /// textures, and pre-build one bind group per pass.
    ///
    /// # Errors
    /// `GpuError::Flare` for an invalid configuration or a resolution that
    /// is zero or above the device's texture limit.
    pub fn new(
        gpu: &GpuDevice,
        config: &LensFlareConfig,
        textures: &LensTextures,
        width: usize,
        height: usize,
    ) -> Result<Self, GpuError> {
        config.validate().map_err(FlareError::from)?;
        check_resolution(width, height)?;
        let max = gpu.max_texture_dimension() as usize;
        if width > max || height > max {
            return Err(FlareError::UnsupportedResolution { width, height, max }.into());
        }
        let routes = resolve_routes(&PASS_GRAPH)?;
        let (w, h) = (width as u32, height as u32);

        let shader_src = gpu.workgroup_size.specialize(include_str!("../shaders/lensflare.wgsl"));
        let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lensflare.wgsl"),
            source: wgpu::ShaderSource::Wgsl(shader_src.into()),
        });

        let bgl = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("GpuLensFlare BGL"),
            entries: &[
                // 0 input, 1 original, 2 dirt, 3 star, 4 ramp
                texture_entry(0),
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                texture_entry(4),
                // 5 output (storage write)
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba32Float,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                // 6 params uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 6,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("GpuLensFlare pipeline layout"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });

        let uniforms = FlareUniforms::new(config, w, h);
        let params = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("FlareUniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let frames: Vec<GpuFrame> = ["source", "original copy", "work A", "work B", "output"]
            .iter()
            .map(|label| GpuFrame::new(&gpu.device, w, h, label))
            .collect();
        let lookup = [
            GpuFrame::upload(gpu, textures.dirt(), "dirt"),
            GpuFrame::upload(gpu, textures.star(), "star"),
            GpuFrame::upload(gpu, textures.ramp(), "ramp"),
        ];

        let mut passes = Vec::with_capacity(routes.len());
        for route in routes {
            let pipeline = gpu.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(route.pass.name()),
                layout: Some(&layout),
                module: &shader,
                entry_point: route.pass.name(),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });

            let input = &frames[frame_index(route.reads[0])];
            // Passes without a second frame input bind Source, which no
            // pass ever writes, so it never aliases the storage output.
            let second = &frames[frame_index(route.reads.get(1).copied().unwrap_or(Buffer::Source))];
            let output = &frames[frame_index(route.write)];

            let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(route.pass.name()),
                layout: &bgl,
                entries: &[
                    view_entry(0, &input.view),
                    view_entry(1, &second.view),
                    view_entry(2, &lookup[0].view),
                    view_entry(3, &lookup[1].view),
                    view_entry(4, &lookup[2].view),
                    view_entry(5, &output.view),
                    wgpu::BindGroupEntry { binding: 6, resource: params.as_entire_binding() },
                ],
            });
            passes.push(GpuPass { route, pipeline, bind_group });
        }

        debug!(
            "GPU lens flare pipeline {width}×{height}, workgroup {}, {} passes",
            gpu.workgroup_size,
            passes.len()
        );

        Ok(GpuLensFlarePipeline {
            passes,
            frames,
            _lookup: lookup,
            _params: params,
            width: w,
            height: h,
        })
    }

    /// Resolved physical routing, in execution order.
    pub fn passes(&self) -> impl Iterator<Item = &PassRoute> + '_ {
        self.passes.iter().map(|p| &p.route)
    }

    /// Encode all eight passes into `encoder`, reading whatever the Source
    /// frame currently holds. For hosts that chain their own GPU work.
    pub fn encode(&self, gpu: &GpuDevice, encoder: &mut wgpu::CommandEncoder) {
        let (dx, dy) = gpu.dispatch_size(self.width, self.height);
        for p in &self.passes {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(p.route.pass.name()),
                timestamp_writes: None,
            });
            pass.set_pipeline(&p.pipeline);
            pass.set_bind_group(0, &p.bind_group, &[]);
            pass.dispatch_workgroups(dx, dy, 1);
        }
    }

    /// Upload `source`, run all passes, and read the output back.
    ///
    /// # Errors
    /// - `GpuError::Flare(ResolutionMismatch)` if `source` is the wrong size;
    ///   nothing is submitted in that case.
    /// - `GpuError::BufferMap` if the readback fails.
    pub fn process(&self, gpu: &GpuDevice, source: &Image<Vec4>) -> Result<Image<Vec4>, GpuError> {
        if (source.width() as u32, source.height() as u32) != (self.width, self.height) {
            return Err(FlareError::ResolutionMismatch {
                width: self.width as usize,
                height: self.height as usize,
                got_width: source.width(),
                got_height: source.height(),
            }
            .into());
        }

        self.frames[frame_index(Buffer::Source)].write(gpu, source);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("GpuLensFlare::process") });
        self.encode(gpu, &mut encoder);
        gpu.queue.submit(std::iter::once(encoder.finish()));

        self.output_frame().readback(gpu)
    }

    /// The output texture, for hosts that present it without a readback.
    pub fn output_frame(&self) -> &GpuFrame {
        &self.frames[frame_index(Buffer::Output)]
    }

    /// The source texture `encode` reads from.
    pub fn source_frame(&self) -> &GpuFrame {
        &self.frames[frame_index(Buffer::Source)]
    }

    /// Pass names in dispatch order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.route.pass.name()).collect()
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
        },
        count: None,
    }
}

fn view_entry(binding: u32, view: &wgpu::TextureView) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry { binding, resource: wgpu::BindingResource::TextureView(view) }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{GaussQuality, KERNEL_9};
    use crate::pipeline::LensFlarePipeline;
    use crate::texture::{procedural_dirt, procedural_ramp, procedural_star};

    #[test]
    fn test_uniform_layout_size() {
        assert_eq!(std::mem::size_of::<FlareUniforms>(), 256);
    }

    #[test]
    fn test_pack_tables() {
        let w: [[f32; 4]; 3] = pack(KERNEL_9.weights);
        assert_eq!(w[0][0], KERNEL_9.weights[0]);
        assert_eq!(w[2][0], KERNEL_9.weights[8]);
        assert_eq!(w[2][1], 0.0);
    }

    #[test]
    fn test_uniforms_from_config() {
        let cfg = LensFlareConfig {
            quality: GaussQuality::Original,
            blur_taps: Some(4),
            flare_only: true,
            ..Default::default()
        };
        let u = FlareUniforms::new(&cfg, 640, 360);
        assert_eq!(u.size, [640, 360]);
        assert_eq!(u.taps, 4);
        assert_eq!(u.ghost_count, 8);
        assert_eq!(u.flags[0], 1);
        assert_eq!(u.offsets[1][0], KERNEL_5.offsets[4]);
        assert_eq!(u.vibrance, [10.0, 10.0, 15.0, 0.0]);
    }

    // ---- GPU integration tests (subprocess isolation) -----------------------

    fn run_gpu_test_in_subprocess(test_name: &str) -> String {
        let output = std::process::Command::new("cargo")
            .args(["test", "--lib", "--", test_name, "--exact", "--ignored", "--nocapture"])
            .output()
            .unwrap_or_else(|e| panic!("failed to spawn subprocess for {test_name}: {e}"));
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        print!("{stdout}");
        eprint!("{stderr}");
        stdout + &stderr
    }

    fn test_frame(w: usize, h: usize) -> Image<Vec4> {
        let mut img = Image::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let fx = x as f32 / w as f32;
                let fy = y as f32 / h as f32;
                // A bright spot on a dim gradient.
                let spot = (-((fx - 0.3).powi(2) + (fy - 0.35).powi(2)) * 200.0).exp();
                img.set(x, y, Vec4::new(0.2 * fx + spot, 0.1 + spot, 0.3 * fy + spot, 1.0));
            }
        }
        img
    }

    #[test]
    #[ignore = "GPU integration: run via outer subprocess wrapper"]
    fn inner_gpu_matches_cpu() {
        let (w, h) = (96, 64);
        let cfg = LensFlareConfig { threshold: 180.0, ..Default::default() };
        let textures = LensTextures::new(
            procedural_dirt(64, 36, 20),
            procedural_star(32, 6),
            procedural_ramp(),
        )
        .unwrap();
        let src = test_frame(w, h);

        let mut cpu = LensFlarePipeline::new(cfg.clone(), textures.clone(), w, h).unwrap();
        let expect = cpu.process(&src).unwrap().clone();

        let gpu = GpuDevice::new().expect("need Vulkan GPU");
        let pipeline = GpuLensFlarePipeline::new(&gpu, &cfg, &textures, w, h).unwrap();
        let got = pipeline.process(&gpu, &src).unwrap();

        let max_err = expect
            .pixels()
            .map(|(x, y, e)| (e - got.get(x, y)).abs().max_element())
            .fold(0.0f32, f32::max);
        eprintln!("[test] max |gpu - cpu| = {max_err:e}");
        assert!(max_err <= 1e-3, "GPU diverges from CPU by {max_err}");
        println!("GPU_TEST_OK");
    }

    #[test]
    #[ignore = "GPU integration: run via outer subprocess wrapper"]
    fn inner_gpu_resolution_mismatch() {
        let gpu = GpuDevice::new().expect("need Vulkan GPU");
        let pipeline =
            GpuLensFlarePipeline::new(&gpu, &LensFlareConfig::default(), &LensTextures::black(), 16, 16)
                .unwrap();
        let err = pipeline.process(&gpu, &Image::new(8, 16)).unwrap_err();
        assert!(matches!(err, GpuError::Flare(FlareError::ResolutionMismatch { .. })));
        assert_eq!(pipeline.pass_names().len(), 8);
        println!("GPU_TEST_OK");
    }

    #[test]
    #[ignore = "requires a real Vulkan GPU"]
    fn test_gpu_matches_cpu() {
        let out = run_gpu_test_in_subprocess("gpu::pipeline::tests::inner_gpu_matches_cpu");
        assert!(out.contains("GPU_TEST_OK"), "inner test failed:\n{out}");
    }

    #[test]
    #[ignore = "requires a real Vulkan GPU"]
    fn test_gpu_resolution_mismatch() {
        let out = run_gpu_test_in_subprocess("gpu::pipeline::tests::inner_gpu_resolution_mismatch");
        assert!(out.contains("GPU_TEST_OK"), "inner test failed:\n{out}");
    }
}
