// benches/gpu_benchmarks.rs — GPU pipeline benchmarks.
//
// Mirrors benchmarks.rs structure. Each GPU benchmark has a CPU counterpart
// in the same group for direct comparison.
//
//   cargo bench --bench gpu_benchmarks
//
// Skips itself (with a note on stderr) when no GPU adapter is available.
//
//
// CRITERION + GPU CAVEATS
// ────────────────────────
// Criterion measures wall time including CPU overhead (staging writes,
// submit, poll). GPU shader execution is included in poll(). The
// `dispatch_only` benchmark submits without a readback and waits for the
// queue, which is the cost a host presenting the output texture pays.
//
// The first few iterations pay shader compilation costs on some drivers,
// so warmup_time is set explicitly.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec4;
use std::time::Duration;

use lens_flare::gpu::{DeviceProfile, GpuDevice, GpuLensFlarePipeline};
use lens_flare::image::Image;
use lens_flare::texture::{procedural_dirt, procedural_ramp, procedural_star, LensTextures};
use lens_flare::{LensFlareConfig, LensFlarePipeline};

// ============================================================
// Shared helpers
// ============================================================

fn make_scene(w: usize, h: usize) -> Image<Vec4> {
    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let u = x as f32 / w as f32;
            let v = y as f32 / h as f32;
            let lamp = ((u - 0.3) * w as f32).hypot((v - 0.35) * h as f32) < 8.0;
            let c = if lamp { Vec4::ONE } else { Vec4::new(0.05 + 0.1 * u, 0.06, 0.1 + 0.05 * v, 1.0) };
            img.set(x, y, c);
        }
    }
    img
}

fn make_textures() -> LensTextures {
    LensTextures::new(procedural_dirt(480, 270, 60), procedural_star(256, 6), procedural_ramp())
        .expect("procedural textures are non-empty")
}

fn open_gpu(profile: DeviceProfile) -> Option<GpuDevice> {
    match GpuDevice::new_with_profile(profile) {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("no GPU available ({e}), skipping GPU benchmarks");
            None
        }
    }
}

// ============================================================
// Full pipeline: CPU vs GPU
// ============================================================

fn bench_pipeline(c: &mut Criterion) {
    let Some(gpu) = open_gpu(DeviceProfile::Native) else { return };
    let cfg = LensFlareConfig::default();
    let textures = make_textures();

    let mut group = c.benchmark_group("pipeline");
    group.warm_up_time(Duration::from_secs(2));
    group.sample_size(10);

    for (w, h) in [(640, 360), (1280, 720)] {
        let src = make_scene(w, h);
        let res = format!("{w}x{h}");

        let mut cpu = LensFlarePipeline::new(cfg.clone(), textures.clone(), w, h).expect("valid pipeline");
        group.bench_with_input(BenchmarkId::new("cpu", &res), &src, |b, src| {
            b.iter(|| {
                cpu.process(src).expect("matching resolution");
            })
        });

        let gpu_pipeline = GpuLensFlarePipeline::new(&gpu, &cfg, &textures, w, h).expect("valid GPU pipeline");
        group.bench_with_input(BenchmarkId::new("gpu_with_readback", &res), &src, |b, src| {
            b.iter(|| gpu_pipeline.process(&gpu, src).expect("GPU readback"))
        });

        gpu_pipeline.source_frame().write(&gpu, &src);
        group.bench_function(BenchmarkId::new("gpu_dispatch_only", &res), |b| {
            b.iter(|| {
                let mut encoder = gpu
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("bench") });
                gpu_pipeline.encode(&gpu, &mut encoder);
                gpu.queue.submit(std::iter::once(encoder.finish()));
                gpu.device.poll(wgpu::Maintain::Wait);
            })
        });
    }

    group.finish();
}

// ============================================================
// Workgroup profiles
// ============================================================

fn bench_profiles(c: &mut Criterion) {
    let (w, h) = (1280, 720);
    let cfg = LensFlareConfig::default();
    let textures = make_textures();
    let src = make_scene(w, h);

    let mut group = c.benchmark_group("profile_1280x720");
    group.warm_up_time(Duration::from_secs(2));
    group.sample_size(10);

    for profile in [DeviceProfile::Native, DeviceProfile::Conservative] {
        let Some(gpu) = open_gpu(profile) else { return };
        let pipeline = GpuLensFlarePipeline::new(&gpu, &cfg, &textures, w, h).expect("valid GPU pipeline");
        group.bench_function(format!("{profile:?}"), |b| {
            b.iter(|| pipeline.process(&gpu, &src).expect("GPU readback"))
        });
    }

    group.finish();
}

// ============================================================
// Register
// ============================================================

criterion_group!(benches, bench_pipeline, bench_profiles);
criterion_main!(benches);
