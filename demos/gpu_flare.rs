// demos/gpu_flare.rs — CPU vs GPU lens flare on the same frame.
//
// Runs both pipelines, prints the timings and the largest per-channel
// difference, and writes both results as PNGs.
//
// USAGE
//   cargo run --example gpu_flare --release
//   cargo run --example gpu_flare --release -- path/to/image.png
//   cargo run --example gpu_flare --release -- path/to/image.png --conservative

use std::env;
use std::fs;
use std::time::Instant;

use glam::Vec4;
use lens_flare::convert;
use lens_flare::gpu::{DeviceProfile, GpuDevice, GpuLensFlarePipeline};
use lens_flare::image::Image;
use lens_flare::texture::{procedural_dirt, procedural_ramp, procedural_star, LensTextures};
use lens_flare::{LensFlareConfig, LensFlarePipeline};

const RUNS: u32 = 10;

fn main() {
    env_logger::init();
    fs::create_dir_all("vis_output").expect("failed to create vis_output/");

    let args: Vec<String> = env::args().skip(1).collect();
    let profile = if args.iter().any(|a| a == "--conservative") {
        DeviceProfile::Conservative
    } else {
        DeviceProfile::Native
    };
    let src = match args.iter().find(|a| !a.starts_with("--")) {
        Some(path) => {
            let rgba = image::open(path).unwrap_or_else(|e| panic!("cannot open {path}: {e}")).to_rgba8();
            convert::rgba8_to_frame(rgba.width() as usize, rgba.height() as usize, rgba.as_raw())
        }
        None => lamp_scene(1280, 720),
    };
    let (w, h) = src.dimensions();

    println!("Initialising GPU ({profile:?})...");
    let gpu = GpuDevice::new_with_profile(profile).expect("failed to initialise a GPU");
    println!("Adapter: {}", gpu.adapter_info);

    let config = LensFlareConfig::default();
    let textures = LensTextures::new(procedural_dirt(w, h, 80), procedural_star(256, 6), procedural_ramp())
        .expect("procedural textures are non-empty");

    let mut cpu = LensFlarePipeline::new(config.clone(), textures.clone(), w, h).expect("CPU pipeline");
    let gpu_pipeline = GpuLensFlarePipeline::new(&gpu, &config, &textures, w, h).expect("GPU pipeline");
    println!("Passes: {}", gpu_pipeline.pass_names().join(" → "));

    // Warm-up: first dispatch pays for shader compilation on some drivers.
    gpu_pipeline.process(&gpu, &src).expect("GPU warm-up");

    let t0 = Instant::now();
    for _ in 0..RUNS {
        cpu.process(&src).expect("CPU process");
    }
    let cpu_time = t0.elapsed() / RUNS;

    let t1 = Instant::now();
    let mut gpu_out = Image::new(w, h);
    for _ in 0..RUNS {
        gpu_out = gpu_pipeline.process(&gpu, &src).expect("GPU process");
    }
    let gpu_time = t1.elapsed() / RUNS;

    let cpu_out = cpu.output();
    let max_err = cpu_out
        .pixels()
        .map(|(x, y, c)| (c - gpu_out.get(x, y)).abs().max_element())
        .fold(0.0f32, f32::max);

    println!("{w}×{h}: CPU {cpu_time:?}/frame, GPU {gpu_time:?}/frame (with readback)");
    println!("max |CPU − GPU| = {max_err:.2e}");

    save(cpu_out, "vis_output/gpu_flare_cpu.png");
    save(&gpu_out, "vis_output/gpu_flare_gpu.png");
}

fn save(frame: &Image<Vec4>, path: &str) {
    let (w, h) = frame.dimensions();
    image::RgbaImage::from_raw(w as u32, h as u32, convert::frame_to_rgba8(frame))
        .expect("buffer matches dimensions")
        .save(path)
        .unwrap_or_else(|e| panic!("cannot write {path}: {e}"));
    println!("Wrote {path}");
}

fn lamp_scene(w: usize, h: usize) -> Image<Vec4> {
    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let u = x as f32 / w as f32;
            let v = y as f32 / h as f32;
            let lamp = ((u - 0.25) * w as f32).hypot((v - 0.3) * h as f32) < 10.0;
            let c = if lamp { Vec4::ONE } else { Vec4::new(0.04, 0.05 + 0.05 * u, 0.1 * (1.0 - v) + 0.03, 1.0) };
            img.set(x, y, c);
        }
    }
    img
}
