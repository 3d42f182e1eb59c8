// demos/flare_png.rs — Apply the lens flare to a still image.
//
// USAGE
//   cargo run --example flare_png --release
//   cargo run --example flare_png --release -- in.png
//   cargo run --example flare_png --release -- in.png out.png flare.json
//
// Without an input a synthetic night scene is rendered. The optional JSON
// file may set any subset of the configuration fields; the rest keep their
// defaults. Run with RUST_LOG=debug for per-pass timings.

use std::env;
use std::fs;
use std::time::Instant;

use glam::Vec4;
use lens_flare::convert;
use lens_flare::image::Image;
use lens_flare::texture::{procedural_dirt, procedural_ramp, procedural_star, LensTextures, STAR_SIZE};
use lens_flare::{LensFlareConfig, LensFlarePipeline};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let (src, name) = match args.get(1) {
        Some(path) => {
            let rgba = image::open(path).unwrap_or_else(|e| panic!("cannot open {path}: {e}")).to_rgba8();
            let (w, h) = (rgba.width() as usize, rgba.height() as usize);
            (convert::rgba8_to_frame(w, h, rgba.as_raw()), path.clone())
        }
        None => (night_scene(960, 540), "synthetic scene".to_string()),
    };
    let out_path = args.get(2).cloned().unwrap_or_else(|| "vis_output/flare.png".to_string());

    let config = match args.get(3) {
        Some(path) => LensFlareConfig::from_json_file(path).unwrap_or_else(|e| panic!("{path}: {e}")),
        None => LensFlareConfig::default(),
    };
    println!("Input: {name} ({}×{})", src.width(), src.height());
    println!("Config:\n{}", config.to_json_string().expect("config serializes"));

    let (w, h) = src.dimensions();
    let textures = LensTextures::new(
        procedural_dirt(w, h, 80),
        procedural_star(STAR_SIZE.0 / 4, 6),
        procedural_ramp(),
    )
    .expect("procedural textures are non-empty");

    let t0 = Instant::now();
    let mut pipeline = LensFlarePipeline::new(config, textures, w, h).expect("failed to build pipeline");
    println!("Setup: {:?}", t0.elapsed());

    let t1 = Instant::now();
    let out = pipeline.process(&src).expect("frame matches pipeline resolution");
    println!("Process: {:?}", t1.elapsed());

    if let Some(dir) = std::path::Path::new(&out_path).parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).expect("failed to create output directory");
        }
    }
    let bytes = convert::frame_to_rgba8(out);
    let img = image::RgbaImage::from_raw(w as u32, h as u32, bytes).expect("buffer matches dimensions");
    img.save(&out_path).unwrap_or_else(|e| panic!("cannot write {out_path}: {e}"));
    println!("Wrote {out_path}");
}

/// Dark street with a row of lamps and one bright moon.
fn night_scene(w: usize, h: usize) -> Image<Vec4> {
    let mut lights: Vec<(f32, f32, f32)> = (0..5).map(|i| (0.15 + i as f32 * 0.17, 0.62, 5.0)).collect();
    lights.push((0.78, 0.18, 14.0));

    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let v = y as f32 / h as f32;
            let sky = Vec4::new(0.02, 0.03, 0.08 + 0.1 * (1.0 - v), 1.0);
            let ground = Vec4::new(0.05, 0.05, 0.05, 1.0);
            let mut c = if v > 0.65 { ground } else { sky };
            for &(lx, ly, r) in &lights {
                let d = (x as f32 - lx * w as f32).hypot(y as f32 - ly * h as f32);
                if d < r {
                    c = Vec4::new(1.0, 0.97, 0.88, 1.0);
                }
            }
            img.set(x, y, c);
        }
    }
    img
}
