// demos/flare_live.rs
//
// Live view of the CPU lens flare. A bright light follows the mouse over a
// dark scene; ghosts and halo move to the opposite side of the centre.
//
// Usage:
//   cargo run --example flare_live --release
//
// Controls:
//   mouse  — move the light
//   G / H  — more / fewer ghosts
//   Q      — toggle blur quality (original / extended)
//   F      — toggle flare-only output
//   D      — toggle lens dirt
//   Esc    — quit

use lens_flare::convert;
use lens_flare::image::Image;
use lens_flare::texture::{procedural_dirt, procedural_ramp, procedural_star, LensTextures};
use lens_flare::{GaussQuality, LensFlareConfig, LensFlarePipeline};

use glam::Vec4;
use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};
use std::time::Instant;

const FRAME_W: usize = 480;
const FRAME_H: usize = 270;
const SCALE: usize = 2;

fn main() {
    env_logger::init();

    let (win_w, win_h) = (FRAME_W * SCALE, FRAME_H * SCALE);
    let mut window = Window::new(
        "lens-flare — live",
        win_w,
        win_h,
        WindowOptions { resize: false, ..WindowOptions::default() },
    )
    .expect("failed to create window");
    window.set_target_fps(60);

    let textures = LensTextures::new(procedural_dirt(FRAME_W, FRAME_H, 40), procedural_star(256, 6), procedural_ramp())
        .expect("procedural textures are non-empty");

    let mut config = LensFlareConfig::default();
    let mut pipeline = build(&config, &textures);
    let mut fb = vec![0u32; win_w * win_h];
    let mut light = (0.3f32, 0.3f32);
    let mut frames = 0u32;
    let mut fps_clock = Instant::now();

    println!("Controls: mouse=light, G/H=ghosts, Q=quality, F=flare only, D=dirt, Esc=quit");

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let mut changed = false;
        if window.is_key_pressed(Key::G, KeyRepeat::No) {
            config.ghost_count = (config.ghost_count + 1).min(lens_flare::config::MAX_GHOSTS);
            changed = true;
        }
        if window.is_key_pressed(Key::H, KeyRepeat::No) {
            config.ghost_count = config.ghost_count.saturating_sub(1).max(1);
            changed = true;
        }
        if window.is_key_pressed(Key::Q, KeyRepeat::No) {
            config.quality = match config.quality {
                GaussQuality::Original => GaussQuality::Extended,
                GaussQuality::Extended => GaussQuality::Original,
            };
            changed = true;
        }
        if window.is_key_pressed(Key::F, KeyRepeat::No) {
            config.flare_only = !config.flare_only;
            changed = true;
        }
        if window.is_key_pressed(Key::D, KeyRepeat::No) {
            config.dirt_strength = if config.dirt_strength > 0.0 { 0.0 } else { 0.6 };
            changed = true;
        }
        if changed {
            println!(
                "ghosts={} quality={:?} flare_only={} dirt={}",
                config.ghost_count, config.quality, config.flare_only, config.dirt_strength
            );
            pipeline = build(&config, &textures);
        }

        if let Some((mx, my)) = window.get_mouse_pos(MouseMode::Clamp) {
            light = (mx / win_w as f32, my / win_h as f32);
        }

        let src = scene(light);
        let out = pipeline.process(&src).expect("frame matches pipeline resolution");
        blit_scaled(&convert::frame_to_0rgb(out), &mut fb);
        window.update_with_buffer(&fb, win_w, win_h).expect("failed to present frame");

        frames += 1;
        if fps_clock.elapsed().as_secs_f32() >= 2.0 {
            let fps = frames as f32 / fps_clock.elapsed().as_secs_f32();
            window.set_title(&format!("lens-flare — live ({fps:.1} fps)"));
            frames = 0;
            fps_clock = Instant::now();
        }
    }
}

fn build(config: &LensFlareConfig, textures: &LensTextures) -> LensFlarePipeline {
    LensFlarePipeline::new(config.clone(), textures.clone(), FRAME_W, FRAME_H).expect("invalid configuration")
}

/// Dim horizon gradient with one light disc at `light` (UV).
fn scene(light: (f32, f32)) -> Image<Vec4> {
    let (lx, ly) = (light.0 * FRAME_W as f32, light.1 * FRAME_H as f32);
    let mut img = Image::new(FRAME_W, FRAME_H);
    for y in 0..FRAME_H {
        for x in 0..FRAME_W {
            let v = y as f32 / FRAME_H as f32;
            let d = (x as f32 - lx).hypot(y as f32 - ly);
            let c = if d < 6.0 {
                Vec4::ONE
            } else {
                Vec4::new(0.03, 0.04, 0.06 + 0.12 * v, 1.0)
            };
            img.set(x, y, c);
        }
    }
    img
}

/// Nearest-neighbour upscale of a FRAME_W×FRAME_H 0RGB buffer into `fb`.
fn blit_scaled(src: &[u32], fb: &mut [u32]) {
    let win_w = FRAME_W * SCALE;
    for (i, px) in fb.iter_mut().enumerate() {
        let (x, y) = (i % win_w / SCALE, i / win_w / SCALE);
        *px = src[y * FRAME_W + x];
    }
}
