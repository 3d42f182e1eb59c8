// tests/test_composite.rs — Final blend onto the original frame.

use glam::{Vec2, Vec4};
use lens_flare::composite::{composite_pass, composite_pixel, lens_mod, CompositeParams};
use lens_flare::image::Image;
use lens_flare::texture::{procedural_dirt, procedural_star, LensTextures};

fn pattern(w: usize, h: usize, seed: f32) -> Image<Vec4> {
    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let t = (x * 3 + y * 5) as f32 * 0.01 + seed;
            img.set(x, y, Vec4::new(t, 0.5 * t, 1.0 - t, 0.75));
        }
    }
    img
}

#[test]
fn no_aberration_closed_form() {
    let (w, h) = (10, 6);
    let flare = pattern(w, h, 0.1);
    let orig = pattern(w, h, 0.3);
    let tex = LensTextures::uniform(Vec4::splat(0.2), Vec4::splat(0.05), Vec4::ONE);
    let p = CompositeParams { chromatic_aberration: 0.0, dirt_strength: 0.6, flare_only: false };
    let mut dst = Image::new(w, h);
    composite_pass(&flare, &orig, &tex, &mut dst, &p);

    // lensMod = 0.75 everywhere; factor = 0.75·0.6 + 0.4.
    let factor = 0.75 * 0.6 + 0.4;
    for (x, y, out) in dst.pixels() {
        let (fx, fy) = (w - 1 - x, h - 1 - y);
        let f = flare.get(fx, fy);
        let expect = orig.get(fx, fy) + Vec4::new(f.x, f.y, f.z, 1.0) * factor;
        assert!((out - expect).abs().max_element() < 1e-4, "({x},{y}): {out} vs {expect}");
    }
}

#[test]
fn aberration_shifts_red_and_blue_only() {
    let flare = pattern(32, 32, 0.0);
    let orig = Image::filled(32, 32, Vec4::ZERO);
    let tex = LensTextures::black();
    let coord = Vec2::new(0.2, 0.7);
    let still = CompositeParams { chromatic_aberration: 0.0, dirt_strength: 0.0, flare_only: false };
    let shifted = CompositeParams { chromatic_aberration: 0.05, ..still };
    let a = composite_pixel(&flare, &orig, &tex, coord, &still);
    let b = composite_pixel(&flare, &orig, &tex, coord, &shifted);
    assert_eq!(a.y, b.y);
    assert_ne!(a.x, b.x);
    assert_ne!(a.z, b.z);
}

#[test]
fn aberration_is_invisible_on_a_uniform_flare() {
    let flare = Image::filled(8, 8, Vec4::new(0.3, 0.6, 0.9, 0.0));
    let orig = Image::filled(8, 8, Vec4::splat(0.1));
    let tex = LensTextures::black();
    let p = CompositeParams { chromatic_aberration: 0.2, dirt_strength: 0.0, flare_only: false };
    let out = composite_pixel(&flare, &orig, &tex, Vec2::new(0.9, 0.1), &p);
    let expect = Vec4::new(0.4, 0.7, 1.0, 1.1);
    assert!((out - expect).abs().max_element() < 1e-5, "{out}");
}

#[test]
fn zero_dirt_strength_ignores_textures() {
    let flare = pattern(16, 9, 0.2);
    let orig = pattern(16, 9, 0.0);
    let dirty = LensTextures::new(procedural_dirt(64, 36, 12), procedural_star(32, 6), Image::filled(1, 1, Vec4::ONE))
        .expect("non-empty textures");
    let p = CompositeParams { chromatic_aberration: 0.01, dirt_strength: 0.0, flare_only: false };
    let mut a = Image::new(16, 9);
    let mut b = Image::new(16, 9);
    composite_pass(&flare, &orig, &dirty, &mut a, &p);
    composite_pass(&flare, &orig, &LensTextures::black(), &mut b, &p);
    assert_eq!(a, b);
}

#[test]
fn lens_mod_adds_half() {
    let tex = LensTextures::uniform(Vec4::splat(0.1), Vec4::splat(0.2), Vec4::ZERO);
    let m = lens_mod(&tex, Vec2::new(0.4, 0.4));
    assert!((m - Vec4::splat(0.8)).abs().max_element() < 1e-6);
}

#[test]
fn flare_only_output_is_the_overlay() {
    let flare = Image::filled(4, 4, Vec4::new(0.5, 0.25, 0.125, 0.0));
    let orig = Image::filled(4, 4, Vec4::ONE);
    let tex = LensTextures::black();
    let p = CompositeParams { chromatic_aberration: 0.0, dirt_strength: 0.0, flare_only: true };
    let out = composite_pixel(&flare, &orig, &tex, Vec2::splat(0.25), &p);
    assert_eq!(out, Vec4::new(0.5, 0.25, 0.125, 1.0));
}
