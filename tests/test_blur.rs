// tests/test_blur.rs — Directional, diagonal and cross blurs.

use glam::Vec4;
use lens_flare::blur::{blur_b, blur_h, blur_s, blur_v, BlurParams};
use lens_flare::image::Image;
use lens_flare::kernel::{KERNEL_5, KERNEL_9};

const N: usize = 41;
const C: usize = N / 2;

fn impulse() -> Image<Vec4> {
    let mut img = Image::new(N, N);
    img.set(C, C, Vec4::ONE);
    img
}

fn unit_widths() -> BlurParams {
    BlurParams { table: KERNEL_5, taps: KERNEL_5.len(), horizontal: 1.0, vertical: 1.0, slant: 1.0 }
}

#[test]
fn horizontal_then_vertical_is_separable() {
    // H∘V of an impulse is the outer product of the two 1-D footprints.
    // Each pass point-reflects, so the H footprint shows up mirrored in x
    // after the V pass.
    let p = unit_widths();
    let src = impulse();

    let mut h_only = Image::new(N, N);
    blur_h(&src, &mut h_only, &p);
    let mut v_only = Image::new(N, N);
    blur_v(&src, &mut v_only, &p);

    let mut hv = Image::new(N, N);
    blur_v(&h_only, &mut hv, &p);

    let h = |x: usize| h_only.get(x, C).x;
    let v = |y: usize| v_only.get(C, y).x;

    let mut peak = 0.0f32;
    for y in 0..N {
        for x in 0..N {
            let expect = h(N - 1 - x) * v(y);
            let got = hv.get(x, y).x;
            peak = peak.max(got);
            assert!((got - expect).abs() < 1e-5, "({x},{y}): {got} vs {expect}");
        }
    }
    assert!(peak > 0.0);
}

#[test]
fn footprints_stay_on_their_axis() {
    let p = unit_widths();
    let src = impulse();
    let mut h_only = Image::new(N, N);
    blur_h(&src, &mut h_only, &p);
    for y in 0..N {
        if y == C {
            continue;
        }
        for x in 0..N {
            assert!(h_only.get(x, y).x.abs() < 1e-5, "({x},{y}) leaked");
        }
    }
}

#[test]
fn uniform_frame_gain_of_each_pass() {
    let src = Image::filled(24, 16, Vec4::splat(0.4));
    let mut dst = Image::new(24, 16);
    let p = BlurParams { table: KERNEL_9, taps: KERNEL_9.len(), horizontal: 10.0, vertical: 10.0, slant: 15.0 };
    let check = |img: &Image<Vec4>, gain: f32| {
        img.pixels().all(|(_, _, c)| (c - Vec4::splat(0.4 * gain)).abs().max_element() < 1e-5)
    };

    // Clamp addressing: each tap of a constant frame reads the constant.
    blur_h(&src, &mut dst, &p);
    assert!(check(&dst, KERNEL_9.total_weight()));

    blur_v(&src, &mut dst, &p);
    assert!(check(&dst, KERNEL_9.total_weight()));

    // S and B use four taps per offset and halve the sum.
    blur_s(&src, &mut dst, &p);
    assert!(check(&dst, KERNEL_9.total_weight() - KERNEL_9.weights[0] / 2.0));

    let gain_b = KERNEL_5.total_weight() - KERNEL_5.weights[0] / 2.0;
    blur_b(&src, &mut dst);
    assert!(check(&dst, gain_b));
}

#[test]
fn truncated_taps_narrow_the_footprint() {
    let src = impulse();
    let mut wide = Image::new(N, N);
    let mut narrow = Image::new(N, N);
    blur_h(&src, &mut wide, &unit_widths());
    blur_h(&src, &mut narrow, &BlurParams { taps: 2, ..unit_widths() });
    // Offset 1.43 reaches two texels out; 7.17 reaches eight.
    assert!(narrow.get(C + 3, C).x.abs() < 1e-6);
    assert!(narrow.get(C + 2, C).x > 0.0);
    assert!(wide.get(C + 8, C).x > 0.0);
}

#[test]
fn blur_b_ignores_configured_table() {
    // The final cross blur is fixed to the 5-tap table regardless of quality.
    let src = impulse();
    let mut dst = Image::new(N, N);
    blur_b(&src, &mut dst);
    let centre = dst.get(C, C).x;
    assert!((centre - KERNEL_5.weights[0] * 0.5).abs() < 1e-5, "{centre}");
}
