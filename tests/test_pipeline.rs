// tests/test_pipeline.rs — End-to-end behaviour of the eight-pass pipeline.

use glam::Vec4;
use lens_flare::image::Image;
use lens_flare::pipeline::{Buffer, Pass, MAX_DIMENSION};
use lens_flare::texture::{procedural_dirt, procedural_ramp, procedural_star};
use lens_flare::{ConfigError, FlareError, LensFlareConfig, LensFlarePipeline, LensTextures};

const W: usize = 48;
const H: usize = 27;

/// Dim gradient with one bright disc in the upper-left quadrant.
fn scene(w: usize, h: usize) -> Image<Vec4> {
    let (cx, cy) = (w as f32 * 0.25, h as f32 * 0.3);
    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            let base = 0.1 + 0.2 * x as f32 / w as f32;
            let v = if d < 3.0 { 1.0 } else { base };
            img.set(x, y, Vec4::new(v, v, v * 0.9, 1.0));
        }
    }
    img
}

fn textures() -> LensTextures {
    LensTextures::new(procedural_dirt(96, 54, 20), procedural_star(64, 6), procedural_ramp())
        .expect("procedural textures are non-empty")
}

#[test]
fn pass_order_and_routing() {
    let p = LensFlarePipeline::new(LensFlareConfig::default(), LensTextures::black(), W, H).unwrap();
    let order: Vec<Pass> = p.passes().iter().map(|r| r.pass).collect();
    assert_eq!(
        order,
        vec![
            Pass::PassThrough,
            Pass::Threshold,
            Pass::FlareGeneration,
            Pass::BlurH,
            Pass::BlurV,
            Pass::BlurS,
            Pass::BlurB,
            Pass::Composite,
        ]
    );
    assert_eq!(p.passes()[0].reads, vec![Buffer::Source]);
    assert_eq!(p.passes()[1].reads, vec![Buffer::Source]);
    for route in p.passes() {
        assert!(!route.reads.contains(&route.write), "{route:?}");
    }
}

#[test]
fn black_frame_gives_black_rgb() {
    let cfg = LensFlareConfig { dirt_strength: 0.0, ..Default::default() };
    let mut p = LensFlarePipeline::new(cfg, LensTextures::black(), W, H).unwrap();
    let out = p.process(&Image::new(W, H)).unwrap();
    for (x, y, c) in out.pixels() {
        assert!(c.is_finite(), "({x},{y}) not finite: {c}");
        assert_eq!(c.truncate(), glam::Vec3::ZERO, "({x},{y})");
    }
}

#[test]
fn frame_below_threshold_comes_out_upright() {
    // Zero-width knee at full scale: nothing below 1.0 reaches the flare
    // chain, so the output RGB is the original flipped twice.
    let cfg = LensFlareConfig { threshold: 255.0, threshold_knee: 0.0, ..Default::default() };
    let src = Image::from_vec(
        W,
        H,
        (0..W * H).map(|i| Vec4::new((i % W) as f32 / W as f32 * 0.9, (i / W) as f32 / H as f32 * 0.9, 0.3, 1.0)).collect(),
    );
    let mut p = LensFlarePipeline::new(cfg, textures(), W, H).unwrap();
    let out = p.process(&src).unwrap();
    for (x, y, c) in out.pixels() {
        let expect = src.get(x, y).truncate();
        assert!((c.truncate() - expect).abs().max_element() < 1e-4, "({x},{y}): {c} vs {expect}");
    }
}

#[test]
fn bright_source_adds_flare() {
    let src = scene(W, H);
    let mut p = LensFlarePipeline::new(LensFlareConfig::default(), textures(), W, H).unwrap();
    let out = p.process(&src).unwrap();
    let energy: f32 = out
        .pixels()
        .map(|(x, y, c)| (c.truncate() - src.get(x, y).truncate()).abs().max_element())
        .sum();
    assert!(energy > 0.1, "flare energy {energy}");
}

#[test]
fn process_is_repeatable() {
    let a = scene(W, H);
    let b = Image::filled(W, H, Vec4::splat(0.95));
    let mut p = LensFlarePipeline::new(LensFlareConfig::default(), textures(), W, H).unwrap();

    let first = p.process(&a).unwrap().clone();
    p.process(&b).unwrap();
    let third = p.process(&a).unwrap().clone();
    assert_eq!(first, third);

    let mut fresh = LensFlarePipeline::new(LensFlareConfig::default(), textures(), W, H).unwrap();
    assert_eq!(fresh.process(&a).unwrap(), &first);
}

#[test]
fn padded_source_matches_compact_source() {
    let compact = scene(W, H);
    let stride = W + 5;
    let mut data = vec![Vec4::splat(7.0); stride * H];
    for y in 0..H {
        data[y * stride..y * stride + W].copy_from_slice(compact.row(y));
    }
    let padded = Image::from_vec_with_stride(W, H, stride, data);

    let mut p = LensFlarePipeline::new(LensFlareConfig::default(), textures(), W, H).unwrap();
    let expect = p.process(&compact).unwrap().clone();
    assert_eq!(p.process(&padded).unwrap(), &expect);
}

#[test]
fn extreme_but_valid_config_stays_finite() {
    // Every tunable at the edge of its accepted range.
    let cfg = LensFlareConfig {
        ghost_count: lens_flare::config::MAX_GHOSTS,
        blur_strength: 1.0,
        halo_strength: 1.0,
        dirt_strength: 1.0,
        chromatic_aberration: lens_flare::config::MAX_CHROMATIC_ABERRATION,
        threshold: 0.0,
        threshold_knee: 255.0,
        vibrance: -50.0,
        vibrance_balance: [10.0, -10.0, 10.0],
        lens_color_level: 1.0,
        blur_width: lens_flare::BlurWidth {
            horizontal: lens_flare::config::MAX_BLUR_WIDTH,
            vertical: lens_flare::config::MAX_BLUR_WIDTH,
            slant: lens_flare::config::MAX_BLUR_WIDTH,
        },
        ..Default::default()
    };
    let mut p = LensFlarePipeline::new(cfg, textures(), W, H).unwrap();
    let out = p.process(&scene(W, H)).unwrap();
    assert!(out.pixels().all(|(_, _, c)| c.is_finite()));
}

#[test]
fn oversized_tunables_fail_before_processing() {
    let mut cfg = LensFlareConfig::default();
    cfg.blur_width.horizontal = 1e38;
    let r = LensFlarePipeline::new(cfg, LensTextures::black(), W, H);
    assert!(matches!(
        r,
        Err(FlareError::Config(ConfigError::OutOfRange { field: "blur_width.horizontal", .. }))
    ));

    let cfg = LensFlareConfig { chromatic_aberration: 3e38, ..Default::default() };
    let r = LensFlarePipeline::new(cfg, LensTextures::black(), W, H);
    assert!(matches!(
        r,
        Err(FlareError::Config(ConfigError::OutOfRange { field: "chromatic_aberration", .. }))
    ));
}

#[test]
fn flare_only_on_dark_frame_is_black_rgb() {
    let cfg = LensFlareConfig { flare_only: true, ..Default::default() };
    let mut p = LensFlarePipeline::new(cfg, textures(), W, H).unwrap();
    let out = p.process(&Image::filled(W, H, Vec4::new(0.2, 0.2, 0.2, 1.0))).unwrap();
    assert!(out.pixels().all(|(_, _, c)| c.truncate() == glam::Vec3::ZERO));
}

#[test]
fn resolution_mismatch_runs_nothing() {
    let mut p = LensFlarePipeline::new(LensFlareConfig::default(), LensTextures::black(), W, H).unwrap();
    let err = p.process(&Image::new(W + 1, H)).unwrap_err();
    assert!(matches!(
        err,
        FlareError::ResolutionMismatch { width: W, height: H, got_width: 49, got_height: H }
    ));
    assert!(p.output().pixels().all(|(_, _, c)| c == Vec4::ZERO));
}

#[test]
fn unsupported_resolutions_rejected() {
    for (w, h) in [(0, 10), (10, 0), (MAX_DIMENSION + 1, 1)] {
        let r = LensFlarePipeline::new(LensFlareConfig::default(), LensTextures::black(), w, h);
        assert!(matches!(r, Err(FlareError::UnsupportedResolution { .. })), "{w}×{h}");
    }
}

#[test]
fn invalid_config_rejected() {
    let cfg = LensFlareConfig { ghost_count: 0, ..Default::default() };
    let r = LensFlarePipeline::new(cfg, LensTextures::black(), W, H);
    assert!(matches!(r, Err(FlareError::Config(ConfigError::ZeroGhosts))));
}

#[test]
fn json_config_drives_pipeline() {
    let cfg = LensFlareConfig::from_json_str(
        r#"{ "ghost_count": 3, "quality": "original", "blur_taps": 3, "blur_width": { "horizontal": 4.0, "vertical": 4.0, "slant": 6.0 } }"#,
    )
    .unwrap();
    let mut p = LensFlarePipeline::new(cfg, textures(), W, H).unwrap();
    assert_eq!(p.config().effective_taps(), 3);
    let out = p.process(&scene(W, H)).unwrap();
    assert!(out.pixels().all(|(_, _, c)| c.is_finite()));
}

#[test]
fn unknown_json_field_rejected() {
    let r = LensFlareConfig::from_json_str(r#"{ "ghosts": 3 }"#);
    assert!(matches!(r, Err(FlareError::ConfigParse(_))));
}
