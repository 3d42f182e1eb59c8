// pipeline.rs — Fixed eight-pass lens-flare pipeline (CPU reference).
//
// PASS GRAPH
// ──────────
//
//   Source ──PassThrough──────────────────────────────► OriginalCopy ─┐
//     │                                                                │
//     └──Threshold──► W ──Flare──► W ──H──► W ──V──► W ──S──► W ──B──► W ──Composite──► Output
//                          ▲                                           ▲      ▲
//                        ramp                                    dirt, star   OriginalCopy
//
// "W" is the logical Working target. Physically it is a ping-pong pair
// (WorkA / WorkB): every pass that reads Working writes the other half, so
// no pass ever reads the buffer it is writing. The physical routing is
// resolved once at construction from `PASS_GRAPH` and checked there:
//
//   - every read of Working has an earlier writer
//   - no pass writes a buffer it reads
//   - Source is never written, Output is written exactly once, last
//
// All targets are allocated at construction at the source resolution and
// reused by every `process` call. Nothing carries over between calls
// except those allocations.
//
// ORIENTATION
// ───────────
// Each pass reads its input through the π-rotated coordinate from
// `vertex`, i.e. point-reflected. The original copy is flipped twice
// (PassThrough, Composite) and comes out upright; the flare chain is
// flipped an odd number of times, which puts ghosts on the opposite side
// of the centre from the light source.

use std::mem;
use std::time::Instant;

use glam::Vec4;
use log::debug;

use crate::blur::{blur_b, blur_h, blur_s, blur_v, BlurParams};
use crate::composite::{composite_pass, CompositeParams};
use crate::config::LensFlareConfig;
use crate::error::FlareError;
use crate::flare::{flare_pass, FlareParams};
use crate::image::{sample_bilinear, AddressMode, Image};
use crate::texture::LensTextures;
use crate::threshold::{threshold_pass, ThresholdParams};
use crate::vertex::raster;

/// Largest accepted frame side, in pixels.
pub const MAX_DIMENSION: usize = 16384;

// ---------------------------------------------------------------------------
// Logical graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    PassThrough,
    Threshold,
    FlareGeneration,
    BlurH,
    BlurV,
    BlurS,
    BlurB,
    Composite,
}

impl Pass {
    /// Lower-case name used in logs and GPU labels.
    pub fn name(self) -> &'static str {
        match self {
            Pass::PassThrough => "pass_through",
            Pass::Threshold => "threshold",
            Pass::FlareGeneration => "flare",
            Pass::BlurH => "blur_h",
            Pass::BlurV => "blur_v",
            Pass::BlurS => "blur_s",
            Pass::BlurB => "blur_b",
            Pass::Composite => "composite",
        }
    }
}

/// Logical render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// The caller's frame. Read-only.
    Source,
    OriginalCopy,
    /// Ping-pong pair, resolved to `Buffer::WorkA` / `Buffer::WorkB`.
    Working,
    Output,
}

/// One node of the pass graph. Frame inputs only; lookup textures and
/// kernel tables are shared constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSpec {
    pub pass: Pass,
    pub inputs: &'static [Target],
    pub output: Target,
}

/// The fixed pass order. No branching, no skipping.
pub const PASS_GRAPH: [PassSpec; 8] = [
    PassSpec { pass: Pass::PassThrough, inputs: &[Target::Source], output: Target::OriginalCopy },
    PassSpec { pass: Pass::Threshold, inputs: &[Target::Source], output: Target::Working },
    PassSpec { pass: Pass::FlareGeneration, inputs: &[Target::Working], output: Target::Working },
    PassSpec { pass: Pass::BlurH, inputs: &[Target::Working], output: Target::Working },
    PassSpec { pass: Pass::BlurV, inputs: &[Target::Working], output: Target::Working },
    PassSpec { pass: Pass::BlurS, inputs: &[Target::Working], output: Target::Working },
    PassSpec { pass: Pass::BlurB, inputs: &[Target::Working], output: Target::Working },
    PassSpec {
        pass: Pass::Composite,
        inputs: &[Target::Working, Target::OriginalCopy],
        output: Target::Output,
    },
];

// ---------------------------------------------------------------------------
// Physical routing
// ---------------------------------------------------------------------------

/// Physical frame buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Buffer {
    Source,
    OriginalCopy,
    WorkA,
    WorkB,
    Output,
}

impl Buffer {
    /// Slot in the pipeline's owned target table. `Source` is not owned.
    fn slot(self) -> Option<usize> {
        match self {
            Buffer::Source => None,
            Buffer::OriginalCopy => Some(0),
            Buffer::WorkA => Some(1),
            Buffer::WorkB => Some(2),
            Buffer::Output => Some(3),
        }
    }
}

/// A pass with its logical targets resolved to buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRoute {
    pub pass: Pass,
    pub reads: Vec<Buffer>,
    pub write: Buffer,
}

/// Resolve a logical graph into physical routes, checking that it forms a
/// valid read-after-write chain.
///
/// # Errors
/// `FlareError::PassGraph` describing the first violation.
pub fn resolve_routes(graph: &[PassSpec]) -> Result<Vec<PassRoute>, FlareError> {
    let mut routes = Vec::with_capacity(graph.len());
    // Buffer holding the latest Working contents, if any pass wrote one.
    let mut working: Option<Buffer> = None;
    let mut original_written = false;
    let mut output_written = false;

    for (i, spec) in graph.iter().enumerate() {
        let name = spec.pass.name();
        if output_written {
            return Err(FlareError::PassGraph(format!("pass {i} ({name}) runs after Output was written")));
        }

        let mut reads = Vec::with_capacity(spec.inputs.len());
        for &input in spec.inputs {
            let buf = match input {
                Target::Source => Buffer::Source,
                Target::OriginalCopy if original_written => Buffer::OriginalCopy,
                Target::Working => working.ok_or_else(|| {
                    FlareError::PassGraph(format!("pass {i} ({name}) reads Working before any pass wrote it"))
                })?,
                other => {
                    return Err(FlareError::PassGraph(format!(
                        "pass {i} ({name}) reads {other:?} before any pass wrote it"
                    )))
                }
            };
            reads.push(buf);
        }

        let write = match spec.output {
            Target::Source => {
                return Err(FlareError::PassGraph(format!("pass {i} ({name}) writes Source")));
            }
            Target::OriginalCopy => {
                original_written = true;
                Buffer::OriginalCopy
            }
            Target::Working => {
                let next = match working {
                    Some(Buffer::WorkA) => Buffer::WorkB,
                    _ => Buffer::WorkA,
                };
                working = Some(next);
                next
            }
            Target::Output => {
                output_written = true;
                Buffer::Output
            }
        };

        if reads.contains(&write) {
            return Err(FlareError::PassGraph(format!("pass {i} ({name}) reads the buffer it writes ({write:?})")));
        }
        routes.push(PassRoute { pass: spec.pass, reads, write });
    }

    if !output_written {
        return Err(FlareError::PassGraph("no pass writes Output".to_string()));
    }
    Ok(routes)
}

/// Reject zero or oversized frames.
pub fn check_resolution(width: usize, height: usize) -> Result<(), FlareError> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(FlareError::UnsupportedResolution { width, height, max: MAX_DIMENSION });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// LensFlarePipeline
// ---------------------------------------------------------------------------

/// CPU lens-flare pipeline for one frame resolution.
///
/// ```no_run
/// use lens_flare::{LensFlareConfig, LensFlarePipeline, LensTextures};
/// # fn frame() -> lens_flare::image::Image<glam::Vec4> { unimplemented!() }
/// let mut pipeline =
///     LensFlarePipeline::new(LensFlareConfig::default(), LensTextures::black(), 1280, 720)?;
/// let out = pipeline.process(&frame())?;
/// # Ok::<(), lens_flare::FlareError>(())
/// ```
pub struct LensFlarePipeline {
    config: LensFlareConfig,
    textures: LensTextures,
    width: usize,
    height: usize,
    routes: Vec<PassRoute>,
    /// OriginalCopy, WorkA, WorkB, Output.
    targets: [Image<Vec4>; 4],
    threshold: ThresholdParams,
    flare: FlareParams,
    blur: BlurParams,
    composite: CompositeParams,
}

fn frame<'a>(targets: &'a [Image<Vec4>; 4], source: &'a Image<Vec4>, b: Buffer) -> &'a Image<Vec4> {
    match b.slot() {
        Some(s) => &targets[s],
        None => source,
    }
}

impl LensFlarePipeline {
    /// Validate `config`, resolve the pass graph and allocate all targets.
    ///
    /// # Errors
    /// - `FlareError::Config` if the configuration is invalid.
    /// - `FlareError::UnsupportedResolution` for a zero or oversized frame.
    pub fn new(
        config: LensFlareConfig,
        textures: LensTextures,
        width: usize,
        height: usize,
    ) -> Result<Self, FlareError> {
        config.validate()?;
        check_resolution(width, height)?;
        let routes = resolve_routes(&PASS_GRAPH)?;

        debug!(
            "lens flare pipeline {width}×{height}: {} ghosts, {:?} quality, {} taps",
            config.ghost_count,
            config.quality,
            config.effective_taps()
        );

        Ok(LensFlarePipeline {
            threshold: ThresholdParams::from_config(&config),
            flare: FlareParams::from_config(&config),
            blur: BlurParams::from_config(&config),
            composite: CompositeParams::from_config(&config),
            config,
            textures,
            width,
            height,
            routes,
            targets: std::array::from_fn(|_| Image::new(width, height)),
        })
    }

    pub fn config(&self) -> &LensFlareConfig {
        &self.config
    }

    pub fn textures(&self) -> &LensTextures {
        &self.textures
    }

    /// `(width, height)` the pipeline was built for.
    pub fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Resolved physical routing, in execution order.
    pub fn passes(&self) -> &[PassRoute] {
        &self.routes
    }

    /// Result of the last `process` call (black before the first).
    pub fn output(&self) -> &Image<Vec4> {
        &self.targets[3]
    }

    /// Run all eight passes on `source`.
    ///
    /// # Errors
    /// `FlareError::ResolutionMismatch` if `source` is not the constructed
    /// size. No pass runs in that case.
    pub fn process(&mut self, source: &Image<Vec4>) -> Result<&Image<Vec4>, FlareError> {
        if source.dimensions() != (self.width, self.height) {
            return Err(FlareError::ResolutionMismatch {
                width: self.width,
                height: self.height,
                got_width: source.width(),
                got_height: source.height(),
            });
        }

        let t_total = Instant::now();
        for i in 0..self.routes.len() {
            let t0 = Instant::now();
            self.run(i, source);
            debug!("{:>12}: {:?}", self.routes[i].pass.name(), t0.elapsed());
        }
        debug!("{:>12}: {:?}", "total", t_total.elapsed());

        Ok(&self.targets[3])
    }

    fn run(&mut self, index: usize, source: &Image<Vec4>) {
        let route = &self.routes[index];
        let Some(slot) = route.write.slot() else {
            unreachable!("{:?} routed to write Source", route.pass);
        };
        // Move the write target out so the read targets can be borrowed
        // alongside it.
        let mut dst = mem::take(&mut self.targets[slot]);
        let targets = &self.targets;
        let read = |b: Buffer| frame(targets, source, b);

        match route.pass {
            Pass::PassThrough => {
                let src = read(route.reads[0]);
                raster(&mut dst, |coord| sample_bilinear(src, coord, AddressMode::Clamp));
            }
            Pass::Threshold => threshold_pass(read(route.reads[0]), &mut dst, &self.threshold),
            Pass::FlareGeneration => {
                flare_pass(read(route.reads[0]), self.textures.ramp(), &mut dst, &self.flare)
            }
            Pass::BlurH => blur_h(read(route.reads[0]), &mut dst, &self.blur),
            Pass::BlurV => blur_v(read(route.reads[0]), &mut dst, &self.blur),
            Pass::BlurS => blur_s(read(route.reads[0]), &mut dst, &self.blur),
            Pass::BlurB => blur_b(read(route.reads[0]), &mut dst),
            Pass::Composite => composite_pass(
                read(route.reads[0]),
                read(route.reads[1]),
                &self.textures,
                &mut dst,
                &self.composite,
            ),
        }

        self.targets[slot] = dst;
    }
}
