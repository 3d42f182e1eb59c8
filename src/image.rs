// image.rs — Runtime-sized frame container, generic over pixel type.
//
// Every pass of the flare pipeline reads one or more `Image<Vec4>` frames
// and writes exactly one. Lookup textures (dirt, star, ramp) are the same
// type, so a single bilinear sampling primitive serves all of them.
//
// SAMPLING CONVENTION
// ───────────────────
// Coordinates are normalized UV in [0,1]², texel centres at (i + 0.5)/size.
// This is the GPU convention: a UV of exactly (i + 0.5)/size returns texel
// i untouched, and anything in between blends the four nearest texels.
//
//   texel space:  p = uv * size - 0.5
//   base texel:   i0 = floor(p),  i1 = i0 + 1
//   weights:      f = p - i0
//
// Neighbour indices that fall outside the image are resolved by the
// `AddressMode` of the fetch, not by the caller:
//
//   Clamp  — replicate the edge texel (GPU clamp-to-edge)
//   Repeat — wrap modulo size (GPU repeat), so the image tiles the plane
//
// NEW RUST CONCEPTS:
// - Operator traits as bounds (`Add<Output = Self> + Mul<f32, Output = Self>`)
//   let one generic bilinear routine serve both f32 and RGBA pixels.
// - `rem_euclid` — modulo that is never negative, unlike `%`.

use std::fmt;
use std::ops::{Add, Mul};

use glam::{Vec2, Vec4};

// ---------------------------------------------------------------------------
// Pixel Trait
// ---------------------------------------------------------------------------
// Anything that can be linearly blended can live in an Image and be
// bilinearly sampled. Copy + Default give cheap zero-initialised buffers;
// Send + Sync let frames cross threads (the host may hand us a frame from a
// render thread).

/// Trait for types that can serve as pixel values in an Image.
pub trait Pixel:
    Copy + Default + Send + Sync + 'static + Add<Output = Self> + Mul<f32, Output = Self>
{
}

impl Pixel for f32 {}

impl Pixel for Vec4 {}

// ---------------------------------------------------------------------------
// AddressMode
// ---------------------------------------------------------------------------

/// How out-of-range texel indices are resolved during a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    /// Replicate the nearest edge texel.
    #[default]
    Clamp,
    /// Wrap around modulo the image size (toroidal addressing).
    Repeat,
}

impl AddressMode {
    /// Resolve a possibly out-of-range index against an axis of length `len`.
    #[inline]
    pub fn resolve(self, i: isize, len: usize) -> usize {
        debug_assert!(len > 0);
        match self {
            AddressMode::Clamp => i.clamp(0, len as isize - 1) as usize,
            AddressMode::Repeat => i.rem_euclid(len as isize) as usize,
        }
    }
}

// ---------------------------------------------------------------------------
// Image<T>
// ---------------------------------------------------------------------------
// Row-major, contiguous buffer with explicit stride.
//
// Memory layout (stride = 5, width = 4):
//
//   data index:  0  1  2  3 [4]  5  6  7  8 [9] 10 11 12 13 [14]
//   pixel:       ■  ■  ■  ■  ·   ■  ■  ■  ■  ·   ■  ■  ■  ■  ·
//
// Padding elements are never read by the passes; they exist so a frame
// handed over by a host with aligned rows can be wrapped without a copy.

/// A 2D image with runtime dimensions, generic over pixel type `T`.
pub struct Image<T: Pixel> {
    /// Pixel data in row-major order. Length = height * stride.
    data: Vec<T>,
    width: usize,
    height: usize,
    /// Row stride in *elements* (not bytes). stride >= width.
    stride: usize,
}

// Manual Clone: a frame clone is a deep copy of the whole buffer.
impl<T: Pixel> Clone for Image<T> {
    fn clone(&self) -> Self {
        Image {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }
}

impl<T: Pixel> Default for Image<T> {
    /// An empty 0×0 image. Used as the placeholder when a target is
    /// temporarily moved out of the pipeline's target table.
    fn default() -> Self {
        Image { data: Vec::new(), width: 0, height: 0, stride: 0 }
    }
}

impl<T: Pixel> Image<T> {
    // --- Constructors ---

    /// Create a zero-initialized image. Stride equals width.
    pub fn new(width: usize, height: usize) -> Self {
        Self::new_with_stride(width, height, width)
    }

    /// Create a zero-initialized image with an explicit stride.
    ///
    /// # Panics
    /// Panics if `stride < width`.
    pub fn new_with_stride(width: usize, height: usize, stride: usize) -> Self {
        assert!(
            stride >= width,
            "stride ({stride}) must be >= width ({width})"
        );
        Image {
            data: vec![T::default(); height * stride],
            width,
            height,
            stride,
        }
    }

    /// Create an image where every pixel holds `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Image {
            data: vec![value; width * height],
            width,
            height,
            stride: width,
        }
    }

    /// Create an image from an existing pixel vector (no stride padding).
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "data length ({}) must equal width * height ({})",
            data.len(),
            width * height,
        );
        Image { data, width, height, stride: width }
    }

    /// Create an image from raw data with explicit stride.
    ///
    /// # Panics
    /// Panics if `data.len() != height * stride` or `stride < width`.
    pub fn from_vec_with_stride(width: usize, height: usize, stride: usize, data: Vec<T>) -> Self {
        assert!(stride >= width, "stride ({stride}) must be >= width ({width})");
        assert_eq!(
            data.len(),
            height * stride,
            "data length ({}) must equal height * stride ({})",
            data.len(),
            height * stride,
        );
        Image { data, width, height, stride }
    }

    // --- Accessors ---

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// `(width, height)` in pixels.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// True when the image holds no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Get the pixel value at (x, y). x is column, y is row.
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.bounds_check(x, y);
        self.data[y * self.stride + x]
    }

    /// Get pixel value without bounds checking.
    ///
    /// # Safety
    /// Caller must guarantee x < width and y < height.
    ///
    /// GPU EQUIVALENT: `textureLoad` on an index the address mode already
    /// resolved; there is no per-fetch bounds check.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, x: usize, y: usize) -> T {
        debug_assert!(x < self.width && y < self.height,
            "get_unchecked({x},{y}) out of bounds for {}x{}", self.width, self.height);
        *self.data.get_unchecked(y * self.stride + x)
    }

    /// Mutable reference to the pixel at (x, y).
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        self.bounds_check(x, y);
        let idx = y * self.stride + x;
        &mut self.data[idx]
    }

    /// Set the pixel at (x, y).
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        *self.get_mut(x, y) = value;
    }

    /// Overwrite every pixel with `value`.
    pub fn fill(&mut self, value: T) {
        for y in 0..self.height {
            self.row_mut(y).fill(value);
        }
    }

    /// Borrow a single row as a slice (padding excluded).
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    /// Mutable borrow of a single row.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    /// Iterate over all pixels as `(x, y, value)` tuples.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).map(move |x| (x, y, self.data[y * self.stride + x]))
        })
    }

    /// The underlying data, stride padding included.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable access to the underlying data.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Total number of elements in the buffer (including stride padding).
    pub fn buffer_len(&self) -> usize {
        self.data.len()
    }

    /// Fetch one texel through an address mode. `x`/`y` may lie outside
    /// the image.
    ///
    /// # Panics
    /// Panics if the image is empty.
    #[inline]
    pub fn fetch(&self, x: isize, y: isize, mode: AddressMode) -> T {
        assert!(!self.is_empty(), "cannot fetch from an empty image");
        let xi = mode.resolve(x, self.width);
        let yi = mode.resolve(y, self.height);
        // SAFETY: resolve() always lands inside [0, len).
        unsafe { self.get_unchecked(xi, yi) }
    }

    // --- Internal helpers ---

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}×{}",
            self.width,
            self.height,
        );
    }
}

// Debug formatting — useful for small images in tests.
impl<T: Pixel + fmt::Debug> fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Image<{}> {{ {}×{}, stride={} }}",
            std::any::type_name::<T>(),
            self.width,
            self.height,
            self.stride,
        )?;
        for y in 0..self.height.min(8) {
            write!(f, "  row {y}: [")?;
            for x in 0..self.width.min(8) {
                if x > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", self.get(x, y))?;
            }
            if self.width > 8 {
                write!(f, ", ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.height > 8 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}

impl<T: Pixel + PartialEq> PartialEq for Image<T> {
    /// Pixel-wise equality; stride padding is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && (0..self.height).all(|y| self.row(y) == other.row(y))
    }
}

// ---------------------------------------------------------------------------
// Index / IndexMut — img[(x, y)] syntax
// ---------------------------------------------------------------------------

impl<T: Pixel> std::ops::Index<(usize, usize)> for Image<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &T {
        self.bounds_check(x, y);
        &self.data[y * self.stride + x]
    }
}

impl<T: Pixel> std::ops::IndexMut<(usize, usize)> for Image<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        self.bounds_check(x, y);
        let idx = y * self.stride + x;
        &mut self.data[idx]
    }
}

// ---------------------------------------------------------------------------
// Bilinear sampling
// ---------------------------------------------------------------------------

/// Bilinear fetch at normalized coordinate `uv` with the given addressing.
///
/// This is the one sampling primitive every pass uses. It reproduces what a
/// GPU sampler with linear min/mag filtering does, so the wgpu mirror in
/// `gpu::pipeline` can implement the same arithmetic with `textureLoad`.
///
/// # Panics
/// Panics if the image is empty.
pub fn sample_bilinear<T: Pixel>(img: &Image<T>, uv: Vec2, mode: AddressMode) -> T {
    assert!(!img.is_empty(), "cannot sample an empty image");

    let (x0, fx) = split_texel(uv.x * img.width() as f32 - 0.5);
    let (y0, fy) = split_texel(uv.y * img.height() as f32 - 0.5);
    let x1 = x0.saturating_add(1);
    let y1 = y0.saturating_add(1);

    let p00 = img.fetch(x0, y0, mode);
    let p10 = img.fetch(x1, y0, mode);
    let p01 = img.fetch(x0, y1, mode);
    let p11 = img.fetch(x1, y1, mode);

    // Same blend order as the shader: lerp along x, then along y.
    let top = p00 * (1.0 - fx) + p10 * fx;
    let bottom = p01 * (1.0 - fx) + p11 * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Split a texel-space coordinate into its integer texel and the blend
/// fraction toward the next one.
///
/// `as isize` saturates, so far-out coordinates land on an edge index; a
/// non-finite coordinate blends nothing (fraction 0).
#[inline]
fn split_texel(p: f32) -> (isize, f32) {
    let base = p.floor();
    let frac = if p.is_finite() { p - base } else { 0.0 };
    (base as isize, frac)
}

/// Toroidal wrap of a coordinate into [0, 1): `v - floor(v)` per component.
///
/// NOTE: this is GLSL/HLSL `fract`, not Rust's `f32::fract` (which keeps the
/// sign of negative inputs).
#[inline]
pub fn wrap_unit(v: Vec2) -> Vec2 {
    v - v.floor()
}
