// gpu/image.rs — RGBA32F frames resident on the GPU, upload and readback.
//
// RESPONSIBILITIES
// ─────────────────
// 1. `GpuFrame` — one render target of the flare pipeline as a
//    `Rgba32Float` texture. Every pass reads frames through `textureLoad`
//    and writes them as `texture_storage_2d<rgba32float, write>`.
//
// 2. `GpuFrame::write()` — copy a CPU `Image<Vec4>` into the texture via a
//    staging buffer, handling the stride-compaction problem described below.
//
// 3. `GpuFrame::readback()` — copy the texture back into an `Image<Vec4>`.
//    Synchronous; used at the end of the pipeline and in tests.
//
//
// THE STRIDE-COMPACTION PROBLEM
// ──────────────────────────────
// A CPU `Image<Vec4>` may have stride > width (padding per row), while
// `copy_buffer_to_texture` wants rows at a `bytes_per_row` that is a
// multiple of 256:
//
//   CPU layout (stride=5, width=4), 16 bytes per texel:
//     row0: [p00 p01 p02 p03 _pad_]
//     row1: [p10 p11 p12 p13 _pad_]
//
//   staging (width·16 rounded up to 256):
//     row0: [p00 p01 p02 p03 ....zero....]
//     row1: [p10 p11 p12 p13 ....zero....]
//
// Rows are compacted into a staging buffer before upload, and the same
// padding is stripped again on readback.
//
//
// WHY RGBA32FLOAT?
// ────────────────
// The CPU reference carries f32 through every pass and the composite is
// deliberately unclamped. A normalized 8-bit or 16-bit float target would
// quantize between passes and the GPU/CPU comparison would no longer be
// meaningful. `Rgba32Float` is not filterable, so the shader does its own
// bilinear blend with `textureLoad`, exactly as `image::sample_bilinear`.
//
//
// NEW RUST CONCEPTS
// ──────────────────
// - `bytemuck::cast_slice` — reinterpret `&[Vec4]` as `&[u8]` without
//   unsafe code (glam's `bytemuck` feature makes `Vec4: Pod`).
// - `bytemuck::pod_read_unaligned` — read a `Vec4` out of a byte slice
//   that carries no alignment guarantee.

use glam::Vec4;
use wgpu::util::DeviceExt;

use crate::gpu::device::{GpuDevice, GpuError};
use crate::image::Image;

/// Bytes per `Rgba32Float` texel.
pub const BYTES_PER_TEXEL: u32 = 16;

/// A `Rgba32Float` texture with views for reading and storage writing.
pub struct GpuFrame {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl GpuFrame {
    /// Allocate an uninitialized frame.
    pub fn new(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GpuFrame { texture, view, width, height }
    }

    /// Allocate a frame and upload `src` into it.
    pub fn upload(gpu: &GpuDevice, src: &Image<Vec4>, label: &str) -> Self {
        let frame = Self::new(&gpu.device, src.width() as u32, src.height() as u32, label);
        frame.write(gpu, src);
        frame
    }

    /// Overwrite the texture contents with `src`.
    ///
    /// The copy is submitted immediately; later submissions on the same
    /// queue observe it.
    ///
    /// # Panics
    /// Panics if `src` is not the frame's size.
    pub fn write(&self, gpu: &GpuDevice, src: &Image<Vec4>) {
        assert_eq!(
            (src.width() as u32, src.height() as u32),
            (self.width, self.height),
            "GpuFrame::write size mismatch"
        );
        let row_bytes = (self.width * BYTES_PER_TEXEL) as usize;
        let aligned_bytes_per_row = align_to(self.width * BYTES_PER_TEXEL, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        let mut staging = vec![0u8; (aligned_bytes_per_row * self.height) as usize];
        for y in 0..self.height as usize {
            let dst_start = y * aligned_bytes_per_row as usize;
            staging[dst_start..dst_start + row_bytes].copy_from_slice(bytemuck::cast_slice(src.row(y)));
        }

        let staging_buf = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("GpuFrame::staging"),
            contents: &staging,
            usage: wgpu::BufferUsages::COPY_SRC,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("GpuFrame::write") });
        encoder.copy_buffer_to_texture(
            wgpu::ImageCopyBuffer {
                buffer: &staging_buf,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(aligned_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 },
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Read the texture back into a compact `Image<Vec4>`.
    ///
    /// **Expensive and synchronous** — waits for all submitted work.
    ///
    /// # Errors
    /// `GpuError::BufferMap` if mapping the readback buffer fails.
    pub fn readback(&self, gpu: &GpuDevice) -> Result<Image<Vec4>, GpuError> {
        let aligned_bytes_per_row = align_to(self.width * BYTES_PER_TEXEL, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback_buf = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("GpuFrame::readback"),
            size: (aligned_bytes_per_row * self.height) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("GpuFrame::readback") });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback_buf,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(aligned_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 },
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let buf_slice = readback_buf.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buf_slice.map_async(wgpu::MapMode::Read, move |r| {
            // The receiver outlives the poll below; a failed send only
            // means the caller already gave up.
            let _ = tx.send(r);
        });
        gpu.device.poll(wgpu::Maintain::Wait);
        rx.recv().map_err(|_| GpuError::MapCallbackLost)??;

        let mapped = buf_slice.get_mapped_range();
        let out = unpack_rows(&mapped, self.width as usize, self.height as usize, aligned_bytes_per_row as usize);
        drop(mapped);
        readback_buf.unmap();
        Ok(out)
    }
}

/// Strip row padding from a readback buffer and decode the texels.
fn unpack_rows(bytes: &[u8], width: usize, height: usize, bytes_per_row: usize) -> Image<Vec4> {
    let row_bytes = width * BYTES_PER_TEXEL as usize;
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        let row = &bytes[y * bytes_per_row..y * bytes_per_row + row_bytes];
        data.extend(row.chunks_exact(BYTES_PER_TEXEL as usize).map(bytemuck::pod_read_unaligned::<Vec4>));
    }
    Image::from_vec(width, height, data)
}

/// Round `value` up to the next multiple of `alignment`.
///
///   align_to(100, 256) = 256
///   align_to(256, 256) = 256
///   align_to(257, 256) = 512
#[inline]
pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
