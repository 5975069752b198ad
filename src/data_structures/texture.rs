//! GPU textures and render-target attachments.
//!
//! [`Texture`] covers the sampled variants (plain 2D from a pixel buffer,
//! cube maps from six faces, 1x1 fallbacks). [`Attachment`] is a resizable
//! render target with no initial contents, reallocated only when its
//! requested size actually changes.

use std::iter;
use std::time::Duration;

use crate::error::RenderError;

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Channel format of every sampled colour texture.
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Uploads a tightly packed RGBA8 buffer as a sampled 2D texture
    /// (repeat wrapping, nearest filtering). Rows are uploaded as given.
    pub fn from_pixels(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
        label: &str,
    ) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(RenderError::Device(format!(
                "texture `{label}`: {} bytes do not describe a {width}x{height} RGBA8 image",
                rgba.len()
            )));
        }
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_layer(queue, &texture, 0, width, height, rgba);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_sampler(device, wgpu::AddressMode::Repeat));
        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    /// Uploads a decoded image. The rows are flipped first so that `v = 0`
    /// addresses the bottom of the picture, which is what mesh UVs assume.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: &str,
    ) -> Result<Self, RenderError> {
        let flipped = bottom_up(&img.to_rgba8());
        Self::from_pixels(
            device,
            queue,
            flipped.width(),
            flipped.height(),
            flipped.as_raw(),
            label,
        )
    }

    /// Builds a cube map from six square faces in layer order
    /// +X, -X, +Y, -Y, +Z, -Z. Each face is flipped like [`Self::from_image`]
    /// before upload.
    pub fn cube(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[image::RgbaImage; 6],
        label: &str,
    ) -> Result<Self, RenderError> {
        let (width, height) = faces[0].dimensions();
        if width == 0 || width != height {
            return Err(RenderError::Device(format!(
                "cube map `{label}` needs square faces, got {width}x{height}"
            )));
        }
        if let Some(odd) = faces.iter().position(|f| f.dimensions() != (width, height)) {
            return Err(RenderError::Device(format!(
                "cube map `{label}` face {odd} does not match {width}x{height}"
            )));
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (layer, face) in faces.iter().enumerate() {
            let face = bottom_up(face);
            write_layer(queue, &texture, layer as u32, width, height, face.as_raw());
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = Some(create_sampler(device, wgpu::AddressMode::ClampToEdge));
        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    /// 1x1 texture of a single colour, bound where a material has no map.
    pub fn solid(device: &wgpu::Device, queue: &wgpu::Queue, rgba: [u8; 4], label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_layer(queue, &texture, 0, 1, 1, &rgba);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: Some(create_sampler(device, wgpu::AddressMode::Repeat)),
        }
    }

    /// Cube-map counterpart of [`Texture::solid`].
    pub fn solid_cube(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for layer in 0..6 {
            write_layer(queue, &texture, layer, 1, 1, &rgba);
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler: Some(create_sampler(device, wgpu::AddressMode::ClampToEdge)),
        }
    }
}

/// Reverses the row order of a decoded image so its last row is uploaded
/// first and `v = 0` lands on the bottom of the picture.
pub fn bottom_up(img: &image::RgbaImage) -> image::RgbaImage {
    image::imageops::flip_vertical(img)
}

fn write_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    layer: u32,
    width: u32,
    height: u32,
    rgba: &[u8],
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

pub fn create_sampler(device: &wgpu::Device, address_mode: wgpu::AddressMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Remembers the last size a target was allocated with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeMemo {
    current: Option<(u32, u32)>,
}

impl SizeMemo {
    /// Zero extents are not allocatable; they are treated as 1.
    pub fn normalize(width: u32, height: u32) -> (u32, u32) {
        (width.max(1), height.max(1))
    }

    pub fn needs_resize(&self, width: u32, height: u32) -> bool {
        self.current != Some(Self::normalize(width, height))
    }

    pub fn record(&mut self, width: u32, height: u32) {
        self.current = Some(Self::normalize(width, height));
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.current
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

/// Resizable render target. Contents are undefined after every reallocation.
#[derive(Debug)]
pub struct Attachment {
    label: String,
    format: wgpu::TextureFormat,
    memo: SizeMemo,
    texture: Option<Texture>,
    generation: u64,
}

impl Attachment {
    pub fn new(label: impl Into<String>, format: wgpu::TextureFormat) -> Self {
        Self {
            label: label.into(),
            format,
            memo: SizeMemo::default(),
            texture: None,
            generation: 0,
        }
    }

    /// Reallocates storage when `(width, height)` differs from the current
    /// size. Returns whether a reallocation happened.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        if !self.memo.needs_resize(width, height) && self.texture.is_some() {
            return false;
        }
        let (width, height) = SizeMemo::normalize(width, height);
        if let Some(old) = self.texture.take() {
            old.texture.destroy();
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&self.label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.texture = Some(Texture {
            texture,
            view,
            sampler: None,
        });
        self.memo.record(width, height);
        self.generation += 1;
        log::debug!("allocated attachment `{}` at {width}x{height}", self.label);
        true
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.memo.size()
    }

    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.texture.as_ref().map(|t| &t.view)
    }

    pub fn texture(&self) -> Option<&wgpu::Texture> {
        self.texture.as_ref().map(|t| &t.texture)
    }

    /// Bumped on every reallocation; equal generations mean the same handle.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_allocated(&self) -> bool {
        self.texture.is_some()
    }

    /// Releases the GPU texture. Calling it again is a no-op.
    pub fn dispose(&mut self) {
        if let Some(texture) = self.texture.take() {
            texture.texture.destroy();
            self.memo.clear();
        }
    }
}

/// Copies a colour texture back to the CPU as normalized RGBA floats,
/// row by row from the top. Supports 8-bit unorm and 32-bit float formats.
pub async fn read_texels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<Vec<[f32; 4]>, RenderError> {
    let format = texture.format();
    let bytes_per_texel: u32 = match format {
        wgpu::TextureFormat::Rgba8Unorm
        | wgpu::TextureFormat::Rgba8UnormSrgb
        | wgpu::TextureFormat::Bgra8Unorm
        | wgpu::TextureFormat::Bgra8UnormSrgb => 4,
        wgpu::TextureFormat::Rgba32Float => 16,
        other => {
            return Err(RenderError::Readback(format!(
                "unsupported readback format {other:?}"
            )));
        }
    };
    let (width, height) = (texture.width(), texture.height());
    let unpadded = width * bytes_per_texel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded = unpadded.div_ceil(align) * align;

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback buffer"),
        size: (padded * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .map_err(|e| RenderError::Readback(e.to_string()))?;
    rx.receive()
        .await
        .ok_or_else(|| RenderError::Readback("map callback dropped".into()))?
        .map_err(|e| RenderError::Readback(e.to_string()))?;

    let mut texels = Vec::with_capacity((width * height) as usize);
    {
        let data = slice.get_mapped_range();
        for row in data.chunks(padded as usize) {
            for texel in row[..unpadded as usize].chunks(bytes_per_texel as usize) {
                texels.push(decode_texel(format, texel));
            }
        }
    }
    buffer.unmap();
    Ok(texels)
}

fn decode_texel(format: wgpu::TextureFormat, bytes: &[u8]) -> [f32; 4] {
    let unorm = |b: u8| b as f32 / 255.0;
    match format {
        wgpu::TextureFormat::Rgba32Float => bytemuck::pod_read_unaligned::<[f32; 4]>(bytes),
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => [
            unorm(bytes[2]),
            unorm(bytes[1]),
            unorm(bytes[0]),
            unorm(bytes[3]),
        ],
        _ => [
            unorm(bytes[0]),
            unorm(bytes[1]),
            unorm(bytes[2]),
            unorm(bytes[3]),
        ],
    }
}
