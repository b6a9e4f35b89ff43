//! GPU textures, cubemaps and shared samplers.

use crate::errors::{RenderError, Result};
use crate::resources::texture::Image;

pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[derive(Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    /// Uploads an RGBA8 image as a single-mip 2D texture.
    #[must_use]
    pub fn from_image(device: &wgpu::Device, queue: &wgpu::Queue, image: &Image, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: image.width.max(1),
                height: image.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_layer(queue, &texture, image, 0);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Writes `image` into one array layer of `texture`.
pub fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, image: &Image, layer: u32) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect: wgpu::TextureAspect::All,
        },
        &image.data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width),
            rows_per_image: Some(image.height),
        },
        wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        },
    );
}

// ============================================================================
// Cubemaps
// ============================================================================

#[derive(Debug)]
pub struct GpuCubemap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: u32,
}

impl GpuCubemap {
    /// Builds a cubemap from six square faces in `+X -X +Y -Y +Z -Z` order.
    pub fn from_faces(device: &wgpu::Device, queue: &wgpu::Queue, faces: &[Image; 6], label: &str) -> Result<Self> {
        let size = faces[0].width;
        if size == 0 {
            return Err(RenderError::CubeMapError("empty cubemap face".to_string()));
        }
        for (i, face) in faces.iter().enumerate() {
            if face.width != size || face.height != size {
                return Err(RenderError::CubeMapError(format!(
                    "face {i} is {}x{}, expected {size}x{size}",
                    face.width, face.height
                )));
            }
        }
        Ok(Self::build(device, queue, size, faces, label))
    }

    fn build(device: &wgpu::Device, queue: &wgpu::Queue, size: u32, faces: &[Image; 6], label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (layer, face) in faces.iter().enumerate() {
            write_layer(queue, &texture, face, layer as u32);
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Self { texture, view, size }
    }

    /// 1×1 dark cube bound when an object has no probe.
    #[must_use]
    pub fn fallback(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let face = Image::solid(1, 1, [24, 24, 24, 255]);
        let faces = std::array::from_fn(|_| face.clone());
        Self::build(device, queue, 1, &faces, "Fallback Cubemap")
    }
}

// ============================================================================
// Samplers
// ============================================================================

pub struct Samplers {
    pub linear_clamp: wgpu::Sampler,
    pub linear_repeat: wgpu::Sampler,
    pub nearest_clamp: wgpu::Sampler,
    /// Depth comparison sampler for shadow maps.
    pub shadow: wgpu::Sampler,
}

impl Samplers {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let linear_clamp = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Clamp Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let linear_repeat = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Repeat Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let nearest_clamp = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Nearest Clamp Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });
        let shadow = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        Self {
            linear_clamp,
            linear_repeat,
            nearest_clamp,
            shadow,
        }
    }
}
