//! Texture inputs of fullscreen passes.
//!
//! Screen-space stages bind `frame_layout` at group 0 and a
//! [`ScreenInputs`] group at group 1: `count` sampled 2D textures at
//! bindings `0..count` followed by one filtering sampler.

use crate::renderer::core::resources::{sampler_entry, texture_entry};

pub struct ScreenInputs {
    pub layout: wgpu::BindGroupLayout,
    count: u32,
    label: &'static str,
}

impl ScreenInputs {
    #[must_use]
    pub fn new(device: &wgpu::Device, label: &'static str, count: u32) -> Self {
        let mut entries: Vec<wgpu::BindGroupLayoutEntry> = (0..count)
            .map(|binding| texture_entry(binding, wgpu::ShaderStages::FRAGMENT))
            .collect();
        entries.push(sampler_entry(
            count,
            wgpu::ShaderStages::FRAGMENT,
            wgpu::SamplerBindingType::Filtering,
        ));
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        });
        Self { layout, count, label }
    }

    /// Binds `views` in order; `views.len()` must equal the texture count.
    #[must_use]
    pub fn bind(&self, device: &wgpu::Device, views: &[&wgpu::TextureView], sampler: &wgpu::Sampler) -> wgpu::BindGroup {
        debug_assert_eq!(views.len() as u32, self.count, "{}", self.label);
        let mut entries: Vec<wgpu::BindGroupEntry> = views
            .iter()
            .take(self.count as usize)
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: self.count,
            resource: wgpu::BindingResource::Sampler(sampler),
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label),
            layout: &self.layout,
            entries: &entries,
        })
    }
}
