//! Separable Gaussian blur shared by SSAO, volumetrics and bloom.
//!
//! One pipeline per target format. The step direction lives in two static
//! uniform buffers (horizontal and vertical); `blur.wgsl` converts it to
//! texels with `textureDimensions`, so the same buffers serve every target
//! size.

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use crate::renderer::core::ResourceManager;
use crate::renderer::core::pipeline;
use crate::renderer::core::resources::{sampler_entry, texture_entry, uniform_entry};
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::core::targets::PingPong;
use crate::resources::filter::{BlurDirection, BlurStep, PingPongSlot};
use crate::resources::uniforms::BlurUniforms;

pub struct SeparableBlur {
    layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    module: wgpu::ShaderModule,
    pipelines: FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
    horizontal: wgpu::Buffer,
    vertical: wgpu::Buffer,
}

/// Bind groups for one ping-pong pair: reading A or B in either direction.
pub struct BlurGroups {
    groups: [[wgpu::BindGroup; 2]; 2],
}

impl BlurGroups {
    #[must_use]
    pub fn get(&self, source: PingPongSlot, direction: BlurDirection) -> &wgpu::BindGroup {
        let d = match direction {
            BlurDirection::Horizontal => 0,
            BlurDirection::Vertical => 1,
        };
        &self.groups[source.index()][d]
    }
}

impl SeparableBlur {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blur Layout"),
            entries: &[
                texture_entry(0, wgpu::ShaderStages::FRAGMENT),
                sampler_entry(1, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let pipeline_layout = pipeline::pipeline_layout(device, "Blur Pipeline Layout", &[&layout]);
        let buffer = |label, direction| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&BlurUniforms { direction }),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        };
        Self {
            layout,
            pipeline_layout,
            module: shaders::create_module(device, ShaderId::Blur),
            pipelines: FxHashMap::default(),
            horizontal: buffer("Blur Horizontal", glam::Vec4::new(1.0, 0.0, 0.0, 0.0)),
            vertical: buffer("Blur Vertical", glam::Vec4::new(0.0, 1.0, 0.0, 0.0)),
        }
    }

    pub fn ensure_format(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipelines.contains_key(&format) {
            return;
        }
        let pipeline = pipeline::fullscreen_pipeline(
            device,
            "Blur Pipeline",
            &self.module,
            &self.pipeline_layout,
            &[pipeline::replace_target(format)],
        );
        self.pipelines.insert(format, pipeline);
    }

    #[must_use]
    pub fn groups(&self, device: &wgpu::Device, resources: &ResourceManager, pair: &PingPong) -> BlurGroups {
        let group = |slot: PingPongSlot, buffer: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Blur BindGroup"),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(pair.view(slot)),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&resources.samplers.linear_clamp),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: buffer.as_entire_binding(),
                    },
                ],
            })
        };
        BlurGroups {
            groups: [PingPongSlot::A, PingPongSlot::B]
                .map(|slot| [group(slot, &self.horizontal), group(slot, &self.vertical)]),
        }
    }

    /// Records `steps` over `pair`. Each step reads `step.source` and writes
    /// `step.target`.
    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pair: &PingPong,
        groups: &BlurGroups,
        steps: &[BlurStep],
    ) {
        let Some(pipeline) = self.pipelines.get(&pair.get(PingPongSlot::A).format) else {
            return;
        };
        for step in steps {
            pipeline::draw_fullscreen(
                encoder,
                label,
                pair.view(step.target),
                pipeline,
                &[groups.get(step.source, step.direction)],
            );
        }
    }
}
