//! Bloom Pass
//!
//! Soft-knee bright pass from the lit G-buffer (direct + indirect) into the
//! downsampled bloom pair, then [`BLOOM_BLUR_ITERATIONS`] separable blur
//! steps. Disabled bloom clears the final slot to [`BLOOM_NEUTRAL`].

use wgpu::util::DeviceExt;

use super::blur::{BlurGroups, SeparableBlur};
use crate::renderer::core::pipeline;
use crate::renderer::core::resources::{sampler_entry, texture_entry, uniform_entry};
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::core::targets::HDR_FORMAT;
use crate::renderer::graph::context::{ExecuteContext, PrepareContext};
use crate::renderer::graph::node::RenderNode;
use crate::resources::bloom::{BLOOM_BLUR_ITERATIONS, BLOOM_NEUTRAL};
use crate::resources::filter::{BlurStep, PingPongSlot, final_slot, ping_pong_schedule};
use crate::resources::uniforms::FilterUniforms;

pub struct BloomPass {
    layout: wgpu::BindGroupLayout,
    pipeline: Option<wgpu::RenderPipeline>,
    uniforms: wgpu::Buffer,
    blur: SeparableBlur,
    steps: Vec<BlurStep>,
    groups: Option<(wgpu::BindGroup, BlurGroups)>,
}

impl BloomPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Extract Layout"),
            entries: &[
                texture_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1, wgpu::ShaderStages::FRAGMENT),
                sampler_entry(2, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
                uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bloom Uniforms"),
            contents: bytemuck::bytes_of(&FilterUniforms {
                params: glam::Vec4::ZERO,
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            layout,
            pipeline: None,
            uniforms,
            blur: SeparableBlur::new(device),
            steps: ping_pong_schedule(BLOOM_BLUR_ITERATIONS),
            groups: None,
        }
    }

    fn ensure_pipeline(&mut self, ctx: &PrepareContext) {
        if self.pipeline.is_some() {
            return;
        }
        let device = ctx.device();
        let module = shaders::create_module(device, ShaderId::BloomExtract);
        let layout = pipeline::pipeline_layout(
            device,
            "Bloom Extract Pipeline Layout",
            &[&ctx.resources.frame_layout, &self.layout],
        );
        self.pipeline = Some(pipeline::fullscreen_pipeline(
            device,
            "Bloom Extract Pipeline",
            &module,
            &layout,
            &[pipeline::replace_target(HDR_FORMAT)],
        ));
        self.blur.ensure_format(device, HDR_FORMAT);
    }
}

impl RenderNode for BloomPass {
    fn name(&self) -> &'static str {
        "Bloom Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        ctx.blackboard.bloom_slot = final_slot(BLOOM_BLUR_ITERATIONS);
        let settings = ctx.settings.bloom;
        if !(settings.enabled && ctx.view.features.bloom) {
            self.groups = None;
            return;
        }
        self.ensure_pipeline(ctx);
        ctx.queue()
            .write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&settings.extract_uniforms()));

        let device = ctx.device();
        let gbuffer = &ctx.targets.gbuffer;
        let input = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Extract BindGroup"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.direct.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.indirect.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&ctx.resources.samplers.linear_clamp),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.uniforms.as_entire_binding(),
                },
            ],
        });
        let blur = self.blur.groups(device, ctx.resources, &ctx.targets.bloom);
        self.groups = Some((input, blur));
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let bloom = &ctx.targets.bloom;
        let final_view = bloom.view(ctx.blackboard.bloom_slot);
        let (Some(pipeline), Some((input, blur))) = (&self.pipeline, &self.groups) else {
            pipeline::clear_target(encoder, "Bloom Neutral", final_view, f64::from(BLOOM_NEUTRAL));
            return;
        };

        encoder.push_debug_group(self.name());
        pipeline::draw_fullscreen(
            encoder,
            "Bloom Extract",
            bloom.view(PingPongSlot::B),
            pipeline,
            &[&ctx.resources.frame_bind_group, input],
        );
        self.blur.run(encoder, "Bloom Blur", bloom, blur, &self.steps);
        encoder.pop_debug_group();
    }
}
