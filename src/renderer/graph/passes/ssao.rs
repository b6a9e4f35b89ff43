//! SSAO Pass
//!
//! Hemisphere-sampled ambient occlusion from the view-space G-buffer,
//! written at reduced resolution and smoothed with one horizontal and one
//! vertical blur step:
//!
//! ```text
//! position + normal ──► ssao.wgsl ──► B ──H──► A ──V──► B (final)
//! ```
//!
//! When SSAO is off for this view the final slot is cleared to
//! [`SSAO_NEUTRAL`] so the composite multiplies by one.

use wgpu::util::DeviceExt;

use super::blur::{BlurGroups, SeparableBlur};
use crate::renderer::core::pipeline;
use crate::renderer::core::resources::{sampler_entry, texture_entry, uniform_entry};
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::core::targets::SSAO_FORMAT;
use crate::renderer::graph::context::{ExecuteContext, PrepareContext};
use crate::renderer::graph::node::RenderNode;
use crate::resources::filter::{BlurStep, PingPongSlot, final_slot, ping_pong_schedule};
use crate::resources::ssao::{SSAO_KERNEL_SIZE, SSAO_NEUTRAL, SsaoSettings, generate_ssao_kernel};
use crate::resources::uniforms::SsaoUniforms;

pub const SSAO_BLUR_ITERATIONS: u32 = 2;

pub struct SsaoPass {
    layout: wgpu::BindGroupLayout,
    pipeline: Option<wgpu::RenderPipeline>,
    uniforms: wgpu::Buffer,
    kernel: [glam::Vec4; SSAO_KERNEL_SIZE],
    last_settings: Option<SsaoSettings>,

    blur: SeparableBlur,
    steps: Vec<BlurStep>,
    /// `None` when the pass only clears to neutral.
    groups: Option<(wgpu::BindGroup, BlurGroups)>,
}

impl SsaoPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Layout"),
            entries: &[
                texture_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1, wgpu::ShaderStages::FRAGMENT),
                sampler_entry(2, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
                uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let kernel = generate_ssao_kernel();
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SSAO Uniforms"),
            contents: bytemuck::bytes_of(&SsaoUniforms {
                samples: kernel,
                params: glam::Vec4::ZERO,
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            layout,
            pipeline: None,
            uniforms,
            kernel,
            last_settings: None,
            blur: SeparableBlur::new(device),
            steps: ping_pong_schedule(SSAO_BLUR_ITERATIONS),
            groups: None,
        }
    }

    fn ensure_pipeline(&mut self, ctx: &PrepareContext) {
        if self.pipeline.is_some() {
            return;
        }
        let device = ctx.device();
        let module = shaders::create_module(device, ShaderId::Ssao);
        let layout = pipeline::pipeline_layout(
            device,
            "SSAO Pipeline Layout",
            &[&ctx.resources.frame_layout, &self.layout],
        );
        self.pipeline = Some(pipeline::fullscreen_pipeline(
            device,
            "SSAO Pipeline",
            &module,
            &layout,
            &[pipeline::replace_target(SSAO_FORMAT)],
        ));
        self.blur.ensure_format(device, SSAO_FORMAT);
    }
}

impl RenderNode for SsaoPass {
    fn name(&self) -> &'static str {
        "SSAO Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        ctx.blackboard.ssao_slot = final_slot(SSAO_BLUR_ITERATIONS);
        let settings = ctx.settings.ssao;
        if !(settings.enabled && ctx.view.features.ssao) {
            self.groups = None;
            return;
        }
        self.ensure_pipeline(ctx);

        if self.last_settings != Some(settings) {
            let uniforms = SsaoUniforms {
                samples: self.kernel,
                params: glam::Vec4::new(
                    settings.radius,
                    settings.bias,
                    settings.intensity,
                    SSAO_KERNEL_SIZE as f32,
                ),
            };
            ctx.queue().write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));
            self.last_settings = Some(settings);
        }

        let device = ctx.device();
        let gbuffer = &ctx.targets.gbuffer;
        let input = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO BindGroup"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.position.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&ctx.resources.samplers.nearest_clamp),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.uniforms.as_entire_binding(),
                },
            ],
        });
        let blur = self.blur.groups(device, ctx.resources, &ctx.targets.ssao);
        self.groups = Some((input, blur));
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let ssao = &ctx.targets.ssao;
        let final_view = ssao.view(ctx.blackboard.ssao_slot);
        let (Some(pipeline), Some((input, blur))) = (&self.pipeline, &self.groups) else {
            pipeline::clear_target(encoder, "SSAO Neutral", final_view, f64::from(SSAO_NEUTRAL));
            return;
        };

        encoder.push_debug_group(self.name());
        pipeline::draw_fullscreen(
            encoder,
            "SSAO Raw",
            ssao.view(PingPongSlot::B),
            pipeline,
            &[&ctx.resources.frame_bind_group, input],
        );
        self.blur.run(encoder, "SSAO Blur", ssao, blur, &self.steps);
        encoder.pop_debug_group();
    }
}
