//! Volumetric Scattering Pass
//!
//! Ray-marches from the camera to the G-buffer surface (or the distance
//! cap) and accumulates in-scattered light from every active light with a
//! volumetric intensity, shadow-tested against the same maps the geometry
//! pass uses. The downsampled result is denoised with
//! [`VOLUMETRIC_BLUR_ITERATIONS`] ping-pong blur steps.
//!
//! Skipped entirely (final slot cleared to [`VOLUMETRIC_NEUTRAL`]) when
//! volumetrics are off for this view or no light scatters.

use wgpu::util::DeviceExt;

use super::blur::{BlurGroups, SeparableBlur};
use crate::renderer::core::pipeline;
use crate::renderer::core::resources::{sampler_entry, texture_entry, uniform_entry};
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::core::targets::HDR_FORMAT;
use crate::renderer::graph::context::{ExecuteContext, PrepareContext};
use crate::renderer::graph::node::RenderNode;
use crate::resources::filter::{BlurStep, PingPongSlot, final_slot, ping_pong_schedule};
use crate::resources::uniforms::FilterUniforms;
use crate::resources::volumetric::{VOLUMETRIC_BLUR_ITERATIONS, VOLUMETRIC_NEUTRAL, volumetrics_active};

pub struct VolumetricPass {
    layout: wgpu::BindGroupLayout,
    pipeline: Option<wgpu::RenderPipeline>,
    uniforms: wgpu::Buffer,
    blur: SeparableBlur,
    steps: Vec<BlurStep>,
    groups: Option<(wgpu::BindGroup, BlurGroups)>,
}

impl VolumetricPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Volumetric Layout"),
            entries: &[
                texture_entry(0, wgpu::ShaderStages::FRAGMENT),
                sampler_entry(1, wgpu::ShaderStages::FRAGMENT, wgpu::SamplerBindingType::Filtering),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Volumetric Uniforms"),
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
            steps: ping_pong_schedule(VOLUMETRIC_BLUR_ITERATIONS),
            groups: None,
        }
    }

    fn ensure_pipeline(&mut self, ctx: &PrepareContext) {
        if self.pipeline.is_some() {
            return;
        }
        let device = ctx.device();
        let module = shaders::create_module(device, ShaderId::Volumetric);
        let layout = pipeline::pipeline_layout(
            device,
            "Volumetric Pipeline Layout",
            &[&ctx.resources.lighting_layout, &self.layout],
        );
        self.pipeline = Some(pipeline::fullscreen_pipeline(
            device,
            "Volumetric Pipeline",
            &module,
            &layout,
            &[pipeline::replace_target(HDR_FORMAT)],
        ));
        self.blur.ensure_format(device, HDR_FORMAT);
    }
}

impl RenderNode for VolumetricPass {
    fn name(&self) -> &'static str {
        "Volumetric Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        ctx.blackboard.volumetric_slot = final_slot(VOLUMETRIC_BLUR_ITERATIONS);
        let settings = ctx.settings.volumetrics;
        if !(settings.enabled && ctx.view.features.volumetrics && volumetrics_active(ctx.scene, settings.threshold))
        {
            self.groups = None;
            return;
        }
        self.ensure_pipeline(ctx);
        ctx.queue()
            .write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&settings.march_uniforms()));

        let device = ctx.device();
        let input = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Volumetric BindGroup"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&ctx.targets.gbuffer.position.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&ctx.resources.samplers.nearest_clamp),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniforms.as_entire_binding(),
                },
            ],
        });
        let blur = self.blur.groups(device, ctx.resources, &ctx.targets.volumetric);
        self.groups = Some((input, blur));
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let volumetric = &ctx.targets.volumetric;
        let final_view = volumetric.view(ctx.blackboard.volumetric_slot);
        let (Some(pipeline), Some((input, blur))) = (&self.pipeline, &self.groups) else {
            pipeline::clear_target(encoder, "Volumetric Neutral", final_view, f64::from(VOLUMETRIC_NEUTRAL));
            return;
        };

        encoder.push_debug_group(self.name());
        pipeline::draw_fullscreen(
            encoder,
            "Volumetric March",
            volumetric.view(PingPongSlot::B),
            pipeline,
            &[&ctx.resources.lighting_bind_group, input],
        );
        self.blur.run(encoder, "Volumetric Blur", volumetric, blur, &self.steps);
        encoder.pop_debug_group();
    }
}
