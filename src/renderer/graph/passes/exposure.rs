//! Auto-Exposure Pass
//!
//! Two compute dispatches over the lit G-buffer:
//!
//! 1. `histogram`: one 16 × 16 work-group per tile, atomically counting
//!    log-luminance into 256 bins (cleared with `clear_buffer` first).
//! 2. `reduce`: a single work-group averages the bins and moves the
//!    persisted exposure toward `key / average` by at most `speed × dt`.
//!
//! The exposure value stays on the GPU; the composite reads it from the
//! frame bind group. With auto-exposure disabled the value is pinned to
//! [`NEUTRAL_EXPOSURE`] and the composite is told to ignore it.

use wgpu::util::DeviceExt;

use crate::renderer::core::pipeline;
use crate::renderer::core::resources::{storage_entry, uniform_entry};
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::graph::context::{ExecuteContext, PrepareContext};
use crate::renderer::graph::node::RenderNode;
use crate::resources::tone_mapping::{HISTOGRAM_WORKGROUP_SIZE, NEUTRAL_EXPOSURE};
use crate::resources::uniforms::{ExposureUniforms, ExposureValue};

pub struct ExposurePass {
    layout: wgpu::BindGroupLayout,
    histogram_pipeline: Option<wgpu::ComputePipeline>,
    reduce_pipeline: Option<wgpu::ComputePipeline>,
    uniforms: wgpu::Buffer,
    bind_group: Option<wgpu::BindGroup>,
    groups: (u32, u32),
}

impl ExposurePass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let lit_texture = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Exposure Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                storage_entry(1, wgpu::ShaderStages::COMPUTE, false),
                storage_entry(2, wgpu::ShaderStages::COMPUTE, false),
                lit_texture(3),
                lit_texture(4),
            ],
        });
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Exposure Uniforms"),
            contents: bytemuck::bytes_of(&ExposureUniforms {
                params: glam::Vec4::ZERO,
                frame: glam::Vec4::ZERO,
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            layout,
            histogram_pipeline: None,
            reduce_pipeline: None,
            uniforms,
            bind_group: None,
            groups: (0, 0),
        }
    }

    fn ensure_pipelines(&mut self, ctx: &PrepareContext) {
        if self.histogram_pipeline.is_some() {
            return;
        }
        let device = ctx.device();
        let layout = pipeline::pipeline_layout(device, "Exposure Pipeline Layout", &[&self.layout]);
        let histogram = shaders::create_module(device, ShaderId::Histogram);
        let reduce = shaders::create_module(device, ShaderId::Exposure);
        self.histogram_pipeline = Some(pipeline::compute_pipeline(
            device,
            "Luminance Histogram Pipeline",
            &histogram,
            &layout,
            "main",
        ));
        self.reduce_pipeline = Some(pipeline::compute_pipeline(
            device,
            "Exposure Reduce Pipeline",
            &reduce,
            &layout,
            "main",
        ));
    }
}

impl RenderNode for ExposurePass {
    fn name(&self) -> &'static str {
        "Exposure Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        let settings = ctx.settings.exposure;
        if !settings.enabled || !ctx.view.is_main() {
            self.bind_group = None;
            ctx.blackboard.neutral_exposure = true;
            if ctx.view.is_main() {
                let neutral = ExposureValue {
                    exposure: NEUTRAL_EXPOSURE,
                    average_luminance: 0.18,
                    _pad: [0.0; 2],
                };
                ctx.queue()
                    .write_buffer(&ctx.resources.exposure_buffer, 0, bytemuck::bytes_of(&neutral));
            }
            return;
        }
        self.ensure_pipelines(ctx);

        let (width, height) = ctx.targets.gbuffer.size();
        let uniforms = settings.uniforms(ctx.view.dt, width * height);
        ctx.queue().write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));
        self.groups = (
            width.div_ceil(HISTOGRAM_WORKGROUP_SIZE),
            height.div_ceil(HISTOGRAM_WORKGROUP_SIZE),
        );

        let gbuffer = &ctx.targets.gbuffer;
        let resources = &*ctx.resources;
        self.bind_group = Some(ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Exposure BindGroup"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: resources.histogram_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: resources.exposure_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.direct.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.indirect.view),
                },
            ],
        }));
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let (Some(histogram), Some(reduce), Some(group)) =
            (&self.histogram_pipeline, &self.reduce_pipeline, &self.bind_group)
        else {
            return;
        };
        encoder.clear_buffer(&ctx.resources.histogram_buffer, 0, None);

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(self.name()),
            timestamp_writes: None,
        });
        pass.set_bind_group(0, group, &[]);
        pass.set_pipeline(histogram);
        pass.dispatch_workgroups(self.groups.0, self.groups.1, 1);
        pass.set_pipeline(reduce);
        pass.dispatch_workgroups(1, 1, 1);
    }
}
