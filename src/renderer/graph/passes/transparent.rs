//! Transparent Overlay Pass
//!
//! Forward-draws water brushes (alpha blended, tinted by the environment
//! water colour) and particles (additive camera-facing billboards) over the
//! composited image. There is no depth attachment at output resolution;
//! both shaders sample the G-buffer position and discard fragments behind
//! opaque geometry.

use super::screen::ScreenInputs;
use crate::renderer::core::pipeline::{self, MeshPipelineDesc};
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::core::targets::HDR_FORMAT;
use crate::renderer::graph::context::{ExecuteContext, PrepareContext};
use crate::renderer::graph::cull::cull_water;
use crate::renderer::graph::node::RenderNode;
use crate::resources::filter::PingPongSlot;
use crate::resources::geometry::Vertex;
use crate::scene::Particle;

const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

pub struct TransparentPass {
    inputs: ScreenInputs,
    water_pipeline: Option<wgpu::RenderPipeline>,
    particle_pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
    target: PingPongSlot,

    water: Vec<usize>,
    particles: Vec<Particle>,
    particle_buffer: Option<wgpu::Buffer>,
    particle_capacity: usize,
}

impl TransparentPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            inputs: ScreenInputs::new(device, "Transparent Inputs", 1),
            water_pipeline: None,
            particle_pipeline: None,
            bind_group: None,
            target: PingPongSlot::A,
            water: Vec::new(),
            particles: Vec::new(),
            particle_buffer: None,
            particle_capacity: 0,
        }
    }

    fn ensure_pipelines(&mut self, ctx: &PrepareContext) {
        if self.water_pipeline.is_some() {
            return;
        }
        let device = ctx.device();
        let layout = pipeline::pipeline_layout(
            device,
            "Transparent Pipeline Layout",
            &[&ctx.resources.frame_layout, &self.inputs.layout],
        );

        let water = shaders::create_module(device, ShaderId::Water);
        self.water_pipeline = Some(pipeline::mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Water Pipeline",
                module: &water,
                layout: &layout,
                vertex_buffers: &[Vertex::layout()],
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::COLOR,
                })],
                depth: None,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
            },
        ));

        let particles = shaders::create_module(device, ShaderId::Particles);
        let instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Particle>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4],
        };
        self.particle_pipeline = Some(pipeline::mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Particle Pipeline",
                module: &particles,
                layout: &layout,
                vertex_buffers: &[instance_layout],
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: Some(ADDITIVE),
                    write_mask: wgpu::ColorWrites::COLOR,
                })],
                depth: None,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
            },
        ));
    }

    fn upload_particles(&mut self, ctx: &PrepareContext) {
        self.particles.clear();
        self.particles.extend(
            ctx.scene
                .emitters
                .iter()
                .flat_map(|e| e.particles.iter())
                .filter(|p| p.size > 0.0 && p.color.w > 0.0),
        );
        if self.particles.is_empty() {
            return;
        }
        if self.particles.len() > self.particle_capacity || self.particle_buffer.is_none() {
            let capacity = self.particles.len().next_power_of_two().max(64);
            self.particle_buffer = Some(ctx.device().create_buffer(&wgpu::BufferDescriptor {
                label: Some("Particle Instances"),
                size: (capacity * std::mem::size_of::<Particle>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.particle_capacity = capacity;
        }
        if let Some(buffer) = &self.particle_buffer {
            ctx.queue().write_buffer(buffer, 0, bytemuck::cast_slice(&self.particles));
        }
    }
}

impl RenderNode for TransparentPass {
    fn name(&self) -> &'static str {
        "Transparent Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        self.ensure_pipelines(ctx);
        self.target = ctx.blackboard.post_slot;
        self.water = cull_water(ctx.scene, &ctx.view.camera.frustum());
        if ctx.scene.environment.water_color[3] <= 0.0 {
            self.water.clear();
        }
        self.upload_particles(ctx);

        self.bind_group = Some(self.inputs.bind(
            ctx.device(),
            &[&ctx.targets.gbuffer.position.view],
            &ctx.resources.samplers.nearest_clamp,
        ));
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        if self.water.is_empty() && self.particles.is_empty() {
            return;
        }
        let (Some(water), Some(particles), Some(group)) =
            (&self.water_pipeline, &self.particle_pipeline, &self.bind_group)
        else {
            return;
        };

        let mut pass = pipeline::color_pass(encoder, self.name(), ctx.targets.scratch.view(self.target), None);
        pass.set_bind_group(0, &ctx.resources.frame_bind_group, &[]);
        pass.set_bind_group(1, group, &[]);

        pass.set_pipeline(water);
        for index in &self.water {
            let Some(mesh) = ctx.resources.brush_mesh(*index) else {
                continue;
            };
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }

        if let Some(buffer) = &self.particle_buffer
            && !self.particles.is_empty()
        {
            pass.set_pipeline(particles);
            pass.set_vertex_buffer(0, buffer.slice(..));
            pass.draw(0..6, 0..self.particles.len() as u32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_instance_is_two_vec4() {
        // particles.wgsl reads `position.xyz, size` then `color` as two vec4 attributes.
        assert_eq!(std::mem::size_of::<Particle>(), 32);
        let p = Particle {
            position: glam::Vec3::new(1.0, 2.0, 3.0),
            size: 0.5,
            color: glam::Vec4::ONE,
        };
        let words: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&p));
        assert_eq!(&words[..4], &[1.0, 2.0, 3.0, 0.5]);
    }
}
