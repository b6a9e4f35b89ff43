//! Skybox Pass
//!
//! Fills every pixel the geometry pass left empty (G-buffer position
//! `w = 0`) with a procedural gradient sky and sun disc, tone-mapped with
//! the same exposure as the composite. Drawn into the current post scratch
//! target with load, so geometry pixels keep the composite result.

use super::screen::ScreenInputs;
use crate::renderer::core::pipeline;
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::core::targets::HDR_FORMAT;
use crate::renderer::graph::context::{ExecuteContext, PrepareContext};
use crate::renderer::graph::node::RenderNode;
use crate::resources::filter::PingPongSlot;

pub struct SkyboxPass {
    inputs: ScreenInputs,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
    target: PingPongSlot,
}

impl SkyboxPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            inputs: ScreenInputs::new(device, "Skybox Inputs", 1),
            pipeline: None,
            bind_group: None,
            target: PingPongSlot::A,
        }
    }
}

impl RenderNode for SkyboxPass {
    fn name(&self) -> &'static str {
        "Skybox Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        if self.pipeline.is_none() {
            let device = ctx.device();
            let module = shaders::create_module(device, ShaderId::Skybox);
            let layout = pipeline::pipeline_layout(
                device,
                "Skybox Pipeline Layout",
                &[&ctx.resources.frame_layout, &self.inputs.layout],
            );
            self.pipeline = Some(pipeline::fullscreen_pipeline(
                device,
                "Skybox Pipeline",
                &module,
                &layout,
                &[pipeline::replace_target(HDR_FORMAT)],
            ));
        }
        self.target = ctx.blackboard.post_slot;
        self.bind_group = Some(self.inputs.bind(
            ctx.device(),
            &[&ctx.targets.gbuffer.position.view],
            &ctx.resources.samplers.nearest_clamp,
        ));
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let (Some(pipeline), Some(group)) = (&self.pipeline, &self.bind_group) else {
            return;
        };
        let mut pass = pipeline::color_pass(encoder, self.name(), ctx.targets.scratch.view(self.target), None);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &ctx.resources.frame_bind_group, &[]);
        pass.set_bind_group(1, group, &[]);
        pass.draw(0..3, 0..1);
    }
}
