//! Optional post-chain stages.
//!
//! Each stage reads the latest scratch target and writes the other one:
//!
//! | stage          | reads                         | effect                         |
//! |----------------|-------------------------------|--------------------------------|
//! | depth of field | colour, position              | disc blur scaled by focus CoC  |
//! | motion blur    | colour, velocity, position    | samples along the velocity     |
//! | depth-AA       | colour, position, normal      | blends across geometric edges  |
//!
//! Depth-AA is purely spatial: edges come from depth and normal
//! discontinuities of the current frame only.

use super::screen::ScreenInputs;
use crate::renderer::core::pipeline;
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::core::targets::{FrameTargets, HDR_FORMAT};
use crate::renderer::graph::context::{ExecuteContext, PrepareContext};
use crate::renderer::graph::node::RenderNode;
use crate::resources::filter::PingPongSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostStage {
    DepthOfField,
    MotionBlur,
    DepthAa,
}

impl PostStage {
    fn shader(self) -> ShaderId {
        match self {
            Self::DepthOfField => ShaderId::DepthOfField,
            Self::MotionBlur => ShaderId::MotionBlur,
            Self::DepthAa => ShaderId::DepthAa,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::DepthOfField => "Depth Of Field Pass",
            Self::MotionBlur => "Motion Blur Pass",
            Self::DepthAa => "Depth AA Pass",
        }
    }

    /// G-buffer views bound after the colour input.
    fn gbuffer_inputs(self, targets: &FrameTargets) -> Vec<&wgpu::TextureView> {
        let g = &targets.gbuffer;
        match self {
            Self::DepthOfField => vec![&g.position.view],
            Self::MotionBlur => vec![&g.velocity.view, &g.position.view],
            Self::DepthAa => vec![&g.position.view, &g.normal.view],
        }
    }

    fn input_count(self) -> u32 {
        match self {
            Self::DepthOfField => 2,
            Self::MotionBlur | Self::DepthAa => 3,
        }
    }
}

pub struct PostStagePass {
    stage: PostStage,
    inputs: ScreenInputs,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
    target: PingPongSlot,
}

impl PostStagePass {
    #[must_use]
    pub fn new(device: &wgpu::Device, stage: PostStage) -> Self {
        Self {
            stage,
            inputs: ScreenInputs::new(device, stage.label(), stage.input_count()),
            pipeline: None,
            bind_group: None,
            target: PingPongSlot::B,
        }
    }
}

impl RenderNode for PostStagePass {
    fn name(&self) -> &'static str {
        self.stage.label()
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        if self.pipeline.is_none() {
            let device = ctx.device();
            let module = shaders::create_module(device, self.stage.shader());
            let layout = pipeline::pipeline_layout(
                device,
                self.stage.label(),
                &[&ctx.resources.frame_layout, &self.inputs.layout],
            );
            self.pipeline = Some(pipeline::fullscreen_pipeline(
                device,
                self.stage.label(),
                &module,
                &layout,
                &[pipeline::replace_target(HDR_FORMAT)],
            ));
        }

        let (source, target) = ctx.blackboard.flip_post();
        self.target = target;
        let targets = ctx.targets;
        let mut views = vec![targets.scratch.view(source)];
        views.extend(self.stage.gbuffer_inputs(targets));
        self.bind_group = Some(
            self.inputs
                .bind(ctx.device(), &views, &ctx.resources.samplers.linear_clamp),
        );
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let (Some(pipeline), Some(group)) = (&self.pipeline, &self.bind_group) else {
            return;
        };
        pipeline::draw_fullscreen(
            encoder,
            self.name(),
            ctx.targets.scratch.view(self.target),
            pipeline,
            &[&ctx.resources.frame_bind_group, group],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::graph::context::FrameBlackboard;

    #[test]
    fn consecutive_stages_alternate_scratch_targets() {
        let mut blackboard = FrameBlackboard::default();
        let mut last_target = blackboard.post_slot;
        for _ in 0..3 {
            let (source, target) = blackboard.flip_post();
            assert_eq!(source, last_target);
            assert_ne!(source, target);
            last_target = target;
        }
        assert_eq!(blackboard.post_slot, last_target);
    }
}
