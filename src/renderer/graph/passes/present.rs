//! Terminal passes: present and debug view.
//!
//! Exactly one of them runs per view and it is the only pass writing the
//! output view. Pipelines are cached per output format, since the main
//! surface and probe captures use different formats.

use rustc_hash::FxHashMap;

use super::screen::ScreenInputs;
use crate::renderer::core::pipeline;
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::graph::context::{ExecuteContext, PrepareContext};
use crate::renderer::graph::node::RenderNode;

struct OutputPipelines {
    shader: ShaderId,
    label: &'static str,
    inputs: ScreenInputs,
    pipelines: FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

impl OutputPipelines {
    fn new(device: &wgpu::Device, shader: ShaderId, label: &'static str, input_count: u32) -> Self {
        Self {
            shader,
            label,
            inputs: ScreenInputs::new(device, label, input_count),
            pipelines: FxHashMap::default(),
        }
    }

    fn ensure(&mut self, ctx: &PrepareContext) {
        let format = ctx.view.output_format;
        if self.pipelines.contains_key(&format) {
            return;
        }
        let device = ctx.device();
        let module = shaders::create_module(device, self.shader);
        let layout = pipeline::pipeline_layout(
            device,
            self.label,
            &[&ctx.resources.frame_layout, &self.inputs.layout],
        );
        let pipeline = pipeline::fullscreen_pipeline(
            device,
            self.label,
            &module,
            &layout,
            &[pipeline::replace_target(format)],
        );
        log::debug!("{} pipeline created for {format:?}", self.label);
        self.pipelines.insert(format, pipeline);
    }

    fn draw(
        &self,
        ctx: &ExecuteContext,
        encoder: &mut wgpu::CommandEncoder,
        group: Option<&wgpu::BindGroup>,
    ) {
        let (Some(pipeline), Some(group)) = (self.pipelines.get(&ctx.view.output_format), group) else {
            return;
        };
        pipeline::draw_fullscreen(
            encoder,
            self.label,
            ctx.output,
            pipeline,
            &[&ctx.resources.frame_bind_group, group],
        );
    }
}

// ─── Present ─────────────────────────────────────────────────────────────────

/// Copies the last post-chain output to the output view.
pub struct PresentPass {
    output: OutputPipelines,
    bind_group: Option<wgpu::BindGroup>,
}

impl PresentPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            output: OutputPipelines::new(device, ShaderId::Blit, "Present Pass", 1),
            bind_group: None,
        }
    }
}

impl RenderNode for PresentPass {
    fn name(&self) -> &'static str {
        "Present Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        self.output.ensure(ctx);
        let source = ctx.targets.scratch.view(ctx.blackboard.post_slot);
        self.bind_group = Some(
            self.output
                .inputs
                .bind(ctx.device(), &[source], &ctx.resources.samplers.linear_clamp),
        );
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        self.output.draw(ctx, encoder, self.bind_group.as_ref());
    }
}

// ─── Debug View ──────────────────────────────────────────────────────────────

/// Shows one raw intermediate buffer instead of the final image.
pub struct DebugViewPass {
    output: OutputPipelines,
    bind_group: Option<wgpu::BindGroup>,
}

impl DebugViewPass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            // albedo, position, normal, pbr, velocity, indirect, ssao, bloom
            output: OutputPipelines::new(device, ShaderId::DebugView, "Debug View Pass", 8),
            bind_group: None,
        }
    }
}

impl RenderNode for DebugViewPass {
    fn name(&self) -> &'static str {
        "Debug View Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        self.output.ensure(ctx);
        let targets = ctx.targets;
        let g = &targets.gbuffer;
        let blackboard = &*ctx.blackboard;
        self.bind_group = Some(self.output.inputs.bind(
            ctx.device(),
            &[
                &g.albedo.view,
                &g.position.view,
                &g.normal.view,
                &g.pbr.view,
                &g.velocity.view,
                &g.indirect.view,
                targets.ssao.view(blackboard.ssao_slot),
                targets.bloom.view(blackboard.bloom_slot),
            ],
            &ctx.resources.samplers.nearest_clamp,
        ));
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        self.output.draw(ctx, encoder, self.bind_group.as_ref());
    }
}
