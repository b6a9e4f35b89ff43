//! Composite Pass
//!
//! Resolves the lit G-buffer and the three screen-space filters into the
//! first post scratch target:
//!
//! ```text
//! hdr = direct + indirect × ao + bloom × strength + volumetric
//! hdr = fog(hdr)                       geometry pixels only
//! ldr = aces(hdr × exposure) + screen effects
//! ```
//!
//! Also fills the [`PostUniforms`] shared by every later screen-space stage
//! and publishes the lens-flare anchor.

use glam::{Vec2, Vec4};

use super::screen::ScreenInputs;
use crate::renderer::core::pipeline;
use crate::renderer::core::shaders::{self, ShaderId};
use crate::renderer::core::targets::HDR_FORMAT;
use crate::renderer::graph::context::{ExecuteContext, FrameBlackboard, PrepareContext, ViewContext};
use crate::renderer::graph::node::RenderNode;
use crate::renderer::settings::RenderSettings;
use crate::resources::composite::lens_flare_anchor;
use crate::resources::filter::PingPongSlot;
use crate::resources::uniforms::PostUniforms;
use crate::scene::Environment;

/// Edge thresholds of the depth-AA pass (view-space distance ratio and
/// normal dot product).
pub const DEPTH_AA_DEPTH_THRESHOLD: f32 = 0.1;
pub const DEPTH_AA_NORMAL_THRESHOLD: f32 = 0.8;

/// Packs environment, settings and per-view blackboard state into the
/// post-chain uniform block.
#[must_use]
pub fn build_post_uniforms(
    environment: &Environment,
    settings: &RenderSettings,
    view: &ViewContext,
    blackboard: &FrameBlackboard,
) -> PostUniforms {
    let fog = environment.fog;
    let fx = environment.effects;
    let dof = environment.depth_of_field;
    let sky = environment.sky;
    let ssao_intensity = if settings.ssao.enabled && view.features.ssao {
        settings.ssao.intensity
    } else {
        0.0
    };
    let bloom_strength = if view.features.bloom {
        settings.bloom.effective_strength()
    } else {
        0.0
    };
    let anchor = blackboard.flare_anchor.unwrap_or(Vec2::splat(-1.0));
    let debug_mode = settings.debug_view.map_or(0, |d| d.shader_mode());

    PostUniforms {
        fog_color: fog.color.extend(if fog.enabled { 1.0 } else { 0.0 }),
        fog_params: Vec4::new(fog.start, fog.end, bloom_strength, view.time),
        effects: Vec4::new(fx.vignette, fx.chromatic_aberration, fx.scanlines, fx.film_grain),
        effects2: Vec4::new(fx.sharpen, fx.lens_flare, anchor.x, anchor.y),
        flags: Vec4::new(
            if blackboard.flare_anchor.is_some() { 1.0 } else { 0.0 },
            ssao_intensity,
            if blackboard.neutral_exposure { 1.0 } else { 0.0 },
            0.0,
        ),
        dof: Vec4::new(dof.focus_distance, dof.aperture, dof.max_blur, 0.0),
        misc: Vec4::new(
            settings.motion_blur_strength,
            DEPTH_AA_DEPTH_THRESHOLD,
            DEPTH_AA_NORMAL_THRESHOLD,
            debug_mode as f32,
        ),
        sky_zenith: sky.zenith_color.extend(1.0),
        sky_horizon: sky.horizon_color.extend(1.0),
        sky_ground: sky.ground_color.extend(1.0),
        sun_direction: blackboard
            .sun_direction
            .map_or(Vec4::ZERO, |d| d.extend(1.0)),
        water_color: Vec4::from_array(environment.water_color),
    }
}

pub struct CompositePass {
    inputs: ScreenInputs,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
    target: PingPongSlot,
}

impl CompositePass {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            // direct, indirect, position, ssao, volumetric, bloom
            inputs: ScreenInputs::new(device, "Composite Inputs", 6),
            pipeline: None,
            bind_group: None,
            target: PingPongSlot::A,
        }
    }

    fn ensure_pipeline(&mut self, ctx: &PrepareContext) {
        if self.pipeline.is_some() {
            return;
        }
        let device = ctx.device();
        let module = shaders::create_module(device, ShaderId::Composite);
        let layout = pipeline::pipeline_layout(
            device,
            "Composite Pipeline Layout",
            &[&ctx.resources.frame_layout, &self.inputs.layout],
        );
        self.pipeline = Some(pipeline::fullscreen_pipeline(
            device,
            "Composite Pipeline",
            &module,
            &layout,
            &[pipeline::replace_target(HDR_FORMAT)],
        ));
    }
}

impl RenderNode for CompositePass {
    fn name(&self) -> &'static str {
        "Composite Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        self.ensure_pipeline(ctx);
        let environment = &ctx.scene.environment;

        ctx.blackboard.flare_anchor = if environment.effects.lens_flare > 0.0 && ctx.view.is_main() {
            lens_flare_anchor(ctx.scene.lights().map(|(_, l)| l), ctx.view.camera.view_projection)
                .filter(|uv| uv.cmpge(Vec2::ZERO).all() && uv.cmple(Vec2::ONE).all())
        } else {
            None
        };

        let uniforms = build_post_uniforms(environment, ctx.settings, ctx.view, ctx.blackboard);
        ctx.queue()
            .write_buffer(&ctx.resources.post_uniforms, 0, bytemuck::bytes_of(&uniforms));

        self.target = ctx.blackboard.post_slot;
        let targets = ctx.targets;
        let gbuffer = &targets.gbuffer;
        let blackboard = &*ctx.blackboard;
        self.bind_group = Some(self.inputs.bind(
            ctx.device(),
            &[
                &gbuffer.direct.view,
                &gbuffer.indirect.view,
                &gbuffer.position.view,
                targets.ssao.view(blackboard.ssao_slot),
                targets.volumetric.view(blackboard.volumetric_slot),
                targets.bloom.view(blackboard.bloom_slot),
            ],
            &ctx.resources.samplers.linear_clamp,
        ));
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
