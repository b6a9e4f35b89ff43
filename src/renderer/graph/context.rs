//! Render Context System
//!
//! Every pass entry point receives an explicit context record instead of
//! reaching for global renderer state:
//!
//! - [`PrepareContext`]: mutable phase. Passes resolve their toggles, create
//!   pipelines, upload uniforms and publish cross-pass data on the
//!   [`FrameBlackboard`].
//! - [`ExecuteContext`]: read-only phase. Passes record GPU commands.
//!
//! The [`ViewContext`] describes the view being rendered (main camera or a
//! probe face). Rendering a probe face builds a fresh set of contexts, so a
//! bake running between two frames never observes or mutates main-view
//! state.

use glam::{Mat4, Vec2, Vec3};

use crate::renderer::core::{FrameTargets, ResourceManager, WgpuContext};
use crate::renderer::settings::RenderSettings;
use crate::resources::composite::FeatureToggles;
use crate::resources::filter::PingPongSlot;
use crate::scene::{RenderCamera, Scene};

/// What the view is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// The player camera, presented to the output.
    Main,
    /// One face of a reflection-probe capture.
    ProbeFace,
}

/// Per-view inputs resolved once before any pass runs.
#[derive(Debug, Clone)]
pub struct ViewContext {
    pub camera: RenderCamera,
    /// View-projection of the previous main frame (velocity buffer).
    pub prev_view_projection: Mat4,
    pub kind: ViewKind,
    pub dt: f32,
    pub time: f32,
    /// Screen-space filters allowed to contribute in this view.
    pub features: FeatureToggles,
    pub output_format: wgpu::TextureFormat,
}

impl ViewContext {
    #[inline]
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.kind == ViewKind::Main
    }
}

/// Cross-pass data produced during prepare.
///
/// Written by exactly one pass and read by later passes of the same view.
#[derive(Debug, Clone)]
pub struct FrameBlackboard {
    /// Entries in the light storage buffer (shadow pass).
    pub light_count: u32,
    /// Records in the VPL buffer (VPL pass).
    pub vpl_count: u32,
    /// Direction of the shadow-casting sun, if any.
    pub sun_direction: Option<Vec3>,
    /// Screen UV of the lens-flare source (composite pass).
    pub flare_anchor: Option<Vec2>,
    /// Slot holding each filter's final output.
    pub ssao_slot: PingPongSlot,
    pub volumetric_slot: PingPongSlot,
    pub bloom_slot: PingPongSlot,
    /// Scratch slot holding the latest post-chain output.
    pub post_slot: PingPongSlot,
    /// Composite ignores the adapted exposure and uses the neutral value.
    pub neutral_exposure: bool,
}

impl Default for FrameBlackboard {
    fn default() -> Self {
        Self {
            light_count: 0,
            vpl_count: 0,
            sun_direction: None,
            flare_anchor: None,
            ssao_slot: PingPongSlot::A,
            volumetric_slot: PingPongSlot::A,
            bloom_slot: PingPongSlot::B,
            post_slot: PingPongSlot::A,
            neutral_exposure: false,
        }
    }
}

impl FrameBlackboard {
    /// Advances the post chain: the next stage reads the current slot and
    /// writes the other. Returns `(source, target)`.
    pub fn flip_post(&mut self) -> (PingPongSlot, PingPongSlot) {
        let source = self.post_slot;
        self.post_slot = source.other();
        (source, self.post_slot)
    }
}

// ─── Prepare Context ──────────────────────────────────────────────────────────

pub struct PrepareContext<'a> {
    pub wgpu_ctx: &'a WgpuContext,
    pub resources: &'a mut ResourceManager,
    pub targets: &'a FrameTargets,
    pub scene: &'a Scene,
    pub view: &'a ViewContext,
    pub settings: &'a RenderSettings,
    pub blackboard: &'a mut FrameBlackboard,
}

impl PrepareContext<'_> {
    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.wgpu_ctx.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.wgpu_ctx.queue
    }
}

// ─── Execute Context ──────────────────────────────────────────────────────────

pub struct ExecuteContext<'a> {
    pub wgpu_ctx: &'a WgpuContext,
    pub resources: &'a ResourceManager,
    pub targets: &'a FrameTargets,
    pub scene: &'a Scene,
    pub view: &'a ViewContext,
    pub settings: &'a RenderSettings,
    pub blackboard: &'a FrameBlackboard,
    /// Destination of the present / debug-view pass.
    pub output: &'a wgpu::TextureView,
}
