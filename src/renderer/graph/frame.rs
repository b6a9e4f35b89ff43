//! Frame Plan
//!
//! The pass order is fixed; there is no dependency graph. A [`FramePlan`] is
//! the ordered list of [`PassId`]s one view executes, derived from the
//! settings and the view kind.
//!
//! ```text
//! Main view:
//!   Shadow → [Vpl] → Geometry → Ssao → Volumetric → Bloom → Exposure
//!     → Composite → Skybox → Transparent → [Dof] → [MotionBlur] → [DepthAa]
//!     → Present | DebugView
//!
//! Probe face:
//!   Shadow → [Vpl] → Geometry → Ssao → Volumetric → Bloom (all neutral)
//!     → Composite (neutral exposure) → Skybox → Present
//! ```
//!
//! SSAO, volumetrics and bloom always appear: when disabled they clear their
//! output to the neutral value instead of being dropped, so the composite
//! never needs to know which of them ran.

use smallvec::SmallVec;

use crate::renderer::settings::RenderSettings;
use crate::scene::Environment;

/// Tag identifying one pass of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Shadow,
    Vpl,
    Geometry,
    Ssao,
    Volumetric,
    Bloom,
    Exposure,
    Composite,
    Skybox,
    Transparent,
    DepthOfField,
    MotionBlur,
    DepthAa,
    Present,
    DebugView,
}

impl PassId {
    /// Stages that read the previous post output and write the other scratch
    /// target.
    #[must_use]
    pub fn is_post_stage(self) -> bool {
        matches!(self, Self::DepthOfField | Self::MotionBlur | Self::DepthAa)
    }

    /// Stages that write the final output view.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Present | Self::DebugView)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    passes: SmallVec<[PassId; 16]>,
}

impl FramePlan {
    /// Plan of the player view.
    #[must_use]
    pub fn main(settings: &RenderSettings, environment: &Environment) -> Self {
        let mut passes = SmallVec::new();
        passes.push(PassId::Shadow);
        if settings.vpl.enabled {
            passes.push(PassId::Vpl);
        }
        passes.extend([
            PassId::Geometry,
            PassId::Ssao,
            PassId::Volumetric,
            PassId::Bloom,
            PassId::Exposure,
            PassId::Composite,
            PassId::Skybox,
            PassId::Transparent,
        ]);
        if environment.depth_of_field.enabled {
            passes.push(PassId::DepthOfField);
        }
        if settings.motion_blur {
            passes.push(PassId::MotionBlur);
        }
        if settings.depth_aa {
            passes.push(PassId::DepthAa);
        }
        // The debug view replaces presentation, never both.
        passes.push(if settings.debug_view.is_some() {
            PassId::DebugView
        } else {
            PassId::Present
        });
        Self { passes }
    }

    /// Plan of one reflection-probe face: the lit scene and sky without the
    /// camera-dependent post chain or exposure adaptation.
    #[must_use]
    pub fn probe_face(settings: &RenderSettings) -> Self {
        let mut passes = SmallVec::new();
        passes.push(PassId::Shadow);
        if settings.vpl.enabled {
            passes.push(PassId::Vpl);
        }
        passes.extend([
            PassId::Geometry,
            PassId::Ssao,
            PassId::Volumetric,
            PassId::Bloom,
            PassId::Composite,
            PassId::Skybox,
            PassId::Present,
        ]);
        Self { passes }
    }

    #[inline]
    #[must_use]
    pub fn passes(&self) -> &[PassId] {
        &self.passes
    }

    #[must_use]
    pub fn contains(&self, id: PassId) -> bool {
        self.passes.contains(&id)
    }

    #[must_use]
    pub fn position(&self, id: PassId) -> Option<usize> {
        self.passes.iter().position(|p| *p == id)
    }
}
