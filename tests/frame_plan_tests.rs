//! Frame Plan Tests
//!
//! Tests for:
//! - Fixed pass order of the main view
//! - Optional stages (VPL, depth of field, motion blur, depth AA)
//! - Debug view replacing presentation
//! - Probe-face plans without exposure, transparency or post stages

use myth_deferred::renderer::graph::{FramePlan, PassId};
use myth_deferred::renderer::settings::{DebugView, RenderSettings};
use myth_deferred::scene::Environment;

fn dof_environment() -> Environment {
    let mut env = Environment::default();
    env.depth_of_field.enabled = true;
    env
}

fn all_optional() -> RenderSettings {
    RenderSettings {
        motion_blur: true,
        depth_aa: true,
        ..Default::default()
    }
}

// ============================================================================
// Main view
// ============================================================================

#[test]
fn main_plan_follows_fixed_order() {
    let plan = FramePlan::main(&all_optional(), &dof_environment());
    assert_eq!(
        plan.passes(),
        &[
            PassId::Shadow,
            PassId::Vpl,
            PassId::Geometry,
            PassId::Ssao,
            PassId::Volumetric,
            PassId::Bloom,
            PassId::Exposure,
            PassId::Composite,
            PassId::Skybox,
            PassId::Transparent,
            PassId::DepthOfField,
            PassId::MotionBlur,
            PassId::DepthAa,
            PassId::Present,
        ]
    );
}

#[test]
fn default_plan_has_depth_aa_only() {
    let plan = FramePlan::main(&RenderSettings::default(), &Environment::default());
    assert!(plan.contains(PassId::DepthAa));
    assert!(!plan.contains(PassId::DepthOfField));
    assert!(!plan.contains(PassId::MotionBlur));
}

#[test]
fn disabled_features_keep_their_neutral_passes() {
    let mut settings = RenderSettings::default();
    settings.ssao.enabled = false;
    settings.volumetrics.enabled = false;
    settings.bloom.enabled = false;
    settings.vpl.enabled = false;

    let plan = FramePlan::main(&settings, &Environment::default());
    assert!(!plan.contains(PassId::Vpl));
    for id in [PassId::Ssao, PassId::Volumetric, PassId::Bloom] {
        assert!(plan.contains(id), "{id:?} dropped");
    }
}

#[test]
fn producers_run_before_the_composite() {
    let plan = FramePlan::main(&all_optional(), &dof_environment());
    let composite = plan.position(PassId::Composite).unwrap_or(0);
    for id in [PassId::Geometry, PassId::Ssao, PassId::Volumetric, PassId::Bloom, PassId::Exposure] {
        assert!(plan.position(id).is_some_and(|p| p < composite), "{id:?} after composite");
    }
    let post = plan.passes().iter().filter(|p| p.is_post_stage());
    for id in post {
        assert!(plan.position(*id).is_some_and(|p| p > composite));
    }
}

#[test]
fn debug_view_replaces_present() {
    for view in DebugView::all() {
        let settings = RenderSettings {
            debug_view: Some(*view),
            ..all_optional()
        };
        let plan = FramePlan::main(&settings, &dof_environment());
        assert!(plan.contains(PassId::DebugView));
        assert!(!plan.contains(PassId::Present));
        assert_eq!(plan.passes().last(), Some(&PassId::DebugView));
    }
}

#[test]
fn exactly_one_terminal_pass_ends_every_plan() {
    let settings = [
        RenderSettings::default(),
        all_optional(),
        RenderSettings {
            debug_view: Some(DebugView::Normals),
            ..Default::default()
        },
    ];
    for s in &settings {
        for plan in [FramePlan::main(s, &Environment::default()), FramePlan::probe_face(s)] {
            let terminals = plan.passes().iter().filter(|p| p.is_terminal()).count();
            assert_eq!(terminals, 1);
            assert!(plan.passes().last().is_some_and(|p| p.is_terminal()));
        }
    }
}

// ============================================================================
// Probe faces
// ============================================================================

#[test]
fn probe_plan_skips_camera_dependent_stages() {
    let settings = RenderSettings {
        debug_view: Some(DebugView::Albedo),
        ..all_optional()
    };
    let plan = FramePlan::probe_face(&settings);
    assert!(!plan.contains(PassId::Exposure));
    assert!(!plan.contains(PassId::Transparent));
    assert!(!plan.contains(PassId::DebugView));
    assert!(plan.passes().iter().all(|p| !p.is_post_stage()));
    assert_eq!(plan.passes().last(), Some(&PassId::Present));
}

#[test]
fn probe_plan_keeps_vpl_when_enabled() {
    let mut settings = RenderSettings::default();
    assert!(FramePlan::probe_face(&settings).contains(PassId::Vpl));
    settings.vpl.enabled = false;
    assert!(!FramePlan::probe_face(&settings).contains(PassId::Vpl));
}

#[test]
fn post_and_terminal_classification() {
    assert!(PassId::DepthOfField.is_post_stage());
    assert!(PassId::MotionBlur.is_post_stage());
    assert!(PassId::DepthAa.is_post_stage());
    assert!(!PassId::Composite.is_post_stage());
    assert!(PassId::Present.is_terminal());
    assert!(PassId::DebugView.is_terminal());
    assert!(!PassId::Skybox.is_terminal());
}
