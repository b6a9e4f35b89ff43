//! Composite Tests
//!
//! Tests for:
//! - Disabled SSAO / volumetrics / bloom equal their neutral contribution
//! - Fog only on geometry pixels
//! - Tone mapping range
//! - Lens-flare anchor from the first active light
//! - Post-chain uniforms for main and probe views

use glam::{Mat4, Vec2, Vec3};

use myth_deferred::renderer::graph::passes::composite::build_post_uniforms;
use myth_deferred::renderer::graph::{FrameBlackboard, ViewContext, ViewKind};
use myth_deferred::renderer::settings::RenderSettings;
use myth_deferred::resources::bloom::BLOOM_NEUTRAL;
use myth_deferred::resources::composite::{
    CompositeParams, CompositeSample, FeatureToggles, FogParams, lens_flare_anchor, resolve_pixel,
};
use myth_deferred::resources::ssao::SSAO_NEUTRAL;
use myth_deferred::resources::volumetric::VOLUMETRIC_NEUTRAL;
use myth_deferred::scene::{Camera, Environment, Light};

const EPSILON: f32 = 1e-6;

fn sample() -> CompositeSample {
    CompositeSample {
        direct: Vec3::new(0.6, 0.5, 0.4),
        indirect: Vec3::new(0.2, 0.25, 0.3),
        bloom: Vec3::new(1.5, 1.2, 0.9),
        ssao: 0.35,
        volumetric: Vec3::new(0.05, 0.04, 0.03),
        view_distance: Some(25.0),
        uv: Vec2::new(0.3, 0.6),
    }
}

fn params() -> CompositeParams {
    CompositeParams {
        exposure: 1.4,
        bloom_strength: 0.3,
        ssao_intensity: 1.0,
        fog: Some(FogParams {
            color: Vec3::new(0.5, 0.55, 0.6),
            start: 10.0,
            end: 80.0,
        }),
        vignette: 0.4,
    }
}

fn assert_same(a: Vec3, b: Vec3) {
    assert!((a - b).abs().max_element() < EPSILON, "{a} != {b}");
}

// ============================================================================
// Neutral equivalence
// ============================================================================

#[test]
fn disabled_ssao_equals_unoccluded() {
    let toggles = FeatureToggles {
        ssao: false,
        ..FeatureToggles::ALL
    };
    let reference = CompositeSample {
        ssao: SSAO_NEUTRAL,
        ..sample()
    };
    assert_same(
        resolve_pixel(&toggles.apply(sample()), &params()),
        resolve_pixel(&reference, &params()),
    );
}

#[test]
fn disabled_volumetrics_equal_zero_scattering() {
    let toggles = FeatureToggles {
        volumetrics: false,
        ..FeatureToggles::ALL
    };
    let reference = CompositeSample {
        volumetric: Vec3::splat(VOLUMETRIC_NEUTRAL),
        ..sample()
    };
    assert_same(
        resolve_pixel(&toggles.apply(sample()), &params()),
        resolve_pixel(&reference, &params()),
    );
}

#[test]
fn disabled_bloom_equals_zero_bloom() {
    let toggles = FeatureToggles {
        bloom: false,
        ..FeatureToggles::ALL
    };
    let reference = CompositeSample {
        bloom: Vec3::splat(BLOOM_NEUTRAL),
        ..sample()
    };
    assert_same(
        resolve_pixel(&toggles.apply(sample()), &params()),
        resolve_pixel(&reference, &params()),
    );
}

#[test]
fn all_toggles_on_leave_the_sample_alone() {
    assert_eq!(FeatureToggles::ALL.apply(sample()), sample());
}

#[test]
fn neutral_values_have_no_effect() {
    let neutral = FeatureToggles::NONE.apply(sample());
    let mut no_extras = params();
    no_extras.bloom_strength = 0.0;
    no_extras.ssao_intensity = 0.0;
    let stripped = CompositeSample {
        volumetric: Vec3::ZERO,
        ..sample()
    };
    assert_same(resolve_pixel(&neutral, &params()), resolve_pixel(&stripped, &no_extras));
}

// ============================================================================
// Fog & tone mapping
// ============================================================================

#[test]
fn fog_skips_sky_pixels() {
    let sky = CompositeSample {
        view_distance: None,
        ..sample()
    };
    let without_fog = CompositeParams {
        fog: None,
        ..params()
    };
    assert_same(resolve_pixel(&sky, &params()), resolve_pixel(&sky, &without_fog));
}

#[test]
fn dense_fog_replaces_geometry_colour() {
    let far = CompositeSample {
        view_distance: Some(1000.0),
        ..sample()
    };
    let other = CompositeSample {
        direct: Vec3::splat(5.0),
        view_distance: Some(1000.0),
        ..sample()
    };
    assert_same(resolve_pixel(&far, &params()), resolve_pixel(&other, &params()));
}

#[test]
fn tone_mapped_output_stays_in_unit_range() {
    for exposure in [0.01, 1.0, 100.0] {
        let out = resolve_pixel(
            &sample(),
            &CompositeParams {
                exposure,
                ..params()
            },
        );
        assert!(out.min_element() >= 0.0 && out.max_element() <= 1.0);
    }
}

// ============================================================================
// Lens flare
// ============================================================================

#[test]
fn flare_anchor_uses_first_active_light() {
    let camera = Camera::new(Vec3::ZERO, 0.0, 0.0).extract_render_camera(1.0);
    let mut dark = Light::new_point(Vec3::new(5.0, 0.0, -10.0), Vec3::ONE, 1.0, 10.0);
    dark.intensity = 0.0;
    let ahead = Light::new_point(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE, 1.0, 10.0);

    let anchor = lens_flare_anchor([&dark, &ahead], camera.view_projection);
    let anchor = anchor.unwrap_or(Vec2::splat(-1.0));
    assert!((anchor - Vec2::splat(0.5)).length() < 1e-4);
}

#[test]
fn light_behind_camera_has_no_flare() {
    let camera = Camera::new(Vec3::ZERO, 0.0, 0.0).extract_render_camera(1.0);
    let behind = Light::new_point(Vec3::new(0.0, 0.0, 10.0), Vec3::ONE, 1.0, 10.0);
    let ahead = Light::new_point(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE, 1.0, 10.0);
    // Only the first active light is considered.
    assert!(lens_flare_anchor([&behind, &ahead], camera.view_projection).is_none());
}

// ============================================================================
// Post uniforms
// ============================================================================

fn view(kind: ViewKind, features: FeatureToggles) -> ViewContext {
    ViewContext {
        camera: Camera::default().extract_render_camera(1.0),
        prev_view_projection: Mat4::IDENTITY,
        kind,
        dt: 0.016,
        time: 2.0,
        features,
        output_format: wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

#[test]
fn probe_view_uniforms_are_neutral() {
    let settings = RenderSettings::default();
    let blackboard = FrameBlackboard {
        neutral_exposure: true,
        ..Default::default()
    };
    let post = build_post_uniforms(
        &Environment::default(),
        &settings,
        &view(ViewKind::ProbeFace, FeatureToggles::NONE),
        &blackboard,
    );
    assert_eq!(post.flags.y, 0.0, "ssao intensity");
    assert_eq!(post.fog_params.z, 0.0, "bloom strength");
    assert_eq!(post.flags.z, 1.0, "neutral exposure");
    assert_eq!(post.flags.x, 0.0, "no flare");
}

#[test]
fn main_view_uniforms_follow_settings() {
    let settings = RenderSettings::default();
    let post = build_post_uniforms(
        &Environment::default(),
        &settings,
        &view(ViewKind::Main, FeatureToggles::ALL),
        &FrameBlackboard::default(),
    );
    let expected_ssao = if settings.ssao.enabled { settings.ssao.intensity } else { 0.0 };
    assert!((post.flags.y - expected_ssao).abs() < EPSILON);
    assert!((post.fog_params.z - settings.bloom.effective_strength()).abs() < EPSILON);
    assert!((post.fog_params.w - 2.0).abs() < EPSILON);
    assert_eq!(post.flags.z, 0.0);
}
