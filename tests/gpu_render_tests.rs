//! GPU Render Tests
//!
//! Tests for:
//! - Decals changing the lit, presented image (not only the albedo buffer)
//! - Disabled SSAO matching SSAO that contributes no occlusion
//! - Persisted exposure moving steadily toward its target across frames
//! - Disabled auto-exposure pinning the buffer to the neutral value
//!
//! Every test needs a GPU adapter and returns early when none is available.

use glam::{Mat4, Vec3};

use myth_deferred::resources::tone_mapping::{ExposureSettings, NEUTRAL_EXPOSURE};
use myth_deferred::scene::{Decal, SceneObject};
use myth_deferred::{
    Camera, ContextSettings, Image, Light, MaterialLayer, MaterialLayers, Mesh, RenderSettings, Renderer, Scene,
    WgpuContext,
};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 64;
const EPSILON: f32 = 1e-5;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn headless_renderer(settings: RenderSettings) -> Option<Renderer> {
    init_logger();
    match pollster::block_on(WgpuContext::new_headless(&ContextSettings::default())) {
        Ok(ctx) => Some(Renderer::new(ctx, WIDTH, HEIGHT, settings)),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

/// A magenta wall filling the view, lit head-on by a sun and a bright ambient.
fn wall_scene() -> Scene {
    let mut scene = Scene::new();
    let magenta = scene.add_texture(Image::solid(4, 4, [188, 0, 188, 255]));
    let wall = scene.add_mesh(Mesh::cuboid(Vec3::new(4.0, 4.0, 0.1)));
    scene.objects.push(SceneObject::new(
        wall,
        Mat4::IDENTITY,
        MaterialLayers::single(MaterialLayer::albedo(magenta)),
    ));
    scene.add_light(Light::new_directional(Vec3::NEG_Z, Vec3::ONE, 1.0));
    scene.environment.ambient = Vec3::splat(0.6);
    scene
}

fn wall_camera() -> Camera {
    Camera::new(Vec3::new(0.0, 0.0, 3.0), 0.0, 0.0)
}

fn centre(image: &Image) -> [u8; 4] {
    image.pixel(WIDTH / 2, HEIGHT / 2)
}

// ============================================================================
// Decals
// ============================================================================

#[test]
fn decal_tints_the_presented_image() {
    let settings = RenderSettings {
        exposure: ExposureSettings {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let Some(mut renderer) = headless_renderer(settings) else {
        return;
    };
    let camera = wall_camera();

    let mut scene = wall_scene();
    renderer.render_frame(&scene, &camera, 0.0);
    let plain = renderer.read_output().expect("readback");

    let red = scene.add_texture(Image::solid(4, 4, [255, 0, 0, 255]));
    scene.decals.push(Decal {
        transform: Mat4::from_translation(Vec3::new(0.0, 0.0, 0.1)) * Mat4::from_scale(Vec3::splat(2.0)),
        texture: Some(red),
        opacity: 1.0,
    });
    renderer.render_frame(&scene, &camera, 0.0);
    let tinted = renderer.read_output().expect("readback");

    let (before, after) = (centre(&plain), centre(&tinted));
    assert!(before[2] > 0, "wall should show its blue component: {before:?}");
    assert!(after[2] < before[2], "decal did not reach the lit output: {before:?} -> {after:?}");
    assert!(after[0] >= before[0], "red decal darkened red: {before:?} -> {after:?}");
}

#[test]
fn transparent_decal_leaves_the_image_unchanged() {
    let Some(mut renderer) = headless_renderer(RenderSettings::default()) else {
        return;
    };
    let camera = wall_camera();

    let mut scene = wall_scene();
    renderer.render_frame(&scene, &camera, 0.0);
    let plain = renderer.read_output().expect("readback");

    let red = scene.add_texture(Image::solid(4, 4, [255, 0, 0, 255]));
    scene.decals.push(Decal {
        transform: Mat4::from_translation(Vec3::new(0.0, 0.0, 0.1)),
        texture: Some(red),
        opacity: 0.0,
    });
    renderer.render_frame(&scene, &camera, 0.0);
    let faded = renderer.read_output().expect("readback");

    assert_eq!(centre(&plain), centre(&faded));
}

// ============================================================================
// SSAO
// ============================================================================

#[test]
fn disabled_ssao_matches_zero_intensity() {
    let mut off = RenderSettings::default();
    off.ssao.enabled = false;
    let mut zero = RenderSettings::default();
    zero.ssao.intensity = 0.0;

    let mut images = Vec::new();
    for settings in [off, zero] {
        let Some(mut renderer) = headless_renderer(settings) else {
            return;
        };
        renderer.render_frame(&wall_scene(), &wall_camera(), 0.0);
        images.push(renderer.read_output().expect("readback"));
    }

    let (a, b) = (&images[0], &images[1]);
    let worst = a
        .data
        .iter()
        .zip(&b.data)
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0);
    assert!(worst <= 1, "neutral SSAO differs from disabled SSAO by {worst}");
}

// ============================================================================
// Exposure
// ============================================================================

#[test]
fn exposure_moves_monotonically_toward_its_target() {
    let Some(mut renderer) = headless_renderer(RenderSettings::default()) else {
        return;
    };
    let settings = renderer.settings().exposure;
    let scene = wall_scene();
    let camera = wall_camera();

    let mut values = vec![renderer.read_exposure().expect("readback").exposure];
    assert!((values[0] - NEUTRAL_EXPOSURE).abs() < EPSILON);
    for _ in 0..6 {
        renderer.render_frame(&scene, &camera, 0.1);
        values.push(renderer.read_exposure().expect("readback").exposure);
    }

    for v in &values {
        assert!(v.is_finite());
        assert!(*v >= settings.min_exposure - EPSILON && *v <= settings.max_exposure + EPSILON);
    }
    let steps: Vec<f32> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let direction = steps.iter().copied().find(|s| s.abs() > EPSILON).unwrap_or(0.0);
    for step in &steps {
        assert!(step * direction >= -EPSILON, "exposure reversed direction: {values:?}");
    }
    // Each step closes part of the remaining gap, so steps shrink.
    for w in steps.windows(2) {
        assert!(w[1].abs() <= w[0].abs() + EPSILON, "exposure overshot: {values:?}");
    }
}

#[test]
fn disabled_exposure_pins_the_buffer_to_neutral() {
    let Some(mut renderer) = headless_renderer(RenderSettings::default()) else {
        return;
    };
    let scene = wall_scene();
    let camera = wall_camera();
    for _ in 0..3 {
        renderer.render_frame(&scene, &camera, 0.1);
    }

    renderer.settings_mut().exposure.enabled = false;
    renderer.render_frame(&scene, &camera, 0.1);
    let value = renderer.read_exposure().expect("readback");
    assert!((value.exposure - NEUTRAL_EXPOSURE).abs() < EPSILON);

    renderer.render_frame(&scene, &camera, 0.1);
    let value = renderer.read_exposure().expect("readback");
    assert!((value.exposure - NEUTRAL_EXPOSURE).abs() < EPSILON);
}
