//! Shadow Tests
//!
//! Tests for:
//! - Shadow kind per light (inactive lights never shadow)
//! - Slot assignment: cube layers, planar layers, the sun on layer 0
//! - Slot release when a light leaves the scene or stops casting
//! - Exhausted layers degrade to unshadowed lights
//! - Light view/projection helpers

use glam::{Vec3, Vec4};

use myth_deferred::renderer::core::resources::shadow_atlas::{SUN_SHADOW_LAYER, ShadowSlots};
use myth_deferred::renderer::graph::shadow_utils::{
    cube_face_view_projections, point_shadow_far, spot_view_projection, sun_view_projection,
};
use myth_deferred::scene::{Light, Scene, ShadowKind};

fn point(intensity: f32) -> Light {
    Light::new_point(Vec3::ZERO, Vec3::ONE, intensity, 10.0)
}

fn spot() -> Light {
    Light::new_spot(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, Vec3::ONE, 2.0, 20.0, 0.3, 0.5)
}

fn sun() -> Light {
    Light::new_directional(Vec3::new(0.2, -1.0, 0.1), Vec3::ONE, 3.0)
}

// ============================================================================
// Shadow kinds
// ============================================================================

#[test]
fn inactive_light_never_casts_shadows() {
    assert_eq!(point(0.0).shadow_kind(), ShadowKind::None);
    assert_eq!(point(-1.0).shadow_kind(), ShadowKind::None);
    assert_eq!(point(1.0).with_shadows(false).shadow_kind(), ShadowKind::None);
}

#[test]
fn shadow_kind_follows_light_kind() {
    assert_eq!(point(1.0).shadow_kind(), ShadowKind::Cube);
    assert_eq!(spot().shadow_kind(), ShadowKind::Planar);
    assert_eq!(sun().shadow_kind(), ShadowKind::Planar);
}

// ============================================================================
// Slot assignment
// ============================================================================

#[test]
fn zero_intensity_light_gets_no_slot() {
    let mut scene = Scene::new();
    let dark = scene.add_light(point(0.0));
    let lit = scene.add_light(point(1.0));

    let mut slots = ShadowSlots::new(4);
    slots.sync(&scene, true);

    assert_eq!(slots.cube_layer(dark), None);
    assert_eq!(slots.cube_layer(lit), Some(0));
    assert_eq!(slots.shadowed_count(), 1);
}

#[test]
fn first_directional_light_owns_the_sun_layer() {
    let mut scene = Scene::new();
    let first = scene.add_light(sun());
    let second = scene.add_light(sun());
    let spot_id = scene.add_light(spot());

    let mut slots = ShadowSlots::new(4);
    slots.sync(&scene, true);

    assert_eq!(slots.sun(), Some(first));
    assert_eq!(slots.planar_layer(first), Some(SUN_SHADOW_LAYER));
    assert_eq!(slots.planar_layer(second), None);
    // Spot lights never receive the sun layer.
    assert_eq!(slots.planar_layer(spot_id), Some(1));
}

#[test]
fn removed_light_releases_its_layer() {
    let mut scene = Scene::new();
    let a = scene.add_light(point(1.0));
    let b = scene.add_light(point(1.0));

    let mut slots = ShadowSlots::new(2);
    slots.sync(&scene, true);
    assert_eq!(slots.cube_layer(a), Some(0));
    assert_eq!(slots.cube_layer(b), Some(1));

    scene.remove_light(a);
    let c = scene.add_light(point(1.0));
    slots.sync(&scene, true);

    assert_eq!(slots.cube_layer(a), None);
    assert_eq!(slots.cube_layer(b), Some(1));
    assert_eq!(slots.cube_layer(c), Some(0));
}

#[test]
fn dimmed_light_releases_its_layer() {
    let mut scene = Scene::new();
    let id = scene.add_light(spot());
    let mut slots = ShadowSlots::new(2);
    slots.sync(&scene, true);
    assert!(slots.planar_layer(id).is_some());

    if let Some(light) = scene.light_mut(id) {
        light.intensity = 0.0;
    }
    slots.sync(&scene, true);
    assert_eq!(slots.planar_layer(id), None);
    assert_eq!(slots.shadowed_count(), 0);
}

#[test]
fn exhausted_layers_leave_later_lights_unshadowed() {
    let mut scene = Scene::new();
    let ids: Vec<_> = (0..3).map(|_| scene.add_light(point(1.0))).collect();

    let mut slots = ShadowSlots::new(2);
    slots.sync(&scene, true);

    assert!(slots.cube_layer(ids[0]).is_some());
    assert!(slots.cube_layer(ids[1]).is_some());
    assert_eq!(slots.cube_layer(ids[2]), None);
}

#[test]
fn disabling_shadows_releases_everything() {
    let mut scene = Scene::new();
    scene.add_light(point(1.0));
    scene.add_light(spot());
    scene.add_light(sun());

    let mut slots = ShadowSlots::new(4);
    slots.sync(&scene, true);
    assert_eq!(slots.shadowed_count(), 3);

    slots.sync(&scene, false);
    assert_eq!(slots.shadowed_count(), 0);
    assert_eq!(slots.sun(), None);
}

// ============================================================================
// Light views
// ============================================================================

#[test]
fn point_shadow_faces_cover_the_light_range() {
    let light = point(1.0);
    let far = point_shadow_far(&light);
    assert!((far - 10.0).abs() < 1e-5);

    let vps = cube_face_view_projections(light.position, far);
    // A point inside the radius along +X is inside face 0 only.
    let p = Vec4::new(5.0, 0.0, 0.0, 1.0);
    let inside: Vec<bool> = vps
        .iter()
        .map(|vp| {
            let clip = *vp * p;
            clip.w > 0.0 && (clip.truncate() / clip.w).abs().cmple(Vec3::ONE).all()
        })
        .collect();
    assert!(inside[0]);
    assert!(!inside[1]);
}

#[test]
fn spot_projection_only_for_spot_lights() {
    assert!(spot_view_projection(&spot()).is_some());
    assert!(spot_view_projection(&point(1.0)).is_none());
    assert!(spot_view_projection(&sun()).is_none());
}

#[test]
fn sun_projection_follows_the_focus() {
    let focus = Vec3::new(40.0, 0.0, -40.0);
    let vp = sun_view_projection(Vec3::NEG_Y, focus, 30.0);
    let clip = vp * focus.extend(1.0);
    assert!(clip.x.abs() < 1e-3 && clip.y.abs() < 1e-3);

    let outside = vp * (focus + Vec3::new(100.0, 0.0, 0.0)).extend(1.0);
    assert!(outside.x.abs() > 1.0 || outside.y.abs() > 1.0);
}
