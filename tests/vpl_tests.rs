//! VPL Tests
//!
//! Tests for:
//! - Budget split over lights in insertion order
//! - Point lights: quota split over six cube faces
//! - The running count never exceeding the buffer capacity
//! - Inactive lights contributing nothing
//! - Injection parameters carrying the whole light quota

use glam::Vec3;

use myth_deferred::renderer::graph::passes::plan_vpl_views;
use myth_deferred::resources::vpl::{VPL_AUX_SIZE, VplAllocator, VplSettings, vpl_sample_texel};
use myth_deferred::scene::{Light, Scene};

const SUN_DISTANCE: f32 = 60.0;

fn point_at_origin() -> Light {
    Light::new_point(Vec3::ZERO, Vec3::ONE, 1.0, 10.0)
}

#[test]
fn point_light_quota_48_gives_eight_per_face() {
    let mut scene = Scene::new();
    let id = scene.add_light(point_at_origin());

    let mut allocator = VplAllocator::new(1024);
    let views = plan_vpl_views(&scene, 48, &mut allocator, Vec3::ZERO, SUN_DISTANCE);

    assert_eq!(views.len(), 6);
    for (face, view) in views.iter().enumerate() {
        assert_eq!(view.light, id);
        assert_eq!(view.face, Some(face as u8));
        assert_eq!(view.count, 8);
        assert_eq!(view.offset, face as u32 * 8);
    }
    assert_eq!(allocator.count(), 48);
}

#[test]
fn zero_intensity_light_contributes_nothing() {
    let mut scene = Scene::new();
    let mut light = point_at_origin();
    light.intensity = 0.0;
    scene.add_light(light);
    scene.add_light(Light::new_spot(Vec3::ZERO, Vec3::NEG_Y, Vec3::ONE, -2.0, 10.0, 0.2, 0.4));

    let mut allocator = VplAllocator::new(1024);
    let views = plan_vpl_views(&scene, 48, &mut allocator, Vec3::ZERO, SUN_DISTANCE);

    assert!(views.is_empty());
    assert_eq!(allocator.count(), 0);
}

#[test]
fn budget_is_never_exceeded() {
    let mut scene = Scene::new();
    for i in 0..10 {
        scene.add_light(Light::new_point(Vec3::new(i as f32, 0.0, 0.0), Vec3::ONE, 1.0, 5.0));
        scene.add_light(Light::new_spot(
            Vec3::new(0.0, i as f32, 0.0),
            Vec3::NEG_Y,
            Vec3::ONE,
            1.0,
            10.0,
            0.2,
            0.4,
        ));
    }
    scene.add_light(Light::new_directional(Vec3::NEG_Y, Vec3::ONE, 1.0));

    for capacity in [0, 1, 7, 48, 100, 333, 1024] {
        let mut allocator = VplAllocator::new(capacity);
        let views = plan_vpl_views(&scene, 96, &mut allocator, Vec3::ZERO, SUN_DISTANCE);

        let total: u32 = views.iter().map(|v| v.count).sum();
        assert!(total <= capacity, "capacity {capacity}: {total} records planned");
        assert_eq!(total, allocator.count());

        // Views are contiguous and non-overlapping.
        let mut cursor = 0;
        for view in &views {
            assert_eq!(view.offset, cursor);
            cursor += view.count;
        }
    }
}

#[test]
fn later_lights_fill_leftover_budget_or_are_dropped() {
    let mut scene = Scene::new();
    let first = scene.add_light(point_at_origin());
    let second = scene.add_light(point_at_origin());

    // Room for the first light's 48 plus three faces of the second.
    let mut allocator = VplAllocator::new(48 + 24);
    let views = plan_vpl_views(&scene, 48, &mut allocator, Vec3::ZERO, SUN_DISTANCE);

    assert_eq!(views.iter().filter(|v| v.light == first).count(), 6);
    assert_eq!(views.iter().filter(|v| v.light == second).count(), 3);
    assert_eq!(allocator.count(), 72);
    assert_eq!(allocator.remaining(), 0);
}

#[test]
fn quota_below_six_skips_point_lights() {
    let mut scene = Scene::new();
    scene.add_light(point_at_origin());
    let mut allocator = VplAllocator::new(1024);
    let views = plan_vpl_views(&scene, 5, &mut allocator, Vec3::ZERO, SUN_DISTANCE);
    assert!(views.is_empty());
}

#[test]
fn spot_and_sun_take_the_whole_quota_in_one_view() {
    let mut scene = Scene::new();
    scene.add_light(Light::new_spot(Vec3::ZERO, Vec3::NEG_Y, Vec3::ONE, 1.0, 10.0, 0.2, 0.4));
    scene.add_light(Light::new_directional(Vec3::new(0.3, -1.0, 0.0), Vec3::ONE, 1.0));

    let mut allocator = VplAllocator::new(1024);
    let views = plan_vpl_views(&scene, 32, &mut allocator, Vec3::ZERO, SUN_DISTANCE);

    assert_eq!(views.len(), 2);
    assert!(views.iter().all(|v| v.face.is_none() && v.count == 32));
    assert_eq!(views[1].offset, 32);
}

#[test]
fn default_settings_fit_their_buffer() {
    let settings = VplSettings::default();
    assert!(settings.quota_per_light <= settings.max_vpls);
    assert_eq!(settings.quota_per_light % 6, 0);
}

#[test]
fn sampled_texels_stay_distinct_for_a_full_face() {
    let mut seen = std::collections::HashSet::new();
    for i in 0..8 {
        assert!(seen.insert(vpl_sample_texel(i, 8)));
    }
}

#[test]
fn every_face_normalizes_by_the_whole_light_quota() {
    let mut scene = Scene::new();
    scene.add_light(point_at_origin());
    scene.add_light(Light::new_spot(Vec3::ZERO, Vec3::NEG_Y, Vec3::ONE, 1.0, 10.0, 0.2, 0.4));

    let mut allocator = VplAllocator::new(1024);
    let views = plan_vpl_views(&scene, 48, &mut allocator, Vec3::ZERO, SUN_DISTANCE);
    assert_eq!(views.len(), 7);

    for view in &views {
        let [offset, count, size, quota] = view.inject_params();
        assert_eq!((offset, count, size), (view.offset, view.count, VPL_AUX_SIZE));
        assert_eq!(quota, 48, "{:?} face {:?}", view.light, view.face);
    }

    // A point face injects 8 records each weighted 1/48, so its six faces sum
    // to the same total weight as the spot's single 48-record view.
    let point_weight: f32 = views[..6].iter().map(|v| v.count as f32 / v.inject_params()[3] as f32).sum();
    let spot_weight = views[6].count as f32 / views[6].inject_params()[3] as f32;
    assert!((point_weight - 1.0).abs() < 1e-6);
    assert!((spot_weight - 1.0).abs() < 1e-6);
}

#[test]
fn partially_planned_point_light_keeps_its_full_quota() {
    let mut scene = Scene::new();
    scene.add_light(point_at_origin());

    let mut allocator = VplAllocator::new(24);
    let views = plan_vpl_views(&scene, 48, &mut allocator, Vec3::ZERO, SUN_DISTANCE);

    assert_eq!(views.len(), 3);
    assert!(views.iter().all(|v| v.inject_params()[3] == 48));
}
