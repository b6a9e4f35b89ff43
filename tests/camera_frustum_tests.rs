//! Camera & Frustum Tests
//!
//! Tests for:
//! - Frustum plane extraction and AABB visibility
//! - Cube-face cameras (90° views, Y-flipped projection)
//! - Reflection-probe lookup: inclusive bounds, first match in scan order
//! - Draw-list culling over scene objects and brushes

use glam::{Mat4, Vec3};

use myth_deferred::renderer::graph::cull::{DrawItem, cull_scene};
use myth_deferred::renderer::graph::shadow_utils::{CUBE_FACES, cube_face_cameras};
use myth_deferred::resources::geometry::{BoundingBox, Mesh};
use myth_deferred::resources::material::MaterialLayers;
use myth_deferred::scene::{Brush, Camera, Frustum, RenderCamera, Scene, SceneObject};

const EPSILON: f32 = 1e-4;

fn looking_down_neg_z() -> Frustum {
    let camera = Camera::new(Vec3::ZERO, 0.0, 0.0);
    camera.extract_render_camera(1.0).frustum()
}

// ============================================================================
// Frustum
// ============================================================================

#[test]
fn box_in_front_is_visible() {
    let frustum = looking_down_neg_z();
    let aabb = BoundingBox::from_center_half_extents(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE);
    assert!(frustum.intersects_aabb(&aabb));
}

#[test]
fn box_behind_is_culled() {
    let frustum = looking_down_neg_z();
    let aabb = BoundingBox::from_center_half_extents(Vec3::new(0.0, 0.0, 10.0), Vec3::ONE);
    assert!(!frustum.intersects_aabb(&aabb));
}

#[test]
fn box_beyond_far_plane_is_culled() {
    let frustum = looking_down_neg_z();
    let aabb = BoundingBox::from_center_half_extents(Vec3::new(0.0, 0.0, -5000.0), Vec3::ONE);
    assert!(!frustum.intersects_aabb(&aabb));
}

#[test]
fn box_far_to_the_side_is_culled() {
    let frustum = looking_down_neg_z();
    let aabb = BoundingBox::from_center_half_extents(Vec3::new(500.0, 0.0, -10.0), Vec3::ONE);
    assert!(!frustum.intersects_aabb(&aabb));
}

#[test]
fn box_straddling_a_plane_is_visible() {
    let frustum = looking_down_neg_z();
    // Crosses the near plane.
    let aabb = BoundingBox::new(Vec3::new(-1.0, -1.0, -2.0), Vec3::new(1.0, 1.0, 2.0));
    assert!(frustum.intersects_aabb(&aabb));
}

#[test]
fn empty_box_is_never_visible() {
    let frustum = looking_down_neg_z();
    assert!(!frustum.intersects_aabb(&BoundingBox::EMPTY));
}

#[test]
fn frustum_planes_are_normalized() {
    let frustum = looking_down_neg_z();
    for plane in frustum.planes() {
        assert!((plane.truncate().length() - 1.0).abs() < EPSILON);
    }
}

#[test]
fn sphere_test_agrees_with_box_test() {
    let frustum = looking_down_neg_z();
    assert!(frustum.intersects_sphere(Vec3::new(0.0, 0.0, -10.0), 1.0));
    assert!(!frustum.intersects_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0));
}

// ============================================================================
// Cube faces
// ============================================================================

#[test]
fn cube_face_cameras_look_along_their_axis() {
    let center = Vec3::new(2.0, 1.0, -3.0);
    for (camera, (forward, _)) in cube_face_cameras(center, 0.1, 100.0).iter().zip(CUBE_FACES) {
        let target = center + forward * 10.0;
        let clip = camera.view_projection * target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < EPSILON && ndc.y.abs() < EPSILON);
        assert!(camera.frustum().intersects_sphere(target, 0.5));
    }
}

#[test]
fn cube_face_projection_flips_y() {
    let camera = RenderCamera::cube_face(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 0.1, 100.0);
    // A point above the view axis lands in the lower half of NDC.
    let clip = camera.view_projection * Vec3::new(0.0, 1.0, -5.0).extend(1.0);
    assert!(clip.y / clip.w < 0.0);
}

#[test]
fn render_camera_inverse_round_trips() {
    let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), 0.4, -0.2).extract_render_camera(16.0 / 9.0);
    let product = camera.view_projection * camera.inverse_view_projection;
    assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-3));
}

// ============================================================================
// Probe lookup
// ============================================================================

fn probe_scene() -> Scene {
    let mut scene = Scene::new();
    scene.brushes.push(Brush::probe(
        "hall",
        BoundingBox::new(Vec3::ZERO, Vec3::splat(10.0)),
    ));
    scene.brushes.push(Brush::probe(
        "alcove",
        BoundingBox::new(Vec3::splat(5.0), Vec3::splat(15.0)),
    ));
    scene
}

#[test]
fn camera_on_probe_boundary_is_inside() {
    let scene = probe_scene();
    assert_eq!(scene.find_probe(Vec3::new(10.0, 0.0, 0.0)), Some(0));
    assert_eq!(scene.find_probe(Vec3::ZERO), Some(0));
}

#[test]
fn overlapping_probes_resolve_to_first_in_scan_order() {
    let scene = probe_scene();
    // Inside both; the alcove's centre is closer but the hall comes first.
    assert_eq!(scene.find_probe(Vec3::splat(9.0)), Some(0));
    assert_eq!(scene.find_probe(Vec3::splat(12.0)), Some(1));
}

#[test]
fn point_outside_every_probe_has_none() {
    let scene = probe_scene();
    assert_eq!(scene.find_probe(Vec3::splat(-1.0)), None);
}

// ============================================================================
// Culling
// ============================================================================

#[test]
fn culling_keeps_only_objects_in_view() {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(Mesh::cuboid(Vec3::ONE));
    scene.objects.push(SceneObject::new(
        mesh,
        Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)),
        MaterialLayers::new(),
    ));
    scene.objects.push(SceneObject::new(
        mesh,
        Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0)),
        MaterialLayers::new(),
    ));
    // Probe brushes are never drawn.
    scene.brushes.push(Brush::probe("hall", BoundingBox::new(Vec3::splat(-20.0), Vec3::splat(20.0))));

    let list = cull_scene(&scene, &looking_down_neg_z());
    assert_eq!(list.items.as_slice(), &[DrawItem::Object(0)]);
}
