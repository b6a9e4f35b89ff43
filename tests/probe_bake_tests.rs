//! Probe Bake Tests
//!
//! Tests for:
//! - Six PNG faces per named probe, `<name>_<suffix>.png`
//! - Live cubemap handles installed and previous ones released
//! - Unnamed probes skipped without aborting the bake
//! - Named volumes without geometry skipped instead of capturing from NaN
//! - Capture cameras centred on the probe volume, in cube-layer order

use std::path::Path;

use glam::Vec3;
use slotmap::SlotMap;

use myth_deferred::errors::{RenderError, Result};
use myth_deferred::renderer::graph::shadow_utils::CUBE_FACES;
use myth_deferred::renderer::probe_bake::{FACE_SUFFIXES, PROBE_FACE_SIZE, ProbeCapture, build_cubemaps};
use myth_deferred::resources::geometry::BoundingBox;
use myth_deferred::resources::texture::Image;
use myth_deferred::scene::{Brush, BrushFlags, CubemapHandle, ProbeData, RenderCamera, Scene};

/// CPU stand-in for the renderer: fills each face with a colour derived
/// from the capture direction and keeps cubemaps in a slot map.
#[derive(Default)]
struct MockCapture {
    cameras: Vec<RenderCamera>,
    cubemaps: SlotMap<CubemapHandle, [Image; 6]>,
    released: Vec<CubemapHandle>,
    fail_after: Option<usize>,
}

impl ProbeCapture for MockCapture {
    fn capture_face(&mut self, _scene: &Scene, camera: &RenderCamera) -> Result<Image> {
        if self.fail_after.is_some_and(|n| self.cameras.len() >= n) {
            return Err(RenderError::ReadbackFailed("device lost".to_string()));
        }
        self.cameras.push(*camera);
        let shade = (self.cameras.len() * 40 % 256) as u8;
        Ok(Image::solid(PROBE_FACE_SIZE, PROBE_FACE_SIZE, [shade, 128, 255 - shade, 255]))
    }

    fn install_cubemap(&mut self, faces: &[Image; 6]) -> Result<CubemapHandle> {
        Ok(self.cubemaps.insert(faces.clone()))
    }

    fn release_cubemap(&mut self, handle: CubemapHandle) {
        self.cubemaps.remove(handle);
        self.released.push(handle);
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn two_probe_scene() -> Scene {
    let mut scene = Scene::new();
    scene.brushes.push(Brush::probe("hall", BoundingBox::new(Vec3::ZERO, Vec3::splat(10.0))));
    scene.brushes.push(Brush::probe(
        "cellar",
        BoundingBox::new(Vec3::new(20.0, -4.0, 0.0), Vec3::new(24.0, 0.0, 4.0)),
    ));
    scene
}

fn probe_handle(scene: &Scene, index: usize) -> Option<CubemapHandle> {
    scene.brushes[index].probe.as_ref().and_then(|p| p.cubemap)
}

#[test]
fn two_named_probes_write_twelve_faces() {
    init_logger();
    let dir = tempfile::tempdir().expect("temp dir");
    let mut scene = two_probe_scene();
    let mut baker = MockCapture::default();

    let report = build_cubemaps(&mut scene, &mut baker, dir.path()).expect("bake");

    assert_eq!(report.baked, vec!["hall".to_string(), "cellar".to_string()]);
    assert_eq!(report.files.len(), 12);
    for name in ["hall", "cellar"] {
        for suffix in FACE_SUFFIXES {
            let path = dir.path().join(format!("{name}_{suffix}.png"));
            assert!(path.is_file(), "missing {}", path.display());
        }
    }
    let written = std::fs::read_dir(dir.path()).expect("read dir").count();
    assert_eq!(written, 12);
}

#[test]
fn saved_faces_decode_as_rgba_png() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut scene = two_probe_scene();
    let mut baker = MockCapture::default();
    build_cubemaps(&mut scene, &mut baker, dir.path()).expect("bake");

    let decoded = image::open(dir.path().join("hall_px.png")).expect("decode").to_rgba8();
    assert_eq!(decoded.dimensions(), (PROBE_FACE_SIZE, PROBE_FACE_SIZE));
    assert_eq!(decoded.as_raw().as_slice(), baker.cubemaps.values().next().expect("installed")[0].data.as_slice());
}

#[test]
fn bake_installs_a_live_cubemap_per_probe() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut scene = two_probe_scene();
    let mut baker = MockCapture::default();
    build_cubemaps(&mut scene, &mut baker, dir.path()).expect("bake");

    let hall = probe_handle(&scene, 0).expect("hall cubemap");
    let cellar = probe_handle(&scene, 1).expect("cellar cubemap");
    assert_ne!(hall, cellar);
    assert!(baker.cubemaps.contains_key(hall));
    assert!(baker.cubemaps.contains_key(cellar));
}

#[test]
fn rebake_replaces_and_releases_previous_cubemaps() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut scene = two_probe_scene();
    let mut baker = MockCapture::default();

    build_cubemaps(&mut scene, &mut baker, dir.path()).expect("first bake");
    let first = [probe_handle(&scene, 0), probe_handle(&scene, 1)];
    build_cubemaps(&mut scene, &mut baker, dir.path()).expect("second bake");
    let second = [probe_handle(&scene, 0), probe_handle(&scene, 1)];

    assert_ne!(first, second);
    assert_eq!(baker.cubemaps.len(), 2);
    assert_eq!(baker.released.len(), 2);
    for handle in first.into_iter().flatten() {
        assert!(baker.released.contains(&handle));
    }
}

#[test]
fn unnamed_probe_is_skipped() {
    init_logger();
    let dir = tempfile::tempdir().expect("temp dir");
    let mut scene = two_probe_scene();
    scene.brushes.insert(1, Brush::probe("  ", BoundingBox::new(Vec3::ZERO, Vec3::ONE)));
    let mut baker = MockCapture::default();

    let report = build_cubemaps(&mut scene, &mut baker, dir.path()).expect("bake");

    assert_eq!(report.skipped, vec![1]);
    assert_eq!(report.baked.len(), 2);
    assert_eq!(report.files.len(), 12);
    assert_eq!(probe_handle(&scene, 1), None);
    assert!(probe_handle(&scene, 2).is_some());
}

#[test]
fn named_volume_without_vertices_is_skipped() {
    init_logger();
    let dir = tempfile::tempdir().expect("temp dir");
    let mut scene = two_probe_scene();
    let mut hollow = Brush::default().with_flags(BrushFlags::PROBE);
    hollow.probe = Some(ProbeData {
        name: "void".to_string(),
        cubemap: None,
    });
    scene.brushes.push(hollow);
    let mut baker = MockCapture::default();

    let report = build_cubemaps(&mut scene, &mut baker, dir.path()).expect("bake");

    assert_eq!(report.skipped, vec![2]);
    assert_eq!(report.baked, vec!["hall".to_string(), "cellar".to_string()]);
    assert!(!dir.path().join("void_px.png").exists());
    assert_eq!(probe_handle(&scene, 2), None);
    assert_eq!(baker.cameras.len(), 12);
    assert!(baker.cameras.iter().all(|c| c.position.is_finite()));
}

#[test]
fn capture_cameras_sit_at_the_probe_centre() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut scene = two_probe_scene();
    let mut baker = MockCapture::default();
    build_cubemaps(&mut scene, &mut baker, dir.path()).expect("bake");

    assert_eq!(baker.cameras.len(), 12);
    let centres = [Vec3::splat(5.0), Vec3::new(22.0, -2.0, 2.0)];
    for (i, camera) in baker.cameras.iter().enumerate() {
        assert!((camera.position - centres[i / 6]).length() < 1e-5);
        let (forward, _) = CUBE_FACES[i % 6];
        let ahead = camera.view_projection * (camera.position + forward).extend(1.0);
        assert!(ahead.w > 0.0);
        assert!((ahead.x / ahead.w).abs() < 1e-4 && (ahead.y / ahead.w).abs() < 1e-4);
    }
}

#[test]
fn failed_capture_aborts_without_touching_later_probes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut scene = two_probe_scene();
    let mut baker = MockCapture {
        fail_after: Some(8),
        ..Default::default()
    };

    let result = build_cubemaps(&mut scene, &mut baker, dir.path());
    assert!(matches!(result, Err(RenderError::ReadbackFailed(_))));
    assert!(probe_handle(&scene, 0).is_some());
    assert_eq!(probe_handle(&scene, 1), None);
}

#[test]
fn scene_without_probes_bakes_nothing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut scene = Scene::new();
    let mut baker = MockCapture::default();
    let report = build_cubemaps(&mut scene, &mut baker, Path::new(dir.path())).expect("bake");
    assert!(report.baked.is_empty() && report.files.is_empty());
}
