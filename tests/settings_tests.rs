//! Settings Tests
//!
//! Tests for:
//! - Defaults
//! - Partial JSON overrides keeping every unnamed field at its default
//! - Enum spelling (`snake_case`)
//! - Error reporting for malformed files
//! - G-buffer extent derivation

use std::io::Write;

use myth_deferred::errors::RenderError;
use myth_deferred::renderer::settings::{DebugView, FaceCulling, RenderSettings};
use myth_deferred::resources::texture::TextureQuality;
use myth_deferred::resources::vpl::VplMode;

#[test]
fn defaults_enable_the_full_pipeline() {
    let s = RenderSettings::default();
    assert!(s.shadows);
    assert!(s.ssao.enabled && s.volumetrics.enabled && s.bloom.enabled);
    assert!(s.exposure.enabled && s.vpl.enabled);
    assert!(s.depth_aa);
    assert!(!s.motion_blur);
    assert_eq!(s.debug_view, None);
    assert_eq!(s.face_culling, FaceCulling::Back);
}

#[test]
fn empty_object_is_the_default() {
    let parsed = RenderSettings::from_json_str("{}").expect("parse");
    assert_eq!(parsed, RenderSettings::default());
}

#[test]
fn partial_override_keeps_other_fields() {
    let parsed = RenderSettings::from_json_str(
        r#"{
            "shadows": false,
            "ssao": { "radius": 0.8 },
            "vpl": { "mode": "static", "max_vpls": 512 }
        }"#,
    )
    .expect("parse");

    let defaults = RenderSettings::default();
    assert!(!parsed.shadows);
    assert!((parsed.ssao.radius - 0.8).abs() < f32::EPSILON);
    assert_eq!(parsed.ssao.intensity, defaults.ssao.intensity);
    assert_eq!(parsed.vpl.mode, VplMode::Static);
    assert_eq!(parsed.vpl.max_vpls, 512);
    assert_eq!(parsed.vpl.quota_per_light, defaults.vpl.quota_per_light);
    assert_eq!(parsed.bloom, defaults.bloom);
}

#[test]
fn enums_use_snake_case() {
    let parsed = RenderSettings::from_json_str(
        r#"{ "debug_view": "material_ao", "face_culling": "none", "texture_quality": "low" }"#,
    )
    .expect("parse");
    assert_eq!(parsed.debug_view, Some(DebugView::MaterialAo));
    assert_eq!(parsed.face_culling, FaceCulling::None);
    assert_eq!(parsed.texture_quality, TextureQuality::Low);
}

#[test]
fn settings_survive_a_json_round_trip() {
    let settings = RenderSettings {
        motion_blur: true,
        debug_view: Some(DebugView::IndirectLight),
        gbuffer_downsample: 2,
        ..Default::default()
    };
    let text = serde_json::to_string(&settings).expect("serialize");
    assert_eq!(RenderSettings::from_json_str(&text).expect("parse"), settings);
}

#[test]
fn malformed_json_is_a_settings_error() {
    let result = RenderSettings::from_json_str(r#"{ "debug_view": "sparkles" }"#);
    assert!(matches!(result, Err(RenderError::SettingsError(_))));

    let result = RenderSettings::from_json_str("{ shadows: ");
    assert!(matches!(result, Err(RenderError::SettingsError(_))));
}

#[test]
fn load_json_reads_a_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"{{ "wireframe": true, "exposure": {{ "key": 0.25 }} }}"#).expect("write");

    let loaded = RenderSettings::load_json(file.path()).expect("load");
    assert!(loaded.wireframe);
    assert!((loaded.exposure.key - 0.25).abs() < f32::EPSILON);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = RenderSettings::load_json(dir.path().join("absent.json"));
    assert!(matches!(result, Err(RenderError::IoError(_))));
}

#[test]
fn gbuffer_extent_is_never_zero() {
    let mut s = RenderSettings::default();
    assert_eq!(s.gbuffer_extent(1280, 720), (1280, 720));

    s.gbuffer_downsample = 2;
    assert_eq!(s.gbuffer_extent(1280, 720), (640, 360));

    s.gbuffer_downsample = 0;
    assert_eq!(s.gbuffer_extent(1280, 720), (1280, 720));

    s.gbuffer_downsample = 8;
    assert_eq!(s.gbuffer_extent(3, 1), (1, 1));
}

#[test]
fn every_debug_view_has_a_distinct_mode() {
    let mut modes: Vec<u32> = DebugView::all().iter().map(|v| v.shader_mode()).collect();
    modes.sort_unstable();
    modes.dedup();
    assert_eq!(modes.len(), DebugView::all().len());
}
