//! Reflection-Probe Baking
//!
//! [`build_cubemaps`] captures the six faces of every named probe brush,
//! writes them to disk as `<name>_<suffix>.png` and installs them as the
//! probe's live cubemap, releasing the previous one.
//!
//! The capture itself is abstracted behind [`ProbeCapture`]: the
//! [`Renderer`](super::Renderer) implements it by re-running its own
//! pipeline for a cube-face view, and tests substitute a CPU stand-in.
//!
//! ```text
//! for probe in scene.probes()        (scan order)
//!   ├─ unnamed? → warn, skip
//!   ├─ 6 × capture_face(camera)      +X -X +Y -Y +Z -Z
//!   ├─ 6 × save <name>_<suffix>.png
//!   └─ install_cubemap → swap handle → release old
//! ```

use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::errors::{RenderError, Result};
use crate::renderer::graph::shadow_utils::cube_face_cameras;
use crate::resources::texture::Image;
use crate::scene::{CubemapHandle, RenderCamera, Scene};

/// File suffix per cube face, in layer order.
pub const FACE_SUFFIXES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

/// Edge length of a captured face.
pub const PROBE_FACE_SIZE: u32 = 256;

pub const PROBE_NEAR: f32 = 0.1;
pub const PROBE_FAR: f32 = 1000.0;

/// Something that can render a probe face and own the resulting cubemaps.
pub trait ProbeCapture {
    /// Renders `scene` from one cube-face camera into an RGBA8 image of
    /// [`PROBE_FACE_SIZE`]².
    fn capture_face(&mut self, scene: &Scene, camera: &RenderCamera) -> Result<Image>;

    /// Uploads six faces (layer order) as a new live cubemap.
    fn install_cubemap(&mut self, faces: &[Image; 6]) -> Result<CubemapHandle>;

    /// Frees a cubemap no probe references anymore.
    fn release_cubemap(&mut self, handle: CubemapHandle);
}

/// Outcome of one bake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BakeReport {
    /// Probe names in bake order.
    pub baked: Vec<String>,
    /// Brush indices of probes skipped for having no name.
    pub skipped: Vec<usize>,
    /// Every face file written.
    pub files: Vec<PathBuf>,
}

/// Path of one baked face image.
#[must_use]
pub fn face_path(out_dir: &Path, probe: &str, face: usize) -> PathBuf {
    out_dir.join(format!("{probe}_{}.png", FACE_SUFFIXES[face % 6]))
}

/// The six cameras of a capture at `center`, in layer order.
#[must_use]
pub fn probe_cameras(center: Vec3) -> [RenderCamera; 6] {
    cube_face_cameras(center, PROBE_NEAR, PROBE_FAR)
}

/// Bakes every named probe of `scene`.
///
/// Unnamed probes and probes without geometry (empty or non-finite bounds)
/// are skipped with a warning. A failing capture, write or
/// upload aborts the bake; probes finished before the failure keep their new
/// cubemap.
pub fn build_cubemaps(scene: &mut Scene, baker: &mut impl ProbeCapture, out_dir: &Path) -> Result<BakeReport> {
    std::fs::create_dir_all(out_dir)?;

    let mut report = BakeReport::default();
    let targets: Vec<(usize, String, Vec3)> = scene
        .probes()
        .filter_map(|(index, brush)| {
            let name = brush.probe.as_ref().map_or("", |p| p.name.trim());
            if name.is_empty() {
                log::warn!("Probe brush {index} has no name; skipping");
                report.skipped.push(index);
                return None;
            }
            let bounds = brush.bounds();
            let center = bounds.center();
            if bounds.is_empty() || !center.is_finite() {
                log::warn!("Probe '{name}' (brush {index}) has no extent; skipping");
                report.skipped.push(index);
                return None;
            }
            Some((index, name.to_string(), center))
        })
        .collect();

    for (index, name, center) in targets {
        log::info!("Baking probe '{name}' at {center}");

        let mut faces = Vec::with_capacity(6);
        for (face, camera) in probe_cameras(center).iter().enumerate() {
            let image = baker.capture_face(scene, camera)?;
            let path = face_path(out_dir, &name, face);
            save_face(&path, &image)?;
            report.files.push(path);
            faces.push(image);
        }
        let faces: [Image; 6] = faces
            .try_into()
            .map_err(|_| RenderError::CubeMapError(format!("probe '{name}' captured an incomplete face set")))?;

        let handle = baker.install_cubemap(&faces)?;
        let previous = scene.brushes[index]
            .probe
            .as_mut()
            .and_then(|probe| probe.cubemap.replace(handle));
        if let Some(old) = previous {
            baker.release_cubemap(old);
        }
        report.baked.push(name);
    }

    log::info!(
        "Probe bake finished: {} baked, {} skipped, {} files",
        report.baked.len(),
        report.skipped.len(),
        report.files.len()
    );
    Ok(report)
}

fn save_face(path: &Path, image: &Image) -> Result<()> {
    image::save_buffer(path, &image.data, image.width, image.height, image::ColorType::Rgba8)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_paths_follow_layer_order() {
        let dir = Path::new("out");
        let names: Vec<PathBuf> = (0..6).map(|f| face_path(dir, "hall", f)).collect();
        assert_eq!(names[0], dir.join("hall_px.png"));
        assert_eq!(names[3], dir.join("hall_ny.png"));
        assert_eq!(names[5], dir.join("hall_nz.png"));
    }

    #[test]
    fn probe_cameras_share_the_center() {
        let center = Vec3::new(1.0, 2.0, 3.0);
        for camera in probe_cameras(center) {
            assert_eq!(camera.position, center);
            assert!((camera.near - PROBE_NEAR).abs() < f32::EPSILON);
        }
    }
}
