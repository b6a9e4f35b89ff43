//! Volumetric Scattering Configuration
//!
//! The volumetric pass ray-marches the view frustum against shadow-tested
//! lights at a downsampled resolution and denoises the result with
//! [`VOLUMETRIC_BLUR_ITERATIONS`] separable ping-pong blur steps.
//!
//! The whole pass is skipped (target cleared to [`VOLUMETRIC_NEUTRAL`]) unless
//! some active light carries a non-negligible volumetric intensity.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::resources::uniforms::FilterUniforms;
use crate::scene::Scene;

pub const VOLUMETRIC_BLUR_ITERATIONS: u32 = 4;

/// Scattering written when the pass is skipped.
pub const VOLUMETRIC_NEUTRAL: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumetricSettings {
    pub enabled: bool,
    pub downsample: u32,
    /// Ray-march steps per pixel.
    pub steps: u32,
    pub density: f32,
    /// Henyey-Greenstein `g`.
    pub anisotropy: f32,
    /// March distance cap in world units.
    pub max_distance: f32,
    /// Per-light volumetric intensity at or below which a light is ignored.
    pub threshold: f32,
}

impl Default for VolumetricSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            downsample: 2,
            steps: 32,
            density: 0.02,
            anisotropy: 0.3,
            max_distance: 100.0,
            threshold: 0.001,
        }
    }
}

impl VolumetricSettings {
    #[must_use]
    pub fn march_uniforms(&self) -> FilterUniforms {
        FilterUniforms {
            params: Vec4::new(
                self.steps.max(1) as f32,
                self.density,
                self.anisotropy,
                self.max_distance,
            ),
        }
    }
}

/// `true` when the sun or any other active light contributes scattering.
#[must_use]
pub fn volumetrics_active(scene: &Scene, threshold: f32) -> bool {
    scene
        .lights()
        .any(|(_, light)| light.is_active() && light.volumetric_intensity > threshold)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene::Light;

    #[test]
    fn only_active_scattering_lights_enable_the_pass() {
        let threshold = VolumetricSettings::default().threshold;
        let mut scene = Scene::new();
        scene.add_light(Light::new_point(Vec3::ZERO, Vec3::ONE, 1.0, 10.0));
        assert!(!volumetrics_active(&scene, threshold));

        let dark = Light::new_point(Vec3::ZERO, Vec3::ONE, 0.0, 10.0).with_volumetric(1.0);
        let id = scene.add_light(dark);
        assert!(!volumetrics_active(&scene, threshold));

        if let Some(light) = scene.light_mut(id) {
            light.intensity = 2.0;
        }
        assert!(volumetrics_active(&scene, threshold));
    }
}
