//! Composite arithmetic shared by the composite pass and its CPU reference.
//!
//! The composite shader combines, per pixel:
//!
//! ```text
//! hdr = direct
//!     + indirect × ao_term(ssao)
//!     + bloom × strength
//!     + volumetric
//! hdr = fog(hdr, view distance)            (geometry pixels only)
//! ldr = aces(hdr × exposure) × vignette(uv)
//! ```
//!
//! Disabled features never branch here: their passes write a neutral value
//! into the buffer the composite reads ([`SSAO_NEUTRAL`], zero scattering,
//! zero bloom). [`FeatureToggles::apply`] models exactly that substitution so
//! the equivalence can be checked without a GPU.

use glam::{Mat4, Vec2, Vec3};

use crate::resources::bloom::BLOOM_NEUTRAL;
use crate::resources::ssao::SSAO_NEUTRAL;
use crate::resources::volumetric::VOLUMETRIC_NEUTRAL;
use crate::scene::light::{Light, LightKind};

/// One pixel's worth of composite inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeSample {
    pub direct: Vec3,
    pub indirect: Vec3,
    pub bloom: Vec3,
    pub ssao: f32,
    pub volumetric: Vec3,
    /// Distance from the camera; `None` for sky pixels.
    pub view_distance: Option<f32>,
    pub uv: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeParams {
    pub exposure: f32,
    pub bloom_strength: f32,
    pub ssao_intensity: f32,
    pub fog: Option<FogParams>,
    pub vignette: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParams {
    pub color: Vec3,
    pub start: f32,
    pub end: f32,
}

/// Which screen-space producers ran this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureToggles {
    pub ssao: bool,
    pub volumetrics: bool,
    pub bloom: bool,
}

impl FeatureToggles {
    pub const ALL: Self = Self {
        ssao: true,
        volumetrics: true,
        bloom: true,
    };

    /// Every producer forced neutral (probe captures).
    pub const NONE: Self = Self {
        ssao: false,
        volumetrics: false,
        bloom: false,
    };

    /// Replaces the buffers of disabled producers with their cleared values.
    #[must_use]
    pub fn apply(&self, mut sample: CompositeSample) -> CompositeSample {
        if !self.ssao {
            sample.ssao = SSAO_NEUTRAL;
        }
        if !self.volumetrics {
            sample.volumetric = Vec3::splat(VOLUMETRIC_NEUTRAL);
        }
        if !self.bloom {
            sample.bloom = Vec3::splat(BLOOM_NEUTRAL);
        }
        sample
    }
}

/// Narkowicz ACES filmic fit.
#[must_use]
pub fn aces_filmic(x: Vec3) -> Vec3 {
    const A: f32 = 2.51;
    const B: f32 = 0.03;
    const C: f32 = 2.43;
    const D: f32 = 0.59;
    const E: f32 = 0.14;
    ((x * (A * x + B)) / (x * (C * x + D) + E)).clamp(Vec3::ZERO, Vec3::ONE)
}

/// Linear fog weight in `[0, 1]`.
#[must_use]
pub fn fog_factor(distance: f32, start: f32, end: f32) -> f32 {
    let span = (end - start).max(1e-4);
    ((distance - start) / span).clamp(0.0, 1.0)
}

#[must_use]
pub fn vignette_factor(uv: Vec2, strength: f32) -> f32 {
    let d = (uv - Vec2::splat(0.5)).length() * std::f32::consts::SQRT_2;
    let t = ((d - 0.3) / 0.6).clamp(0.0, 1.0);
    let smooth = t * t * (3.0 - 2.0 * t);
    1.0 - strength * smooth
}

/// CPU reference of `composite.wgsl` (noise-based effects excluded).
#[must_use]
pub fn resolve_pixel(sample: &CompositeSample, params: &CompositeParams) -> Vec3 {
    let ao = 1.0 - params.ssao_intensity * (1.0 - sample.ssao);
    let mut hdr = sample.direct
        + sample.indirect * ao
        + sample.bloom * params.bloom_strength
        + sample.volumetric;

    if let (Some(fog), Some(distance)) = (params.fog, sample.view_distance) {
        hdr = hdr.lerp(fog.color, fog_factor(distance, fog.start, fog.end));
    }

    aces_filmic(hdr * params.exposure) * vignette_factor(sample.uv, params.vignette)
}

/// Screen UV of the first active light, if it lies in front of the camera.
///
/// Only the first active light is considered; if it is behind the camera
/// there is no flare this frame.
#[must_use]
pub fn lens_flare_anchor<'a>(
    lights: impl IntoIterator<Item = &'a Light>,
    view_projection: Mat4,
) -> Option<Vec2> {
    let light = lights.into_iter().find(|l| l.is_active())?;
    let clip = match light.kind {
        LightKind::Directional(_) => view_projection * (-light.direction()).extend(0.0),
        LightKind::Point(_) | LightKind::Spot(_) => view_projection * light.position.extend(1.0),
    };
    if clip.w <= 1e-5 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aces_maps_zero_to_zero_and_saturates() {
        assert!(aces_filmic(Vec3::ZERO).length() < 1e-6);
        assert!((aces_filmic(Vec3::splat(1000.0)) - Vec3::ONE).length() < 1e-2);
    }

    #[test]
    fn fog_ramps_between_start_and_end() {
        assert_eq!(fog_factor(5.0, 10.0, 20.0), 0.0);
        assert!((fog_factor(15.0, 10.0, 20.0) - 0.5).abs() < 1e-6);
        assert_eq!(fog_factor(50.0, 10.0, 20.0), 1.0);
    }

    #[test]
    fn vignette_leaves_centre_untouched() {
        assert_eq!(vignette_factor(Vec2::splat(0.5), 1.0), 1.0);
        assert!(vignette_factor(Vec2::ZERO, 1.0) < 0.1);
    }
}
