//! Scene lights.
//!
//! A [`Light`] owns its optional cookie texture handle. GPU residency for the
//! cookie and the shadow map is keyed by [`LightId`](super::LightId) in the
//! renderer and released when the light leaves the scene.

use glam::Vec3;

use super::TextureHandle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// Influence radius; also the far plane of the cube shadow map.
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub direction: Vec3,
    pub range: f32,
    /// Half-angle in radians where the falloff starts.
    pub inner_cutoff: f32,
    /// Half-angle in radians where the cone ends.
    pub outer_cutoff: f32,
}

/// The sun. Only the first active directional light casts the shared sun
/// shadow map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Point(PointLight),
    Spot(SpotLight),
    Directional(DirectionalLight),
}

/// How a light is rendered by the shadow subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowKind {
    /// Intensity ≤ 0 or shadows disabled for this light.
    None,
    /// Six-face cube map (point lights).
    Cube,
    /// Single view/projection (spot lights and the sun).
    Planar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadows: bool,
    /// Strength of this light's contribution to volumetric scattering.
    pub volumetric_intensity: f32,
    /// Projected mask texture.
    pub cookie: Option<TextureHandle>,
}

impl Light {
    #[must_use]
    pub fn new_point(position: Vec3, color: Vec3, intensity: f32, radius: f32) -> Self {
        Self {
            kind: LightKind::Point(PointLight { radius }),
            position,
            color,
            intensity,
            cast_shadows: true,
            volumetric_intensity: 0.0,
            cookie: None,
        }
    }

    #[must_use]
    pub fn new_spot(
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        intensity: f32,
        range: f32,
        inner_cutoff: f32,
        outer_cutoff: f32,
    ) -> Self {
        Self {
            kind: LightKind::Spot(SpotLight {
                direction,
                range,
                inner_cutoff,
                outer_cutoff,
            }),
            position,
            color,
            intensity,
            cast_shadows: true,
            volumetric_intensity: 0.0,
            cookie: None,
        }
    }

    #[must_use]
    pub fn new_directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional(DirectionalLight { direction }),
            position: Vec3::ZERO,
            color,
            intensity,
            cast_shadows: true,
            volumetric_intensity: 0.0,
            cookie: None,
        }
    }

    #[must_use]
    pub fn with_volumetric(mut self, intensity: f32) -> Self {
        self.volumetric_intensity = intensity;
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: TextureHandle) -> Self {
        self.cookie = Some(cookie);
        self
    }

    #[must_use]
    pub fn with_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }

    /// Lights with intensity ≤ 0 are skipped by shadows, VPL generation and
    /// lens flare.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.intensity > 0.0
    }

    /// Normalized emission direction; `-Z` for point lights.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        let dir = match self.kind {
            LightKind::Spot(s) => s.direction,
            LightKind::Directional(d) => d.direction,
            LightKind::Point(_) => Vec3::NEG_Z,
        };
        dir.try_normalize().unwrap_or(Vec3::NEG_Z)
    }

    /// Attenuation distance (point radius / spot range). Unbounded for the sun.
    #[must_use]
    pub fn range(&self) -> f32 {
        match self.kind {
            LightKind::Point(p) => p.radius,
            LightKind::Spot(s) => s.range,
            LightKind::Directional(_) => f32::INFINITY,
        }
    }

    #[must_use]
    pub fn shadow_kind(&self) -> ShadowKind {
        if !self.is_active() || !self.cast_shadows {
            return ShadowKind::None;
        }
        match self.kind {
            LightKind::Point(_) => ShadowKind::Cube,
            LightKind::Spot(_) | LightKind::Directional(_) => ShadowKind::Planar,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_directional(&self) -> bool {
        matches!(self.kind, LightKind::Directional(_))
    }
}
