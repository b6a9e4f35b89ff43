//! Per-map atmosphere and post-processing parameters.
//!
//! These are authored with the map (as opposed to [`RenderSettings`], which
//! are user quality toggles) and read by the composite and post passes.
//!
//! [`RenderSettings`]: crate::renderer::settings::RenderSettings

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogSettings {
    pub enabled: bool,
    pub color: Vec3,
    /// View distance where fog starts.
    pub start: f32,
    /// View distance of full fog.
    pub end: f32,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Vec3::new(0.5, 0.55, 0.6),
            start: 20.0,
            end: 200.0,
        }
    }
}

/// Screen-space effects applied inside the composite pass. A zero value
/// disables the effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenEffects {
    pub vignette: f32,
    pub chromatic_aberration: f32,
    pub scanlines: f32,
    pub film_grain: f32,
    pub sharpen: f32,
    pub lens_flare: f32,
}

impl Default for ScreenEffects {
    fn default() -> Self {
        Self {
            vignette: 0.25,
            chromatic_aberration: 0.0,
            scanlines: 0.0,
            film_grain: 0.0,
            sharpen: 0.0,
            lens_flare: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthOfField {
    pub enabled: bool,
    pub focus_distance: f32,
    pub aperture: f32,
    /// Maximum blur radius in pixels.
    pub max_blur: f32,
}

impl Default for DepthOfField {
    fn default() -> Self {
        Self {
            enabled: false,
            focus_distance: 10.0,
            aperture: 0.1,
            max_blur: 8.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkySettings {
    pub zenith_color: Vec3,
    pub horizon_color: Vec3,
    pub ground_color: Vec3,
}

impl Default for SkySettings {
    fn default() -> Self {
        Self {
            zenith_color: Vec3::new(0.15, 0.35, 0.75),
            horizon_color: Vec3::new(0.7, 0.8, 0.9),
            ground_color: Vec3::new(0.25, 0.22, 0.2),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub fog: FogSettings,
    pub effects: ScreenEffects,
    pub depth_of_field: DepthOfField,
    pub sky: SkySettings,
    /// Tint (rgb) and opacity (a) of water brushes.
    pub water_color: [f32; 4],
    /// Ambient term added to direct lighting.
    pub ambient: Vec3,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            fog: FogSettings::default(),
            effects: ScreenEffects::default(),
            depth_of_field: DepthOfField::default(),
            sky: SkySettings::default(),
            water_color: [0.1, 0.3, 0.4, 0.6],
            ambient: Vec3::splat(0.03),
        }
    }
}
