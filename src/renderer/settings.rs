//! Renderer Settings
//!
//! [`RenderSettings`] holds the user-facing quality toggles. Every field has
//! a default, so a settings file only needs to name what it changes:
//!
//! ```rust,ignore
//! use myth_deferred::renderer::settings::RenderSettings;
//!
//! let settings = RenderSettings::from_json_str(r#"{
//!     "shadows": false,
//!     "ssao": { "radius": 0.8 },
//!     "vpl": { "mode": "static", "max_vpls": 512 }
//! }"#)?;
//! ```
//!
//! Each pass resolves the toggles it needs once at the top of `prepare`;
//! changing a field between frames takes effect on the next frame.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::resources::bloom::BloomSettings;
use crate::resources::ssao::SsaoSettings;
use crate::resources::texture::TextureQuality;
use crate::resources::tone_mapping::ExposureSettings;
use crate::resources::volumetric::VolumetricSettings;
use crate::resources::vpl::VplSettings;

// ---------------------------------------------------------------------------
// DebugView
// ---------------------------------------------------------------------------

/// Raw intermediate buffer shown instead of the final image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugView {
    Albedo,
    Normals,
    Position,
    Roughness,
    Metallic,
    MaterialAo,
    Ssao,
    Velocity,
    BloomMask,
    IndirectLight,
}

impl DebugView {
    /// Mode index understood by `debug_view.wgsl`.
    #[must_use]
    pub fn shader_mode(self) -> u32 {
        match self {
            Self::Albedo => 0,
            Self::Normals => 1,
            Self::Position => 2,
            Self::Roughness => 3,
            Self::Metallic => 4,
            Self::MaterialAo => 5,
            Self::Ssao => 6,
            Self::Velocity => 7,
            Self::BloomMask => 8,
            Self::IndirectLight => 9,
        }
    }

    #[must_use]
    pub fn all() -> &'static [DebugView] {
        &[
            Self::Albedo,
            Self::Normals,
            Self::Position,
            Self::Roughness,
            Self::Metallic,
            Self::MaterialAo,
            Self::Ssao,
            Self::Velocity,
            Self::BloomMask,
            Self::IndirectLight,
        ]
    }
}

// ---------------------------------------------------------------------------
// FaceCulling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceCulling {
    None,
    #[default]
    Back,
    Front,
}

impl FaceCulling {
    #[must_use]
    pub fn to_wgpu(self) -> Option<wgpu::Face> {
        match self {
            Self::None => None,
            Self::Back => Some(wgpu::Face::Back),
            Self::Front => Some(wgpu::Face::Front),
        }
    }
}

// ---------------------------------------------------------------------------
// RenderSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub shadows: bool,
    /// Edge length of every shadow map layer. Fixed once the renderer is
    /// created.
    pub shadow_map_size: u32,
    /// Half-extent of the sun shadow projection around the camera.
    pub sun_shadow_distance: f32,
    pub shadow_bias: f32,
    /// Maximum number of simultaneously shadowed lights per kind.
    pub max_shadowed_lights: u32,

    /// G-buffer resolution divisor.
    pub gbuffer_downsample: u32,
    pub wireframe: bool,
    pub face_culling: FaceCulling,
    pub texture_quality: TextureQuality,

    pub ssao: SsaoSettings,
    pub volumetrics: VolumetricSettings,
    pub bloom: BloomSettings,
    pub exposure: ExposureSettings,
    pub vpl: VplSettings,

    pub motion_blur: bool,
    pub motion_blur_strength: f32,
    pub depth_aa: bool,
    /// Overrides final presentation when set.
    pub debug_view: Option<DebugView>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shadows: true,
            shadow_map_size: 1024,
            sun_shadow_distance: 60.0,
            shadow_bias: 0.005,
            max_shadowed_lights: 8,
            gbuffer_downsample: 1,
            wireframe: false,
            face_culling: FaceCulling::Back,
            texture_quality: TextureQuality::High,
            ssao: SsaoSettings::default(),
            volumetrics: VolumetricSettings::default(),
            bloom: BloomSettings::default(),
            exposure: ExposureSettings::default(),
            vpl: VplSettings::default(),
            motion_blur: false,
            motion_blur_strength: 1.0,
            depth_aa: true,
            debug_view: None,
        }
    }
}

impl RenderSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// G-buffer extent for a given output size (never zero).
    #[must_use]
    pub fn gbuffer_extent(&self, width: u32, height: u32) -> (u32, u32) {
        let d = self.gbuffer_downsample.max(1);
        ((width / d).max(1), (height / d).max(1))
    }
}

// ---------------------------------------------------------------------------
// ContextSettings
// ---------------------------------------------------------------------------

/// Options for GPU context creation.
#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub power_preference: wgpu::PowerPreference,
    /// Format of the offscreen output target when running headless.
    pub output_format: wgpu::TextureFormat,
    pub vsync: bool,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            output_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            vsync: true,
        }
    }
}
