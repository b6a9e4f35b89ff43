//! GPU data layouts shared between Rust and WGSL.
//!
//! Every struct is built from `mat4x4<f32>` / `vec4` members only so the
//! Rust `#[repr(C)]` layout matches WGSL uniform and storage layout rules
//! without manual padding. The matching WGSL declarations live in
//! `shaders/common.wgsl`.

use glam::{Mat4, Vec3, Vec4};

use crate::scene::RenderCamera;
use crate::scene::light::{Light, LightKind};

/// Per-view constants (group 0, binding 0 of most passes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub inverse_view: Mat4,
    pub inverse_view_projection: Mat4,
    /// Previous frame's view-projection, for the velocity buffer.
    pub prev_view_projection: Mat4,
    /// xyz = camera world position, w = time in seconds.
    pub camera_position: Vec4,
    /// x = target width, y = target height, z = 1/width, w = 1/height.
    pub screen: Vec4,
    /// x = near, y = far, z = light count, w = VPL count.
    pub params: Vec4,
    /// xyz = ambient, w = shadow bias.
    pub ambient: Vec4,
}

impl FrameUniforms {
    /// Camera block of one view rendered at `width × height`. Light and VPL
    /// counts start at zero; see [`Self::with_counts`].
    #[must_use]
    pub fn new(camera: &RenderCamera, prev_view_projection: Mat4, time: f32, (width, height): (u32, u32)) -> Self {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;
        Self {
            view: camera.view,
            projection: camera.projection,
            view_projection: camera.view_projection,
            inverse_view: camera.inverse_view,
            inverse_view_projection: camera.inverse_view_projection,
            prev_view_projection,
            camera_position: camera.position.extend(time),
            screen: Vec4::new(width, height, 1.0 / width, 1.0 / height),
            params: Vec4::new(camera.near, camera.far, 0.0, 0.0),
            ambient: Vec4::ZERO,
        }
    }

    #[must_use]
    pub fn with_counts(mut self, lights: u32, vpls: u32) -> Self {
        self.params.z = lights as f32;
        self.params.w = vpls as f32;
        self
    }

    #[must_use]
    pub fn with_ambient(mut self, ambient: Vec3, shadow_bias: f32) -> Self {
        self.ambient = ambient.extend(shadow_bias);
        self
    }
}

/// Light as seen by shaders (storage buffer array).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    /// xyz = position, w = range (0 for the sun).
    pub position_range: Vec4,
    /// xyz = color, w = intensity.
    pub color_intensity: Vec4,
    /// xyz = direction, w = kind (0 point, 1 spot, 2 directional).
    pub direction_kind: Vec4,
    /// x = cos(inner), y = cos(outer), z = volumetric intensity,
    /// w = shadow layer (-1 = none).
    pub cone_shadow: Vec4,
    /// x = cookie layer (-1 = none), y = shadow far plane.
    pub extra: Vec4,
    /// View-projection of planar shadows (spot / sun).
    pub shadow_matrix: Mat4,
}

pub const LIGHT_KIND_POINT: f32 = 0.0;
pub const LIGHT_KIND_SPOT: f32 = 1.0;
pub const LIGHT_KIND_DIRECTIONAL: f32 = 2.0;

impl GpuLight {
    #[must_use]
    pub fn from_light(light: &Light) -> Self {
        let (kind, range, cos_inner, cos_outer) = match light.kind {
            LightKind::Point(p) => (LIGHT_KIND_POINT, p.radius, -1.0, -1.0),
            LightKind::Spot(s) => (
                LIGHT_KIND_SPOT,
                s.range,
                s.inner_cutoff.cos(),
                s.outer_cutoff.cos(),
            ),
            LightKind::Directional(_) => (LIGHT_KIND_DIRECTIONAL, 0.0, -1.0, -1.0),
        };
        Self {
            position_range: light.position.extend(range),
            color_intensity: light.color.extend(light.intensity.max(0.0)),
            direction_kind: light.direction().extend(kind),
            cone_shadow: Vec4::new(cos_inner, cos_outer, light.volumetric_intensity, -1.0),
            extra: Vec4::new(-1.0, range, 0.0, 0.0),
            shadow_matrix: Mat4::IDENTITY,
        }
    }
}

/// One virtual point light. Written by the VPL kernel, read by the geometry
/// pass lighting.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VplRecord {
    /// xyz = position, w = 1 when valid.
    pub position: Vec4,
    pub normal: Vec4,
    /// rgb = color × intensity.
    pub color: Vec4,
}

/// Per-draw object constants (dynamic offset).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniforms {
    pub model: Mat4,
    pub normal_matrix: Mat4,
    /// Probe AABB min; w = 1 when a probe applies.
    pub probe_min: Vec4,
    pub probe_max: Vec4,
    /// Probe capture position.
    pub probe_center: Vec4,
    /// x = layer count, y = height scale, z = decal opacity.
    pub params: Vec4,
}

impl ObjectUniforms {
    #[must_use]
    pub fn new(model: Mat4, layer_count: u32) -> Self {
        Self {
            model,
            normal_matrix: model.inverse().transpose(),
            probe_min: Vec4::ZERO,
            probe_max: Vec4::ZERO,
            probe_center: Vec4::ZERO,
            params: Vec4::new(layer_count as f32, 0.05, 1.0, 0.0),
        }
    }

    #[must_use]
    pub fn with_probe(mut self, min: Vec3, max: Vec3) -> Self {
        self.probe_min = min.extend(1.0);
        self.probe_max = max.extend(0.0);
        self.probe_center = ((min + max) * 0.5).extend(0.0);
        self
    }
}

/// A single shadow or VPL view (dynamic offset).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightViewUniforms {
    pub view_projection: Mat4,
    /// xyz = light position, w = far plane.
    pub light_position: Vec4,
    /// rgb = color × intensity, w = light kind.
    pub light_color: Vec4,
    /// VPL views: x = buffer offset, y = record count, z = aux size,
    /// w = records planned for the light over all its views.
    pub params: [u32; 4],
    pub light_direction: Vec4,
}

/// Generic separable-blur direction (two static buffers: H and V).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniforms {
    pub direction: Vec4,
}

/// Auto-exposure kernel parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ExposureUniforms {
    /// x = min log2 luminance, y = log2 luminance range, z = key, w = speed.
    pub params: Vec4,
    /// x = delta time, y = pixel count, z = min exposure, w = max exposure.
    pub frame: Vec4,
}

/// Persisted exposure value (storage buffer, survives across frames).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ExposureValue {
    pub exposure: f32,
    pub average_luminance: f32,
    pub _pad: [f32; 2],
}

/// Post-chain parameters shared by the screen-space passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostUniforms {
    /// rgb = fog color, w = fog enabled.
    pub fog_color: Vec4,
    /// x = fog start, y = fog end, z = bloom strength, w = time.
    pub fog_params: Vec4,
    /// x = vignette, y = chromatic aberration, z = scanlines, w = film grain.
    pub effects: Vec4,
    /// x = sharpen, y = lens flare, zw = flare anchor in UV.
    pub effects2: Vec4,
    /// x = flare visible, y = ssao intensity, z = neutral exposure override.
    pub flags: Vec4,
    /// DOF: x = focus distance, y = aperture, z = max blur.
    pub dof: Vec4,
    /// x = motion blur strength, y = depth threshold, z = normal threshold,
    /// w = debug view mode.
    pub misc: Vec4,
    pub sky_zenith: Vec4,
    pub sky_horizon: Vec4,
    pub sky_ground: Vec4,
    /// xyz = sun direction, w = sun present.
    pub sun_direction: Vec4,
    /// Water tint (rgb) and opacity (a).
    pub water_color: Vec4,
}

/// SSAO parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SsaoUniforms {
    pub samples: [Vec4; crate::resources::ssao::SSAO_KERNEL_SIZE],
    /// x = radius, y = bias, z = intensity, w = sample count.
    pub params: Vec4,
}

/// Bloom bright-pass and volumetric parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FilterUniforms {
    /// Bloom: x = threshold, y = soft knee.
    /// Volumetrics: x = step count, y = density, z = anisotropy, w = max distance.
    pub params: Vec4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_blocks_are_vec4_aligned() {
        for size in [
            size_of::<FrameUniforms>(),
            size_of::<GpuLight>(),
            size_of::<VplRecord>(),
            size_of::<ObjectUniforms>(),
            size_of::<LightViewUniforms>(),
            size_of::<ExposureValue>(),
            size_of::<PostUniforms>(),
            size_of::<SsaoUniforms>(),
        ] {
            assert_eq!(size % 16, 0, "{size} bytes is not a multiple of 16");
        }
    }

    #[test]
    fn frame_uniforms_screen_is_output_extent() {
        let camera = RenderCamera::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::new(1.0, 2.0, 3.0), 0.1, 50.0);
        let frame = FrameUniforms::new(&camera, Mat4::IDENTITY, 4.0, (800, 400))
            .with_counts(3, 48)
            .with_ambient(Vec3::splat(0.1), 0.005);
        assert_eq!(frame.screen, Vec4::new(800.0, 400.0, 1.0 / 800.0, 1.0 / 400.0));
        assert_eq!(frame.camera_position, Vec4::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(frame.params, Vec4::new(0.1, 50.0, 3.0, 48.0));
        assert!((frame.ambient.w - 0.005).abs() < f32::EPSILON);
    }
}
