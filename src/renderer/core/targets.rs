//! Intermediate Render Targets
//!
//! All textures the frame passes render into are created once with the
//! renderer and never reallocated mid-frame.
//!
//! ```text
//! GBuffer (gbuffer extent)                      Output extent
//! ┌──────────┬──────────┬────────┬─────┐        ┌──────────────────────┐
//! │ albedo   │ position │ normal │ pbr │        │ scratch A / B        │
//! │ velocity │ direct   │ indirect     │        │ bloom A / B (/ n)    │
//! │ depth                              │        └──────────────────────┘
//! └────────────────────────────────────┘
//! SSAO A / B, volumetric A / B (/ n of gbuffer)  VPL aux 32² (pos, normal, flux)
//! ```

use thiserror::Error;

use crate::renderer::settings::RenderSettings;
use crate::resources::filter::PingPongSlot;
use crate::resources::vpl::VPL_AUX_SIZE;

pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const SSAO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// Surface phase attachments of the geometry pass, in shader output order.
pub const SURFACE_FORMATS: [wgpu::TextureFormat; 4] = [
    wgpu::TextureFormat::Rgba8Unorm, // albedo (decals blend here)
    wgpu::TextureFormat::Rgba16Float, // view-space normal
    wgpu::TextureFormat::Rgba8Unorm, // roughness, metallic, ao, height
    wgpu::TextureFormat::Rg16Float,  // velocity (uv delta)
];

/// Lit phase attachments of the geometry pass, in shader output order.
pub const LIT_FORMATS: [wgpu::TextureFormat; 3] = [
    wgpu::TextureFormat::Rgba16Float, // view-space position, w = 1 on geometry
    wgpu::TextureFormat::Rgba16Float, // direct-lit colour
    wgpu::TextureFormat::Rgba16Float, // indirect (VPL) light
];

/// Auxiliary light-view targets: world position, world normal, reflected flux.
pub const VPL_AUX_FORMATS: [wgpu::TextureFormat; 3] = [
    wgpu::TextureFormat::Rgba16Float,
    wgpu::TextureFormat::Rgba16Float,
    wgpu::TextureFormat::Rgba16Float,
];

// ============================================================================
// RenderTarget
// ============================================================================

#[derive(Debug)]
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            format,
            width,
            height,
        }
    }

    /// Sampled colour attachment.
    #[must_use]
    pub fn color(device: &wgpu::Device, label: &str, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self::new(
            device,
            label,
            width,
            height,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }
}

/// Two same-sized targets used alternately as source and destination.
#[derive(Debug)]
pub struct PingPong {
    targets: [RenderTarget; 2],
}

impl PingPong {
    #[must_use]
    pub fn new(device: &wgpu::Device, label: &str, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            targets: [
                RenderTarget::color(device, &format!("{label} A"), width, height, format),
                RenderTarget::color(device, &format!("{label} B"), width, height, format),
            ],
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, slot: PingPongSlot) -> &RenderTarget {
        &self.targets[slot.index()]
    }

    #[inline]
    #[must_use]
    pub fn view(&self, slot: PingPongSlot) -> &wgpu::TextureView {
        &self.targets[slot.index()].view
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.targets[0].width, self.targets[0].height)
    }
}

// ============================================================================
// GBuffer
// ============================================================================

#[derive(Debug)]
pub struct GBuffer {
    pub albedo: RenderTarget,
    pub position: RenderTarget,
    pub normal: RenderTarget,
    pub pbr: RenderTarget,
    pub velocity: RenderTarget,
    pub direct: RenderTarget,
    pub indirect: RenderTarget,
    pub depth: RenderTarget,
}

impl GBuffer {
    #[must_use]
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let [albedo, normal, pbr, velocity] = SURFACE_FORMATS;
        let [position, direct, indirect] = LIT_FORMATS;
        Self {
            albedo: RenderTarget::color(device, "GBuffer Albedo", width, height, albedo),
            position: RenderTarget::color(device, "GBuffer Position", width, height, position),
            normal: RenderTarget::color(device, "GBuffer Normal", width, height, normal),
            pbr: RenderTarget::color(device, "GBuffer PBR", width, height, pbr),
            velocity: RenderTarget::color(device, "GBuffer Velocity", width, height, velocity),
            direct: RenderTarget::color(device, "GBuffer Direct", width, height, direct),
            indirect: RenderTarget::color(device, "GBuffer Indirect", width, height, indirect),
            depth: RenderTarget::color(device, "GBuffer Depth", width, height, DEPTH_FORMAT),
        }
    }

    /// Surface phase targets in attachment order.
    #[must_use]
    pub fn surface_targets(&self) -> [&RenderTarget; 4] {
        [&self.albedo, &self.normal, &self.pbr, &self.velocity]
    }

    /// Lit phase targets in attachment order.
    #[must_use]
    pub fn lit_targets(&self) -> [&RenderTarget; 3] {
        [&self.position, &self.direct, &self.indirect]
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.albedo.width, self.albedo.height)
    }
}

#[derive(Debug)]
pub struct VplAuxTargets {
    pub position: RenderTarget,
    pub normal: RenderTarget,
    pub flux: RenderTarget,
    pub depth: RenderTarget,
}

impl VplAuxTargets {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let s = VPL_AUX_SIZE;
        let [p, n, f] = VPL_AUX_FORMATS;
        Self {
            position: RenderTarget::color(device, "VPL Aux Position", s, s, p),
            normal: RenderTarget::color(device, "VPL Aux Normal", s, s, n),
            flux: RenderTarget::color(device, "VPL Aux Flux", s, s, f),
            depth: RenderTarget::new(device, "VPL Aux Depth", s, s, DEPTH_FORMAT, wgpu::TextureUsages::RENDER_ATTACHMENT),
        }
    }
}

// ============================================================================
// FrameTargets
// ============================================================================

#[derive(Debug)]
pub struct FrameTargets {
    pub width: u32,
    pub height: u32,
    pub gbuffer: GBuffer,
    pub ssao: PingPong,
    pub volumetric: PingPong,
    pub bloom: PingPong,
    /// Post-chain scratch pair at output resolution.
    pub scratch: PingPong,
    pub vpl_aux: VplAuxTargets,
}

impl FrameTargets {
    #[must_use]
    pub fn new(device: &wgpu::Device, width: u32, height: u32, settings: &RenderSettings) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let (gw, gh) = settings.gbuffer_extent(width, height);
        let ssao_div = settings.ssao.downsample.max(1);
        let vol_div = settings.volumetrics.downsample.max(1);
        let bloom_div = settings.bloom.downsample.max(1);

        log::debug!("Allocating frame targets: output {width}x{height}, gbuffer {gw}x{gh}");

        Self {
            width,
            height,
            gbuffer: GBuffer::new(device, gw, gh),
            ssao: PingPong::new(device, "SSAO", gw / ssao_div, gh / ssao_div, SSAO_FORMAT),
            volumetric: PingPong::new(device, "Volumetric", gw / vol_div, gh / vol_div, HDR_FORMAT),
            bloom: PingPong::new(device, "Bloom", width / bloom_div, height / bloom_div, HDR_FORMAT),
            scratch: PingPong::new(device, "Post Scratch", width, height, HDR_FORMAT),
            vpl_aux: VplAuxTargets::new(device),
        }
    }

    /// Validates every target against the device limits and logs each
    /// problem. Rendering continues regardless; returns `false` if anything
    /// was reported.
    pub fn check_complete(&self, limits: &wgpu::Limits) -> bool {
        let mut extents = vec![
            ("GBuffer", self.gbuffer.size()),
            ("SSAO", self.ssao.size()),
            ("Volumetric", self.volumetric.size()),
            ("Bloom", self.bloom.size()),
            ("Post Scratch", self.scratch.size()),
        ];
        extents.push(("VPL Aux", (VPL_AUX_SIZE, VPL_AUX_SIZE)));

        let mut issues = Vec::new();
        for (label, extent) in extents {
            issues.extend(extent_issues(label, extent, limits));
        }
        issues.extend(attachment_issues("GBuffer Surface", &SURFACE_FORMATS, limits));
        issues.extend(attachment_issues("GBuffer Lit", &LIT_FORMATS, limits));
        issues.extend(attachment_issues("VPL Aux", &VPL_AUX_FORMATS, limits));

        for issue in &issues {
            log::error!("Incomplete render target: {issue}");
        }
        issues.is_empty()
    }
}

// ============================================================================
// Completeness checks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetIssue {
    #[error("{label}: extent {width}x{height} exceeds max dimension {max}")]
    ExtentTooLarge {
        label: &'static str,
        width: u32,
        height: u32,
        max: u32,
    },
    #[error("{label}: {count} colour attachments exceed limit {max}")]
    TooManyAttachments {
        label: &'static str,
        count: u32,
        max: u32,
    },
    #[error("{label}: {bytes} colour bytes per sample exceed limit {max}")]
    BytesPerSample {
        label: &'static str,
        bytes: u32,
        max: u32,
    },
}

#[must_use]
pub fn extent_issues(label: &'static str, (width, height): (u32, u32), limits: &wgpu::Limits) -> Vec<TargetIssue> {
    let max = limits.max_texture_dimension_2d;
    if width > max || height > max {
        vec![TargetIssue::ExtentTooLarge {
            label,
            width,
            height,
            max,
        }]
    } else {
        Vec::new()
    }
}

/// Per-sample byte cost of an attachment set, using the same alignment rule
/// as wgpu's validation.
#[must_use]
pub fn color_bytes_per_sample(formats: &[wgpu::TextureFormat]) -> u32 {
    formats.iter().fold(0, |total, format| {
        let cost = format.target_pixel_byte_cost().unwrap_or(0);
        let align = format.target_component_alignment().unwrap_or(1);
        total.next_multiple_of(align) + cost
    })
}

#[must_use]
pub fn attachment_issues(
    label: &'static str,
    formats: &[wgpu::TextureFormat],
    limits: &wgpu::Limits,
) -> Vec<TargetIssue> {
    let mut issues = Vec::new();
    let count = formats.len() as u32;
    if count > limits.max_color_attachments {
        issues.push(TargetIssue::TooManyAttachments {
            label,
            count,
            max: limits.max_color_attachments,
        });
    }
    let bytes = color_bytes_per_sample(formats);
    if bytes > limits.max_color_attachment_bytes_per_sample {
        issues.push(TargetIssue::BytesPerSample {
            label,
            bytes,
            max: limits.max_color_attachment_bytes_per_sample,
        });
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_sample_respects_component_alignment() {
        use wgpu::TextureFormat as F;
        assert_eq!(color_bytes_per_sample(&[F::R8Unorm, F::R8Unorm]), 2);
        // 1 byte, then aligned to 2 for the half-float target.
        assert_eq!(color_bytes_per_sample(&[F::R8Unorm, F::Rgba16Float]), 10);
        assert_eq!(color_bytes_per_sample(&[F::R8Unorm, F::R32Float]), 8);
    }

    #[test]
    fn oversized_extent_is_reported() {
        let limits = wgpu::Limits::default();
        let max = limits.max_texture_dimension_2d;
        assert!(extent_issues("Scratch", (max, max), &limits).is_empty());
        assert_eq!(
            extent_issues("Scratch", (max + 1, 16), &limits),
            vec![TargetIssue::ExtentTooLarge {
                label: "Scratch",
                width: max + 1,
                height: 16,
                max,
            }]
        );
    }

    #[test]
    fn geometry_phases_fit_default_and_downlevel_limits() {
        for limits in [wgpu::Limits::default(), wgpu::Limits::downlevel_defaults()] {
            assert!(attachment_issues("GBuffer Surface", &SURFACE_FORMATS, &limits).is_empty());
            assert!(attachment_issues("GBuffer Lit", &LIT_FORMATS, &limits).is_empty());
            assert!(attachment_issues("VPL Aux", &VPL_AUX_FORMATS, &limits).is_empty());
        }
        assert_eq!(color_bytes_per_sample(&SURFACE_FORMATS), 28);
        assert_eq!(color_bytes_per_sample(&LIT_FORMATS), 24);
    }

    #[test]
    fn single_pass_gbuffer_would_exceed_default_bytes() {
        let all: Vec<wgpu::TextureFormat> = SURFACE_FORMATS.iter().chain(LIT_FORMATS.iter()).copied().collect();
        let issues = attachment_issues("GBuffer", &all, &wgpu::Limits::default());
        assert!(matches!(issues.as_slice(), [TargetIssue::BytesPerSample { bytes: 52, max: 32, .. }]));
    }
}
