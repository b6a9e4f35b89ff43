//! Frame passes, one module per pass.
//!
//! [`Passes`] owns one instance of every pass and maps a [`PassId`] from
//! the frame plan to its node. Pass instances are shared by the main view
//! and probe captures; everything that depends on the view's targets is
//! rebuilt in `prepare`.

pub mod bloom;
pub mod blur;
pub mod composite;
pub mod exposure;
pub mod geometry;
pub mod post;
pub mod present;
pub mod screen;
pub mod shadow;
pub mod skybox;
pub mod ssao;
pub mod transparent;
pub mod volumetric;
pub mod vpl;

pub use bloom::BloomPass;
pub use composite::CompositePass;
pub use exposure::ExposurePass;
pub use geometry::GeometryPass;
pub use post::{PostStage, PostStagePass};
pub use present::{DebugViewPass, PresentPass};
pub use shadow::ShadowPass;
pub use skybox::SkyboxPass;
pub use ssao::SsaoPass;
pub use transparent::TransparentPass;
pub use volumetric::VolumetricPass;
pub use vpl::{VplPass, VplView, plan_vpl_views};

use super::frame::PassId;
use super::node::RenderNode;

pub struct Passes {
    pub shadow: ShadowPass,
    pub vpl: VplPass,
    pub geometry: GeometryPass,
    pub ssao: SsaoPass,
    pub volumetric: VolumetricPass,
    pub bloom: BloomPass,
    pub exposure: ExposurePass,
    pub composite: CompositePass,
    pub skybox: SkyboxPass,
    pub transparent: TransparentPass,
    pub depth_of_field: PostStagePass,
    pub motion_blur: PostStagePass,
    pub depth_aa: PostStagePass,
    pub present: PresentPass,
    pub debug_view: DebugViewPass,
}

impl Passes {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            shadow: ShadowPass::new(),
            vpl: VplPass::new(device),
            geometry: GeometryPass::new(),
            ssao: SsaoPass::new(device),
            volumetric: VolumetricPass::new(device),
            bloom: BloomPass::new(device),
            exposure: ExposurePass::new(device),
            composite: CompositePass::new(device),
            skybox: SkyboxPass::new(device),
            transparent: TransparentPass::new(device),
            depth_of_field: PostStagePass::new(device, PostStage::DepthOfField),
            motion_blur: PostStagePass::new(device, PostStage::MotionBlur),
            depth_aa: PostStagePass::new(device, PostStage::DepthAa),
            present: PresentPass::new(device),
            debug_view: DebugViewPass::new(device),
        }
    }

    pub fn node_mut(&mut self, id: PassId) -> &mut dyn RenderNode {
        match id {
            PassId::Shadow => &mut self.shadow,
            PassId::Vpl => &mut self.vpl,
            PassId::Geometry => &mut self.geometry,
            PassId::Ssao => &mut self.ssao,
            PassId::Volumetric => &mut self.volumetric,
            PassId::Bloom => &mut self.bloom,
            PassId::Exposure => &mut self.exposure,
            PassId::Composite => &mut self.composite,
            PassId::Skybox => &mut self.skybox,
            PassId::Transparent => &mut self.transparent,
            PassId::DepthOfField => &mut self.depth_of_field,
            PassId::MotionBlur => &mut self.motion_blur,
            PassId::DepthAa => &mut self.depth_aa,
            PassId::Present => &mut self.present,
            PassId::DebugView => &mut self.debug_view,
        }
    }

    #[must_use]
    pub fn node(&self, id: PassId) -> &dyn RenderNode {
        match id {
            PassId::Shadow => &self.shadow,
            PassId::Vpl => &self.vpl,
            PassId::Geometry => &self.geometry,
            PassId::Ssao => &self.ssao,
            PassId::Volumetric => &self.volumetric,
            PassId::Bloom => &self.bloom,
            PassId::Exposure => &self.exposure,
            PassId::Composite => &self.composite,
            PassId::Skybox => &self.skybox,
            PassId::Transparent => &self.transparent,
            PassId::DepthOfField => &self.depth_of_field,
            PassId::MotionBlur => &self.motion_blur,
            PassId::DepthAa => &self.depth_aa,
            PassId::Present => &self.present,
            PassId::DebugView => &self.debug_view,
        }
    }
}
