//! WGSL sources.
//!
//! Every pass shader is compiled with `common.wgsl` prepended, which holds
//! the shared struct declarations (mirroring `resources::uniforms`), the
//! fullscreen-triangle vertex stage and a few colour helpers. Shaders that
//! bind `lighting_layout` at group 0 also get `lighting.wgsl` (bindings,
//! shadow lookups and light attenuation).

const COMMON: &str = include_str!("../shaders/common.wgsl");
const LIGHTING: &str = include_str!("../shaders/lighting.wgsl");

/// Identifies one WGSL pass shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderId {
    Geometry,
    Decal,
    Shadow,
    VplAux,
    VplInject,
    Ssao,
    Blur,
    Volumetric,
    BloomExtract,
    Histogram,
    Exposure,
    Composite,
    Skybox,
    Water,
    Particles,
    DepthOfField,
    MotionBlur,
    DepthAa,
    Blit,
    DebugView,
}

impl ShaderId {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Geometry => "geometry.wgsl",
            Self::Decal => "decal.wgsl",
            Self::Shadow => "shadow.wgsl",
            Self::VplAux => "vpl_aux.wgsl",
            Self::VplInject => "vpl_inject.wgsl",
            Self::Ssao => "ssao.wgsl",
            Self::Blur => "blur.wgsl",
            Self::Volumetric => "volumetric.wgsl",
            Self::BloomExtract => "bloom_extract.wgsl",
            Self::Histogram => "histogram.wgsl",
            Self::Exposure => "exposure.wgsl",
            Self::Composite => "composite.wgsl",
            Self::Skybox => "skybox.wgsl",
            Self::Water => "water.wgsl",
            Self::Particles => "particles.wgsl",
            Self::DepthOfField => "dof.wgsl",
            Self::MotionBlur => "motion_blur.wgsl",
            Self::DepthAa => "depth_aa.wgsl",
            Self::Blit => "blit.wgsl",
            Self::DebugView => "debug_view.wgsl",
        }
    }

    fn body(self) -> &'static str {
        match self {
            Self::Geometry => include_str!("../shaders/geometry.wgsl"),
            Self::Decal => include_str!("../shaders/decal.wgsl"),
            Self::Shadow => include_str!("../shaders/shadow.wgsl"),
            Self::VplAux => include_str!("../shaders/vpl_aux.wgsl"),
            Self::VplInject => include_str!("../shaders/vpl_inject.wgsl"),
            Self::Ssao => include_str!("../shaders/ssao.wgsl"),
            Self::Blur => include_str!("../shaders/blur.wgsl"),
            Self::Volumetric => include_str!("../shaders/volumetric.wgsl"),
            Self::BloomExtract => include_str!("../shaders/bloom_extract.wgsl"),
            Self::Histogram => include_str!("../shaders/histogram.wgsl"),
            Self::Exposure => include_str!("../shaders/exposure.wgsl"),
            Self::Composite => include_str!("../shaders/composite.wgsl"),
            Self::Skybox => include_str!("../shaders/skybox.wgsl"),
            Self::Water => include_str!("../shaders/water.wgsl"),
            Self::Particles => include_str!("../shaders/particles.wgsl"),
            Self::DepthOfField => include_str!("../shaders/dof.wgsl"),
            Self::MotionBlur => include_str!("../shaders/motion_blur.wgsl"),
            Self::DepthAa => include_str!("../shaders/depth_aa.wgsl"),
            Self::Blit => include_str!("../shaders/blit.wgsl"),
            Self::DebugView => include_str!("../shaders/debug_view.wgsl"),
        }
    }

    #[must_use]
    pub fn uses_lighting(self) -> bool {
        matches!(self, Self::Geometry | Self::Volumetric)
    }

    /// Full source: common declarations, the lighting prelude when needed,
    /// then the pass body.
    #[must_use]
    pub fn source(self) -> String {
        let body = self.body();
        let mut source = String::with_capacity(COMMON.len() + LIGHTING.len() + body.len() + 2);
        source.push_str(COMMON);
        source.push('\n');
        if self.uses_lighting() {
            source.push_str(LIGHTING);
            source.push('\n');
        }
        source.push_str(body);
        source
    }
}

#[must_use]
pub fn create_module(device: &wgpu::Device, id: ShaderId) -> wgpu::ShaderModule {
    log::debug!("Compiling {}", id.label());
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(id.label()),
        source: wgpu::ShaderSource::Wgsl(id.source().into()),
    })
}
