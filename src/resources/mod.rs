//! Pure data shared by the scene and the renderer: geometry, textures,
//! material layers, GPU uniform layouts and per-feature settings.
//!
//! Nothing here touches a `wgpu::Device`; every CPU reference of a GPU
//! kernel lives next to the settings that drive it.

pub mod bloom;
pub mod composite;
pub mod filter;
pub mod geometry;
pub mod material;
pub mod ssao;
pub mod texture;
pub mod tone_mapping;
pub mod uniforms;
pub mod volumetric;
pub mod vpl;

pub use bloom::BloomSettings;
pub use geometry::{BoundingBox, Mesh, Vertex};
pub use material::{MaterialLayer, MaterialLayers};
pub use ssao::SsaoSettings;
pub use texture::{Image, TextureQuality};
pub use tone_mapping::{ExposureSettings, ExposureState};
pub use volumetric::VolumetricSettings;
pub use vpl::{VplAllocator, VplMode, VplSettings};
