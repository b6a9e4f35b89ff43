pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{RenderError, Result};
pub use renderer::core::WgpuContext;
pub use renderer::probe_bake::{BakeReport, ProbeCapture, build_cubemaps};
pub use renderer::settings::{ContextSettings, DebugView, FaceCulling, RenderSettings};
pub use renderer::{FrameHistory, Renderer};
pub use resources::geometry::{BoundingBox, Mesh, Vertex};
pub use resources::material::{MaterialLayer, MaterialLayers};
pub use resources::texture::Image;
pub use scene::{Brush, BrushFlags, Camera, Environment, Light, LightKind, Scene};
