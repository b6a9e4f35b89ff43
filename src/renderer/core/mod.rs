//! GPU Core
//!
//! - [`WgpuContext`]: device, queue and optional surface
//! - [`FrameTargets`]: every intermediate render target of one view size
//! - [`ResourceManager`]: long-lived GPU resources shared by all passes
//! - [`pipeline`] / [`shaders`]: pipeline construction and WGSL sources

pub mod context;
pub mod pipeline;
pub mod resources;
pub mod shaders;
pub mod targets;

pub use context::WgpuContext;
pub use resources::ResourceManager;
pub use targets::FrameTargets;
