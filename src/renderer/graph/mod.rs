//! Render graph
//!
//! - [`FramePlan`] / [`PassId`]: the fixed pass order of one view
//! - [`RenderNode`]: two-phase pass interface
//! - [`PrepareContext`] / [`ExecuteContext`]: explicit per-view context
//! - [`cull`]: CPU frustum culling into draw lists
//! - [`shadow_utils`]: light view/projection math
//! - [`passes`]: one module per pass

pub mod context;
pub mod cull;
pub mod frame;
pub mod node;
pub mod passes;
pub mod shadow_utils;

pub use context::{ExecuteContext, FrameBlackboard, PrepareContext, ViewContext, ViewKind};
pub use cull::{DrawItem, DrawList};
pub use frame::{FramePlan, PassId};
pub use node::RenderNode;
