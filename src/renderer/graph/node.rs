//! Render node trait.
//!
//! Every pass of the frame is a [`RenderNode`]. Nodes are split into two
//! phases so that all mutation happens before any command is recorded:
//!
//! - `prepare` gets a [`PrepareContext`] with mutable access to the
//!   resource manager and the frame blackboard. Pipelines are created,
//!   uniforms uploaded, bind groups rebuilt and toggles resolved here.
//! - `run` gets a read-only [`ExecuteContext`] and the view's single
//!   command encoder.

use super::context::{ExecuteContext, PrepareContext};

pub trait RenderNode {
    /// Name used for debug groups and logs.
    fn name(&self) -> &'static str;

    fn prepare(&mut self, _ctx: &mut PrepareContext) {}

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder);
}
