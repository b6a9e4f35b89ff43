//! Renderable objects, decals and particle emitters.

use glam::{Mat4, Vec3, Vec4};

use crate::resources::geometry::BoundingBox;
use crate::resources::material::MaterialLayers;

use super::{MeshHandle, TextureHandle};

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub mesh: MeshHandle,
    pub transform: Mat4,
    pub layers: MaterialLayers,
    pub visible: bool,
}

impl SceneObject {
    #[must_use]
    pub fn new(mesh: MeshHandle, transform: Mat4, layers: MaterialLayers) -> Self {
        Self {
            mesh,
            transform,
            layers,
            visible: true,
        }
    }

    /// World-space position used for probe selection.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    #[must_use]
    pub fn world_bounds(&self, local: &BoundingBox) -> BoundingBox {
        local.transformed(&self.transform)
    }
}

/// Forward, alpha-blended overlay drawn after opaque geometry. The transform
/// places a unit quad.
#[derive(Debug, Clone)]
pub struct Decal {
    pub transform: Mat4,
    pub texture: Option<TextureHandle>,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Particle {
    pub position: Vec3,
    pub size: f32,
    pub color: Vec4,
}

/// Particles are simulated outside the renderer; only their current state
/// is drawn.
#[derive(Debug, Clone, Default)]
pub struct ParticleEmitter {
    pub particles: Vec<Particle>,
}
