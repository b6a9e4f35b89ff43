//! Scene data read by the rendering core.
//!
//! The scene is built on map load and cleared on unload by collaborators
//! outside this crate; gameplay and physics mutate it between frames. The
//! renderer only reads it, except for probe baking which replaces each
//! probe's live cubemap handle.

pub mod brush;
pub mod camera;
pub mod environment;
pub mod light;
pub mod object;

use glam::Vec3;
use slotmap::{SlotMap, new_key_type};

use crate::resources::geometry::Mesh;
use crate::resources::texture::Image;

pub use brush::{Brush, BrushFlags, ProbeData};
pub use camera::{Camera, Frustum, RenderCamera};
pub use environment::Environment;
pub use light::{Light, LightKind, ShadowKind};
pub use object::{Decal, Particle, ParticleEmitter, SceneObject};

new_key_type! {
    /// Stable identity of a light across frames.
    pub struct LightId;
    pub struct MeshHandle;
    pub struct TextureHandle;
    /// A live GPU cubemap owned by the renderer.
    pub struct CubemapHandle;
}

#[derive(Debug, Default)]
pub struct Scene {
    lights: SlotMap<LightId, Light>,
    /// Insertion order; "first light" semantics depend on it.
    light_order: Vec<LightId>,
    meshes: SlotMap<MeshHandle, Mesh>,
    textures: SlotMap<TextureHandle, Image>,

    pub objects: Vec<SceneObject>,
    /// Scan order matters: probe lookup returns the first match.
    pub brushes: Vec<Brush>,
    pub decals: Vec<Decal>,
    pub emitters: Vec<ParticleEmitter>,
    pub environment: Environment,

    generation: u64,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lights ───────────────────────────────────────────────────────────

    pub fn add_light(&mut self, light: Light) -> LightId {
        let id = self.lights.insert(light);
        self.light_order.push(id);
        id
    }

    /// Removes a light. The renderer releases its shadow slot and cookie
    /// residency on the next frame.
    pub fn remove_light(&mut self, id: LightId) -> Option<Light> {
        let light = self.lights.remove(id)?;
        self.light_order.retain(|l| *l != id);
        Some(light)
    }

    #[must_use]
    pub fn light(&self, id: LightId) -> Option<&Light> {
        self.lights.get(id)
    }

    pub fn light_mut(&mut self, id: LightId) -> Option<&mut Light> {
        self.lights.get_mut(id)
    }

    /// Lights in insertion order.
    pub fn lights(&self) -> impl Iterator<Item = (LightId, &Light)> + '_ {
        self.light_order.iter().filter_map(|id| self.lights.get(*id).map(|l| (*id, l)))
    }

    #[must_use]
    pub fn contains_light(&self, id: LightId) -> bool {
        self.lights.contains_key(id)
    }

    #[must_use]
    pub fn light_count(&self) -> usize {
        self.light_order.len()
    }

    // ── Assets ───────────────────────────────────────────────────────────

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshHandle {
        self.meshes.insert(mesh)
    }

    #[must_use]
    pub fn mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle)
    }

    pub fn add_texture(&mut self, image: Image) -> TextureHandle {
        self.textures.insert(image)
    }

    pub fn remove_texture(&mut self, handle: TextureHandle) -> Option<Image> {
        self.textures.remove(handle)
    }

    #[must_use]
    pub fn textures(&self) -> &SlotMap<TextureHandle, Image> {
        &self.textures
    }

    // ── Probes ───────────────────────────────────────────────────────────

    /// Probe brushes in scan order, with their index into `brushes`.
    pub fn probes(&self) -> impl Iterator<Item = (usize, &Brush)> + '_ {
        self.brushes.iter().enumerate().filter(|(_, b)| b.is_probe())
    }

    /// First probe (in brush order) whose AABB contains `point`, bounds
    /// inclusive. Overlapping probes resolve by scan order, not distance.
    #[must_use]
    pub fn find_probe(&self, point: Vec3) -> Option<usize> {
        self.probes()
            .find(|(_, b)| b.bounds().contains_point(point))
            .map(|(i, _)| i)
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Monotonic counter bumped whenever the map is (re)loaded or cleared.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Marks the scene content as replaced (map load). Static GI and brush
    /// GPU buffers are rebuilt on the next frame.
    pub fn mark_loaded(&mut self) {
        self.generation += 1;
    }

    /// Drops all content (map unload).
    pub fn clear(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }
}
