//! Map-authored brush geometry.
//!
//! Brushes are solids loaded with the map. Some are tagged: water is drawn
//! as a translucent overlay, triggers and DSP zones are gameplay/audio
//! volumes and never drawn, and probe brushes define reflection probes.

use bitflags::bitflags;
use glam::Vec3;

use crate::resources::geometry::{BoundingBox, Vertex};
use crate::resources::material::MaterialLayers;

use super::CubemapHandle;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BrushFlags: u32 {
        const WATER    = 1 << 0;
        const TRIGGER  = 1 << 1;
        const PROBE    = 1 << 2;
        const DSP_ZONE = 1 << 3;
        /// Parallax-interior room shell.
        const INTERIOR = 1 << 4;
    }
}

/// Reflection-probe payload of a `PROBE` brush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeData {
    /// Base name of the baked face images. Unnamed probes are skipped at
    /// bake time.
    pub name: String,
    /// Live cubemap, replaced on every bake.
    pub cubemap: Option<CubemapHandle>,
}

#[derive(Debug, Clone, Default)]
pub struct Brush {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub flags: BrushFlags,
    pub layers: MaterialLayers,
    pub probe: Option<ProbeData>,
}

impl Brush {
    #[must_use]
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, layers: MaterialLayers) -> Self {
        Self {
            vertices,
            indices,
            flags: BrushFlags::empty(),
            layers,
            probe: None,
        }
    }

    /// An invisible probe volume spanning `bounds`.
    #[must_use]
    pub fn probe(name: impl Into<String>, bounds: BoundingBox) -> Self {
        let vertices = bounds
            .corners()
            .iter()
            .map(|c| Vertex::new(*c, Vec3::Y, [0.0, 0.0]))
            .collect();
        Self {
            vertices,
            indices: Vec::new(),
            flags: BrushFlags::PROBE,
            layers: MaterialLayers::new(),
            probe: Some(ProbeData {
                name: name.into(),
                cubemap: None,
            }),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: BrushFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// World-space bounds, recomputed from the vertex set on every call.
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(self.vertices.iter().map(|v| Vec3::from(v.position)))
    }

    #[inline]
    #[must_use]
    pub fn is_probe(&self) -> bool {
        self.flags.contains(BrushFlags::PROBE)
    }

    #[inline]
    #[must_use]
    pub fn is_water(&self) -> bool {
        self.flags.contains(BrushFlags::WATER)
    }

    /// Drawn by the geometry pass (and shadow/VPL views).
    #[must_use]
    pub fn is_opaque_drawable(&self) -> bool {
        !self.indices.is_empty()
            && !self.flags.intersects(
                BrushFlags::WATER | BrushFlags::TRIGGER | BrushFlags::PROBE | BrushFlags::DSP_ZONE,
            )
    }
}
