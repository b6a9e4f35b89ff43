//! Layered surface materials.
//!
//! Every drawn face samples up to [`MAX_MATERIAL_LAYERS`] layers and blends
//! them with the per-vertex `blend` weights.

use smallvec::SmallVec;

use crate::resources::texture::{TextureSlot, TextureSource, resolve_texture};
use crate::scene::{Scene, TextureHandle};

pub const MAX_MATERIAL_LAYERS: usize = 4;

/// One blendable layer: albedo, tangent-space normal and packed PBR params.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MaterialLayer {
    pub albedo: Option<TextureHandle>,
    pub normal: Option<TextureHandle>,
    pub pbr: Option<TextureHandle>,
}

impl MaterialLayer {
    #[must_use]
    pub fn albedo(handle: TextureHandle) -> Self {
        Self {
            albedo: Some(handle),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MaterialLayers {
    layers: SmallVec<[MaterialLayer; MAX_MATERIAL_LAYERS]>,
}

impl MaterialLayers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(layer: MaterialLayer) -> Self {
        let mut layers = Self::new();
        layers.push(layer);
        layers
    }

    /// Appends a layer. Layers beyond the fourth are dropped with a warning.
    pub fn push(&mut self, layer: MaterialLayer) {
        if self.layers.len() >= MAX_MATERIAL_LAYERS {
            log::warn!("Material already has {MAX_MATERIAL_LAYERS} layers; extra layer ignored");
            return;
        }
        self.layers.push(layer);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    #[must_use]
    pub fn layer(&self, index: usize) -> Option<&MaterialLayer> {
        self.layers.get(index)
    }

    /// Resolves every slot of every layer (unused layers included) to a
    /// concrete texture source, in binding order.
    #[must_use]
    pub fn resolve(&self, scene: &Scene) -> ResolvedMaterial {
        let mut sources = [[TextureSource::Fallback(TextureSlot::Albedo); 3]; MAX_MATERIAL_LAYERS];
        for (i, slot_sources) in sources.iter_mut().enumerate() {
            let layer = self.layers.get(i).copied().unwrap_or_default();
            *slot_sources = [
                resolve_texture(scene.textures(), layer.albedo, TextureSlot::Albedo),
                resolve_texture(scene.textures(), layer.normal, TextureSlot::Normal),
                resolve_texture(scene.textures(), layer.pbr, TextureSlot::Pbr),
            ];
        }
        ResolvedMaterial {
            sources,
            layer_count: self.layers.len().max(1) as u32,
        }
    }
}

/// Material with every slot bound to a live texture or a fallback.
///
/// Used as the cache key for material bind groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedMaterial {
    pub sources: [[TextureSource; 3]; MAX_MATERIAL_LAYERS],
    pub layer_count: u32,
}
