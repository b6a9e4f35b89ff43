//! Shadow map and cookie residency.
//!
//! Both are texture arrays allocated once at renderer creation. Layers are
//! owned per [`LightId`]: a light gets a layer the first frame it needs one
//! and gives it back the first frame it no longer exists (or stops casting
//! that kind of shadow / drops its cookie). Running out of layers leaves the
//! light unshadowed (or uncookied) with a warning; it is never fatal.
//!
//! ```text
//! cube array  (Depth32, 6 × N layers)   point lights, distance / far
//! planar array (Depth32, 1 + N layers)  layer 0 = sun, 1.. = spot lights
//! cookie array (RGBA8,  COOKIE_LAYERS)  projected masks
//! ```

use rustc_hash::{FxHashMap, FxHashSet};

use super::allocator::LayerAllocator;
use super::texture::write_layer;
use crate::renderer::core::targets::DEPTH_FORMAT;
use crate::scene::light::{LightKind, ShadowKind};
use crate::scene::{LightId, Scene, TextureHandle};

pub const SUN_SHADOW_LAYER: u32 = 0;
pub const COOKIE_LAYERS: u32 = 16;
pub const COOKIE_SIZE: u32 = 256;

// ============================================================================
// Slot assignment (no GPU state)
// ============================================================================

/// Which shadow layers each light owns this frame.
#[derive(Debug, Clone)]
pub struct ShadowSlots {
    point: LayerAllocator<LightId>,
    planar: LayerAllocator<LightId>,
    sun: Option<LightId>,
    warned: FxHashSet<LightId>,
}

impl ShadowSlots {
    #[must_use]
    pub fn new(max_shadowed_lights: u32) -> Self {
        Self {
            point: LayerAllocator::new(max_shadowed_lights, 0),
            planar: LayerAllocator::new(max_shadowed_lights + 1, 1),
            sun: None,
            warned: FxHashSet::default(),
        }
    }

    /// Brings slot ownership in line with the scene. Lights are visited in
    /// insertion order, so earlier lights win when layers run out.
    pub fn sync(&mut self, scene: &Scene, shadows_enabled: bool) {
        let wants = |id: LightId, kind: ShadowKind| {
            shadows_enabled
                && scene
                    .light(id)
                    .is_some_and(|l| l.shadow_kind() == kind && !l.is_directional())
        };
        self.point.retain(|id| wants(id, ShadowKind::Cube));
        self.planar.retain(|id| wants(id, ShadowKind::Planar));
        self.warned.retain(|id| scene.contains_light(*id));
        self.sun = None;

        if !shadows_enabled {
            return;
        }

        for (id, light) in scene.lights() {
            let assigned = match (light.shadow_kind(), light.kind) {
                (ShadowKind::None, _) => continue,
                (ShadowKind::Planar, LightKind::Directional(_)) => {
                    if self.sun.is_none() {
                        self.sun = Some(id);
                    }
                    continue;
                }
                (ShadowKind::Cube, _) => self.point.assign(id).is_some(),
                (ShadowKind::Planar, _) => self.planar.assign(id).is_some(),
            };
            if !assigned && self.warned.insert(id) {
                log::warn!("Shadow layers exhausted; light {id:?} renders without shadows");
            }
        }
    }

    /// Cube index in the cube array; its faces are layers `6 × index ..`.
    #[must_use]
    pub fn cube_layer(&self, id: LightId) -> Option<u32> {
        self.point.get(id)
    }

    /// Layer in the planar array (sun included).
    #[must_use]
    pub fn planar_layer(&self, id: LightId) -> Option<u32> {
        if self.sun == Some(id) {
            return Some(SUN_SHADOW_LAYER);
        }
        self.planar.get(id)
    }

    #[inline]
    #[must_use]
    pub fn sun(&self) -> Option<LightId> {
        self.sun
    }

    #[must_use]
    pub fn shadowed_count(&self) -> usize {
        self.point.len() + self.planar.len() + usize::from(self.sun.is_some())
    }
}

// ============================================================================
// ShadowAtlas
// ============================================================================

pub struct ShadowAtlas {
    pub size: u32,
    pub slots: ShadowSlots,
    pub cube_texture: wgpu::Texture,
    /// `CubeArray` view for sampling.
    pub cube_view: wgpu::TextureView,
    /// One 2D view per cube face layer, for rendering.
    pub cube_face_views: Vec<wgpu::TextureView>,
    pub planar_texture: wgpu::Texture,
    pub planar_view: wgpu::TextureView,
    pub planar_layer_views: Vec<wgpu::TextureView>,
}

impl ShadowAtlas {
    #[must_use]
    pub fn new(device: &wgpu::Device, size: u32, max_shadowed_lights: u32) -> Self {
        let size = size.max(1);
        let lights = max_shadowed_lights.max(1);
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;

        let cube_layers = 6 * lights;
        let cube_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Point Shadow Cube Array"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: cube_layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage,
            view_formats: &[],
        });
        let cube_view = cube_texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Point Shadow Cube Array View"),
            dimension: Some(wgpu::TextureViewDimension::CubeArray),
            ..Default::default()
        });
        let cube_face_views = (0..cube_layers)
            .map(|layer| layer_view(&cube_texture, layer, "Point Shadow Face"))
            .collect();

        let planar_layers = lights + 1;
        let planar_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Planar Shadow Array"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: planar_layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage,
            view_formats: &[],
        });
        let planar_view = planar_texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Planar Shadow Array View"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let planar_layer_views = (0..planar_layers)
            .map(|layer| layer_view(&planar_texture, layer, "Planar Shadow Layer"))
            .collect();

        log::info!("Shadow atlas: {size}px, {lights} point + {planar_layers} planar layers");

        Self {
            size,
            slots: ShadowSlots::new(lights),
            cube_texture,
            cube_view,
            cube_face_views,
            planar_texture,
            planar_view,
            planar_layer_views,
        }
    }
}

fn layer_view(texture: &wgpu::Texture, layer: u32, label: &str) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some(label),
        dimension: Some(wgpu::TextureViewDimension::D2),
        base_array_layer: layer,
        array_layer_count: Some(1),
        ..Default::default()
    })
}

// ============================================================================
// CookieAtlas
// ============================================================================

pub struct CookieAtlas {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    slots: LayerAllocator<LightId>,
    /// Texture currently resident in each light's layer.
    uploaded: FxHashMap<LightId, TextureHandle>,
    warned: FxHashSet<LightId>,
}

impl CookieAtlas {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Light Cookie Array"),
            size: wgpu::Extent3d {
                width: COOKIE_SIZE,
                height: COOKIE_SIZE,
                depth_or_array_layers: COOKIE_LAYERS,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: super::texture::TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Light Cookie Array View"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        Self {
            texture,
            view,
            slots: LayerAllocator::new(COOKIE_LAYERS, 0),
            uploaded: FxHashMap::default(),
            warned: FxHashSet::default(),
        }
    }

    /// Releases layers of lights that were removed or dropped their cookie,
    /// then uploads new or changed cookies.
    pub fn sync(&mut self, queue: &wgpu::Queue, scene: &Scene) {
        let released = self.slots.retain(|id| {
            scene
                .light(id)
                .and_then(|l| l.cookie)
                .is_some_and(|c| scene.textures().contains_key(c))
        });
        for id in released {
            self.uploaded.remove(&id);
        }
        self.warned.retain(|id| scene.contains_light(*id));

        for (id, light) in scene.lights() {
            let Some(cookie) = light.cookie else { continue };
            let Some(image) = scene.textures().get(cookie) else {
                continue;
            };
            if self.uploaded.get(&id) == Some(&cookie) {
                continue;
            }
            let Some(layer) = self.slots.assign(id) else {
                if self.warned.insert(id) {
                    log::warn!("Cookie layers exhausted; light {id:?} renders without its cookie");
                }
                continue;
            };
            write_layer(queue, &self.texture, &image.resized(COOKIE_SIZE, COOKIE_SIZE), layer);
            self.uploaded.insert(id, cookie);
        }
    }

    #[must_use]
    pub fn layer(&self, id: LightId) -> Option<u32> {
        self.uploaded.contains_key(&id).then(|| self.slots.get(id)).flatten()
    }

    #[must_use]
    pub fn resident_count(&self) -> usize {
        self.slots.len()
    }
}
