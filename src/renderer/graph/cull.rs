//! CPU visibility culling.
//!
//! Every view (camera, shadow face, VPL light view) builds its own
//! [`DrawList`] by testing world-space AABBs against the view frustum.
//! Scene order is preserved: objects first, then brushes, each in the order
//! they appear in the scene.

use crate::resources::geometry::BoundingBox;
use crate::scene::{Frustum, Scene};

/// Reference to one drawable in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawItem {
    /// Index into `Scene::objects`.
    Object(usize),
    /// Index into `Scene::brushes`.
    Brush(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawList {
    pub items: Vec<DrawItem>,
}

impl DrawList {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// World-space bounds of a draw item, if it still exists.
#[must_use]
pub fn item_bounds(scene: &Scene, item: DrawItem) -> Option<BoundingBox> {
    match item {
        DrawItem::Object(i) => {
            let object = scene.objects.get(i)?;
            let mesh = scene.mesh(object.mesh)?;
            Some(object.world_bounds(&mesh.bounds()))
        }
        DrawItem::Brush(i) => scene.brushes.get(i).map(|b| b.bounds()),
    }
}

/// Opaque geometry visible in `frustum`: visible objects with a live mesh,
/// then drawable brushes (water, trigger, probe and DSP-zone brushes never
/// enter this list).
#[must_use]
pub fn cull_scene(scene: &Scene, frustum: &Frustum) -> DrawList {
    let mut list = DrawList::default();
    cull_scene_into(scene, frustum, &mut list);
    list
}

pub fn cull_scene_into(scene: &Scene, frustum: &Frustum, list: &mut DrawList) {
    list.clear();
    let objects = scene
        .objects
        .iter()
        .enumerate()
        .filter(|(_, o)| o.visible)
        .map(|(i, _)| DrawItem::Object(i));
    let brushes = scene
        .brushes
        .iter()
        .enumerate()
        .filter(|(_, b)| b.is_opaque_drawable())
        .map(|(i, _)| DrawItem::Brush(i));

    list.items.extend(objects.chain(brushes).filter(|item| {
        item_bounds(scene, *item).is_some_and(|bounds| frustum.intersects_aabb(&bounds))
    }));
}

/// Water brushes visible in `frustum`, for the transparent overlay pass.
#[must_use]
pub fn cull_water(scene: &Scene, frustum: &Frustum) -> Vec<usize> {
    scene
        .brushes
        .iter()
        .enumerate()
        .filter(|(_, b)| b.is_water() && !b.indices.is_empty())
        .filter(|(_, b)| frustum.intersects_aabb(&b.bounds()))
        .map(|(i, _)| i)
        .collect()
}
