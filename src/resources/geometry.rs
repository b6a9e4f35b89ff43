//! CPU-side geometry: vertices, meshes and axis-aligned bounding boxes.
//!
//! Meshes are supplied by the external asset layer already decoded; the
//! renderer uploads them lazily and never mutates them.

use glam::{Mat4, Vec3};

/// Interleaved vertex shared by objects, brushes, decals and water.
///
/// `blend` carries the per-vertex weights of the (up to four) material
/// layers. Weights are normalized in the shader, so `[1, 0, 0, 0]` selects
/// the first layer only.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub blend: [f32; 4],
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x4,
    ];

    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
            blend: [1.0, 0.0, 0.0, 0.0],
        }
    }

    #[must_use]
    pub fn with_blend(mut self, blend: [f32; 4]) -> Self {
        self.blend = blend;
        self
    }

    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// ============================================================================
// Bounding Box
// ============================================================================

/// Axis-aligned bounding box.
///
/// All containment queries use **inclusive** bounds: a point lying exactly on
/// a face is inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// An inverted box that any `extend` call will replace.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Builds the tightest box around `points`. Returns [`Self::EMPTY`] for an
    /// empty iterator.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut bb, p| {
            bb.extend(p);
            bb
        })
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    #[must_use]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// The corner most aligned with `normal` (the "positive vertex" used by
    /// the plane rejection test).
    #[inline]
    #[must_use]
    pub fn positive_vertex(&self, normal: Vec3) -> Vec3 {
        Vec3::new(
            if normal.x >= 0.0 { self.max.x } else { self.min.x },
            if normal.y >= 0.0 { self.max.y } else { self.min.y },
            if normal.z >= 0.0 { self.max.z } else { self.min.z },
        )
    }

    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// World-space box enclosing this box after `transform`.
    #[must_use]
    pub fn transformed(&self, transform: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::from_points(self.corners().iter().map(|c| transform.transform_point3(*c)))
    }
}

// ============================================================================
// Mesh
// ============================================================================

/// Indexed triangle mesh with a cached local-space bounding box.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    bounds: BoundingBox,
}

impl Mesh {
    #[must_use]
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let bounds = BoundingBox::from_points(vertices.iter().map(|v| Vec3::from(v.position)));
        Self {
            vertices,
            indices,
            bounds,
        }
    }

    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Unit quad in the XY plane facing +Z, used for decals.
    #[must_use]
    pub fn quad() -> Self {
        let n = Vec3::Z;
        let vertices = vec![
            Vertex::new(Vec3::new(-0.5, -0.5, 0.0), n, [0.0, 1.0]),
            Vertex::new(Vec3::new(0.5, -0.5, 0.0), n, [1.0, 1.0]),
            Vertex::new(Vec3::new(0.5, 0.5, 0.0), n, [1.0, 0.0]),
            Vertex::new(Vec3::new(-0.5, 0.5, 0.0), n, [0.0, 0.0]),
        ];
        Self::new(vertices, vec![0, 1, 2, 0, 2, 3])
    }

    /// Axis-aligned box centered at the origin with per-face normals.
    #[must_use]
    pub fn cuboid(half: Vec3) -> Self {
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in faces {
            let base = vertices.len() as u32;
            for (su, sv, uv) in [
                (-1.0, -1.0, [0.0, 1.0]),
                (1.0, -1.0, [1.0, 1.0]),
                (1.0, 1.0, [1.0, 0.0]),
                (-1.0, 1.0, [0.0, 0.0]),
            ] {
                let p = (normal + u * su + v * sv) * half;
                vertices.push(Vertex::new(p, normal, uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new(vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_point_is_inclusive() {
        let bb = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        assert!(bb.contains_point(Vec3::new(1.0, 0.5, 0.0)));
        assert!(!bb.contains_point(Vec3::new(1.0001, 0.5, 0.0)));
    }

    #[test]
    fn transformed_box_follows_translation() {
        let bb = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let moved = bb.transformed(&Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(moved.min, Vec3::new(4.0, -1.0, -1.0));
        assert_eq!(moved.max, Vec3::new(6.0, 1.0, 1.0));
    }

    #[test]
    fn cuboid_bounds_match_half_extents() {
        let mesh = Mesh::cuboid(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.bounds().max, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.indices().len(), 36);
    }
}
