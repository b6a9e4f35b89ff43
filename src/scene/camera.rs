//! Camera, per-view matrices and frustum culling.
//!
//! [`Camera`] is the gameplay-facing description (position + yaw/pitch + FOV).
//! Passes never read it directly; they consume a [`RenderCamera`] extracted
//! once per view, which is also how probe baking overrides the view without
//! touching the caller's camera.

use glam::{Mat4, Vec3, Vec4};

use crate::resources::geometry::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Rotation around +Y in radians; 0 looks down -Z.
    pub yaw: f32,
    /// Rotation above the horizon in radians.
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            fov_y: 70.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    #[must_use]
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp).normalize()
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }

    #[must_use]
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), aspect.max(1e-4), self.near, self.far)
    }

    #[must_use]
    pub fn extract_render_camera(&self, aspect: f32) -> RenderCamera {
        RenderCamera::new(
            self.view_matrix(),
            self.projection_matrix(aspect),
            self.position,
            self.near,
            self.far,
        )
    }
}

// ============================================================================
// RenderCamera
// ============================================================================

/// Immutable per-view matrices consumed by every pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderCamera {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub inverse_view: Mat4,
    pub inverse_view_projection: Mat4,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

impl RenderCamera {
    #[must_use]
    pub fn new(view: Mat4, projection: Mat4, position: Vec3, near: f32, far: f32) -> Self {
        let view_projection = projection * view;
        Self {
            view,
            projection,
            view_projection,
            inverse_view: view.inverse(),
            inverse_view_projection: view_projection.inverse(),
            position,
            near,
            far,
        }
    }

    /// A 90°, aspect-1 view from `position` along `forward`, as used for
    /// cube faces.
    ///
    /// The projection flips Y so that row 0 of the rendered face lines up
    /// with `t = 0` of the cube sampling rule. This reverses triangle
    /// winding: passes drawing into cube faces swap their cull face.
    #[must_use]
    pub fn cube_face(position: Vec3, forward: Vec3, up: Vec3, near: f32, far: f32) -> Self {
        let view = Mat4::look_to_rh(position, forward, up);
        let projection = Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
            * Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, near, far);
        Self::new(view, projection, position, near, far)
    }

    #[must_use]
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(self.view_projection)
    }
}

// ============================================================================
// Frustum
// ============================================================================

/// Six half-space planes `(n, d)` with `dot(n, p) + d >= 0` meaning inside.
///
/// Order: left, right, bottom, top, near, far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Gribb–Hartmann plane extraction for a `[0, 1]` clip-space depth range.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0], // Left
            rows[3] - rows[0], // Right
            rows[3] + rows[1], // Bottom
            rows[3] - rows[1], // Top
            rows[2],           // Near (z >= 0)
            rows[3] - rows[2], // Far  (z <= w)
        ];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > f32::EPSILON {
                *plane /= length;
            }
        }

        Self { planes }
    }

    #[inline]
    #[must_use]
    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }

    /// Positive-vertex test: the box is rejected when, for any plane, the
    /// corner most aligned with the plane normal is still behind it.
    #[must_use]
    pub fn intersects_aabb(&self, aabb: &BoundingBox) -> bool {
        if aabb.is_empty() {
            return false;
        }
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            normal.dot(aabb.positive_vertex(normal)) + plane.w >= 0.0
        })
    }
}
