//! Shadow Utilities
//!
//! Pure view/projection math shared by the shadow and VPL passes.
//!
//! # Cube faces
//!
//! Faces follow the wgpu cube layer order `+X -X +Y -Y +Z -Z`. Each face has
//! a fixed up vector so `look_to` never builds a basis from two parallel
//! vectors:
//!
//! | face | forward | up  |
//! |------|---------|-----|
//! | +X   | +X      | -Y  |
//! | -X   | -X      | -Y  |
//! | +Y   | +Y      | +Z  |
//! | -Y   | -Y      | -Z  |
//! | +Z   | +Z      | -Y  |
//! | -Z   | -Z      | -Y  |

use glam::{Mat4, Vec3};

use crate::scene::RenderCamera;
use crate::scene::light::{Light, LightKind};

/// Near plane of every light view.
pub const SHADOW_NEAR: f32 = 0.05;

/// `(forward, up)` per cube face, in layer order.
pub const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

/// The six 90° cameras of a cube capture centered on `position`.
#[must_use]
pub fn cube_face_cameras(position: Vec3, near: f32, far: f32) -> [RenderCamera; 6] {
    CUBE_FACES.map(|(forward, up)| RenderCamera::cube_face(position, forward, up, near, far))
}

#[must_use]
pub fn cube_face_view_projections(position: Vec3, far: f32) -> [Mat4; 6] {
    cube_face_cameras(position, SHADOW_NEAR, far.max(SHADOW_NEAR * 2.0)).map(|c| c.view_projection)
}

/// Up vector that is never parallel to `direction`.
fn stable_up(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y }
}

/// Perspective view of a spot light; the field of view covers the full cone
/// (`2 × outer cutoff`). `None` for other light kinds.
#[must_use]
pub fn spot_view_projection(light: &Light) -> Option<Mat4> {
    let LightKind::Spot(spot) = light.kind else {
        return None;
    };
    let direction = light.direction();
    let fov = (spot.outer_cutoff * 2.0).clamp(0.01, std::f32::consts::PI - 0.01);
    let far = spot.range.max(SHADOW_NEAR * 2.0);
    let view = Mat4::look_to_rh(light.position, direction, stable_up(direction));
    let projection = Mat4::perspective_rh(fov, 1.0, SHADOW_NEAR, far);
    Some(projection * view)
}

/// Orthographic view of the sun covering a `shadow_distance` box around
/// `focus` (usually the camera position).
#[must_use]
pub fn sun_view_projection(direction: Vec3, focus: Vec3, shadow_distance: f32) -> Mat4 {
    let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Y);
    let extent = shadow_distance.max(1.0);
    let eye = focus - direction * extent * 2.0;
    let view = Mat4::look_to_rh(eye, direction, stable_up(direction));
    let projection = Mat4::orthographic_rh(-extent, extent, -extent, extent, SHADOW_NEAR, extent * 4.0);
    projection * view
}

/// Far plane used to normalize point-light shadow depth.
#[must_use]
pub fn point_shadow_far(light: &Light) -> f32 {
    light.range().max(SHADOW_NEAR * 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn cube_face_forward_projects_to_center() {
        let vps = cube_face_view_projections(Vec3::ZERO, 10.0);
        for (vp, (forward, _)) in vps.iter().zip(CUBE_FACES) {
            let clip = *vp * (forward * 5.0).extend(1.0);
            let ndc = clip.truncate() / clip.w;
            assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
            assert!((0.0..=1.0).contains(&ndc.z));
        }
    }

    #[test]
    fn spot_cone_edge_stays_in_view() {
        let light = Light::new_spot(Vec3::ZERO, Vec3::NEG_Z, Vec3::ONE, 1.0, 20.0, 0.3, 0.5);
        let vp = spot_view_projection(&light).unwrap();
        let edge = Vec3::new(0.0, 0.49_f32.tan(), -1.0) * 5.0;
        let clip = vp * Vec4::from((edge, 1.0));
        assert!((clip.y / clip.w).abs() <= 1.0);
    }

    #[test]
    fn sun_focus_is_centered() {
        let vp = sun_view_projection(Vec3::new(0.3, -1.0, 0.2), Vec3::new(5.0, 0.0, 5.0), 50.0);
        let clip = vp * Vec4::new(5.0, 0.0, 5.0, 1.0);
        assert!(clip.x.abs() < 1e-3 && clip.y.abs() < 1e-3);
        assert!((0.0..=1.0).contains(&clip.z));
    }
}
