//! SSAO configuration and sample kernel.
//!
//! The kernel is generated deterministically from a Halton sequence so two
//! runs of the same scene produce bit-identical occlusion.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Value written to the AO buffer when SSAO is disabled (fully unoccluded).
pub const SSAO_NEUTRAL: f32 = 1.0;

pub const SSAO_KERNEL_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsaoSettings {
    pub enabled: bool,
    /// Resolution divisor relative to the G-buffer.
    pub downsample: u32,
    /// World-space sampling radius.
    pub radius: f32,
    pub bias: f32,
    pub intensity: f32,
}

impl Default for SsaoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            downsample: 2,
            radius: 0.5,
            bias: 0.025,
            intensity: 1.0,
        }
    }
}

fn halton(mut index: u32, base: u32) -> f32 {
    let mut f = 1.0;
    let mut r = 0.0;
    while index > 0 {
        f /= base as f32;
        r += f * (index % base) as f32;
        index /= base;
    }
    r
}

/// Hemisphere samples (+Z up) with density concentrated near the origin.
#[must_use]
pub fn generate_ssao_kernel() -> [Vec4; SSAO_KERNEL_SIZE] {
    std::array::from_fn(|i| {
        let n = i as u32 + 1;
        let phi = halton(n, 2) * std::f32::consts::TAU;
        let cos_theta = halton(n, 3);
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
        let dir = Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);

        let t = i as f32 / SSAO_KERNEL_SIZE as f32;
        let scale = 0.1 + 0.9 * t * t;
        (dir * scale * halton(n, 5).max(0.1)).extend(0.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_lies_in_unit_hemisphere() {
        for s in generate_ssao_kernel() {
            assert!(s.z >= 0.0);
            assert!(s.truncate().length() <= 1.0 + 1e-5);
        }
    }
}
