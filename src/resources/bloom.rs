//! Bloom Configuration
//!
//! Bloom extracts over-bright pixels from the lit colour buffer into a heavily
//! downsampled target, then blurs them with a fixed number of separable
//! Gaussian iterations over a ping-pong pair (see
//! [`ping_pong_schedule`](super::filter::ping_pong_schedule)).
//!
//! When bloom is disabled the output target is cleared to
//! [`BLOOM_NEUTRAL`] so the composite pass reads a defined zero contribution.

use serde::{Deserialize, Serialize};

use crate::resources::uniforms::FilterUniforms;

/// Separable blur iterations (alternating H / V).
pub const BLOOM_BLUR_ITERATIONS: u32 = 10;

/// Bloom contribution written when the feature is off.
pub const BLOOM_NEUTRAL: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    pub enabled: bool,
    /// Resolution divisor relative to the full-resolution colour buffer.
    pub downsample: u32,
    /// Luminance above which pixels start to bloom.
    pub threshold: f32,
    /// Width of the soft transition around `threshold`.
    pub soft_knee: f32,
    /// Scale applied to the blurred result in the composite pass.
    pub strength: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            downsample: 4,
            threshold: 1.0,
            soft_knee: 0.5,
            strength: 0.6,
        }
    }
}

impl BloomSettings {
    /// Strength as seen by the composite pass.
    #[inline]
    #[must_use]
    pub fn effective_strength(&self) -> f32 {
        if self.enabled { self.strength } else { BLOOM_NEUTRAL }
    }

    #[must_use]
    pub fn extract_uniforms(&self) -> FilterUniforms {
        FilterUniforms {
            params: glam::Vec4::new(self.threshold, self.soft_knee, 0.0, 0.0),
        }
    }
}

/// Soft-knee bright-pass weight; mirrors `bloom_extract.wgsl`.
#[must_use]
pub fn bright_pass_weight(luminance: f32, threshold: f32, knee: f32) -> f32 {
    let knee = knee.max(1e-4) * threshold;
    let soft = (luminance - threshold + knee).clamp(0.0, 2.0 * knee);
    let soft = soft * soft / (4.0 * knee + 1e-5);
    let contribution = soft.max(luminance - threshold);
    contribution / luminance.max(1e-5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_pixels_do_not_bloom() {
        assert_eq!(bright_pass_weight(0.1, 1.0, 0.5), 0.0);
    }

    #[test]
    fn bright_pixels_pass_mostly_through() {
        let w = bright_pass_weight(10.0, 1.0, 0.5);
        assert!(w > 0.85 && w <= 1.0, "weight {w}");
    }
}
