//! Auto-Exposure Configuration
//!
//! Exposure is computed on the GPU in two kernels:
//!
//! ```text
//! lit colour ──► histogram.wgsl ──► 256 × u32 bins (atomic)
//!                                          │
//!                                          ▼
//!                 exposure.wgsl (1 invocation): bins → average luminance
//!                                          │
//!                                          ▼
//!            exposure += (key / lum − exposure) × min(1, speed × dt)
//! ```
//!
//! The functions in this module are the CPU reference of that arithmetic,
//! kept in step with the kernels and checked by the exposure tests. The
//! persisted exposure buffer starts at [`NEUTRAL_EXPOSURE`].

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::resources::uniforms::ExposureUniforms;

/// Exposure held when auto-exposure is disabled.
pub const NEUTRAL_EXPOSURE: f32 = 1.0;

pub const HISTOGRAM_BINS: usize = 256;

/// Work-group edge of the histogram kernel (16 × 16 invocations).
pub const HISTOGRAM_WORKGROUP_SIZE: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureSettings {
    pub enabled: bool,
    /// Middle-grey target ("key value").
    pub key: f32,
    /// Adaptation rate per second.
    pub speed: f32,
    pub min_log_lum: f32,
    pub max_log_lum: f32,
    pub min_exposure: f32,
    pub max_exposure: f32,
}

impl Default for ExposureSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            key: 0.18,
            speed: 1.5,
            min_log_lum: -10.0,
            max_log_lum: 4.0,
            min_exposure: 0.03,
            max_exposure: 32.0,
        }
    }
}

impl ExposureSettings {
    #[inline]
    #[must_use]
    pub fn log_lum_range(&self) -> f32 {
        (self.max_log_lum - self.min_log_lum).max(1e-3)
    }

    #[must_use]
    pub fn uniforms(&self, dt: f32, pixel_count: u32) -> ExposureUniforms {
        ExposureUniforms {
            params: Vec4::new(self.min_log_lum, self.log_lum_range(), self.key, self.speed),
            frame: Vec4::new(
                dt.max(0.0),
                pixel_count as f32,
                self.min_exposure,
                self.max_exposure,
            ),
        }
    }
}

/// Exposure that maps `luminance` to the key value.
#[must_use]
pub fn exposure_target(key: f32, luminance: f32) -> f32 {
    key / luminance.max(1e-4)
}

/// Histogram bin for a pixel luminance. Bin 0 is reserved for near-black
/// pixels, which the reduction ignores.
#[must_use]
pub fn histogram_bin(luminance: f32, min_log_lum: f32, log_lum_range: f32) -> usize {
    if luminance < 1e-5 {
        return 0;
    }
    let t = ((luminance.log2() - min_log_lum) / log_lum_range).clamp(0.0, 1.0);
    1 + (t * (HISTOGRAM_BINS - 2) as f32) as usize
}

/// Weighted average luminance of a histogram, ignoring bin 0. Returns `None`
/// when every counted pixel is black.
#[must_use]
pub fn histogram_average(
    bins: &[u32; HISTOGRAM_BINS],
    min_log_lum: f32,
    log_lum_range: f32,
) -> Option<f32> {
    let mut weighted = 0.0f64;
    let mut count = 0u64;
    for (i, &n) in bins.iter().enumerate().skip(1) {
        weighted += f64::from(n) * (i - 1) as f64;
        count += u64::from(n);
    }
    if count == 0 {
        return None;
    }
    let mean_bin = (weighted / count as f64) as f32;
    let t = mean_bin / (HISTOGRAM_BINS - 2) as f32;
    Some((t * log_lum_range + min_log_lum).exp2())
}

/// Persisted exposure scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureState {
    pub exposure: f32,
}

impl Default for ExposureState {
    fn default() -> Self {
        Self {
            exposure: NEUTRAL_EXPOSURE,
        }
    }
}

impl ExposureState {
    /// Moves exposure toward `target` by at most `speed × dt` of the gap.
    /// Never overshoots and never moves away from the target.
    pub fn advance(&mut self, target: f32, speed: f32, dt: f32) -> f32 {
        let t = (speed * dt).clamp(0.0, 1.0);
        self.exposure += (target - self.exposure) * t;
        self.exposure
    }

    /// One frame of the GPU update: histogram → target → advance. Disabled
    /// auto-exposure pins the value at [`NEUTRAL_EXPOSURE`].
    pub fn update(
        &mut self,
        settings: &ExposureSettings,
        bins: &[u32; HISTOGRAM_BINS],
        dt: f32,
    ) -> f32 {
        if !settings.enabled {
            self.exposure = NEUTRAL_EXPOSURE;
            return self.exposure;
        }
        let Some(lum) = histogram_average(bins, settings.min_log_lum, settings.log_lum_range())
        else {
            return self.exposure;
        };
        let target = exposure_target(settings.key, lum)
            .clamp(settings.min_exposure, settings.max_exposure);
        self.advance(target, settings.speed, dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_goes_to_bin_zero() {
        assert_eq!(histogram_bin(0.0, -10.0, 14.0), 0);
        assert!(histogram_bin(0.5, -10.0, 14.0) > 0);
    }

    #[test]
    fn all_black_histogram_has_no_average() {
        let mut bins = [0u32; HISTOGRAM_BINS];
        bins[0] = 100;
        assert!(histogram_average(&bins, -10.0, 14.0).is_none());
    }
}
