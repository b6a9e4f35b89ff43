//! Auto-Exposure Tests
//!
//! Tests for:
//! - Histogram binning (bin 0 reserved for black)
//! - Average luminance reconstruction
//! - Adaptation: monotone toward the target, bounded by `speed × dt`
//! - Disabled adaptation pinned at the neutral exposure

use myth_deferred::resources::tone_mapping::{
    ExposureSettings, ExposureState, HISTOGRAM_BINS, NEUTRAL_EXPOSURE, exposure_target, histogram_average,
    histogram_bin,
};

const EPSILON: f32 = 1e-4;

fn histogram_of(luminance: f32, settings: &ExposureSettings, pixels: u32) -> [u32; HISTOGRAM_BINS] {
    let mut bins = [0u32; HISTOGRAM_BINS];
    bins[histogram_bin(luminance, settings.min_log_lum, settings.log_lum_range())] = pixels;
    bins
}

// ============================================================================
// Histogram
// ============================================================================

#[test]
fn bins_increase_with_luminance() {
    let s = ExposureSettings::default();
    let mut last = 0;
    for lum in [0.001, 0.01, 0.1, 1.0, 10.0] {
        let bin = histogram_bin(lum, s.min_log_lum, s.log_lum_range());
        assert!(bin > last, "luminance {lum} landed in bin {bin}");
        last = bin;
    }
    assert!(last < HISTOGRAM_BINS);
}

#[test]
fn out_of_range_luminance_is_clamped() {
    let s = ExposureSettings::default();
    assert_eq!(histogram_bin(1e6, s.min_log_lum, s.log_lum_range()), HISTOGRAM_BINS - 1);
    assert_eq!(histogram_bin(1e-4, s.min_log_lum, s.log_lum_range()), 1);
}

#[test]
fn single_bin_average_recovers_luminance() {
    let s = ExposureSettings::default();
    let bins = histogram_of(0.5, &s, 1000);
    let avg = histogram_average(&bins, s.min_log_lum, s.log_lum_range()).unwrap_or_default();
    // Quantized to one bin: within a bin width in log space.
    let bin_width = s.log_lum_range() / (HISTOGRAM_BINS - 2) as f32;
    assert!((avg.log2() - 0.5_f32.log2()).abs() <= bin_width + EPSILON);
}

#[test]
fn target_maps_average_to_key() {
    assert!((exposure_target(0.18, 0.18) - 1.0).abs() < EPSILON);
    assert!((exposure_target(0.18, 0.36) - 0.5).abs() < EPSILON);
    assert!(exposure_target(0.18, 0.0).is_finite());
}

// ============================================================================
// Adaptation
// ============================================================================

#[test]
fn exposure_moves_monotonically_toward_target() {
    let mut state = ExposureState::default();
    let target = 4.0;
    let mut previous = state.exposure;
    for _ in 0..120 {
        let value = state.advance(target, 1.5, 1.0 / 60.0);
        assert!(value >= previous - EPSILON);
        assert!(value <= target + EPSILON);
        previous = value;
    }
    assert!(previous > NEUTRAL_EXPOSURE);
}

#[test]
fn exposure_step_is_bounded_by_speed_times_dt() {
    let speed = 2.0;
    for dt in [0.001, 0.016, 0.1, 0.3] {
        let mut state = ExposureState { exposure: 1.0 };
        let target = 9.0;
        let gap = target - state.exposure;
        let value = state.advance(target, speed, dt);
        assert!(value - 1.0 <= gap * speed * dt + EPSILON);
    }
}

#[test]
fn large_time_step_never_overshoots() {
    let mut state = ExposureState { exposure: 2.0 };
    assert!((state.advance(0.5, 10.0, 5.0) - 0.5).abs() < EPSILON);
}

#[test]
fn exposure_decreases_for_bright_scenes() {
    let s = ExposureSettings::default();
    let bins = histogram_of(8.0, &s, 500);
    let mut state = ExposureState::default();
    let mut previous = state.exposure;
    for _ in 0..30 {
        let value = state.update(&s, &bins, 1.0 / 30.0);
        assert!(value <= previous + EPSILON);
        previous = value;
    }
    assert!(previous < NEUTRAL_EXPOSURE);
    assert!(previous >= s.min_exposure);
}

#[test]
fn disabled_exposure_stays_neutral() {
    let s = ExposureSettings {
        enabled: false,
        ..Default::default()
    };
    let bins = histogram_of(8.0, &s, 500);
    let mut state = ExposureState { exposure: 3.0 };
    for _ in 0..10 {
        assert_eq!(state.update(&s, &bins, 0.016), NEUTRAL_EXPOSURE);
    }
}

#[test]
fn black_frame_keeps_current_exposure() {
    let s = ExposureSettings::default();
    let mut bins = [0u32; HISTOGRAM_BINS];
    bins[0] = 1000;
    let mut state = ExposureState { exposure: 2.5 };
    assert_eq!(state.update(&s, &bins, 0.016), 2.5);
}

#[test]
fn uniforms_carry_clamped_time_step() {
    let s = ExposureSettings::default();
    let u = s.uniforms(-1.0, 640 * 480);
    assert_eq!(u.frame.x, 0.0);
    assert_eq!(u.frame.y, (640 * 480) as f32);
    assert!((u.params.y - s.log_lum_range()).abs() < EPSILON);
}
