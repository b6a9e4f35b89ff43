//! Virtual Point Light budget and configuration.
//!
//! VPL records live in one fixed-capacity storage buffer shared by every
//! light. The [`VplAllocator`] hands out contiguous ranges in generation
//! order; a request that would overflow the buffer is refused, never grown
//! or wrapped.

use serde::{Deserialize, Serialize};

/// Edge length of the auxiliary light-view G-buffer.
pub const VPL_AUX_SIZE: u32 = 32;

/// Invocations per work-group of the injection kernel.
pub const VPL_WORKGROUP_SIZE: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VplMode {
    /// Regenerated every frame.
    #[default]
    Dynamic,
    /// Generated once per loaded map and reused.
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VplSettings {
    pub enabled: bool,
    /// Capacity of the shared VPL buffer.
    pub max_vpls: u32,
    /// VPLs requested per light (split over six faces for point lights).
    pub quota_per_light: u32,
    pub mode: VplMode,
}

impl Default for VplSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_vpls: 1024,
            quota_per_light: 96,
            mode: VplMode::Dynamic,
        }
    }
}

/// Running write cursor into the VPL buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VplAllocator {
    capacity: u32,
    count: u32,
}

impl VplAllocator {
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self { capacity, count: 0 }
    }

    /// Reserves `n` consecutive records and returns the first offset, or
    /// `None` if the buffer cannot hold them. A refused request leaves the
    /// count unchanged.
    pub fn try_reserve(&mut self, n: u32) -> Option<u32> {
        let end = self.count.checked_add(n)?;
        if end > self.capacity {
            return None;
        }
        let offset = self.count;
        self.count = end;
        Some(offset)
    }

    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.capacity - self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// Work-groups needed for `n` invocations (rounded up).
#[inline]
#[must_use]
pub fn vpl_dispatch_groups(n: u32) -> u32 {
    n.div_ceil(VPL_WORKGROUP_SIZE)
}

/// Auxiliary-buffer texel sampled by invocation `i` of `n`. Texels are
/// stratified across the buffer in row-major order; mirrors `vpl_inject.wgsl`.
#[must_use]
pub fn vpl_sample_texel(i: u32, n: u32) -> (u32, u32) {
    let texels = VPL_AUX_SIZE * VPL_AUX_SIZE;
    let stride = (texels / n.max(1)).max(1);
    let index = (i * stride + stride / 2).min(texels - 1);
    (index % VPL_AUX_SIZE, index / VPL_AUX_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_reservation_keeps_count() {
        let mut alloc = VplAllocator::new(10);
        assert_eq!(alloc.try_reserve(6), Some(0));
        assert_eq!(alloc.try_reserve(6), None);
        assert_eq!(alloc.count(), 6);
        assert_eq!(alloc.try_reserve(4), Some(6));
        assert_eq!(alloc.remaining(), 0);
    }

    #[test]
    fn dispatch_rounds_up() {
        assert_eq!(vpl_dispatch_groups(0), 0);
        assert_eq!(vpl_dispatch_groups(8), 1);
        assert_eq!(vpl_dispatch_groups(64), 1);
        assert_eq!(vpl_dispatch_groups(65), 2);
    }

    #[test]
    fn sampled_texels_are_distinct_and_in_bounds() {
        let mut seen = rustc_hash::FxHashSet::default();
        for i in 0..48 {
            let (x, y) = vpl_sample_texel(i, 48);
            assert!(x < VPL_AUX_SIZE && y < VPL_AUX_SIZE);
            assert!(seen.insert((x, y)));
        }
    }
}
