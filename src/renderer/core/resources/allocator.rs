//! Per-frame uniform and array-layer allocators.
//!
//! - [`DynamicUniforms`]: packs one `T` per draw/view into a single uniform
//!   buffer addressed by dynamic offsets. The CPU side is reset every view;
//!   the GPU buffer only grows.
//! - [`LayerAllocator`]: assigns stable texture-array layers to keys (light
//!   ids) and hands them back when the key disappears.

use std::hash::Hash;
use std::marker::PhantomData;
use std::num::NonZeroU64;

use rustc_hash::FxHashMap;

// ============================================================================
// DynamicUniforms
// ============================================================================

pub struct DynamicUniforms<T: bytemuck::Pod> {
    label: &'static str,
    buffer: wgpu::Buffer,
    /// Byte distance between consecutive entries.
    stride: u64,
    /// Entries the GPU buffer can hold.
    capacity: u64,
    host_data: Vec<u8>,
    cursor: u64,
    /// Bumped whenever the GPU buffer is recreated; bind groups keyed on it.
    version: u64,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> DynamicUniforms<T> {
    #[must_use]
    pub fn new(device: &wgpu::Device, label: &'static str, initial_capacity: u64) -> Self {
        let align = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let stride = (std::mem::size_of::<T>() as u64).next_multiple_of(align);
        let capacity = initial_capacity.max(1);
        Self {
            label,
            buffer: Self::create_buffer(device, label, stride * capacity),
            stride,
            capacity,
            host_data: Vec::new(),
            cursor: 0,
            version: 0,
            _marker: PhantomData,
        }
    }

    fn create_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Resets the write cursor at the start of a view.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.host_data.clear();
    }

    /// Appends an entry and returns its dynamic offset.
    pub fn push(&mut self, data: &T) -> u32 {
        let offset = self.cursor * self.stride;
        self.host_data.extend_from_slice(bytemuck::bytes_of(data));
        self.host_data.resize((offset + self.stride) as usize, 0);
        self.cursor += 1;
        offset as u32
    }

    /// Uploads the entries pushed since [`reset`](Self::reset), growing the
    /// GPU buffer if needed. Returns `true` when the buffer was recreated.
    pub fn flush(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> bool {
        let mut recreated = false;
        if self.cursor > self.capacity {
            let new_capacity = self.cursor.next_power_of_two();
            log::debug!(
                "Growing {} from {} to {} entries",
                self.label,
                self.capacity,
                new_capacity
            );
            self.buffer = Self::create_buffer(device, self.label, self.stride * new_capacity);
            self.capacity = new_capacity;
            self.version += 1;
            recreated = true;
        }
        if !self.host_data.is_empty() {
            queue.write_buffer(&self.buffer, 0, &self.host_data);
        }
        recreated
    }

    /// Binding covering one entry, for `has_dynamic_offset` layouts.
    #[must_use]
    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: NonZeroU64::new(std::mem::size_of::<T>() as u64),
        })
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        self.cursor
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }
}

/// Layout entry for a dynamic-offset uniform of type `T`.
#[must_use]
pub fn dynamic_uniform_entry<T>(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: true,
            min_binding_size: NonZeroU64::new(std::mem::size_of::<T>() as u64),
        },
        count: None,
    }
}

// ============================================================================
// LayerAllocator
// ============================================================================

/// Stable key → layer assignment over a fixed number of layers.
///
/// The first `reserved` layers are never handed out (the sun owns planar
/// layer 0).
#[derive(Debug, Clone)]
pub struct LayerAllocator<K: Copy + Eq + Hash> {
    capacity: u32,
    reserved: u32,
    assigned: FxHashMap<K, u32>,
    free: Vec<u32>,
}

impl<K: Copy + Eq + Hash> LayerAllocator<K> {
    #[must_use]
    pub fn new(capacity: u32, reserved: u32) -> Self {
        let reserved = reserved.min(capacity);
        // Reversed so `pop` hands out the lowest layer first.
        let free = (reserved..capacity).rev().collect();
        Self {
            capacity,
            reserved,
            assigned: FxHashMap::default(),
            free,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: K) -> Option<u32> {
        self.assigned.get(&key).copied()
    }

    /// Returns the key's layer, assigning a free one if needed. `None` when
    /// every layer is taken.
    pub fn assign(&mut self, key: K) -> Option<u32> {
        if let Some(layer) = self.get(key) {
            return Some(layer);
        }
        let layer = self.free.pop()?;
        self.assigned.insert(key, layer);
        Some(layer)
    }

    pub fn release(&mut self, key: K) -> Option<u32> {
        let layer = self.assigned.remove(&key)?;
        self.free.push(layer);
        // Keep lowest-first order for deterministic reuse.
        self.free.sort_unstable_by(|a, b| b.cmp(a));
        Some(layer)
    }

    /// Releases every key for which `keep` returns `false`; returns them.
    pub fn retain(&mut self, mut keep: impl FnMut(K) -> bool) -> Vec<K> {
        let dropped: Vec<K> = self.assigned.keys().copied().filter(|k| !keep(*k)).collect();
        for key in &dropped {
            self.release(*key);
        }
        dropped
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Layers available to keys (capacity minus reserved).
    #[inline]
    #[must_use]
    pub fn usable(&self) -> u32 {
        self.capacity - self.reserved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_layers_are_skipped() {
        let mut alloc: LayerAllocator<u32> = LayerAllocator::new(3, 1);
        assert_eq!(alloc.assign(10), Some(1));
        assert_eq!(alloc.assign(11), Some(2));
        assert_eq!(alloc.assign(12), None);
        assert_eq!(alloc.usable(), 2);
    }

    #[test]
    fn released_layer_is_reused() {
        let mut alloc: LayerAllocator<u32> = LayerAllocator::new(2, 0);
        alloc.assign(1);
        alloc.assign(2);
        assert_eq!(alloc.release(1), Some(0));
        assert_eq!(alloc.assign(3), Some(0));
        assert_eq!(alloc.get(1), None);
    }
}
