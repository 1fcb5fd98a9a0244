// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Heap-backed reference implementation of [`RawAllocator`].
//!
//! [`HostAllocator`] serves [`Location::Host`] from the process heap and can
//! emulate a fixed number of device ordinals with heap memory as well, which
//! makes the cache usable in CPU-only builds and in tests.
//!
//! Every [`HostBuffer`] shares a small state block with any number of
//! [`BufferHandle`]s:
//!
//! ```text
//!   HostBuffer ──┐
//!                ├──► Arc<BufferState> { refs, closed }
//!   BufferHandle ┘
//! ```
//!
//! Handles are how the surrounding system pins a buffer (`retain`) and how
//! observers check whether eviction closed it (`is_closed`).

use crate::{AllocError, BufferId, CacheableBuffer, DType, HasReferenceCount, Location, RawAllocator};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Source of per-allocator tags, so buffers can be traced to their origin.
static NEXT_ALLOCATOR_TAG: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Default)]
struct BufferState {
    refs: AtomicUsize,
    closed: AtomicBool,
}

/// A shared, observable view of a [`HostBuffer`]'s lifetime state.
#[derive(Debug, Clone)]
pub struct BufferHandle {
    id: BufferId,
    state: Arc<BufferState>,
}

impl BufferHandle {
    /// Identity of the buffer this handle observes.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Registers one more external user. Returns the new count.
    pub fn retain(&self) -> usize {
        self.state.refs.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drops one external user. Saturates at zero. Returns the new count.
    pub fn release(&self) -> usize {
        let prev = self
            .state
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        prev.saturating_sub(1)
    }

    /// Current number of external users.
    pub fn reference_count(&self) -> usize {
        self.state.refs.load(Ordering::Acquire)
    }

    /// Returns `true` once the owning allocator has freed the buffer.
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }
}

/// A contiguous heap region produced by a [`HostAllocator`].
pub struct HostBuffer {
    id: BufferId,
    allocator_tag: u64,
    data_type: DType,
    location: Location,
    data: Vec<u8>,
    state: Arc<BufferState>,
}

impl HostBuffer {
    /// Returns a handle sharing this buffer's reference count and closed flag.
    pub fn handle(&self) -> BufferHandle {
        BufferHandle {
            id: self.id,
            state: Arc::clone(&self.state),
        }
    }

    /// Returns an immutable view of the buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns a mutable view of the buffer.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Start address of the region. Stable across cache round trips.
    pub fn address(&self) -> usize {
        self.data.as_ptr() as usize
    }

    /// Number of `data_type` elements the buffer holds.
    pub fn element_count(&self) -> usize {
        self.data.len() / self.data_type.size_bytes()
    }
}

impl HasReferenceCount for HostBuffer {
    fn reference_count(&self) -> usize {
        self.state.refs.load(Ordering::Acquire)
    }
}

impl CacheableBuffer for HostBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn byte_len(&self) -> usize {
        self.data.len()
    }

    fn data_type(&self) -> DType {
        self.data_type
    }

    fn location(&self) -> Location {
        self.location
    }

    fn set_data_type(&mut self, data_type: DType) {
        self.data_type = data_type;
    }
}

impl std::fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBuffer")
            .field("id", &self.id)
            .field("data_type", &self.data_type)
            .field("location", &self.location)
            .field("byte_len", &self.data.len())
            .field("refs", &self.reference_count())
            .finish()
    }
}

/// Heap-backed raw allocator.
///
/// # Example
/// ```
/// use buffer_core::{CacheableBuffer, DType, HostAllocator, Location, RawAllocator};
///
/// let mut alloc = HostAllocator::new();
/// let buf = alloc.allocate(100, DType::F32, Location::Host, true).unwrap();
/// assert_eq!(buf.byte_len(), 100);
///
/// let handle = buf.handle();
/// alloc.close(buf);
/// assert!(handle.is_closed());
/// ```
#[derive(Debug)]
pub struct HostAllocator {
    tag: u64,
    next_id: u64,
    device_count: u32,
    limit_bytes: Option<usize>,
    live_bytes: usize,
    allocations: u64,
    closes: u64,
}

impl HostAllocator {
    /// Creates an allocator that serves host memory only, without a limit.
    pub fn new() -> Self {
        Self {
            tag: NEXT_ALLOCATOR_TAG.fetch_add(1, Ordering::Relaxed),
            next_id: 0,
            device_count: 0,
            limit_bytes: None,
            live_bytes: 0,
            allocations: 0,
            closes: 0,
        }
    }

    /// Also serves `Location::Device(0..count)`, backed by heap memory.
    pub fn with_devices(mut self, count: u32) -> Self {
        self.device_count = count;
        self
    }

    /// Caps the bytes that may be live (allocated and not yet closed).
    /// Requests beyond the cap fail with [`AllocError::Exhausted`].
    pub fn with_limit(mut self, limit_bytes: usize) -> Self {
        self.limit_bytes = Some(limit_bytes);
        self
    }

    /// Bytes allocated and not yet closed.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    /// Total number of successful raw allocations.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Total number of buffers closed.
    pub fn closes(&self) -> u64 {
        self.closes
    }

    fn serves(&self, location: Location) -> bool {
        match location {
            Location::Host => true,
            Location::Device(ordinal) => ordinal < self.device_count,
        }
    }
}

impl Default for HostAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RawAllocator for HostAllocator {
    type Buffer = HostBuffer;

    fn allocate(
        &mut self,
        byte_size: usize,
        data_type: DType,
        location: Location,
        _zeroed: bool,
    ) -> Result<HostBuffer, AllocError> {
        if !self.serves(location) {
            return Err(AllocError::UnsupportedLocation(location));
        }

        if let Some(limit) = self.limit_bytes {
            let available = limit.saturating_sub(self.live_bytes);
            if byte_size > available {
                tracing::debug!(
                    "host allocator exhausted: requested {byte_size} bytes, {available} available"
                );
                return Err(AllocError::Exhausted {
                    requested_bytes: byte_size,
                    available_bytes: available,
                    location,
                });
            }
        }

        // Fresh heap memory is always zeroed.
        let data = vec![0u8; byte_size];
        let id = BufferId(self.next_id);
        self.next_id += 1;
        self.live_bytes += byte_size;
        self.allocations += 1;

        Ok(HostBuffer {
            id,
            allocator_tag: self.tag,
            data_type,
            location,
            data,
            state: Arc::new(BufferState::default()),
        })
    }

    fn zero(&mut self, buffer: &mut HostBuffer) {
        buffer.data.fill(0);
    }

    fn close(&mut self, buffer: HostBuffer) {
        self.live_bytes = self.live_bytes.saturating_sub(buffer.data.len());
        self.closes += 1;
        buffer.state.closed.store(true, Ordering::Release);
    }

    fn owns(&self, buffer: &HostBuffer) -> bool {
        buffer.allocator_tag == self.tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_zeroed() {
        let mut alloc = HostAllocator::new();
        let buf = alloc.allocate(64, DType::U8, Location::Host, false).unwrap();
        assert_eq!(buf.byte_len(), 64);
        assert!(buf.as_slice().iter().all(|&b| b == 0));
        assert_eq!(alloc.live_bytes(), 64);
        assert_eq!(alloc.allocations(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut alloc = HostAllocator::new();
        let a = alloc.allocate(4, DType::I32, Location::Host, false).unwrap();
        let b = alloc.allocate(4, DType::I32, Location::Host, false).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_close_marks_handle() {
        let mut alloc = HostAllocator::new();
        let buf = alloc.allocate(16, DType::F32, Location::Host, false).unwrap();
        let handle = buf.handle();
        assert!(!handle.is_closed());

        alloc.close(buf);
        assert!(handle.is_closed());
        assert_eq!(alloc.live_bytes(), 0);
        assert_eq!(alloc.closes(), 1);
    }

    #[test]
    fn test_reference_count_via_handle() {
        let mut alloc = HostAllocator::new();
        let buf = alloc.allocate(8, DType::F64, Location::Host, false).unwrap();
        let handle = buf.handle();

        assert_eq!(handle.retain(), 1);
        assert_eq!(handle.retain(), 2);
        assert_eq!(buf.reference_count(), 2);

        assert_eq!(handle.release(), 1);
        assert_eq!(handle.release(), 0);
        // Saturates rather than wrapping.
        assert_eq!(handle.release(), 0);
        assert_eq!(buf.reference_count(), 0);
    }

    #[test]
    fn test_owns() {
        let mut a1 = HostAllocator::new();
        let a2 = HostAllocator::new();
        let buf = a1.allocate(8, DType::U8, Location::Host, false).unwrap();
        assert!(a1.owns(&buf));
        assert!(!a2.owns(&buf));
    }

    #[test]
    fn test_limit_exhaustion() {
        let mut alloc = HostAllocator::new().with_limit(100);
        let buf = alloc.allocate(60, DType::U8, Location::Host, false).unwrap();

        let err = alloc.allocate(60, DType::U8, Location::Host, false).unwrap_err();
        assert!(err.is_exhaustion());
        assert!(matches!(
            err,
            AllocError::Exhausted { requested_bytes: 60, available_bytes: 40, .. }
        ));

        alloc.close(buf);
        assert!(alloc.allocate(60, DType::U8, Location::Host, false).is_ok());
    }

    #[test]
    fn test_device_locations() {
        let mut host_only = HostAllocator::new();
        let err = host_only
            .allocate(8, DType::U8, Location::Device(0), false)
            .unwrap_err();
        assert_eq!(err, AllocError::UnsupportedLocation(Location::Device(0)));

        let mut with_dev = HostAllocator::new().with_devices(2);
        let buf = with_dev.allocate(8, DType::U8, Location::Device(1), false).unwrap();
        assert_eq!(buf.location(), Location::Device(1));
        assert!(with_dev.allocate(8, DType::U8, Location::Device(2), false).is_err());
    }

    #[test]
    fn test_zero_and_retag() {
        let mut alloc = HostAllocator::new();
        let mut buf = alloc.allocate(16, DType::F32, Location::Host, false).unwrap();
        buf.as_mut_slice().fill(0xAB);
        alloc.zero(&mut buf);
        assert!(buf.as_slice().iter().all(|&b| b == 0));

        buf.set_data_type(DType::I16);
        assert_eq!(buf.data_type(), DType::I16);
        assert_eq!(buf.element_count(), 8);
    }
}
