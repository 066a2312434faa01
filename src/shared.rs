//! Shared memory regions for the ordering probe.
//!
//! The flag and the data buffer live in two independent cache-line-aligned
//! heap allocations so they can never share a cache line. Both are accessed
//! through `AtomicU32` with `Ordering::Relaxed` — the weakest well-defined
//! ordering available, which keeps the concurrent access defined while
//! providing none of the cross-thread ordering the probe is trying to catch
//! missing.

use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::slice;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::HarnessError;

/// Cache line size assumed for alignment decisions.
pub const CACHELINE_SIZE: usize = 64;

/// Alignment of the data buffer: a multiple of the cache line size, so the
/// buffer can never overlap the flag's line.
pub const DATA_BUF_ALIGN: usize = 4 * CACHELINE_SIZE;

/// An owned, aligned heap region. Freed on drop, so every exit path
/// (including setup failures after a partial allocation) releases it.
#[derive(Debug)]
struct AlignedRegion {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl AlignedRegion {
    fn new(region: &'static str, size: usize, align: usize) -> Result<Self, HarnessError> {
        if size == 0 {
            return Err(HarnessError::Allocation {
                region,
                reason: "zero-size region".to_string(),
            });
        }
        let layout =
            Layout::from_size_align(size, align).map_err(|e| HarnessError::Allocation {
                region,
                reason: e.to_string(),
            })?;
        // Zeroed so the atomic views below always see initialized memory.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| HarnessError::Allocation {
            region,
            reason: "allocator returned null".to_string(),
        })?;
        Ok(AlignedRegion { ptr, layout })
    }

    fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

impl Drop for AlignedRegion {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

/// The flag cell: a single `u32` alone in its own cache line. Written only
/// by the writer, read only by the reader.
#[derive(Debug)]
pub struct FlagCell {
    region: AlignedRegion,
}

// SAFETY: the region is uniquely owned by this cell and only ever accessed
// through the AtomicU32 view.
unsafe impl Send for FlagCell {}
unsafe impl Sync for FlagCell {}

impl FlagCell {
    pub fn new() -> Result<Self, HarnessError> {
        let region = AlignedRegion::new("flag", CACHELINE_SIZE, CACHELINE_SIZE)?;
        Ok(FlagCell { region })
    }

    fn cell(&self) -> &AtomicU32 {
        // The region starts on a cache line boundary, so u32 alignment holds.
        unsafe { &*(self.region.ptr.as_ptr() as *const AtomicU32) }
    }

    /// Relaxed store. The writer publishes the iteration number with no
    /// release fence; whether the preceding data store is visible first is
    /// exactly what the probe measures.
    pub fn store(&self, value: u32) {
        self.cell().store(value, Ordering::Relaxed);
    }

    /// Relaxed load. Unlike a plain read, an atomic load cannot be hoisted
    /// out of the spin loop and cached in a register, so the reader always
    /// observes fresh flag values without gaining any ordering.
    pub fn load(&self) -> u32 {
        self.cell().load(Ordering::Relaxed)
    }

    pub fn addr(&self) -> usize {
        self.region.addr()
    }
}

/// The data buffer: one `u32` slot per iteration, in its own aligned
/// allocation. Slot `i` is written by the writer during iteration `i` and
/// read by the reader after it observes `flag == i`.
#[derive(Debug)]
pub struct DataBuffer {
    region: AlignedRegion,
    len: usize,
}

// SAFETY: the region is uniquely owned by this buffer and only ever accessed
// through the AtomicU32 slot view.
unsafe impl Send for DataBuffer {}
unsafe impl Sync for DataBuffer {}

impl DataBuffer {
    pub fn new(len: usize) -> Result<Self, HarnessError> {
        let size = len
            .checked_mul(std::mem::size_of::<u32>())
            .ok_or_else(|| HarnessError::Allocation {
                region: "dat_buf",
                reason: "buffer size overflows usize".to_string(),
            })?;
        let region = AlignedRegion::new("dat_buf", size, DATA_BUF_ALIGN)?;
        Ok(DataBuffer { region, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slots(&self) -> &[AtomicU32] {
        unsafe { slice::from_raw_parts(self.region.ptr.as_ptr() as *const AtomicU32, self.len) }
    }

    pub fn store(&self, index: usize, value: u32) {
        self.slots()[index].store(value, Ordering::Relaxed);
    }

    pub fn load(&self, index: usize) -> u32 {
        self.slots()[index].load(Ordering::Relaxed)
    }

    /// Fill every slot with throwaway random values so the buffer is paged
    /// in before the measurement loop. The values are never inspected.
    pub fn fill_random(&self) {
        for slot in self.slots() {
            slot.store(rand::random(), Ordering::Relaxed);
        }
    }

    pub fn addr(&self) -> usize {
        self.region.addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_cache_line_aligned() {
        let flag = FlagCell::new().unwrap();
        assert_eq!(flag.addr() % CACHELINE_SIZE, 0);
    }

    #[test]
    fn data_buffer_is_aligned_and_sized() {
        let buf = DataBuffer::new(128).unwrap();
        assert_eq!(buf.addr() % DATA_BUF_ALIGN, 0);
        assert_eq!(buf.len(), 128);
        assert!(!buf.is_empty());
    }

    #[test]
    fn flag_and_buffer_never_share_a_cache_line() {
        let flag = FlagCell::new().unwrap();
        let buf = DataBuffer::new(8).unwrap();

        let flag_line = flag.addr() / CACHELINE_SIZE;
        let buf_first_line = buf.addr() / CACHELINE_SIZE;
        let buf_last_line = (buf.addr() + 8 * std::mem::size_of::<u32>() - 1) / CACHELINE_SIZE;
        assert!(flag_line < buf_first_line || flag_line > buf_last_line);
    }

    #[test]
    fn flag_store_load_roundtrip() {
        let flag = FlagCell::new().unwrap();
        assert_eq!(flag.load(), 0);
        flag.store(0xDEAD_BEEF);
        assert_eq!(flag.load(), 0xDEAD_BEEF);
    }

    #[test]
    fn buffer_slots_are_independent() {
        let buf = DataBuffer::new(4).unwrap();
        buf.store(0, 11);
        buf.store(3, 44);
        assert_eq!(buf.load(0), 11);
        assert_eq!(buf.load(1), 0);
        assert_eq!(buf.load(3), 44);
    }

    #[test]
    fn fill_random_leaves_every_slot_readable() {
        let buf = DataBuffer::new(16).unwrap();
        buf.fill_random();
        for i in 0..16 {
            let _ = buf.load(i);
        }
    }

    #[test]
    fn zero_length_buffer_is_an_allocation_error() {
        let err = DataBuffer::new(0).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Allocation {
                region: "dat_buf",
                ..
            }
        ));
    }

    #[test]
    fn oversized_buffer_is_an_allocation_error() {
        let err = DataBuffer::new(usize::MAX).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Allocation {
                region: "dat_buf",
                ..
            }
        ));
    }
}
