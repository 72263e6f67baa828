//! Anonymous-mmap storage backing the ring buffer.
//!
//! The region is mapped once at construction and never grows:
//! - Page-aligned, so every cache-line-aligned offset is naturally aligned
//! - Zero-filled by the kernel, so every byte handed out is initialized
//! - Capacity is a power of two, offsets are `index & mask`

use std::ptr::NonNull;

use memmap2::{MmapMut, MmapOptions};
use tracing::debug;

use super::error::InitError;
use super::header::{SlotHeader, HEADER_SIZE};

/// Granularity of committed regions and of the cursor padding.
pub const CACHE_LINE_SIZE: usize = 64;

const _: () = assert!(CACHE_LINE_SIZE.is_power_of_two() && CACHE_LINE_SIZE >= HEADER_SIZE);

/// Rounds `len` up to the next multiple of [`CACHE_LINE_SIZE`].
#[inline(always)]
pub const fn align_up(len: u64) -> u64 {
    (len + (CACHE_LINE_SIZE as u64 - 1)) & !(CACHE_LINE_SIZE as u64 - 1)
}

/// Capacity actually allocated for a `requested` byte count.
pub fn round_capacity(requested: usize) -> Result<usize, InitError> {
    requested
        .max(CACHE_LINE_SIZE)
        .checked_next_power_of_two()
        .ok_or(InitError::CapacityOverflow { requested })
}

/// Fixed-capacity raw byte region.
pub struct RingStorage {
    // Keeps the mapping alive; all access goes through `base`.
    _map: MmapMut,
    base: NonNull<u8>,
    capacity: usize,
    mask: u64,
}

impl RingStorage {
    /// Maps a zeroed region of `round_capacity(requested)` bytes.
    pub fn new(requested: usize) -> Result<Self, InitError> {
        let capacity = round_capacity(requested)?;
        let mut map = MmapOptions::new().len(capacity).map_anon()?;
        let base = NonNull::from(&mut map[..]).cast::<u8>();

        debug_assert_eq!(base.as_ptr() as usize % CACHE_LINE_SIZE, 0);
        debug!(requested, capacity, "mapped ring storage");

        Ok(Self {
            _map: map,
            base,
            capacity,
            mask: capacity as u64 - 1,
        })
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Storage offset of a logical index.
    #[inline(always)]
    pub fn offset(&self, index: u64) -> usize {
        (index & self.mask) as usize
    }

    /// # Safety
    /// `offset` must be cache-line aligned and inside the storage, and the
    /// caller must own the bytes at `offset..offset + HEADER_SIZE`.
    #[inline(always)]
    pub unsafe fn write_header(&self, offset: usize, header: SlotHeader) {
        debug_assert!(offset % CACHE_LINE_SIZE == 0 && offset + HEADER_SIZE <= self.capacity);
        self.base
            .as_ptr()
            .add(offset)
            .cast::<u64>()
            .write(header.encode());
    }

    /// # Safety
    /// Same as [`write_header`](Self::write_header); the header must have been
    /// published to the reading side.
    #[inline(always)]
    pub unsafe fn read_header(&self, offset: usize) -> SlotHeader {
        debug_assert!(offset % CACHE_LINE_SIZE == 0 && offset + HEADER_SIZE <= self.capacity);
        SlotHeader::decode(self.base.as_ptr().add(offset).cast::<u64>().read())
    }

    /// Pointer to the byte at `offset`.
    ///
    /// # Safety
    /// `offset` must not exceed the capacity.
    #[inline(always)]
    pub unsafe fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.capacity);
        NonNull::new_unchecked(self.base.as_ptr().add(offset))
    }
}
