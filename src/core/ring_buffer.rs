//! Lock-Free Single-Producer Single-Consumer (SPSC) Byte Ring Buffer
//!
//! Variable-length messages are framed in place: every slot starts with an
//! 8-byte [`SlotHeader`] at a cache-line-aligned offset, followed by the
//! payload, rounded up to the next cache line. A message that would straddle
//! the end of the storage is preceded by a padding header that sends the
//! reader back to offset 0.
//!
//! Two monotonic 64-bit cursors do all the synchronization:
//! - `write_index`: stored only by the producer, Release on publish
//! - `read_index`: stored only by the consumer, Release on release
//!
//! Each side loads the other's cursor with Acquire. Nothing blocks; `Full`
//! and `Empty` come back immediately and retry policy belongs to the caller.

use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

use crossbeam_utils::CachePadded;
use tracing::trace;

use super::error::{InitError, SpscError};
use super::header::{SlotHeader, HEADER_SIZE};
use super::storage::{align_up, RingStorage};
use super::sync::{Arc, AtomicU64, Ordering};
use crate::stream::Range;

/// Bytes a message of `len` payload bytes occupies in the storage.
#[inline(always)]
pub const fn frame_len(len: usize) -> u64 {
    align_up((len + HEADER_SIZE) as u64)
}

/// Location of a reserved or published payload inside the storage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawSlot {
    pub(crate) offset: usize,
    pub(crate) len: usize,
}

/// Lock-Free SPSC byte ring buffer.
///
/// The cursors live on separate cache lines so the producer and consumer never
/// invalidate each other's line on a plain cursor update.
pub struct RingBuffer {
    write_index: CachePadded<AtomicU64>,
    read_index: CachePadded<AtomicU64>,
    storage: RingStorage,
}

// SAFETY: RingBuffer is safe to share because:
// - Only the Producer stores write_index and writes unpublished bytes
// - Only the Consumer stores read_index and reads published bytes
// - Release/Acquire on the cursors orders the byte accesses
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Creates a ring of at least `capacity` bytes.
    ///
    /// The capacity is rounded up to the next power of two, never below one
    /// cache line. Allocation happens here once; the hot path never allocates.
    pub fn new(capacity: usize) -> Result<Self, InitError> {
        Ok(Self {
            write_index: CachePadded::new(AtomicU64::new(0)),
            read_index: CachePadded::new(AtomicU64::new(0)),
            storage: RingStorage::new(capacity)?,
        })
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Whether committed data is waiting. Racy, for diagnostics only.
    #[inline(always)]
    pub fn has_pending_data(&self) -> bool {
        let read = self.read_index.load(Ordering::Acquire);
        let write = self.write_index.load(Ordering::Acquire);
        read < write
    }

    /// Splits the ring into its only producer and its only consumer.
    pub fn split(self) -> (Producer, Consumer) {
        let ring = Arc::new(self);
        (
            Producer {
                ring: Arc::clone(&ring),
            },
            Consumer { ring },
        )
    }
}

/// Producer side of a ring. There is exactly one per ring.
pub struct Producer {
    ring: Arc<RingBuffer>,
}

impl Producer {
    /// Reserves `size` payload bytes.
    ///
    /// The returned slot stays invisible to the consumer until
    /// [`WriteSlot::commit`]. Dropping it instead abandons the reservation.
    ///
    /// Returns `Full` when unread data leaves too little room (retryable) and
    /// `TooBig` when `size + HEADER_SIZE` exceeds the capacity (permanent).
    #[inline]
    pub fn acquire_write(&mut self, size: usize) -> Result<WriteSlot<'_>, SpscError> {
        let raw = self.reserve(size)?;
        Ok(WriteSlot::new(self, raw))
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    #[inline(always)]
    pub fn has_pending_data(&self) -> bool {
        self.ring.has_pending_data()
    }

    pub(crate) fn reserve(&mut self, size: usize) -> Result<RawSlot, SpscError> {
        let ring = &*self.ring;
        if size > ring.capacity() - HEADER_SIZE {
            return Err(SpscError::TooBig);
        }

        let capacity = ring.capacity() as u64;
        let required = frame_len(size);

        let mut write = ring.write_index.load(Ordering::Relaxed);
        let read = ring.read_index.load(Ordering::Acquire);
        let mut free = capacity - write.wrapping_sub(read);
        let mut offset = ring.storage.offset(write);

        let tail = capacity - offset as u64;
        if tail < required {
            if tail > free {
                return Err(SpscError::Full);
            }

            // SAFETY: tail <= free, so [offset, capacity) holds no unread data.
            unsafe {
                ring.storage.write_header(
                    offset,
                    SlotHeader::Padding {
                        skip: tail - HEADER_SIZE as u64,
                    },
                );
            }

            write += tail;
            ring.write_index.store(write, Ordering::Release);
            free -= tail;
            offset = 0;
            trace!(skip = tail, index = write, "write cursor wrapped");
        }

        if required > free {
            return Err(SpscError::Full);
        }

        // SAFETY: [offset, offset + required) is free and inside the storage.
        unsafe {
            ring.storage.write_header(offset, SlotHeader::Payload { len: size as u64 });
        }

        Ok(RawSlot {
            offset: offset + HEADER_SIZE,
            len: size,
        })
    }

    #[inline(always)]
    pub(crate) fn publish(&mut self, len: usize) {
        let write = self.ring.write_index.load(Ordering::Relaxed);
        self.ring
            .write_index
            .store(write + frame_len(len), Ordering::Release);
    }
}

/// Consumer side of a ring. There is exactly one per ring.
pub struct Consumer {
    ring: Arc<RingBuffer>,
}

impl Consumer {
    /// Exposes the oldest committed message.
    ///
    /// Returns `Empty` iff the cursors are equal once any padding is skipped.
    /// Dropping the slot without [`ReadSlot::commit`] leaves the message queued.
    #[inline]
    pub fn acquire_read(&mut self) -> Result<ReadSlot<'_>, SpscError> {
        let raw = self.peek()?;
        Ok(ReadSlot::new(self, raw))
    }

    /// Consumes whatever is committed right now, auto-committing each slot.
    pub fn drain(&mut self) -> Range<'_> {
        Range::new(self)
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    #[inline(always)]
    pub fn has_pending_data(&self) -> bool {
        self.ring.has_pending_data()
    }

    pub(crate) fn peek(&mut self) -> Result<RawSlot, SpscError> {
        let ring = &*self.ring;
        let mut read = ring.read_index.load(Ordering::Relaxed);
        let write = ring.write_index.load(Ordering::Acquire);

        loop {
            if read == write {
                return Err(SpscError::Empty);
            }

            let offset = ring.storage.offset(read);
            // SAFETY: read < write, so the header at `offset` is published.
            match unsafe { ring.storage.read_header(offset) } {
                SlotHeader::Payload { len } => {
                    return Ok(RawSlot {
                        offset: offset + HEADER_SIZE,
                        len: len as usize,
                    });
                }
                SlotHeader::Padding { skip } => {
                    read += skip + HEADER_SIZE as u64;
                    ring.read_index.store(read, Ordering::Release);
                    trace!(skip, index = read, "read cursor wrapped");
                }
            }
        }
    }

    #[inline(always)]
    pub(crate) fn release(&mut self, len: usize) {
        let read = self.ring.read_index.load(Ordering::Relaxed);
        self.ring
            .read_index
            .store(read + frame_len(len), Ordering::Release);
    }

    #[inline(always)]
    pub(crate) fn bytes(&self, raw: RawSlot) -> &[u8] {
        // SAFETY: raw came from peek(); the bytes are published and stay put
        // until release() runs.
        unsafe { slice::from_raw_parts(self.ring.storage.ptr_at(raw.offset).as_ptr(), raw.len) }
    }
}

/// Writable payload reserved by [`Producer::acquire_write`].
pub struct WriteSlot<'a> {
    producer: &'a mut Producer,
    data: NonNull<u8>,
    len: usize,
}

impl<'a> WriteSlot<'a> {
    pub(crate) fn new(producer: &'a mut Producer, raw: RawSlot) -> Self {
        // SAFETY: raw.offset + raw.len lies inside the storage.
        let data = unsafe { producer.ring.storage.ptr_at(raw.offset) };
        Self {
            producer,
            data,
            len: raw.len,
        }
    }

    /// Publishes the slot to the consumer.
    #[inline(always)]
    pub fn commit(self) {
        self.producer.publish(self.len);
    }
}

impl Deref for WriteSlot<'_> {
    type Target = [u8];

    #[inline(always)]
    fn deref(&self) -> &[u8] {
        // SAFETY: the reservation is exclusive to this slot.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }
}

impl DerefMut for WriteSlot<'_> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: the reservation is exclusive to this slot.
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }
}

/// Published payload exposed by [`Consumer::acquire_read`].
pub struct ReadSlot<'a> {
    consumer: &'a mut Consumer,
    data: NonNull<u8>,
    len: usize,
}

impl<'a> ReadSlot<'a> {
    pub(crate) fn new(consumer: &'a mut Consumer, raw: RawSlot) -> Self {
        // SAFETY: raw.offset + raw.len lies inside the storage.
        let data = unsafe { consumer.ring.storage.ptr_at(raw.offset) };
        Self {
            consumer,
            data,
            len: raw.len,
        }
    }

    /// Frees the slot's storage for future writes.
    #[inline(always)]
    pub fn commit(self) {
        self.consumer.release(self.len);
    }
}

impl Deref for ReadSlot<'_> {
    type Target = [u8];

    #[inline(always)]
    fn deref(&self) -> &[u8] {
        // SAFETY: published bytes are not touched by the producer until commit.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    fn indices(producer: &Producer) -> (u64, u64) {
        (
            producer.ring.write_index.load(Ordering::Acquire),
            producer.ring.read_index.load(Ordering::Acquire),
        )
    }

    fn write(tx: &mut Producer, bytes: &[u8]) {
        let mut slot = tx.acquire_write(bytes.len()).unwrap();
        slot.copy_from_slice(bytes);
        slot.commit();
    }

    fn read(rx: &mut Consumer) -> Vec<u8> {
        let slot = rx.acquire_read().unwrap();
        let bytes = slot.to_vec();
        slot.commit();
        bytes
    }

    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            self.0 >> 33
        }
    }

    #[test]
    fn test_hello_world() {
        let (mut tx, mut rx) = RingBuffer::new(1053).unwrap().split();
        assert_eq!(tx.capacity(), 2048);

        let msg = b"Hello world!\0";
        write(&mut tx, msg);

        let slot = rx.acquire_read().unwrap();
        assert_eq!(slot.len(), 13);
        assert_eq!(&slot[..], &msg[..]);
        slot.commit();
    }

    #[test]
    fn test_small_capacity_reuse() {
        let (mut tx, mut rx) = RingBuffer::new(5).unwrap().split();
        assert_eq!(rx.capacity(), 64);

        let mut pattern = [0u8, 1, 2, 3];
        write(&mut tx, &pattern);
        assert_eq!(read(&mut rx), pattern);

        pattern[0] = 8;
        write(&mut tx, &pattern);
        assert_eq!(read(&mut rx), pattern);
    }

    #[test]
    fn test_too_big() {
        for requested in [1, 64, 100, 1053, 4096] {
            let (mut tx, mut rx) = RingBuffer::new(requested).unwrap().split();
            let capacity = tx.capacity();

            assert_eq!(tx.acquire_write(capacity + 1).err(), Some(SpscError::TooBig));
            assert_eq!(tx.acquire_write(usize::MAX).err(), Some(SpscError::TooBig));
            assert_eq!(
                tx.acquire_write(capacity - HEADER_SIZE + 1).err(),
                Some(SpscError::TooBig)
            );

            // The largest message fills the whole ring.
            let largest = vec![0xAB; capacity - HEADER_SIZE];
            write(&mut tx, &largest);
            assert_eq!(tx.acquire_write(0).err(), Some(SpscError::Full));
            assert_eq!(read(&mut rx), largest);
        }
    }

    #[test]
    fn test_full_never_overwrites() {
        let (mut tx, mut rx) = RingBuffer::new(256).unwrap().split();

        // 56 + 8 = one cache line per message.
        for tag in 0..4u8 {
            write(&mut tx, &[tag; 56]);
        }
        assert_eq!(indices(&tx), (256, 0));
        assert_eq!(tx.acquire_write(1).err(), Some(SpscError::Full));

        assert_eq!(read(&mut rx), [0u8; 56]);
        write(&mut tx, &[4u8; 56]);
        assert_eq!(tx.acquire_write(1).err(), Some(SpscError::Full));

        for tag in 1..5u8 {
            assert_eq!(read(&mut rx), [tag; 56]);
        }
        assert_eq!(rx.acquire_read().err(), Some(SpscError::Empty));
    }

    #[test]
    fn test_empty_iff_cursors_equal() {
        let (mut tx, mut rx) = RingBuffer::new(128).unwrap().split();
        assert_eq!(rx.acquire_read().err(), Some(SpscError::Empty));

        let mut slot = tx.acquire_write(4).unwrap();
        slot.copy_from_slice(b"ping");
        // Reserved but not committed: still empty.
        assert!(matches!(rx.acquire_read(), Err(SpscError::Empty)));
        slot.commit();

        assert!(rx.has_pending_data());
        assert_eq!(read(&mut rx), b"ping");
        assert_eq!(rx.acquire_read().err(), Some(SpscError::Empty));

        let (write, read) = indices(&tx);
        assert_eq!(write, read);
        assert!(!tx.has_pending_data());
    }

    #[test]
    fn test_padding_lands_on_offset_zero() {
        let (mut tx, mut rx) = RingBuffer::new(256).unwrap().split();

        write(&mut tx, &[1u8; 100]); // [0, 128)
        assert_eq!(read(&mut rx), [1u8; 100]);
        write(&mut tx, &[2u8; 40]); // [128, 192)

        // Needs 128 bytes, only 64 left before the end: pad and wrap.
        write(&mut tx, &[3u8; 100]);
        assert_eq!(indices(&tx), (384, 128));
        let padding = unsafe { tx.ring.storage.read_header(192) };
        assert_eq!(padding, SlotHeader::Padding { skip: 56 });
        let wrapped = unsafe { tx.ring.storage.read_header(0) };
        assert_eq!(wrapped, SlotHeader::Payload { len: 100 });

        assert_eq!(read(&mut rx), [2u8; 40]);
        assert_eq!(read(&mut rx), [3u8; 100]);
        assert_eq!(indices(&tx), (384, 384));
        assert_eq!(rx.acquire_read().err(), Some(SpscError::Empty));
    }

    #[test]
    fn test_wrap_full_is_transient() {
        let (mut tx, mut rx) = RingBuffer::new(256).unwrap().split();

        write(&mut tx, &[1u8; 100]);
        assert_eq!(read(&mut rx), [1u8; 100]);

        // 150 + 8 rounds to 192: the padding is published but the reader
        // has not skipped it yet.
        assert_eq!(tx.acquire_write(150).err(), Some(SpscError::Full));
        assert_eq!(indices(&tx), (256, 128));

        // The reader skips the padding and finds nothing else.
        assert_eq!(rx.acquire_read().err(), Some(SpscError::Empty));
        assert_eq!(indices(&tx), (256, 256));

        write(&mut tx, &[7u8; 150]);
        assert_eq!(read(&mut rx), [7u8; 150]);
    }

    #[test]
    fn test_abandoned_write_slot() {
        let (mut tx, mut rx) = RingBuffer::new(128).unwrap().split();

        let mut slot = tx.acquire_write(32).unwrap();
        slot.fill(0xFF);
        drop(slot);
        assert_eq!(rx.acquire_read().err(), Some(SpscError::Empty));

        write(&mut tx, &[5u8; 16]);
        assert_eq!(read(&mut rx), [5u8; 16]);
    }

    #[test]
    fn test_uncommitted_read_is_redelivered() {
        let (mut tx, mut rx) = RingBuffer::new(128).unwrap().split();
        write(&mut tx, b"again");

        let slot = rx.acquire_read().unwrap();
        assert_eq!(&slot[..], b"again");
        drop(slot);

        assert_eq!(read(&mut rx), b"again");
        assert!(!rx.has_pending_data());
    }

    #[test]
    fn test_zero_length_message() {
        let (mut tx, mut rx) = RingBuffer::new(64).unwrap().split();
        tx.acquire_write(0).unwrap().commit();
        assert_eq!(indices(&tx).0, 64);

        let slot = rx.acquire_read().unwrap();
        assert!(slot.is_empty());
        slot.commit();
        assert_eq!(rx.acquire_read().err(), Some(SpscError::Empty));
    }

    #[test]
    fn test_roundtrip_restores_free_space() {
        let (mut tx, mut rx) = RingBuffer::new(512).unwrap().split();

        for size in [1usize, 57, 63, 200, 240] {
            write(&mut tx, &vec![size as u8; size]);
            assert_eq!(read(&mut rx), vec![size as u8; size]);

            let (write, read) = indices(&tx);
            assert_eq!(write - read, 0);
            assert_eq!(write % 64, 0);
        }
    }

    #[test]
    fn test_fuzz_single_threaded() {
        const REQUESTED: usize = 1053;
        let (mut tx, mut rx) = RingBuffer::new(REQUESTED).unwrap().split();
        let mut rng = Lcg(0x5eed);

        for i in 0..100_000u64 {
            let size = 1 + (rng.next() as usize % (REQUESTED / 2));
            let pattern: Vec<u8> = (0..size).map(|_| rng.next() as u8).collect();

            let mut slot = tx
                .acquire_write(size)
                .unwrap_or_else(|e| panic!("write {i} of {size} bytes failed: {e}"));
            slot.copy_from_slice(&pattern);
            slot.commit();

            let slot = rx.acquire_read().unwrap();
            assert_eq!(slot.len(), size, "size mismatch on iteration {i}");
            assert_eq!(&slot[..], &pattern[..], "bytes mismatch on iteration {i}");
            slot.commit();
        }
    }
}
