//! Block Adapter: fixed header + homogeneous element array per slot.
//!
//! Layout of one block inside a ring slot:
//! ```text
//! ┌──────────────┬─────────┬─────────┬─────┬───────────┐
//! │ Header       │ Data[0] │ Data[1] │ ... │ Data[N-1] │
//! └──────────────┴─────────┴─────────┴─────┴───────────┘
//! N = (slot.len - size_of::<Header>()) / size_of::<Data>()
//! ```
//!
//! Payloads start [`PAYLOAD_ALIGN`] bytes past a cache line, so any `Pod`
//! type aligned to at most that can be viewed in place, no copy.

use std::marker::PhantomData;
use std::mem::{align_of, size_of};

use bytemuck::Pod;

use crate::core::{
    Consumer, InitError, Producer, ReadSlot, RingBuffer, SpscError, WriteSlot, PAYLOAD_ALIGN,
};

/// Stateless layout lens for `Header` + `[Data]` blocks.
pub struct BlockAdapter<H, D> {
    _layout: PhantomData<fn() -> (H, D)>,
}

impl<H: Pod, D: Pod> BlockAdapter<H, D> {
    const LAYOUT_OK: () = {
        assert!(align_of::<H>() <= PAYLOAD_ALIGN, "header alignment exceeds payload alignment");
        assert!(align_of::<D>() <= PAYLOAD_ALIGN, "data alignment exceeds payload alignment");
        assert!(size_of::<D>() > 0, "data elements must not be zero-sized");
        assert!(
            size_of::<H>() % align_of::<D>() == 0,
            "header size must keep data elements aligned"
        );
    };

    /// Splits a ring into block-typed producer and consumer handles.
    pub fn split(ring: RingBuffer) -> (BlockProducer<H, D>, BlockConsumer<H, D>) {
        let () = Self::LAYOUT_OK;
        let (producer, consumer) = ring.split();
        (
            BlockProducer {
                inner: producer,
                _layout: PhantomData,
            },
            BlockConsumer {
                inner: consumer,
                _layout: PhantomData,
            },
        )
    }

    /// Builds a ring of `capacity` bytes and splits it.
    pub fn channel(capacity: usize) -> Result<(BlockProducer<H, D>, BlockConsumer<H, D>), InitError> {
        Ok(Self::split(RingBuffer::new(capacity)?))
    }

    /// Payload bytes of a block holding `count` elements.
    #[inline(always)]
    pub const fn block_size(count: usize) -> usize {
        size_of::<H>() + count * size_of::<D>()
    }

    /// Elements carried by a payload of `bytes` bytes.
    #[inline(always)]
    pub const fn element_count(bytes: usize) -> usize {
        bytes.saturating_sub(size_of::<H>()) / size_of::<D>()
    }

    /// Views a payload as header + elements.
    ///
    /// # Panics
    /// If `bytes` is shorter than a header or misaligned.
    pub fn view(bytes: &[u8]) -> (&H, &[D]) {
        let () = Self::LAYOUT_OK;
        let count = Self::element_count(bytes.len());
        let (head, body) = bytes.split_at(size_of::<H>());
        (
            bytemuck::from_bytes(head),
            bytemuck::cast_slice(&body[..count * size_of::<D>()]),
        )
    }

    /// Mutable counterpart of [`view`](Self::view).
    pub fn view_mut(bytes: &mut [u8]) -> (&mut H, &mut [D]) {
        let () = Self::LAYOUT_OK;
        let count = Self::element_count(bytes.len());
        let (head, body) = bytes.split_at_mut(size_of::<H>());
        (
            bytemuck::from_bytes_mut(head),
            bytemuck::cast_slice_mut(&mut body[..count * size_of::<D>()]),
        )
    }
}

/// Producer handle writing `H` + `[D]` blocks.
pub struct BlockProducer<H, D> {
    inner: Producer,
    _layout: PhantomData<fn() -> (H, D)>,
}

impl<H: Pod, D: Pod> BlockProducer<H, D> {
    /// Reserves a block of `count` elements.
    #[inline]
    pub fn acquire_write(&mut self, count: usize) -> Result<BlockWriteSlot<'_, H, D>, SpscError> {
        let size = count
            .checked_mul(size_of::<D>())
            .and_then(|data| data.checked_add(size_of::<H>()))
            .ok_or(SpscError::TooBig)?;
        let slot = self.inner.acquire_write(size)?;
        Ok(BlockWriteSlot {
            slot,
            _layout: PhantomData,
        })
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Largest element count a single block can carry in this ring.
    pub fn max_elements(&self) -> usize {
        BlockAdapter::<H, D>::element_count(self.capacity() - crate::core::HEADER_SIZE)
    }

    /// The raw byte producer underneath.
    pub fn as_raw(&mut self) -> &mut Producer {
        &mut self.inner
    }
}

/// Consumer handle reading `H` + `[D]` blocks.
pub struct BlockConsumer<H, D> {
    inner: Consumer,
    _layout: PhantomData<fn() -> (H, D)>,
}

impl<H: Pod, D: Pod> BlockConsumer<H, D> {
    /// Exposes the oldest block; the element count comes from the slot size.
    ///
    /// # Panics
    /// If the slot is shorter than `H`, i.e. it was not written as a block.
    #[inline]
    pub fn acquire_read(&mut self) -> Result<BlockReadSlot<'_, H, D>, SpscError> {
        let slot = self.inner.acquire_read()?;
        assert!(
            slot.len() >= size_of::<H>(),
            "slot of {} bytes is shorter than the block header",
            slot.len()
        );
        Ok(BlockReadSlot {
            slot,
            _layout: PhantomData,
        })
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    #[inline(always)]
    pub fn has_pending_data(&self) -> bool {
        self.inner.has_pending_data()
    }

    /// The raw byte consumer underneath.
    pub fn as_raw(&mut self) -> &mut Consumer {
        &mut self.inner
    }
}

/// Writable block; commit publishes the underlying slot.
pub struct BlockWriteSlot<'a, H, D> {
    slot: WriteSlot<'a>,
    _layout: PhantomData<fn() -> (H, D)>,
}

impl<H: Pod, D: Pod> BlockWriteSlot<'_, H, D> {
    pub fn header_mut(&mut self) -> &mut H {
        self.parts_mut().0
    }

    pub fn data_mut(&mut self) -> &mut [D] {
        self.parts_mut().1
    }

    pub fn parts_mut(&mut self) -> (&mut H, &mut [D]) {
        BlockAdapter::<H, D>::view_mut(&mut self.slot)
    }

    /// Number of `D` elements in the block.
    pub fn len(&self) -> usize {
        BlockAdapter::<H, D>::element_count(self.slot.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn commit(self) {
        self.slot.commit();
    }
}

/// Readable block; commit frees the underlying slot.
pub struct BlockReadSlot<'a, H, D> {
    slot: ReadSlot<'a>,
    _layout: PhantomData<fn() -> (H, D)>,
}

impl<H: Pod, D: Pod> BlockReadSlot<'_, H, D> {
    pub fn header(&self) -> &H {
        self.parts().0
    }

    pub fn data(&self) -> &[D] {
        self.parts().1
    }

    pub fn parts(&self) -> (&H, &[D]) {
        BlockAdapter::<H, D>::view(&self.slot)
    }

    pub fn len(&self) -> usize {
        BlockAdapter::<H, D>::element_count(self.slot.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn commit(self) {
        self.slot.commit();
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    struct HeaderTest {
        a: i32,
        b: f32,
    }

    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    struct DataTest {
        x: f64,
        y: u8,
        _pad: [u8; 7],
    }

    type Adapter = BlockAdapter<HeaderTest, DataTest>;

    #[test]
    fn test_block_size_and_count() {
        assert_eq!(Adapter::block_size(0), 8);
        assert_eq!(Adapter::block_size(3), 8 + 3 * 16);
        assert_eq!(Adapter::element_count(8 + 3 * 16), 3);
        assert_eq!(Adapter::element_count(8 + 3 * 16 + 5), 3);
        assert_eq!(Adapter::element_count(4), 0);
    }

    #[test]
    fn test_block_roundtrip() {
        let (mut tx, mut rx) = Adapter::channel(1024).unwrap();

        let mut block = tx.acquire_write(4).unwrap();
        assert_eq!(block.len(), 4);
        {
            let (header, data) = block.parts_mut();
            *header = HeaderTest { a: 7, b: 1.5 };
            for (i, d) in data.iter_mut().enumerate() {
                *d = DataTest {
                    x: i as f64 * 0.25,
                    y: i as u8,
                    _pad: [0; 7],
                };
            }
        }
        block.commit();

        let block = rx.acquire_read().unwrap();
        assert_eq!(*block.header(), HeaderTest { a: 7, b: 1.5 });
        assert_eq!(block.len(), 4);
        for (i, d) in block.data().iter().enumerate() {
            assert_eq!(d.x, i as f64 * 0.25);
            assert_eq!(d.y, i as u8);
        }
        block.commit();
        assert!(matches!(rx.acquire_read(), Err(SpscError::Empty)));
    }

    #[test]
    fn test_header_only_block() {
        let (mut tx, mut rx) = Adapter::channel(256).unwrap();

        let mut block = tx.acquire_write(0).unwrap();
        assert!(block.is_empty());
        block.header_mut().a = -1;
        block.commit();

        let block = rx.acquire_read().unwrap();
        assert!(block.data().is_empty());
        assert_eq!(block.header().a, -1);
        block.commit();
    }

    #[test]
    fn test_block_too_big() {
        let (mut tx, _rx) = Adapter::channel(256).unwrap();
        let max = tx.max_elements();
        assert_eq!(max, (256 - 8 - 8) / 16);

        assert!(tx.acquire_write(max).is_ok());
        assert!(matches!(tx.acquire_write(max + 1), Err(SpscError::TooBig)));
        assert!(matches!(tx.acquire_write(usize::MAX), Err(SpscError::TooBig)));
    }

    #[test]
    fn test_blocks_across_wrap() {
        let (mut tx, mut rx) = Adapter::channel(512).unwrap();

        for round in 0..50i32 {
            let count = (round as usize % 9) + 1;
            let mut block = tx.acquire_write(count).unwrap();
            block.header_mut().a = round;
            for d in block.data_mut() {
                d.y = round as u8;
            }
            block.commit();

            let block = rx.acquire_read().unwrap();
            assert_eq!(block.header().a, round);
            assert_eq!(block.len(), count);
            assert!(block.data().iter().all(|d| d.y == round as u8));
            block.commit();
        }
    }

    #[test]
    #[should_panic(expected = "shorter than the block header")]
    fn test_short_slot_panics() {
        let (mut tx, mut rx) = Adapter::channel(256).unwrap();
        let mut slot = tx.as_raw().acquire_write(3).unwrap();
        slot.copy_from_slice(&[1, 2, 3]);
        slot.commit();
        let _ = rx.acquire_read();
    }
}
