//! Typed message queue: one plain-old-data value per slot.

use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;

use crate::core::{Consumer, InitError, Producer, RingBuffer, SpscError};

/// Builds a ring of `capacity` bytes carrying `T` values.
pub fn message_channel<T: Pod>(
    capacity: usize,
) -> Result<(MessageProducer<T>, MessageConsumer<T>), InitError> {
    let (producer, consumer) = RingBuffer::new(capacity)?.split();
    Ok((
        MessageProducer {
            inner: producer,
            _marker: PhantomData,
        },
        MessageConsumer {
            inner: consumer,
            _marker: PhantomData,
        },
    ))
}

pub struct MessageProducer<T> {
    inner: Producer,
    _marker: PhantomData<fn(T)>,
}

impl<T: Pod> MessageProducer<T> {
    /// Copies `value` into a fresh slot and publishes it.
    #[inline]
    pub fn try_push(&mut self, value: &T) -> Result<(), SpscError> {
        let mut slot = self.inner.acquire_write(size_of::<T>())?;
        slot.copy_from_slice(bytemuck::bytes_of(value));
        slot.commit();
        Ok(())
    }
}

pub struct MessageConsumer<T> {
    inner: Consumer,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Pod> MessageConsumer<T> {
    /// Takes the oldest value out of the queue.
    #[inline]
    pub fn try_pop(&mut self) -> Result<T, SpscError> {
        let slot = self.inner.acquire_read()?;
        let value = bytemuck::pod_read_unaligned(&slot);
        slot.commit();
        Ok(value)
    }

    #[inline(always)]
    pub fn has_pending_data(&self) -> bool {
        self.inner.has_pending_data()
    }
}
