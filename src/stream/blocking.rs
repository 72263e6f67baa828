//! Blocking wrappers over the non-blocking core.
//!
//! Waiting is a spin-then-yield loop (`crossbeam_utils::Backoff`), never an
//! OS wait primitive. A shared [`StopSignal`] ends the wait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_utils::Backoff;
use thiserror::Error;

use crate::core::{Consumer, Producer, ReadSlot, SpscError, WriteSlot};

/// Cooperative shutdown flag shared by both ends of a stream.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Everything committed before this call stays readable.
    #[inline]
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    #[inline(always)]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Why a blocking acquire gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("stream stopped")]
    Stopped,
    #[error(transparent)]
    Queue(#[from] SpscError),
}

/// Producer that waits for room instead of returning `Full`.
pub struct BlockingProducer {
    inner: Producer,
    stop: StopSignal,
}

impl BlockingProducer {
    pub fn new(inner: Producer, stop: StopSignal) -> Self {
        Self { inner, stop }
    }

    /// Waits until `size` bytes can be reserved.
    ///
    /// Fails `Stopped` once the signal is raised while the ring is full, and
    /// `Queue(TooBig)` straight away for a write that can never fit.
    pub fn acquire_write(&mut self, size: usize) -> Result<WriteSlot<'_>, WaitError> {
        let backoff = Backoff::new();
        loop {
            match self.inner.reserve(size) {
                Ok(raw) => return Ok(WriteSlot::new(&mut self.inner, raw)),
                Err(SpscError::Full) => {
                    if self.stop.is_stopped() {
                        return Err(WaitError::Stopped);
                    }
                    backoff.snooze();
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn into_inner(self) -> Producer {
        self.inner
    }
}

/// Consumer that waits for data instead of returning `Empty`.
pub struct BlockingConsumer {
    inner: Consumer,
    stop: StopSignal,
}

impl BlockingConsumer {
    pub fn new(inner: Consumer, stop: StopSignal) -> Self {
        Self { inner, stop }
    }

    /// Waits for the next message.
    ///
    /// After the signal is raised the queue is still drained; `Stopped` comes
    /// back only once nothing committed is left.
    pub fn acquire_read(&mut self) -> Result<ReadSlot<'_>, WaitError> {
        let backoff = Backoff::new();
        loop {
            match self.inner.peek() {
                Ok(raw) => return Ok(ReadSlot::new(&mut self.inner, raw)),
                Err(SpscError::Empty) => {
                    if self.stop.is_stopped() {
                        // The stop may have been raised right after a final commit.
                        return match self.inner.peek() {
                            Ok(raw) => Ok(ReadSlot::new(&mut self.inner, raw)),
                            Err(_) => Err(WaitError::Stopped),
                        };
                    }
                    backoff.snooze();
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn into_inner(self) -> Consumer {
        self.inner
    }
}
