//! Pull-based traversal that turns acquire/commit pairs into one loop.
//!
//! ```no_run
//! # let (_tx, mut rx) = csics::channel(4096).unwrap();
//! let mut range = rx.drain();
//! while let Some(bytes) = range.next_slot() {
//!     // the previous slot was committed by this call
//!     println!("{} bytes", bytes.len());
//! }
//! // dropping the range commits the last slot
//! ```

use crossbeam_utils::Backoff;

use super::blocking::StopSignal;
use crate::core::{Consumer, SpscError};

/// Auto-committing cursor over a consumer.
pub struct Range<'c> {
    consumer: &'c mut Consumer,
    current: Option<usize>,
    stop: Option<StopSignal>,
}

impl<'c> Range<'c> {
    /// Ends at the first `Empty`.
    pub fn new(consumer: &'c mut Consumer) -> Self {
        Self {
            consumer,
            current: None,
            stop: None,
        }
    }

    /// Waits through `Empty` and ends only once `stop` is raised and the
    /// queue is drained.
    pub fn until_stopped(consumer: &'c mut Consumer, stop: StopSignal) -> Self {
        Self {
            consumer,
            current: None,
            stop: Some(stop),
        }
    }

    /// Commits the slot handed out last time and exposes the next one.
    pub fn next_slot(&mut self) -> Option<&[u8]> {
        self.release();

        let backoff = Backoff::new();
        loop {
            match self.consumer.peek() {
                Ok(raw) => {
                    self.current = Some(raw.len);
                    return Some(self.consumer.bytes(raw));
                }
                Err(SpscError::Empty) => match &self.stop {
                    Some(stop) if !stop.is_stopped() => backoff.snooze(),
                    Some(_) => {
                        // Last look: a commit may have landed just before the stop.
                        let raw = self.consumer.peek().ok()?;
                        self.current = Some(raw.len);
                        return Some(self.consumer.bytes(raw));
                    }
                    None => return None,
                },
                Err(_) => return None,
            }
        }
    }

    /// Number of slots this range commits, consuming it.
    pub fn count(mut self) -> usize {
        let mut n = 0;
        while self.next_slot().is_some() {
            n += 1;
        }
        n
    }

    fn release(&mut self) {
        if let Some(len) = self.current.take() {
            self.consumer.release(len);
        }
    }
}

impl Drop for Range<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
