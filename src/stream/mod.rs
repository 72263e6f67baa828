//! Stream layer: waiting and traversal on top of the non-blocking core
//!
//! The core never waits. Callers that want to wait, or to walk the queue in a
//! loop, pick one of these:
//! - `BlockingProducer` / `BlockingConsumer`: spin-then-yield until ready or stopped
//! - `Range`: pull slots one by one, each committed on the next pull

mod blocking;
mod range;

pub use blocking::{BlockingConsumer, BlockingProducer, StopSignal, WaitError};
pub use range::Range;
