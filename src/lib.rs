//! csics - Lock-Free SPSC Byte Ring Buffer
//!
//! Architecture:
//! - core: byte ring with acquire/commit slots over mapped storage
//! - adapter: typed block and message views over raw slots
//! - stream: blocking wrappers, stop signal, slot traversal
//! - radio: synthetic sampling source streaming blocks through the ring

pub mod adapter;
pub mod affinity;
pub mod config;
pub mod core;
pub mod radio;
pub mod stream;
pub mod trace;

pub use crate::adapter::{BlockAdapter, BlockConsumer, BlockProducer};
pub use crate::config::StreamConfig;
pub use crate::core::{
    Consumer, InitError, Producer, ReadSlot, RingBuffer, SpscError, WriteSlot,
};
pub use crate::stream::{Range, StopSignal};

/// Builds a ring of at least `capacity` bytes and splits it.
pub fn channel(capacity: usize) -> Result<(Producer, Consumer), InitError> {
    Ok(RingBuffer::new(capacity)?.split())
}
