//! Core module: Lock-Free SPSC Byte Ring Buffer
//!
//! Design principles:
//! - Zero-Copy: slots point straight into the ring storage
//! - Lock-Free: two atomic cursors, no Mutex, no syscalls on the hot path
//! - No-Allocation: storage is mapped once at construction

mod error;
mod header;
mod ring_buffer;
mod storage;
mod sync;


pub use error::{InitError, SpscError};
pub use header::{SlotHeader, HEADER_SIZE};
pub use ring_buffer::{frame_len, Consumer, Producer, ReadSlot, RingBuffer, WriteSlot};
pub use storage::{align_up, round_capacity, RingStorage, CACHE_LINE_SIZE};

pub(crate) use ring_buffer::RawSlot;

/// Alignment every payload start offset satisfies.
pub const PAYLOAD_ALIGN: usize = HEADER_SIZE;
