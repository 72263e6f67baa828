//! Error types for the ring buffer.
//!
//! `SpscError` is the hot-path result: small, `Copy`, and always retryable
//! except for `TooBig`. `InitError` covers construction and configuration.

use std::io;

use thiserror::Error;

/// Outcome of a failed acquire on either side of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpscError {
    /// Not enough free space for the requested write. Retry later.
    #[error("ring buffer is full")]
    Full,
    /// No committed data to read. Retry later.
    #[error("ring buffer is empty")]
    Empty,
    /// The write can never fit the configured capacity.
    #[error("message does not fit the ring buffer capacity")]
    TooBig,
}

/// Errors raised while building a ring buffer or a stream on top of it.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to map ring storage: {0}")]
    Map(#[from] io::Error),

    #[error("requested capacity {requested} cannot be rounded to a power of two")]
    CapacityOverflow { requested: usize },

    #[error("failed to spawn stream thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("block length must be at least one sample")]
    InvalidBlockLen,

    #[error("block of {block_bytes} bytes does not fit a ring of {capacity} bytes")]
    BlockTooLarge { block_bytes: usize, capacity: usize },
}
