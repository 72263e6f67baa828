//! Stream configuration.

use crate::core::{round_capacity, InitError, HEADER_SIZE};
use crate::radio::RxQueue;

/// Sizing for a sampling stream over one ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Requested ring capacity in bytes, rounded up to a power of two.
    pub capacity: usize,
    /// Samples per block.
    pub block_len: usize,
    /// Stop producing after this many blocks. `None` runs until stopped.
    pub max_blocks: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: 1 << 20,
            block_len: 1024,
            max_blocks: None,
        }
    }
}

impl StreamConfig {
    /// Payload bytes of one block.
    pub fn block_bytes(&self) -> usize {
        RxQueue::block_size(self.block_len)
    }

    /// Checks that at least one block fits the ring.
    ///
    /// Blocks larger than half the ring are accepted, but the producer will
    /// then stall at every wrap until the consumer catches up completely.
    pub fn validate(&self) -> Result<(), InitError> {
        if self.block_len == 0 {
            return Err(InitError::InvalidBlockLen);
        }

        let capacity = round_capacity(self.capacity)?;
        let block_bytes = self
            .block_len
            .checked_mul(std::mem::size_of::<crate::radio::IqSample>())
            .and_then(|n| n.checked_add(std::mem::size_of::<crate::radio::BlockHeader>()))
            .ok_or(InitError::BlockTooLarge {
                block_bytes: usize::MAX,
                capacity,
            })?;

        if block_bytes + HEADER_SIZE > capacity {
            return Err(InitError::BlockTooLarge {
                block_bytes,
                capacity,
            });
        }
        Ok(())
    }
}
