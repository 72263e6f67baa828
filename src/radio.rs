//! Synthetic radio receiver streaming sample blocks through the ring.
//!
//! Stands in for a hardware sampling driver: one thread fills
//! `BlockHeader` + `[IqSample]` blocks and commits them, the caller consumes
//! them through the returned [`BlockConsumer`]. Samples follow a ramp
//! (`i = k mod 32768`, `q = -i` for the `k`-th sample of the stream) so a
//! consumer can check that nothing was lost or reordered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use bytemuck::{Pod, Zeroable};
use crossbeam_utils::Backoff;
use tracing::{debug, info, warn};

use crate::adapter::{BlockAdapter, BlockConsumer, BlockProducer};
use crate::config::StreamConfig;
use crate::core::{InitError, RingBuffer, SpscError};
use crate::stream::StopSignal;

/// Per-block metadata written in front of the samples.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct BlockHeader {
    /// Wall-clock nanoseconds since the epoch when sampling of the block began.
    pub timestamp_ns: u64,
    pub num_samples: u32,
    pub reserved: u32,
}

/// One complex sample, 16-bit I and Q.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct IqSample {
    pub i: i16,
    pub q: i16,
}

impl IqSample {
    /// The `k`-th sample of the synthetic ramp.
    #[inline(always)]
    pub fn ramp(k: u64) -> Self {
        let i = (k & 0x7FFF) as i16;
        Self { i, q: -i }
    }
}

pub type RxQueue = BlockAdapter<BlockHeader, IqSample>;

/// Nanoseconds since the Unix epoch, 0 if the clock is before it.
#[inline(always)]
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Handle on a running synthetic stream.
pub struct SyntheticRx {
    stop: StopSignal,
    streaming: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl SyntheticRx {
    /// Builds the ring and starts the sampling thread.
    pub fn start_stream(
        config: &StreamConfig,
    ) -> Result<(Self, BlockConsumer<BlockHeader, IqSample>), InitError> {
        config.validate()?;

        let (producer, consumer) = RxQueue::split(RingBuffer::new(config.capacity)?);
        let stop = StopSignal::new();
        let streaming = Arc::new(AtomicBool::new(true));

        let handle = {
            let stop = stop.clone();
            let streaming = Arc::clone(&streaming);
            let block_len = config.block_len;
            let max_blocks = config.max_blocks;
            thread::Builder::new()
                .name("csics-rx".into())
                .spawn(move || {
                    let blocks = rx_loop(producer, block_len, max_blocks, &stop);
                    streaming.store(false, Ordering::Release);
                    blocks
                })
                .map_err(InitError::Spawn)?
        };

        info!(
            capacity = consumer.capacity(),
            block_len = config.block_len,
            "synthetic rx stream started"
        );

        Ok((
            Self {
                stop,
                streaming,
                handle: Some(handle),
            },
            consumer,
        ))
    }

    /// Whether the sampling thread is still producing.
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    /// Signal shared with the sampling thread; raised by `stop_stream`.
    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Stops sampling and returns the number of blocks committed.
    ///
    /// Blocks already committed stay readable. Calling it again returns 0.
    pub fn stop_stream(&mut self) -> u64 {
        self.stop.stop();
        let Some(handle) = self.handle.take() else {
            return 0;
        };

        match handle.join() {
            Ok(blocks) => {
                info!(blocks, "synthetic rx stream stopped");
                blocks
            }
            Err(_) => {
                warn!("synthetic rx thread panicked");
                0
            }
        }
    }
}

impl Drop for SyntheticRx {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

fn rx_loop(
    mut producer: BlockProducer<BlockHeader, IqSample>,
    block_len: usize,
    max_blocks: Option<u64>,
    stop: &StopSignal,
) -> u64 {
    let backoff = Backoff::new();
    let mut blocks = 0u64;
    let mut next_sample = 0u64;

    while !stop.is_stopped() && max_blocks.map_or(true, |max| blocks < max) {
        let mut block = match producer.acquire_write(block_len) {
            Ok(block) => block,
            Err(SpscError::Full) => {
                backoff.snooze();
                continue;
            }
            Err(e) => {
                warn!(error = %e, "rx block cannot be reserved");
                break;
            }
        };
        backoff.reset();

        let (header, samples) = block.parts_mut();
        *header = BlockHeader {
            timestamp_ns: now_ns(),
            num_samples: samples.len() as u32,
            reserved: 0,
        };
        for (k, sample) in (next_sample..).zip(samples.iter_mut()) {
            *sample = IqSample::ramp(k);
        }
        next_sample += samples.len() as u64;

        block.commit();
        blocks += 1;
    }

    debug!(blocks, samples = next_sample, "rx loop exited");
    blocks
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_ramp() {
        assert_eq!(IqSample::ramp(0), IqSample { i: 0, q: 0 });
        assert_eq!(IqSample::ramp(5), IqSample { i: 5, q: -5 });
        assert_eq!(IqSample::ramp(0x8001), IqSample { i: 1, q: -1 });
    }

    #[test]
    fn test_bounded_stream() {
        let config = StreamConfig {
            capacity: 16 * 1024,
            block_len: 256,
            max_blocks: Some(64),
        };
        let (mut rx, mut blocks) = SyntheticRx::start_stream(&config).unwrap();

        let mut k = 0u64;
        let mut received = 0u64;
        while received < 64 {
            match blocks.acquire_read() {
                Ok(block) => {
                    assert_eq!(block.header().num_samples, 256);
                    for sample in block.data() {
                        assert_eq!(*sample, IqSample::ramp(k));
                        k += 1;
                    }
                    block.commit();
                    received += 1;
                }
                Err(SpscError::Empty) => thread::yield_now(),
                Err(e) => panic!("unexpected {e}"),
            }
        }

        assert_eq!(rx.stop_stream(), 64);
        assert!(!rx.is_streaming());
        assert_eq!(rx.stop_stream(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = StreamConfig {
            capacity: 1024,
            block_len: 4096,
            max_blocks: None,
        };
        assert!(matches!(
            SyntheticRx::start_stream(&config),
            Err(InitError::BlockTooLarge { .. })
        ));
    }
}
