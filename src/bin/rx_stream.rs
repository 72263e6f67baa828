//! Synthetic radio stream consumer
//!
//! Starts the synthetic receiver, consumes its blocks through the block
//! adapter and checks every sample against the ramp. Reports block latency
//! (commit timestamp to consumption) and sample throughput.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin rx_stream -- --capacity 1048576 --block-len 1024 --blocks 100000 --pin 1
//! ```

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info, warn};

use csics::affinity::pin_current_thread;
use csics::radio::{now_ns, IqSample, SyntheticRx};
use csics::trace::init_tracing;
use csics::{SpscError, StreamConfig};

#[derive(Parser, Debug)]
#[command(name = "rx_stream", about = "Consume a synthetic sample stream through the ring")]
struct Args {
    /// Ring capacity in bytes (rounded up to a power of two)
    #[arg(long, default_value_t = 1 << 20)]
    capacity: usize,

    /// Samples per block
    #[arg(long, default_value_t = 1024)]
    block_len: usize,

    /// Blocks to consume before stopping
    #[arg(long, default_value_t = 100_000)]
    blocks: u64,

    /// Pin the consuming thread to this core
    #[arg(long)]
    pin: Option<usize>,
}

/// Block latency percentiles over a pre-allocated sample buffer.
struct LatencyStats {
    samples: Vec<u64>,
}

impl LatencyStats {
    fn with_capacity(n: usize) -> Self {
        Self {
            samples: Vec::with_capacity(n),
        }
    }

    #[inline(always)]
    fn record(&mut self, latency_ns: u64) {
        if self.samples.len() < self.samples.capacity() {
            self.samples.push(latency_ns);
        }
    }

    fn print_report(&mut self) {
        if self.samples.is_empty() {
            println!("  No samples collected");
            return;
        }
        self.samples.sort_unstable();

        let count = self.samples.len();
        let percentile = |p: f64| self.samples[((count - 1) as f64 * p) as usize];
        let avg = self.samples.iter().sum::<u64>() / count as u64;

        println!("\n📊 BLOCK LATENCY REPORT");
        println!("=======================");
        println!("  Samples:    {}", count);
        println!("  Min:        {:.2} μs", self.samples[0] as f64 / 1000.0);
        println!("  Max:        {:.2} μs", self.samples[count - 1] as f64 / 1000.0);
        println!("  Avg:        {:.2} μs", avg as f64 / 1000.0);
        println!("\n  Percentiles:");
        println!("    P50:      {:.2} μs", percentile(0.50) as f64 / 1000.0);
        println!("    P90:      {:.2} μs", percentile(0.90) as f64 / 1000.0);
        println!("    P99:      {:.2} μs", percentile(0.99) as f64 / 1000.0);
        println!("    P99.9:    {:.2} μs", percentile(0.999) as f64 / 1000.0);
    }
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    println!("📡 CSICS RX STREAM - Synthetic Sampling Benchmark");
    println!("=================================================\n");
    println!("Configuration:");
    println!("  Capacity:   {} bytes", args.capacity);
    println!("  Block len:  {} samples", args.block_len);
    println!("  Blocks:     {}", args.blocks);
    println!();

    if let Some(core) = args.pin {
        if let Err(e) = pin_current_thread(core) {
            warn!(core, error = %e, "failed to pin consumer thread");
        }
    }

    let config = StreamConfig {
        capacity: args.capacity,
        block_len: args.block_len,
        max_blocks: Some(args.blocks),
    };

    let (mut rx, mut blocks) = match SyntheticRx::start_stream(&config) {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "cannot start stream");
            return ExitCode::FAILURE;
        }
    };

    let mut stats = LatencyStats::with_capacity(args.blocks.min(1_000_000) as usize);
    let mut next_sample = 0u64;
    let mut received = 0u64;
    let mut gaps = 0u64;
    let start = Instant::now();

    while received < args.blocks {
        match blocks.acquire_read() {
            Ok(block) => {
                let (header, samples) = block.parts();
                stats.record(now_ns().saturating_sub(header.timestamp_ns));

                if header.num_samples as usize != samples.len()
                    || samples.first() != Some(&IqSample::ramp(next_sample))
                {
                    gaps += 1;
                }
                next_sample += samples.len() as u64;

                block.commit();
                received += 1;
            }
            Err(SpscError::Empty) => {
                if !rx.is_streaming() && !blocks.has_pending_data() {
                    warn!(received, "stream ended early");
                    break;
                }
                std::hint::spin_loop();
            }
            Err(e) => {
                error!(error = %e, "read failed");
                break;
            }
        }
    }

    let duration = start.elapsed();
    let produced = rx.stop_stream();

    println!("\nReception Summary:");
    println!("  Duration:      {:.2}s", duration.as_secs_f64());
    println!("  Blocks:        {} received / {} produced", received, produced);
    println!("  Samples:       {}", next_sample);
    println!("  Ramp gaps:     {}", gaps);
    println!(
        "  Throughput:    {:.2} M samples/sec",
        next_sample as f64 / duration.as_secs_f64() / 1_000_000.0
    );
    stats.print_report();

    info!(received, produced, gaps, "rx stream finished");
    if gaps == 0 && received == produced {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
