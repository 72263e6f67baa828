//! csics - Lock-Free SPSC Byte Ring Buffer benchmarks
//!
//! Architecture:
//! - Zero-Copy: slots point straight into mapped storage
//! - Lock-Free: two atomic cursors on separate cache lines
//! - No-Allocation: storage mapped once, hot path never allocates

use std::hint::black_box;
use std::thread;
use std::time::Instant;

use clap::Parser;
use csics::adapter::message_channel;
use csics::affinity::{available_cores, pin_current_thread};
use csics::radio::{BlockHeader, IqSample, RxQueue};
use csics::trace::init_tracing;
use csics::{channel, SpscError};

#[derive(Parser, Debug)]
#[command(name = "csics", about = "Ring buffer latency and throughput benchmarks")]
struct Args {
    /// Ring capacity in bytes
    #[arg(long, default_value_t = 1 << 20)]
    capacity: usize,

    /// Operations per benchmark
    #[arg(long, default_value_t = 1_000_000)]
    iterations: usize,

    /// Payload size in bytes for the byte-ring benchmarks
    #[arg(long, default_value_t = 64)]
    msg_size: usize,

    /// Pin producer and consumer threads to the first two cores
    #[arg(long)]
    pin: bool,
}

fn main() {
    init_tracing();
    let args = Args::parse();

    println!("🚀 csics - Lock-Free SPSC Ring Buffer");
    println!("=====================================\n");

    if let Err(e) = run(&args) {
        eprintln!("❌ Benchmark failed: {}", e);
        std::process::exit(1);
    }

    println!("\n✅ All benchmarks complete!");
    println!("\nTo stream synthetic samples: cargo run --release --bin rx_stream");
}

fn run(args: &Args) -> Result<(), csics::InitError> {
    benchmark_ring_buffer(args)?;
    benchmark_block_adapter(args)?;
    benchmark_message_queue(args)?;
    benchmark_two_threads(args)?;
    Ok(())
}

fn report_latency(label: &str, ops: usize, elapsed_ns: u128) {
    let ns = elapsed_ns as f64 / ops as f64;
    println!("  {} {:.2} ns/op ({:.3} μs/op)", label, ns, ns / 1000.0);
}

fn benchmark_ring_buffer(args: &Args) -> Result<(), csics::InitError> {
    println!("📊 Ring Buffer Benchmark (acquire/commit, same thread)");
    println!("------------------------------------------------------");

    let (mut tx, mut rx) = channel(args.capacity)?;
    let msg = vec![0x5Au8; args.msg_size];

    // Warm up
    for _ in 0..1000 {
        if let Ok(mut slot) = tx.acquire_write(msg.len()) {
            slot.copy_from_slice(&msg);
            slot.commit();
        }
        if let Ok(slot) = rx.acquire_read() {
            slot.commit();
        }
    }

    let mut write_ns = 0u128;
    let mut read_ns = 0u128;
    let mut done = 0usize;

    // Alternate fill and drain phases so each side is timed on its own.
    while done < args.iterations {
        let start = Instant::now();
        let mut batch = 0usize;
        while done + batch < args.iterations {
            match tx.acquire_write(msg.len()) {
                Ok(mut slot) => {
                    slot.copy_from_slice(&msg);
                    slot.commit();
                    batch += 1;
                }
                Err(SpscError::Full) => break,
                Err(e) => {
                    println!("  Write failed: {}", e);
                    return Ok(());
                }
            }
        }
        write_ns += start.elapsed().as_nanos();

        // Draining until Empty also skips padding left by a transient Full.
        let start = Instant::now();
        while let Ok(slot) = rx.acquire_read() {
            black_box(slot.first());
            slot.commit();
        }
        read_ns += start.elapsed().as_nanos();

        done += batch;
    }

    println!("  Capacity: {} bytes", tx.capacity());
    println!("  Message size: {} bytes", args.msg_size);
    println!("  Operations: {}", args.iterations);
    report_latency("Write latency:", args.iterations, write_ns);
    report_latency("Read latency: ", args.iterations, read_ns);
    println!(
        "  Write throughput: {:.2} M msgs/sec\n",
        args.iterations as f64 / (write_ns as f64 / 1e9) / 1_000_000.0
    );
    Ok(())
}

fn benchmark_block_adapter(args: &Args) -> Result<(), csics::InitError> {
    println!("📊 Block Adapter Benchmark (BlockHeader + IqSample)");
    println!("---------------------------------------------------");

    const BLOCK_LEN: usize = 256;
    let blocks = (args.iterations / 100).max(1);
    let (mut tx, mut rx) = RxQueue::channel(args.capacity)?;

    let start = Instant::now();
    let mut written = 0usize;
    let mut checksum = 0i64;
    while written < blocks {
        match tx.acquire_write(BLOCK_LEN) {
            Ok(mut block) => {
                let (header, samples) = block.parts_mut();
                *header = BlockHeader {
                    timestamp_ns: written as u64,
                    num_samples: BLOCK_LEN as u32,
                    reserved: 0,
                };
                for (k, sample) in samples.iter_mut().enumerate() {
                    *sample = IqSample::ramp(k as u64);
                }
                block.commit();
                written += 1;
            }
            Err(SpscError::TooBig) => {
                println!("  Skipped: a {} sample block does not fit the ring\n", BLOCK_LEN);
                return Ok(());
            }
            Err(_) => {}
        }

        while let Ok(block) = rx.acquire_read() {
            checksum += block.data().iter().map(|s| s.i as i64).sum::<i64>();
            block.commit();
        }
    }
    let duration = start.elapsed();

    let bytes = blocks * RxQueue::block_size(BLOCK_LEN);
    println!("  Block size: {} bytes ({} samples)", RxQueue::block_size(BLOCK_LEN), BLOCK_LEN);
    println!("  Blocks: {}", blocks);
    report_latency("Block round trip:", blocks, duration.as_nanos());
    println!(
        "  Throughput: {:.2} MB/sec (checksum {})\n",
        bytes as f64 / duration.as_secs_f64() / 1_000_000.0,
        black_box(checksum)
    );
    Ok(())
}

fn benchmark_message_queue(args: &Args) -> Result<(), csics::InitError> {
    println!("📊 Message Queue Benchmark (u64 per slot)");
    println!("-----------------------------------------");

    let (mut tx, mut rx) = message_channel::<u64>(args.capacity)?;

    let start = Instant::now();
    let mut sum = 0u64;
    for i in 0..args.iterations as u64 {
        if tx.try_push(&i).is_err() {
            while let Ok(v) = rx.try_pop() {
                sum = sum.wrapping_add(v);
            }
            let _ = tx.try_push(&i);
        }
    }
    while let Ok(v) = rx.try_pop() {
        sum = sum.wrapping_add(v);
    }
    let duration = start.elapsed();

    println!("  Operations: {}", args.iterations);
    report_latency("Push+pop latency:", args.iterations, duration.as_nanos());
    println!(
        "  Throughput: {:.2} M msgs/sec (sum {})\n",
        args.iterations as f64 / duration.as_secs_f64() / 1_000_000.0,
        black_box(sum)
    );
    Ok(())
}

fn benchmark_two_threads(args: &Args) -> Result<(), csics::InitError> {
    println!("📊 Two-Thread Throughput (producer → consumer)");
    println!("-----------------------------------------------");

    let (mut tx, mut rx) = channel(args.capacity)?;
    let iterations = args.iterations as u64;
    let pin = args.pin && available_cores() >= 2;

    let start = Instant::now();

    let producer = thread::spawn(move || {
        if pin {
            if let Err(e) = pin_current_thread(0) {
                tracing::warn!(error = %e, "failed to pin producer");
            }
        }
        let mut i = 0u64;
        while i < iterations {
            if let Ok(mut slot) = tx.acquire_write(8) {
                slot.copy_from_slice(&i.to_le_bytes());
                slot.commit();
                i += 1;
            }
        }
    });

    if pin {
        if let Err(e) = pin_current_thread(1) {
            tracing::warn!(error = %e, "failed to pin consumer");
        }
    }

    let mut expected = 0u64;
    let mut errors = 0u64;
    while expected < iterations {
        if let Ok(slot) = rx.acquire_read() {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&slot);
            if u64::from_le_bytes(raw) != expected {
                errors += 1;
            }
            slot.commit();
            expected += 1;
        }
    }

    let duration = start.elapsed();
    if producer.join().is_err() {
        println!("  Producer thread panicked");
    }

    println!("  Pinned: {}", if pin { "yes" } else { "no" });
    println!("  Messages: {}", iterations);
    println!("  Order errors: {}", errors);
    println!(
        "  Throughput: {:.2} M msgs/sec",
        iterations as f64 / duration.as_secs_f64() / 1_000_000.0
    );
    report_latency("Avg per message:", args.iterations, duration.as_nanos());
    Ok(())
}
