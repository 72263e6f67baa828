//! Criterion benchmarks for the byte ring and its adapters
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use csics::adapter::message_channel;
use csics::channel;
use csics::radio::{IqSample, RxQueue};

fn bench_acquire_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer");
    group.throughput(Throughput::Elements(1));

    for size in [8usize, 64, 512] {
        group.bench_function(format!("write_read_{}", size), |b| {
            let (mut tx, mut rx) = channel(1 << 16).unwrap();
            let msg = vec![0xA5u8; size];
            b.iter(|| {
                let mut slot = tx.acquire_write(black_box(size)).unwrap();
                slot.copy_from_slice(&msg);
                slot.commit();

                let slot = rx.acquire_read().unwrap();
                black_box(&slot[..]);
                slot.commit();
            });
        });
    }

    // Fill until Full, then drain: exercises the wrap path every pass.
    group.bench_function("fill_drain_wrap", |b| {
        let (mut tx, mut rx) = channel(4096).unwrap();
        b.iter(|| {
            while let Ok(mut slot) = tx.acquire_write(100) {
                slot[0] = 1;
                slot.commit();
            }
            while let Ok(slot) = rx.acquire_read() {
                black_box(slot[0]);
                slot.commit();
            }
        });
    });

    group.finish();
}

fn bench_adapters(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapters");

    group.throughput(Throughput::Elements(1));
    group.bench_function("message_u64", |b| {
        let (mut tx, mut rx) = message_channel::<u64>(1 << 16).unwrap();
        let mut i = 0u64;
        b.iter(|| {
            tx.try_push(&black_box(i)).unwrap();
            black_box(rx.try_pop().unwrap());
            i = i.wrapping_add(1);
        });
    });

    for block_len in [64usize, 1024] {
        group.throughput(Throughput::Bytes(RxQueue::block_size(block_len) as u64));
        group.bench_function(format!("block_{}", block_len), |b| {
            let (mut tx, mut rx) = RxQueue::channel(1 << 20).unwrap();
            b.iter(|| {
                let mut block = tx.acquire_write(block_len).unwrap();
                let (header, samples) = block.parts_mut();
                header.num_samples = samples.len() as u32;
                for (k, sample) in samples.iter_mut().enumerate() {
                    *sample = IqSample::ramp(k as u64);
                }
                block.commit();

                let block = rx.acquire_read().unwrap();
                black_box(block.data().len());
                block.commit();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_acquire_commit, bench_adapters);
criterion_main!(benches);
