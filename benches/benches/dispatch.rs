//! Partitioned dispatch throughput.
//!
//! Run with: `cargo bench --package fxstream-bench --bench dispatch`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fxstream_bench::{INSTRUMENTS, tick_message};
use fxstream_client::{Dispatcher, PartitionHandler, StreamStats};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

const MESSAGES: usize = 4_000;

/// Routes `MESSAGES` ticks round-robin through a dispatcher and waits for the
/// workers to deliver them.
async fn route_all(partitions: usize, capacity: usize) {
    let stats = Arc::new(StreamStats::default());
    let mut dispatcher = Dispatcher::new(capacity, Arc::clone(&stats));
    let keys: Vec<String> = INSTRUMENTS[..partitions].iter().map(|s| (*s).to_string()).collect();
    for key in &keys {
        dispatcher.register(key.clone());
    }

    let handler: PartitionHandler<String> = Arc::new(|key, message| {
        black_box((key, message));
    });
    let cancel = CancellationToken::new();
    dispatcher.start_workers(handler, &cancel);

    let messages: Vec<_> = keys.iter().map(|k| tick_message(k)).collect();
    let router = dispatcher.router();
    for i in 0..MESSAGES {
        let slot = i % keys.len();
        router.route(&keys[slot], messages[slot].clone());
        if i % 64 == 0 {
            tokio::task::yield_now().await;
        }
    }
    dispatcher.drain_and_close(false).await;
}

fn dispatch_benchmark(c: &mut Criterion) {
    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => panic!("failed to build runtime: {e}"),
    };

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(MESSAGES as u64));
    for partitions in [1, INSTRUMENTS.len()] {
        for capacity in [5, 1024] {
            group.bench_with_input(
                BenchmarkId::new(format!("{partitions}_partitions"), capacity),
                &(partitions, capacity),
                |b, &(partitions, capacity)| {
                    b.to_async(&runtime).iter(|| route_all(partitions, capacity));
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, dispatch_benchmark);
criterion_main!(benches);
