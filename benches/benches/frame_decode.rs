//! Frame decoding throughput.
//!
//! Run with: `cargo bench --package fxstream-bench --bench frame_decode`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fxstream_bench::price_body;
use fxstream_client::{Feed, FrameDecoder, PriceFeed};
use std::hint::black_box;

const TICKS: usize = 10_000;

fn decode_all(body: &[u8], chunk_size: usize) -> usize {
    let mut decoder = FrameDecoder::new();
    let mut frames = 0;
    for chunk in body.chunks(chunk_size) {
        decoder.extend(chunk);
        while let Ok(Some(message)) = decoder.next_message() {
            black_box(&message);
            frames += 1;
        }
    }
    frames
}

fn frame_decode_benchmark(c: &mut Criterion) {
    let body = price_body(TICKS, 50);

    let mut group = c.benchmark_group("frame_decode");
    group.throughput(Throughput::Bytes(body.len() as u64));

    // Network reads rarely align with frames; small chunks exercise buffering
    for chunk_size in [64, 1024, 16 * 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| b.iter(|| decode_all(black_box(&body), chunk_size)),
        );
    }
    group.finish();
}

fn tick_decode_benchmark(c: &mut Criterion) {
    let message = fxstream_bench::tick_message("EUR_USD");

    let mut group = c.benchmark_group("tick_decode");
    group.throughput(Throughput::Elements(1));
    group.bench_function("partition_key", |b| {
        b.iter(|| PriceFeed::partition_key(black_box(&message)))
    });
    group.bench_function("record", |b| b.iter(|| PriceFeed::decode(black_box(&message))));
    group.finish();
}

criterion_group!(benches, frame_decode_benchmark, tick_decode_benchmark);
criterion_main!(benches);
