//! md5x Criterion Benchmarks
//!
//! Single-stream latency and the aggregate multi-stream throughput the lane
//! machinery is built for.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use md5x::{Backend, Server};
use rand::prelude::*;
use std::hint::black_box;

const KB: usize = 1024;
const MB: usize = 1024 * 1024;

fn random_input(size: usize) -> Vec<u8> {
    let mut input = vec![0u8; size];
    rand::rng().fill(&mut input[..]);
    input
}

// =============================================================================
// BENCHMARK 1: SINGLE STREAM
// =============================================================================

/// One stream on its own: the latency floor, not the design point.
fn bench_single_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("1-Single-Stream");

    let sizes = [
        (64, "64B"),
        (KB, "1KB"),
        (64 * KB, "64KB"),
        (MB, "1MB"),
        (4 * MB, "4MB"),
    ];

    let server = Server::new();
    for (size, name) in sizes {
        let input = random_input(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(
            criterion::BenchmarkId::from_parameter(name),
            &input,
            |b, data| {
                let mut hasher = server.new_hash();
                b.iter(|| {
                    hasher.reset();
                    hasher.write(black_box(data)).unwrap();
                    black_box(hasher.sum_digest().unwrap())
                });
            },
        );
    }
    group.finish();
}

// =============================================================================
// BENCHMARK 2: FULL LANE TABLE
// =============================================================================

/// Sixteen streams written concurrently: the throughput the lanes buy.
fn bench_full_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("2-Sixteen-Streams");
    group.sample_size(20);

    let sizes = [(64 * KB, "16x64KB"), (MB, "16x1MB"), (2 * MB, "16x2MB")];

    for backend in [Backend::Fused16, Backend::Doubled8] {
        let server = Server::with_backend(backend);
        for (size, name) in sizes {
            let input = random_input(size);
            group.throughput(Throughput::Bytes(16 * size as u64));

            group.bench_with_input(
                criterion::BenchmarkId::new(backend.name(), name),
                &input,
                |b, data| {
                    let mut streams: Vec<_> = (0..16).map(|_| server.new_hash()).collect();
                    b.iter(|| {
                        for h in &mut streams {
                            h.reset();
                        }
                        std::thread::scope(|scope| {
                            for h in &mut streams {
                                scope.spawn(move || {
                                    h.write(black_box(data)).unwrap();
                                    black_box(h.sum_digest().unwrap());
                                });
                            }
                        });
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_single_stream, bench_full_table);
criterion_main!(benches);
