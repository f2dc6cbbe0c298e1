//! CRC throughput benchmarks.
//!
//! Covers the two checksums the XZ container computes over decoded data,
//! across input sizes and the incremental (running value) form the stream
//! decoder uses between calls.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxixz_core::crc::{Crc32, Crc64, crc32};
use std::hint::black_box;

/// Text-like data
fn text_like(size: usize) -> Vec<u8> {
    let text = b"The quick brown fox jumps over the lazy dog. ";
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        let remaining = size - data.len();
        let chunk_size = remaining.min(text.len());
        data.extend_from_slice(&text[..chunk_size]);
    }
    data
}

const SIZES: [(&str, usize); 5] = [
    ("16B", 16),
    ("256B", 256),
    ("4KB", 4 * 1024),
    ("64KB", 64 * 1024),
    ("1MB", 1024 * 1024),
];

fn bench_crc32_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32_sizes");

    for (size_name, size) in SIZES {
        let data = text_like(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size_name), &data, |b, data| {
            b.iter(|| black_box(Crc32::compute(black_box(data))));
        });
    }

    group.finish();
}

fn bench_crc64_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc64_sizes");

    for (size_name, size) in SIZES {
        let data = text_like(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size_name), &data, |b, data| {
            b.iter(|| black_box(Crc64::compute(black_box(data))));
        });
    }

    group.finish();
}

/// Running CRC-32 over output chunks of the sizes a streaming caller produces.
fn bench_crc32_running(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32_running");

    let size = 64 * 1024;
    let data = text_like(size);

    for chunk_size in [64, 512, 4096, 16384] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("chunks_{}", chunk_size)),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut running = 0;
                    for chunk in data.chunks(chunk_size) {
                        running = crc32(black_box(chunk), running);
                    }
                    black_box(running);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_crc32_sizes,
    bench_crc64_sizes,
    bench_crc32_running
);
criterion_main!(benches);
