//! LZMA2 decoding benchmarks.
//!
//! Measures throughput for the bundled fixtures:
//! - Text (one large LZMA chunk)
//! - Mixed text and binary (two LZMA chunks)
//! - Random data (stored chunk, a plain copy)
//!
//! and the cost of small output windows, which force the ring dictionary to
//! flush and the LZMA decoder to suspend mid-match.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxixz_core::Decompressor;
use oxixz_lzma::{Growable, Lzma2Decoder, decode_lzma2};
use std::hint::black_box;

const LOREM: &[u8] = include_bytes!("../tests/data/lorem.lzma2");
const LOREM_LEN: usize = 24000;
const MIXED: &[u8] = include_bytes!("../tests/data/mixed.lzma2");
const MIXED_LEN: usize = 96000;
const RANDOM: &[u8] = include_bytes!("../tests/data/random.lzma2");
const RANDOM_LEN: usize = 40000;

fn bench_fixtures(c: &mut Criterion) {
    let mut group = c.benchmark_group("lzma2_decode");

    for (name, data, len, props) in [
        ("lorem", LOREM, LOREM_LEN, 8u8),
        ("mixed", MIXED, MIXED_LEN, 10),
        ("random", RANDOM, RANDOM_LEN, 0),
    ] {
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| black_box(decode_lzma2(black_box(data), props).expect("decode")));
        });
    }

    group.finish();
}

fn bench_output_windows(c: &mut Criterion) {
    let mut group = c.benchmark_group("lzma2_output_windows");
    group.throughput(Throughput::Bytes(MIXED_LEN as u64));

    for window in [64usize, 1024, 16384] {
        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, &window| {
            let mut decoder = Lzma2Decoder::new(Growable::new(1 << 20));
            let mut out = vec![0u8; window];
            b.iter(|| {
                decoder.reset(10).expect("reset");
                let mut pos = 0;
                let mut total = 0;
                while !decoder.is_finished() {
                    let (consumed, produced, _) =
                        decoder.decompress(&MIXED[pos..], &mut out).expect("decode");
                    pos += consumed;
                    total += produced;
                }
                black_box(total);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fixtures, bench_output_windows);
criterion_main!(benches);
