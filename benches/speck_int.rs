//! Criterion benchmarks for the SPECK-INT bitplane coder (§4.E).
//!
//! Run with:
//!   cargo bench --bench speck_int

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use sperr::bitmask::Bitmask;
use sperr::dims::Dims;
use sperr::speck::{EncodeMode, Speck1D, Speck2D, Speck3D};

fn synthetic_coeffs(n: usize) -> (Vec<u32>, Bitmask) {
    let mut signs = Bitmask::new(n);
    let coeffs: Vec<u32> = (0..n)
        .map(|i| {
            signs.wbit(i, i % 3 != 0);
            // A decaying-magnitude profile, roughly what a wavelet transform
            // produces: a few large low-frequency coefficients, a long tail
            // of small high-frequency ones.
            let decay = 1.0 / (1.0 + (i % 97) as f64 * 0.2);
            ((decay * 6000.0) as u32).max(1)
        })
        .collect();
    (coeffs, signs)
}

fn bench_speck1d(c: &mut Criterion) {
    let mut group = c.benchmark_group("speck1d_encode_decode");
    for &n in &[4096usize, 65536] {
        let (coeffs, signs) = synthetic_coeffs(n);
        let dims = Dims::new(n, 1, 1);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("encode", n), &(coeffs.clone(), signs.clone()), |b, (c, s)| {
            b.iter(|| Speck1D::<u32>::new().encode(c.clone(), s.clone(), dims, EncodeMode::Unbounded))
        });

        let encoded = Speck1D::<u32>::new().encode(coeffs, signs, dims, EncodeMode::Unbounded);
        group.bench_with_input(BenchmarkId::new("decode", n), &encoded, |b, bytes| {
            b.iter(|| Speck1D::<u32>::new().decode(bytes, dims))
        });
    }
    group.finish();
}

fn bench_speck2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("speck2d_encode_decode");
    for &side in &[64usize, 256] {
        let n = side * side;
        let (coeffs, signs) = synthetic_coeffs(n);
        let dims = Dims::new(side, side, 1);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("encode", side), &(coeffs.clone(), signs.clone()), |b, (c, s)| {
            b.iter(|| Speck2D::<u32>::new().encode(c.clone(), s.clone(), dims, EncodeMode::Unbounded))
        });

        let encoded = Speck2D::<u32>::new().encode(coeffs, signs, dims, EncodeMode::Unbounded);
        group.bench_with_input(BenchmarkId::new("decode", side), &encoded, |b, bytes| {
            b.iter(|| Speck2D::<u32>::new().decode(bytes, dims))
        });
    }
    group.finish();
}

fn bench_speck3d(c: &mut Criterion) {
    let mut group = c.benchmark_group("speck3d_encode_decode");
    for &side in &[16usize, 32] {
        let n = side * side * side;
        let (coeffs, signs) = synthetic_coeffs(n);
        let dims = Dims::new(side, side, side);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("encode", side), &(coeffs.clone(), signs.clone()), |b, (c, s)| {
            b.iter(|| Speck3D::<u32>::new().encode(c.clone(), s.clone(), dims, EncodeMode::Unbounded))
        });

        let encoded = Speck3D::<u32>::new().encode(coeffs, signs, dims, EncodeMode::Unbounded);
        group.bench_with_input(BenchmarkId::new("decode", side), &encoded, |b, bytes| {
            b.iter(|| Speck3D::<u32>::new().decode(bytes, dims))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_speck1d, bench_speck2d, bench_speck3d);
criterion_main!(benches);
