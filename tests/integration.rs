//! End-to-end tests exercising the public API the way a caller would: raw
//! sample arrays in, a compressed bitstream, samples back out. Per-module
//! unit tests already cover internal invariants; these focus on properties
//! that only show up once the whole pipeline (conditioner, wavelet
//! transform, quantizer, SPECK, chunked driver) is wired together.

use sperr::dims::Dims;
use sperr::driver::ChunkedVolume;
use sperr::mode::CompMode;
use sperr::speck_flt::SpeckFlt;

fn ramp(n: usize) -> Vec<f64> {
    (0..n).map(|i| (i as f64 * 0.073).sin() * 37.0 + (i as f64 * 0.003)).collect()
}

/// Concrete scenario 1: a constant 12x13 field compresses to exactly the
/// 17-byte conditioner header, and decodes back to the exact input.
#[test]
fn constant_2d_field_short_circuits_to_header_only() {
    let dims = Dims::new(12, 13, 1);
    let data = vec![4.332f64; dims.len()];

    let bytes = SpeckFlt::new().compress(data.clone(), dims, CompMode::Pwe(0.012)).unwrap();
    assert_eq!(bytes.len(), 17);

    let decoded = SpeckFlt::new().decompress(&bytes, dims, false).unwrap();
    assert_eq!(decoded, data);
}

/// Raising the PSNR target should never decrease the number of bits spent.
#[test]
fn monotone_psnr_never_decreases_bits() {
    let dims = Dims::new(32, 32, 1);
    let data = ramp(dims.len());

    let lo = SpeckFlt::new().compress(data.clone(), dims, CompMode::Psnr(30.0)).unwrap();
    let hi = SpeckFlt::new().compress(data, dims, CompMode::Psnr(60.0)).unwrap();
    assert!(hi.len() >= lo.len(), "higher PSNR target produced fewer bytes: {} < {}", hi.len(), lo.len());
}

/// Raising the PWE tolerance should never increase the number of bits spent.
#[test]
fn monotone_pwe_never_increases_bits() {
    let dims = Dims::new(32, 32, 1);
    let data = ramp(dims.len());

    let tight = SpeckFlt::new().compress(data.clone(), dims, CompMode::Pwe(0.01)).unwrap();
    let loose = SpeckFlt::new().compress(data, dims, CompMode::Pwe(1.0)).unwrap();
    assert!(loose.len() <= tight.len(), "looser tolerance produced more bytes: {} > {}", loose.len(), tight.len());
}

/// A full chunked 3D round trip through the public driver API, including
/// the multi-resolution hierarchy exposed alongside the full-resolution
/// reconstruction.
#[test]
fn chunked_3d_psnr_round_trip_with_hierarchy() {
    let vol_dims = Dims::new(32, 32, 32);
    let chunk_dims = Dims::new(16, 16, 16);
    let data = ramp(vol_dims.len());

    let bytes =
        ChunkedVolume::compress(&data, vol_dims, chunk_dims, true, CompMode::Psnr(45.0), 2).unwrap();
    let decoded = ChunkedVolume::decode_multi_res(&bytes, 2).unwrap();

    assert_eq!(decoded.dims, vol_dims);
    let mse: f64 =
        data.iter().zip(decoded.data()).map(|(a, b)| (a - b).powi(2)).sum::<f64>() / data.len() as f64;
    assert!(mse.sqrt() < 5.0, "reconstruction too far off: rmse={}", mse.sqrt());

    // Every hierarchy level should be present with the coarsened length.
    let mut level = 0;
    while let Some(low) = decoded.decode_low_res(level) {
        assert!(!low.is_empty());
        level += 1;
    }
    assert!(level > 0, "expected at least one coarsened hierarchy level");
}

/// Progressive access (§6.4): a truncated container sets `is_portion` and
/// still decodes to something finite, even though it's degraded.
#[test]
fn progressive_truncate_round_trip() {
    let vol_dims = Dims::new(24, 24, 24);
    let chunk_dims = Dims::new(8, 8, 8);
    let data = ramp(vol_dims.len());

    let full =
        ChunkedVolume::compress(&data, vol_dims, chunk_dims, true, CompMode::Rate(4.0), 2).unwrap();
    let truncated = ChunkedVolume::progressive_truncate(&full, 25).unwrap();
    assert!(truncated.len() < full.len());

    let decoded = ChunkedVolume::decode(&truncated, 2).unwrap();
    assert!(decoded.data().iter().all(|v| v.is_finite()));
}

/// A 2D slice round trip under a fixed-rate (bits-per-pixel) budget: the
/// produced bitstream must not exceed the requested budget by more than a
/// small header/rounding allowance.
#[test]
fn fixed_rate_2d_respects_budget() {
    let dims = Dims::new(40, 30, 1);
    let data = ramp(dims.len());
    let bpp = 1.5;

    let bytes = SpeckFlt::new().compress(data, dims, CompMode::Rate(bpp)).unwrap();
    let budget_bytes = (bpp * dims.len() as f64 / 8.0).ceil() as usize;
    assert!(bytes.len() <= budget_bytes + 64, "exceeded fixed-rate budget: {} > {}", bytes.len(), budget_bytes);
}
