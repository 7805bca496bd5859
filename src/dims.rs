//! Shared dimension arithmetic used by the wavelet transform, the SPECK
//! codecs' set initialization, and the chunked driver.
//!
//! `Dims` follows §3's convention: `z == 1` denotes a 2D slice, and
//! `y == z == 1` denotes 1D. `x` is always the fastest-varying axis.

use crate::config::{MAX_XFORM_LEVELS, MIN_XFORM_LEN};

/// Extents of a dense array, fastest-varying axis first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dims {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Dims {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Dims { x, y, z }
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.x * self.y * self.z
    }

    pub fn is_3d(&self) -> bool {
        self.z > 1
    }

    pub fn is_2d(&self) -> bool {
        self.z == 1 && self.y > 1
    }

    pub fn is_1d(&self) -> bool {
        self.y == 1 && self.z == 1
    }
}

/// Number of wavelet transform levels a dimension of length `len` supports:
/// keep halving (`len -= len/2`) as long as the *current* length is still
/// `>= MIN_XFORM_LEN`, capped at [`MAX_XFORM_LEVELS`].
pub fn num_of_xforms(mut len: usize) -> u32 {
    let mut k = 0u32;
    while len >= MIN_XFORM_LEN {
        k += 1;
        len -= len / 2;
    }
    k.min(MAX_XFORM_LEVELS)
}

/// Splits a length-`total_len` axis into the approximation (low-pass)
/// length after `level` recursive halvings, and the detail length removed
/// by the *last* of those halvings (not the cumulative detail across all
/// levels — this is exactly the pair needed to undo one more level, since
/// `low + high` equals the approximation length at `level - 1`).
pub fn calc_approx_detail_len(total_len: usize, level: u32) -> (usize, usize) {
    let mut low = total_len;
    let mut high = 0;
    for _ in 0..level {
        high = low / 2;
        low -= high;
    }
    (low, high)
}

/// Number of times a length-`len` axis can be repeatedly halved
/// (`len -= len/2`) before reaching 1. Used to size the SPECK codecs' LIS
/// (one list per partition level), which is deeper than the number of
/// wavelet transform levels.
pub fn num_of_partitions(mut len: usize) -> u32 {
    let mut num = 0u32;
    while len > 1 {
        num += 1;
        len -= len / 2;
    }
    num
}

/// Whether a 3D volume can use the dyadic (uniform octant) wavelet
/// transform, and if so how many levels.
///
/// Dyadic is usable when the XY plane and the Z axis support the same
/// number of transform levels, or when both independently support at
/// least 5 levels (in which case the smaller of the two counts is used,
/// so every axis is transformed the same number of times).
pub fn can_use_dyadic(dims: Dims) -> Option<u32> {
    if dims.z < 2 || dims.y < 2 {
        return None;
    }
    let k_xy = num_of_xforms(dims.x.min(dims.y));
    let k_z = num_of_xforms(dims.z);
    if k_xy == k_z {
        Some(k_xy)
    } else if k_xy >= 5 && k_z >= 5 {
        Some(k_xy.min(k_z))
    } else {
        None
    }
}

/// The set of coarsened (approximation-only) resolutions exposed by a
/// multi-resolution inverse transform of a 2D array, ordered from the
/// coarsest (`lev == k`) down to the second-finest (`lev == 1`).
pub fn coarsened_resolutions_2d(dims: Dims) -> Vec<Dims> {
    let k = num_of_xforms(dims.x.min(dims.y));
    (1..=k)
        .rev()
        .map(|lev| {
            let (lx, _) = calc_approx_detail_len(dims.x, lev);
            let (ly, _) = calc_approx_detail_len(dims.y, lev);
            Dims::new(lx, ly, 1)
        })
        .collect()
}

/// The set of coarsened resolutions for a 3D volume; empty when the
/// volume cannot use the dyadic transform (wavelet-packet volumes have
/// no single uniform low-pass hierarchy to expose).
pub fn coarsened_resolutions_3d(dims: Dims) -> Vec<Dims> {
    let Some(k) = can_use_dyadic(dims) else {
        return Vec::new();
    };
    (1..=k)
        .rev()
        .map(|lev| {
            let (lx, _) = calc_approx_detail_len(dims.x, lev);
            let (ly, _) = calc_approx_detail_len(dims.y, lev);
            let (lz, _) = calc_approx_detail_len(dims.z, lev);
            Dims::new(lx, ly, lz)
        })
        .collect()
}

/// A single axis-aligned chunk of a volume: start offset and length along
/// each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDesc {
    pub start_x: usize,
    pub len_x: usize,
    pub start_y: usize,
    pub len_y: usize,
    pub start_z: usize,
    pub len_z: usize,
}

impl ChunkDesc {
    pub fn dims(&self) -> Dims {
        Dims::new(self.len_x, self.len_y, self.len_z)
    }
}

/// Splits a single axis of length `vdim` into segments of (nominal) length
/// `cdim`, growing the segment count by one when the trailing remainder
/// exceeds half a chunk (rather than folding a too-large remainder into
/// the last segment) so no tiny trailing segment is produced.
fn axis_segments(vdim: usize, cdim: usize) -> Vec<(usize, usize)> {
    assert!(cdim > 0, "chunk dimension must be non-zero");
    let mut n_chunks = vdim / cdim;
    let rem = vdim % cdim;
    if rem > 0 && rem > cdim / 2 {
        n_chunks += 1;
    }
    if n_chunks == 0 {
        n_chunks = 1;
    }
    let mut segs = Vec::with_capacity(n_chunks);
    let mut start = 0usize;
    for i in 0..n_chunks {
        let len = if i + 1 == n_chunks { vdim - start } else { cdim };
        segs.push((start, len));
        start += len;
    }
    segs
}

/// Partitions a volume of dims `vdim` into chunks of nominal size `cdim`,
/// enumerated in Z-major, then Y, then X order (matching the container's
/// chunk-index ordering in §4.H).
pub fn chunk_volume(vdim: Dims, cdim: Dims) -> Vec<ChunkDesc> {
    let xs = axis_segments(vdim.x, cdim.x);
    let ys = axis_segments(vdim.y, cdim.y);
    let zs = axis_segments(vdim.z, cdim.z);

    let mut out = Vec::with_capacity(xs.len() * ys.len() * zs.len());
    for &(start_z, len_z) in &zs {
        for &(start_y, len_y) in &ys {
            for &(start_x, len_x) in &xs {
                out.push(ChunkDesc {
                    start_x,
                    len_x,
                    start_y,
                    len_y,
                    start_z,
                    len_z,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_of_xforms_caps_at_six() {
        assert_eq!(num_of_xforms(1 << 20), MAX_XFORM_LEVELS);
    }

    #[test]
    fn num_of_xforms_small_len() {
        assert_eq!(num_of_xforms(9), 1);
        assert_eq!(num_of_xforms(18), 2);
        assert_eq!(num_of_xforms(17), 2);
        assert_eq!(num_of_xforms(8), 0);
    }

    #[test]
    fn calc_approx_detail_len_one_level_even() {
        let (low, high) = calc_approx_detail_len(128, 1);
        assert_eq!(low, 64);
        assert_eq!(high, 64);
    }

    #[test]
    fn calc_approx_detail_len_one_level_odd() {
        let (low, high) = calc_approx_detail_len(13, 1);
        assert_eq!(low, 7);
        assert_eq!(high, 6);
    }

    #[test]
    fn calc_approx_detail_len_multi_level() {
        // Each level's `high` is just that level's detail length, not a
        // cumulative total; `low + high` equals the approx length at
        // `level - 1`, the size needed to undo exactly one level.
        let (low, high) = calc_approx_detail_len(128, 3);
        assert_eq!(low, 16);
        assert_eq!(high, 16);
        let (low_prev, _) = calc_approx_detail_len(128, 2);
        assert_eq!(low + high, low_prev);
    }

    #[test]
    fn can_use_dyadic_matching_levels() {
        let d = Dims::new(128, 128, 128);
        assert_eq!(can_use_dyadic(d), Some(6));
    }

    #[test]
    fn can_use_dyadic_both_ge_five() {
        // x,y support 5 levels, z supports 6 (capped) — unequal but both >= 5.
        let d = Dims::new(256, 256, 300);
        assert_eq!(can_use_dyadic(d), Some(5));
    }

    #[test]
    fn can_use_dyadic_rejects_2d_dims() {
        assert_eq!(can_use_dyadic(Dims::new(128, 128, 1)), None);
    }

    #[test]
    fn num_of_partitions_matches_manual_halving() {
        assert_eq!(num_of_partitions(1), 0);
        assert_eq!(num_of_partitions(2), 1);
        assert_eq!(num_of_partitions(13), 4); // 13->7->4->2->1
    }

    #[test]
    fn chunk_volume_exact_division() {
        let chunks = chunk_volume(Dims::new(128, 128, 128), Dims::new(64, 64, 64));
        assert_eq!(chunks.len(), 8);
    }

    #[test]
    fn chunk_volume_avoids_tiny_trailing_chunk() {
        // vdim=70, cdim=64: remainder=6, half of 64 is 32, 6 < 32 -> folded, 1 chunk of len 70
        let segs = axis_segments(70, 64);
        assert_eq!(segs, vec![(0, 70)]);
    }

    #[test]
    fn chunk_volume_grows_extra_chunk() {
        // vdim=100, cdim=64: remainder=36 > 32 -> grow to 2 chunks
        let segs = axis_segments(100, 64);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0], (0, 64));
        assert_eq!(segs[1], (64, 36));
    }
}
