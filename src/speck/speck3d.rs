//! 3D SPECK: octree set partitioning over a volume (§4.E).
//!
//! Subsets are visited in a fixed Morton-like sequence: the low-Z quadrants
//! before the high-Z quadrants, each in (low-Y,low-X), (low-Y,high-X),
//! (high-Y,low-X), (high-Y,high-X) order.
//!
//! Unlike 2D, 3D has no residual complement set: the root is seeded by
//! iteratively partitioning the whole volume down to the wavelet transform's
//! own approximation subband, one octree layer (or, past the point where one
//! axis group runs out of levels, one XY or Z-only layer) at a time, each
//! time keeping the low corner as the new `big` set and pushing the other
//! subsets straight into the LIS. Dyadic volumes ([`crate::dims::can_use_dyadic`])
//! apply the same level count to every axis; wavelet-packet volumes apply
//! `num_of_xforms` levels to XY and Z independently, so root-seeding falls
//! back to XY-only or Z-only splits for whichever axis group has levels left
//! over once the other runs out.

use crate::bitmask::Bitmask;
use crate::dims::{can_use_dyadic, num_of_partitions, num_of_xforms, Dims};
use crate::speck::bitplane::{Core, EncodeMode};
use crate::speck::sets::Set3D;
use crate::speck::uint::Uint;

#[derive(Clone, Copy, PartialEq, Eq)]
enum SigType {
    Dunno,
    Sig,
    Insig,
}

pub struct Speck3D<T: Uint> {
    core: Core<T>,
    lis: Vec<Vec<Set3D>>,
}

impl<T: Uint> Default for Speck3D<T> {
    fn default() -> Self {
        Speck3D { core: Core::default(), lis: Vec::new() }
    }
}

impl<T: Uint> Speck3D<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, coeffs: Vec<T>, signs: Bitmask, dims: Dims, mode: EncodeMode) -> Vec<u8> {
        if self.core.begin_encode(coeffs, signs, dims, mode) {
            self.initialize_lists();
            for _ in 0..self.core.num_bitplanes {
                self.sorting_pass_encode();
                if self.core.over_budget() {
                    break;
                }
                self.core.refinement_pass_encode();
                if self.core.over_budget() {
                    break;
                }
                self.core.threshold = self.core.threshold.half();
                self.clean_lis();
            }
        }
        self.core.finish_encode();
        let mut out = Vec::with_capacity(self.core.encoded_bitstream_len());
        self.core.append_encoded_bitstream(&mut out);
        out
    }

    pub fn decode(&mut self, bytes: &[u8], dims: Dims) -> (Vec<T>, Bitmask) {
        if self.core.begin_decode(bytes, dims) {
            self.initialize_lists();
            for _ in 0..self.core.num_bitplanes {
                self.sorting_pass_decode();
                if self.core.read_exhausted() {
                    break;
                }
                self.core.refinement_pass_decode();
                if self.core.read_exhausted() {
                    break;
                }
                self.core.threshold = self.core.threshold.half();
                self.clean_lis();
            }
        }
        (std::mem::take(&mut self.core.coeff_buf), std::mem::take(&mut self.core.sign_array))
    }

    fn index_of(&self, set: Set3D) -> usize {
        let dims = self.core.dims;
        set.start_z * dims.x * dims.y + set.start_y * dims.x + set.start_x
    }

    fn initialize_lists(&mut self) {
        let dims = self.core.dims;
        let max_dim = dims.x.max(dims.y).max(dims.z);
        let num_of_lists = num_of_partitions(max_dim) as usize + 2;
        if self.lis.len() < num_of_lists {
            self.lis.resize(num_of_lists, Vec::new());
        }
        for list in self.lis.iter_mut() {
            list.clear();
        }

        let (mut xy_remaining, mut z_remaining) = match can_use_dyadic(dims) {
            Some(k) => (k, k),
            None => (num_of_xforms(dims.x.min(dims.y)), num_of_xforms(dims.z)),
        };

        let mut big = Set3D {
            start_x: 0,
            start_y: 0,
            start_z: 0,
            length_x: dims.x,
            length_y: dims.y,
            length_z: dims.z,
            level: 0,
            ..Default::default()
        };

        while xy_remaining > 0 && z_remaining > 0 {
            let subsets = Self::partition_s_xyz(big);
            big = self.seed_from_subsets(subsets);
            xy_remaining -= 1;
            z_remaining -= 1;
        }
        while xy_remaining > 0 {
            let subsets = Self::partition_s_xy(big);
            big = self.seed_from_subsets(subsets);
            xy_remaining -= 1;
        }
        while z_remaining > 0 {
            let subsets = Self::partition_s_z(big);
            big = self.seed_from_subsets(subsets);
            z_remaining -= 1;
        }

        if !big.is_empty_set() {
            if big.num_elem() == 1 {
                self.core.lip_mask.wtrue(self.index_of(big));
            } else {
                self.lis[big.level].push(big);
            }
        }
    }

    /// Pushes every subset but the first (the new, shrunk `big`) into the
    /// LIP or LIS, and hands the first one back to the caller.
    fn seed_from_subsets<const N: usize>(&mut self, subsets: [Set3D; N]) -> Set3D {
        let mut iter = subsets.into_iter();
        let big = iter.next().expect("partition always yields at least one subset");
        for s in iter {
            if s.is_empty_set() {
                continue;
            }
            if s.num_elem() == 1 {
                self.core.lip_mask.wtrue(self.index_of(s));
            } else {
                self.lis[s.level].push(s);
            }
        }
        big
    }

    /// Splits `set` into its 8 octants, low-Z before high-Z and within each
    /// Z-slab (low-Y,low-X), (low-Y,high-X), (high-Y,low-X), (high-Y,high-X).
    /// An axis already down to length 1 just gets copied into both halves
    /// rather than splitting further; `level` still advances by one per
    /// recursion step so LIS indices stay bounded by the deepest axis.
    fn partition_s_xyz(set: Set3D) -> [Set3D; 8] {
        let lx0 = set.length_x - set.length_x / 2;
        let lx1 = set.length_x / 2;
        let ly0 = set.length_y - set.length_y / 2;
        let ly1 = set.length_y / 2;
        let lz0 = set.length_z - set.length_z / 2;
        let lz1 = set.length_z / 2;
        let level = set.level + 1;

        let mut out = [Set3D::default(); 8];
        let mut i = 0;
        for dz in 0..2u8 {
            let (sz, lz) = if dz == 0 { (set.start_z, lz0) } else { (set.start_z + lz0, lz1) };
            for dy in 0..2u8 {
                let (sy, ly) = if dy == 0 { (set.start_y, ly0) } else { (set.start_y + ly0, ly1) };
                for dx in 0..2u8 {
                    let (sx, lx) = if dx == 0 { (set.start_x, lx0) } else { (set.start_x + lx0, lx1) };
                    out[i] = Set3D {
                        start_x: sx,
                        start_y: sy,
                        start_z: sz,
                        length_x: lx,
                        length_y: ly,
                        length_z: lz,
                        level,
                        ..Default::default()
                    };
                    i += 1;
                }
            }
        }
        out
    }

    /// Root-seeding only: splits `set` into 4 quadrants over X/Y, leaving Z
    /// untouched. Used once the Z axis has run out of transform levels but
    /// XY still has some left (wavelet-packet volumes).
    fn partition_s_xy(set: Set3D) -> [Set3D; 4] {
        let lx0 = set.length_x - set.length_x / 2;
        let lx1 = set.length_x / 2;
        let ly0 = set.length_y - set.length_y / 2;
        let ly1 = set.length_y / 2;
        let level = set.level + 1;

        let mut out = [Set3D::default(); 4];
        let mut i = 0;
        for dy in 0..2u8 {
            let (sy, ly) = if dy == 0 { (set.start_y, ly0) } else { (set.start_y + ly0, ly1) };
            for dx in 0..2u8 {
                let (sx, lx) = if dx == 0 { (set.start_x, lx0) } else { (set.start_x + lx0, lx1) };
                out[i] = Set3D {
                    start_x: sx,
                    start_y: sy,
                    start_z: set.start_z,
                    length_x: lx,
                    length_y: ly,
                    length_z: set.length_z,
                    level,
                    ..Default::default()
                };
                i += 1;
            }
        }
        out
    }

    /// Root-seeding only: splits `set` into low-Z/high-Z halves, leaving X/Y
    /// untouched. Used once XY has run out of transform levels but Z still
    /// has some left.
    fn partition_s_z(set: Set3D) -> [Set3D; 2] {
        let lz0 = set.length_z - set.length_z / 2;
        let lz1 = set.length_z / 2;
        let level = set.level + 1;

        [
            Set3D {
                start_x: set.start_x,
                start_y: set.start_y,
                start_z: set.start_z,
                length_x: set.length_x,
                length_y: set.length_y,
                length_z: lz0,
                level,
                ..Default::default()
            },
            Set3D {
                start_x: set.start_x,
                start_y: set.start_y,
                start_z: set.start_z + lz0,
                length_x: set.length_x,
                length_y: set.length_y,
                length_z: lz1,
                level,
                ..Default::default()
            },
        ]
    }

    fn clean_lis(&mut self) {
        for list in self.lis.iter_mut() {
            list.retain(|s| !s.is_empty_set());
        }
    }

    // ---- encode ----

    fn decide_set_significance(&self, set: Set3D) -> bool {
        let thresh = self.core.threshold;
        let dims = self.core.dims;
        for z in set.start_z..set.start_z + set.length_z {
            for y in set.start_y..set.start_y + set.length_y {
                let row = z * dims.x * dims.y + y * dims.x;
                for x in set.start_x..set.start_x + set.length_x {
                    if self.core.coeff_buf[row + x] >= thresh {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn sorting_pass_encode(&mut self) {
        let lip: Vec<usize> = (0..self.core.lip_mask.size()).filter(|&i| self.core.lip_mask.rbit(i)).collect();
        for idx in lip {
            let mut dummy = 0usize;
            self.process_p_encode(idx, SigType::Dunno, &mut dummy, true);
        }
        for idx1 in (0..self.lis.len()).rev() {
            let mut idx2 = 0;
            while idx2 < self.lis[idx1].len() {
                let mut dummy = 0usize;
                self.process_s_encode(idx1, idx2, SigType::Dunno, &mut dummy, true);
                idx2 += 1;
            }
        }
    }

    fn process_s_encode(&mut self, idx1: usize, idx2: usize, sig: SigType, counter: &mut usize, output: bool) {
        let set = self.lis[idx1][idx2];
        let resolved = match sig {
            SigType::Dunno => {
                if self.decide_set_significance(set) {
                    SigType::Sig
                } else {
                    SigType::Insig
                }
            }
            other => other,
        };

        if output {
            self.core.bit_buffer.wbit(resolved == SigType::Sig);
        }

        if resolved == SigType::Sig {
            *counter += 1;
            self.code_s_encode(idx1, idx2);
            self.lis[idx1][idx2].make_empty();
        }
    }

    fn process_p_encode(&mut self, idx: usize, sig: SigType, counter: &mut usize, output: bool) {
        let is_sig = match sig {
            SigType::Dunno => self.core.coeff_buf[idx] >= self.core.threshold,
            SigType::Sig => true,
            SigType::Insig => false,
        };
        if output {
            self.core.bit_buffer.wbit(is_sig);
        }
        if is_sig {
            *counter += 1;
            self.core.bit_buffer.wbit(self.core.sign_array.rbit(idx));
            self.core.coeff_buf[idx] = self.core.coeff_buf[idx].wrapping_sub(self.core.threshold);
            self.core.lsp_new.push(idx);
            self.core.lip_mask.wfalse(idx);
        }
    }

    fn code_s_encode(&mut self, idx1: usize, idx2: usize) {
        let set = self.lis[idx1][idx2];
        let subsets = Self::partition_s_xyz(set);
        let last = subsets.len() - 1;
        let mut sig_counter = 0usize;

        for (i, s) in subsets.into_iter().enumerate() {
            if s.is_empty_set() {
                continue;
            }
            let (sig, output) = if i == last && sig_counter == 0 {
                (SigType::Sig, false)
            } else {
                (SigType::Dunno, true)
            };

            if s.num_elem() == 1 {
                let idx = self.index_of(s);
                self.core.lip_mask.wtrue(idx);
                self.process_p_encode(idx, sig, &mut sig_counter, output);
            } else {
                let newidx1 = s.level;
                self.lis[newidx1].push(s);
                let newidx2 = self.lis[newidx1].len() - 1;
                self.process_s_encode(newidx1, newidx2, sig, &mut sig_counter, output);
            }
        }
    }

    // ---- decode ----

    fn sorting_pass_decode(&mut self) {
        let lip: Vec<usize> = (0..self.core.lip_mask.size()).filter(|&i| self.core.lip_mask.rbit(i)).collect();
        for idx in lip {
            let mut dummy = 0usize;
            self.process_p_decode(idx, &mut dummy, true);
        }
        for idx1 in (0..self.lis.len()).rev() {
            let mut idx2 = 0;
            while idx2 < self.lis[idx1].len() {
                let mut dummy = 0usize;
                self.process_s_decode(idx1, idx2, &mut dummy, true);
                idx2 += 1;
            }
        }
    }

    fn process_s_decode(&mut self, idx1: usize, idx2: usize, counter: &mut usize, read: bool) {
        let is_sig = if read { self.core.bit_buffer.rbit() } else { true };
        if is_sig {
            *counter += 1;
            self.code_s_decode(idx1, idx2);
            self.lis[idx1][idx2].make_empty();
        }
    }

    fn process_p_decode(&mut self, idx: usize, counter: &mut usize, read: bool) {
        let is_sig = if read { self.core.bit_buffer.rbit() } else { true };
        if is_sig {
            *counter += 1;
            self.core.sign_array.wbit(idx, self.core.bit_buffer.rbit());
            self.core.lsp_new.push(idx);
            self.core.lip_mask.wfalse(idx);
        }
    }

    fn code_s_decode(&mut self, idx1: usize, idx2: usize) {
        let set = self.lis[idx1][idx2];
        let subsets = Self::partition_s_xyz(set);
        let last = subsets.len() - 1;
        let mut sig_counter = 0usize;

        for (i, s) in subsets.into_iter().enumerate() {
            if s.is_empty_set() {
                continue;
            }
            let read = !(i == last && sig_counter == 0);

            if s.num_elem() == 1 {
                let idx = self.index_of(s);
                self.core.lip_mask.wtrue(idx);
                self.process_p_decode(idx, &mut sig_counter, read);
            } else {
                let newidx1 = s.level;
                self.lis[newidx1].push(s);
                let newidx2 = self.lis[newidx1].len() - 1;
                self.process_s_decode(newidx1, newidx2, &mut sig_counter, read);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coeffs_and_signs(n: usize) -> (Vec<u32>, Bitmask) {
        let coeffs: Vec<u32> = (0..n).map(|i| ((i * 29 + 3) % 2048) as u32).collect();
        let mut signs = Bitmask::new(n);
        for i in 0..n {
            signs.wbit(i, i % 7 == 0);
        }
        (coeffs, signs)
    }

    #[test]
    fn round_trip_dyadic_cube() {
        let dims = Dims::new(8, 8, 8);
        let (coeffs, signs) = coeffs_and_signs(dims.len());
        let mut enc = Speck3D::<u32>::new();
        let bytes = enc.encode(coeffs.clone(), signs, dims, EncodeMode::Unbounded);

        let mut dec = Speck3D::<u32>::new();
        let (out_coeffs, _) = dec.decode(&bytes, dims);
        assert_eq!(out_coeffs, coeffs);
    }

    #[test]
    fn round_trip_elongated_wavelet_packet_shape() {
        let dims = Dims::new(10, 10, 40);
        let (coeffs, signs) = coeffs_and_signs(dims.len());
        let mut enc = Speck3D::<u32>::new();
        let bytes = enc.encode(coeffs.clone(), signs, dims, EncodeMode::Unbounded);

        let mut dec = Speck3D::<u32>::new();
        let (out_coeffs, _) = dec.decode(&bytes, dims);
        assert_eq!(out_coeffs, coeffs);
    }

    #[test]
    fn all_zero_round_trip() {
        let dims = Dims::new(6, 6, 6);
        let coeffs = vec![0u32; dims.len()];
        let signs = Bitmask::new(dims.len());
        let mut enc = Speck3D::<u32>::new();
        let bytes = enc.encode(coeffs.clone(), signs, dims, EncodeMode::Unbounded);

        let mut dec = Speck3D::<u32>::new();
        let (out_coeffs, _) = dec.decode(&bytes, dims);
        assert_eq!(out_coeffs, coeffs);
    }
}
