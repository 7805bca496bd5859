//! 2D SPECK: quadtree set partitioning over a single plane (§4.E).
//!
//! The root set is seeded at the approximation subband `num_of_xforms`
//! levels deep, not at the whole plane: everything outside that subband is
//! tracked as a single residual set `m_i`, an L-shaped region wrapped
//! around the top-left corner still being refined. `m_i` is walked once
//! per sorting pass, after LIS, and peeled one subband layer at a time —
//! three explicit rectangles (bottom, top-right, and — via the shrinking
//! `m_i` itself — everything still further in) per peel, matching the
//! wavelet transform's own subband boundaries one level at a time rather
//! than partitioning the untransformed low-pass remainder along with
//! everything else.
//!
//! Ordinary `Set2D`s still split bottom-right, bottom-left, top-right,
//! top-left, the order `m_i`'s own rectangles reuse for consistency.

use crate::bitmask::Bitmask;
use crate::dims::{calc_approx_detail_len, num_of_partitions, num_of_xforms, Dims};
use crate::speck::bitplane::{Core, EncodeMode};
use crate::speck::sets::Set2D;
use crate::speck::uint::Uint;

#[derive(Clone, Copy, PartialEq, Eq)]
enum SigType {
    Dunno,
    Sig,
    Insig,
}

pub struct Speck2D<T: Uint> {
    core: Core<T>,
    lis: Vec<Vec<Set2D>>,
    /// The residual complement of the root subband; see the module doc.
    m_i: Set2D,
}

impl<T: Uint> Default for Speck2D<T> {
    fn default() -> Self {
        Speck2D { core: Core::default(), lis: Vec::new(), m_i: Set2D::default() }
    }
}

impl<T: Uint> Speck2D<T> {
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

    fn index_of(&self, set: Set2D) -> usize {
        set.start_y * self.core.dims.x + set.start_x
    }

    fn initialize_lists(&mut self) {
        let dims = self.core.dims;
        let num_of_lists = num_of_partitions(dims.x.max(dims.y)) as usize + 2;
        if self.lis.len() < num_of_lists {
            self.lis.resize(num_of_lists, Vec::new());
        }
        for list in self.lis.iter_mut() {
            list.clear();
        }

        let xforms = num_of_xforms(dims.x.min(dims.y)) as usize;
        let (approx_x, _) = calc_approx_detail_len(dims.x, xforms as u32);
        let (approx_y, _) = calc_approx_detail_len(dims.y, xforms as u32);

        let root = Set2D { start_x: 0, start_y: 0, length_x: approx_x, length_y: approx_y, part_level: xforms };
        self.lis[xforms].push(root);

        self.m_i = Set2D { start_x: approx_x, start_y: approx_y, length_x: dims.x, length_y: dims.y, part_level: xforms };
    }

    /// Splits `set` into (bottom-right, bottom-left, top-right, top-left)
    /// quadrants, in that visiting order.
    fn partition_set(set: Set2D) -> [Set2D; 4] {
        let lx0 = set.length_x - set.length_x / 2;
        let lx1 = set.length_x / 2;
        let ly0 = set.length_y - set.length_y / 2;
        let ly1 = set.length_y / 2;
        let level = set.part_level + 1;
        let tl = Set2D { start_x: set.start_x, start_y: set.start_y, length_x: lx0, length_y: ly0, part_level: level };
        let tr = Set2D { start_x: set.start_x + lx0, start_y: set.start_y, length_x: lx1, length_y: ly0, part_level: level };
        let bl = Set2D { start_x: set.start_x, start_y: set.start_y + ly0, length_x: lx0, length_y: ly1, part_level: level };
        let br = Set2D { start_x: set.start_x + lx0, start_y: set.start_y + ly0, length_x: lx1, length_y: ly1, part_level: level };
        [br, bl, tr, tl]
    }

    fn clean_lis(&mut self) {
        for list in self.lis.iter_mut() {
            list.retain(|s| !s.is_empty_set());
        }
    }

    /// Peels one subband layer off `m_i`, returning the three rectangles
    /// (bottom-right, top-right, bottom-left) vacated by the peel and
    /// shrinking `m_i` itself toward the corner to represent what remains.
    fn partition_i(&mut self) -> [Set2D; 3] {
        let dims = self.core.dims;
        let level = self.m_i.part_level;
        let (approx_x, detail_x) = calc_approx_detail_len(dims.x, level as u32);
        let (approx_y, detail_y) = calc_approx_detail_len(dims.y, level as u32);
        let old_sx = self.m_i.start_x;
        let old_sy = self.m_i.start_y;
        debug_assert_eq!(approx_x, old_sx);
        debug_assert_eq!(approx_y, old_sy);

        let new_level = level - 1;
        let br = Set2D { start_x: old_sx, start_y: old_sy, length_x: detail_x, length_y: detail_y, part_level: new_level };
        let tr = Set2D { start_x: old_sx, start_y: 0, length_x: detail_x, length_y: old_sy, part_level: new_level };
        let bl = Set2D { start_x: 0, start_y: old_sy, length_x: old_sx, length_y: detail_y, part_level: new_level };

        self.m_i.start_x = old_sx + detail_x;
        self.m_i.start_y = old_sy + detail_y;
        self.m_i.part_level = new_level;

        [br, tr, bl]
    }

    // ---- encode ----

    /// Tests the current residual `m_i` for significance: the bottom band
    /// (all columns, rows `start_y..dims.y`) plus the top band's right part
    /// (rows `0..start_y`, columns `start_x..dims.x`).
    fn decide_i_significance(&self) -> bool {
        if self.m_i.part_level == 0 {
            return false;
        }
        let dims = self.core.dims;
        let thresh = self.core.threshold;
        let stride = dims.x;
        for y in self.m_i.start_y..dims.y {
            let row = y * stride;
            for x in 0..dims.x {
                if self.core.coeff_buf[row + x] >= thresh {
                    return true;
                }
            }
        }
        for y in 0..self.m_i.start_y {
            let row = y * stride;
            for x in self.m_i.start_x..dims.x {
                if self.core.coeff_buf[row + x] >= thresh {
                    return true;
                }
            }
        }
        false
    }

    fn decide_set_significance(&self, set: Set2D) -> bool {
        let thresh = self.core.threshold;
        let stride = self.core.dims.x;
        for y in set.start_y..set.start_y + set.length_y {
            let row = y * stride;
            for x in set.start_x..set.start_x + set.length_x {
                if self.core.coeff_buf[row + x] >= thresh {
                    return true;
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
        self.process_i_encode(true);
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
        let subsets = Self::partition_set(set);
        let mut sig_counter = 0usize;

        for (i, s) in subsets.into_iter().enumerate() {
            if s.is_empty_set() {
                continue;
            }
            let (sig, output) = if i == 3 && sig_counter == 0 {
                (SigType::Sig, false)
            } else {
                (SigType::Dunno, true)
            };

            if s.is_pixel() {
                let idx = self.index_of(s);
                self.core.lip_mask.wtrue(idx);
                self.process_p_encode(idx, sig, &mut sig_counter, output);
            } else {
                let newidx1 = s.part_level;
                self.lis[newidx1].push(s);
                let newidx2 = self.lis[newidx1].len() - 1;
                self.process_s_encode(newidx1, newidx2, sig, &mut sig_counter, output);
            }
        }
    }

    /// Called once per sorting pass (after LIS) with `need_decide = true`;
    /// recurses with `need_decide = false` whenever all three peeled
    /// rectangles came back insignificant, per the usual elision rule.
    fn process_i_encode(&mut self, need_decide: bool) {
        if self.m_i.part_level == 0 {
            return;
        }
        let is_sig = if need_decide {
            let sig = self.decide_i_significance();
            self.core.bit_buffer.wbit(sig);
            sig
        } else {
            true
        };
        if is_sig {
            self.code_i_encode();
        }
    }

    fn code_i_encode(&mut self) {
        let subsets = self.partition_i();
        let mut sig_counter = 0usize;

        for s in subsets {
            if s.is_empty_set() {
                continue;
            }
            if s.is_pixel() {
                let idx = self.index_of(s);
                self.core.lip_mask.wtrue(idx);
                self.process_p_encode(idx, SigType::Dunno, &mut sig_counter, true);
            } else {
                let newidx1 = s.part_level;
                self.lis[newidx1].push(s);
                let newidx2 = self.lis[newidx1].len() - 1;
                self.process_s_encode(newidx1, newidx2, SigType::Dunno, &mut sig_counter, true);
            }
        }

        self.process_i_encode(sig_counter != 0);
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
        self.process_i_decode(true);
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
        let subsets = Self::partition_set(set);
        let mut sig_counter = 0usize;

        for (i, s) in subsets.into_iter().enumerate() {
            if s.is_empty_set() {
                continue;
            }
            let read = !(i == 3 && sig_counter == 0);

            if s.is_pixel() {
                let idx = self.index_of(s);
                self.core.lip_mask.wtrue(idx);
                self.process_p_decode(idx, &mut sig_counter, read);
            } else {
                let newidx1 = s.part_level;
                self.lis[newidx1].push(s);
                let newidx2 = self.lis[newidx1].len() - 1;
                self.process_s_decode(newidx1, newidx2, &mut sig_counter, read);
            }
        }
    }

    fn process_i_decode(&mut self, need_decide: bool) {
        if self.m_i.part_level == 0 {
            return;
        }
        let is_sig = if need_decide { self.core.bit_buffer.rbit() } else { true };
        if is_sig {
            self.code_i_decode();
        }
    }

    fn code_i_decode(&mut self) {
        let subsets = self.partition_i();
        let mut sig_counter = 0usize;

        for s in subsets {
            if s.is_empty_set() {
                continue;
            }
            if s.is_pixel() {
                let idx = self.index_of(s);
                self.core.lip_mask.wtrue(idx);
                self.process_p_decode(idx, &mut sig_counter, true);
            } else {
                let newidx1 = s.part_level;
                self.lis[newidx1].push(s);
                let newidx2 = self.lis[newidx1].len() - 1;
                self.process_s_decode(newidx1, newidx2, &mut sig_counter, true);
            }
        }

        self.process_i_decode(sig_counter != 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coeffs_and_signs(n: usize) -> (Vec<u32>, Bitmask) {
        let coeffs: Vec<u32> = (0..n).map(|i| ((i * 53 + 11) % 4096) as u32).collect();
        let mut signs = Bitmask::new(n);
        for i in 0..n {
            signs.wbit(i, i % 5 == 0);
        }
        (coeffs, signs)
    }

    #[test]
    fn round_trip_square() {
        let dims = Dims::new(16, 16, 1);
        let (coeffs, signs) = coeffs_and_signs(dims.len());
        let mut enc = Speck2D::<u32>::new();
        let bytes = enc.encode(coeffs.clone(), signs, dims, EncodeMode::Unbounded);

        let mut dec = Speck2D::<u32>::new();
        let (out_coeffs, _) = dec.decode(&bytes, dims);
        assert_eq!(out_coeffs, coeffs);
    }

    #[test]
    fn round_trip_non_power_of_two() {
        let dims = Dims::new(23, 17, 1);
        let (coeffs, signs) = coeffs_and_signs(dims.len());
        let mut enc = Speck2D::<u32>::new();
        let bytes = enc.encode(coeffs.clone(), signs, dims, EncodeMode::Unbounded);

        let mut dec = Speck2D::<u32>::new();
        let (out_coeffs, _) = dec.decode(&bytes, dims);
        assert_eq!(out_coeffs, coeffs);
    }

    #[test]
    fn all_zero_round_trip() {
        let dims = Dims::new(12, 12, 1);
        let coeffs = vec![0u32; dims.len()];
        let signs = Bitmask::new(dims.len());
        let mut enc = Speck2D::<u32>::new();
        let bytes = enc.encode(coeffs.clone(), signs, dims, EncodeMode::Unbounded);

        let mut dec = Speck2D::<u32>::new();
        let (out_coeffs, _) = dec.decode(&bytes, dims);
        assert_eq!(out_coeffs, coeffs);
    }
}
