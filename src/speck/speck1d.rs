//! 1D SPECK: bisecting set partitioning over a single array (§4.E).

use crate::bitmask::Bitmask;
use crate::dims::{num_of_partitions, Dims};
use crate::speck::bitplane::{Core, EncodeMode};
use crate::speck::sets::Set1D;
use crate::speck::uint::Uint;

#[derive(Clone, Copy, PartialEq, Eq)]
enum SigType {
    Dunno,
    Sig,
    Insig,
}

/// Bisecting SPECK codec for a 1D coefficient array. One instance is used
/// for either encoding or decoding, never both at once.
pub struct Speck1D<T: Uint> {
    core: Core<T>,
    lis: Vec<Vec<Set1D>>,
}

impl<T: Uint> Default for Speck1D<T> {
    fn default() -> Self {
        Speck1D { core: Core::default(), lis: Vec::new() }
    }
}

impl<T: Uint> Speck1D<T> {
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

    fn initialize_lists(&mut self) {
        let total_len = self.core.dims.x;
        let num_of_lists = num_of_partitions(total_len) as usize + 1;
        if self.lis.len() < num_of_lists {
            self.lis.resize(num_of_lists, Vec::new());
        }
        for list in self.lis.iter_mut() {
            list.clear();
        }

        let subsets = Self::partition_set(Set1D::whole(total_len));
        self.lis[subsets[0].level].push(subsets[0]);
        self.lis[subsets[1].level].push(subsets[1]);
    }

    fn partition_set(set: Set1D) -> [Set1D; 2] {
        let len0 = set.length - set.length / 2;
        let len1 = set.length / 2;
        [
            Set1D { start: set.start, length: len0, level: set.level + 1 },
            Set1D { start: set.start + len0, length: len1, level: set.level + 1 },
        ]
    }

    fn clean_lis(&mut self) {
        for list in self.lis.iter_mut() {
            list.retain(|s| !s.is_empty_set());
        }
    }

    // ---- encode ----

    fn decide_significance(&self, set: Set1D) -> Option<usize> {
        let thresh = self.core.threshold;
        (0..set.length).find(|&i| self.core.coeff_buf[set.start + i] >= thresh)
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
        let mut resolved = sig;
        let mut subset_sigs = [SigType::Dunno, SigType::Dunno];

        if resolved == SigType::Dunno {
            match self.decide_significance(set) {
                Some(first_off) => {
                    resolved = SigType::Sig;
                    if first_off < set.length - set.length / 2 {
                        subset_sigs = [SigType::Sig, SigType::Dunno];
                    } else {
                        subset_sigs = [SigType::Insig, SigType::Sig];
                    }
                }
                None => resolved = SigType::Insig,
            }
        }

        if output {
            self.core.bit_buffer.wbit(resolved == SigType::Sig);
        }

        if resolved == SigType::Sig {
            *counter += 1;
            self.code_s_encode(idx1, idx2, subset_sigs);
            self.lis[idx1][idx2].length = 0;
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

    fn code_s_encode(&mut self, idx1: usize, idx2: usize, mut subset_sigs: [SigType; 2]) {
        let set = self.lis[idx1][idx2];
        let subsets = Self::partition_set(set);
        let mut sig_counter = 0usize;
        let mut output = true;

        let set0 = subsets[0];
        if set0.length == 1 {
            self.core.lip_mask.wtrue(set0.start);
            self.process_p_encode(set0.start, subset_sigs[0], &mut sig_counter, output);
        } else {
            let newidx1 = set0.level;
            self.lis[newidx1].push(set0);
            let newidx2 = self.lis[newidx1].len() - 1;
            self.process_s_encode(newidx1, newidx2, subset_sigs[0], &mut sig_counter, output);
        }

        if sig_counter == 0 {
            output = false;
            subset_sigs[1] = SigType::Sig;
        }
        let set1 = subsets[1];
        if set1.length == 1 {
            self.core.lip_mask.wtrue(set1.start);
            self.process_p_encode(set1.start, subset_sigs[1], &mut sig_counter, output);
        } else {
            let newidx1 = set1.level;
            self.lis[newidx1].push(set1);
            let newidx2 = self.lis[newidx1].len() - 1;
            self.process_s_encode(newidx1, newidx2, subset_sigs[1], &mut sig_counter, output);
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
            self.lis[idx1][idx2].length = 0;
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
        let mut read = true;

        let set0 = subsets[0];
        if set0.length == 1 {
            self.core.lip_mask.wtrue(set0.start);
            self.process_p_decode(set0.start, &mut sig_counter, read);
        } else {
            let newidx1 = set0.level;
            self.lis[newidx1].push(set0);
            let newidx2 = self.lis[newidx1].len() - 1;
            self.process_s_decode(newidx1, newidx2, &mut sig_counter, read);
        }

        if sig_counter == 0 {
            read = false;
        }
        let set1 = subsets[1];
        if set1.length == 1 {
            self.core.lip_mask.wtrue(set1.start);
            self.process_p_decode(set1.start, &mut sig_counter, read);
        } else {
            let newidx1 = set1.level;
            self.lis[newidx1].push(set1);
            let newidx2 = self.lis[newidx1].len() - 1;
            self.process_s_decode(newidx1, newidx2, &mut sig_counter, read);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coeffs_and_signs(n: usize) -> (Vec<u32>, Bitmask) {
        let coeffs: Vec<u32> = (0..n).map(|i| ((i * 37 + 5) % 4096) as u32).collect();
        let mut signs = Bitmask::new(n);
        for (i, _) in coeffs.iter().enumerate() {
            signs.wbit(i, i % 3 == 0);
        }
        (coeffs, signs)
    }

    #[test]
    fn round_trip_unbounded() {
        let (coeffs, signs) = coeffs_and_signs(300);
        let dims = Dims::new(300, 1, 1);
        let mut enc = Speck1D::<u32>::new();
        let bytes = enc.encode(coeffs.clone(), signs.clone(), dims, EncodeMode::Unbounded);

        let mut dec = Speck1D::<u32>::new();
        let (out_coeffs, out_signs) = dec.decode(&bytes, dims);
        assert_eq!(out_coeffs, coeffs);
        for i in 0..300 {
            if out_coeffs[i] != 0 {
                assert_eq!(out_signs.rbit(i), signs.rbit(i));
            }
        }
    }

    #[test]
    fn all_zero_coefficients_round_trip() {
        let coeffs = vec![0u32; 64];
        let signs = Bitmask::new(64);
        let dims = Dims::new(64, 1, 1);
        let mut enc = Speck1D::<u32>::new();
        let bytes = enc.encode(coeffs.clone(), signs, dims, EncodeMode::Unbounded);

        let mut dec = Speck1D::<u32>::new();
        let (out_coeffs, _) = dec.decode(&bytes, dims);
        assert_eq!(out_coeffs, coeffs);
    }

    #[test]
    fn fixed_rate_truncates_and_still_decodes() {
        let (coeffs, signs) = coeffs_and_signs(512);
        let dims = Dims::new(512, 1, 1);
        let mut enc = Speck1D::<u32>::new();
        let full = enc.encode(coeffs.clone(), signs.clone(), dims, EncodeMode::Unbounded);

        let mut enc2 = Speck1D::<u32>::new();
        let truncated = enc2.encode(coeffs, signs, dims, EncodeMode::FixedRate(full.len() * 8 / 2));
        assert!(truncated.len() < full.len());

        let mut dec = Speck1D::<u32>::new();
        let (_out_coeffs, _out_signs) = dec.decode(&truncated, dims);
    }
}
