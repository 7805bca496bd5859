//! Shared bitplane-marching state and logic (§4.E), common to the 1D, 2D,
//! and 3D set-partitioning sorts: threshold bookkeeping, the refinement
//! pass, and the 9-byte stream header. Each dimensionality supplies its own
//! sorting pass and set lists on top of this.

use crate::bitmask::Bitmask;
use crate::bitstream::Bitstream;
use crate::config::SPECK_HEADER_SIZE;
use crate::dims::Dims;
use crate::speck::uint::Uint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    /// Encode every bitplane; stop only when coefficients are exhausted.
    Unbounded,
    /// Stop as soon as the bitstream reaches this many bits.
    FixedRate(usize),
}

impl EncodeMode {
    fn budget_bits(self) -> usize {
        match self {
            EncodeMode::Unbounded => 0,
            EncodeMode::FixedRate(bits) => bits,
        }
    }
}

pub(crate) struct Core<T: Uint> {
    pub dims: Dims,
    pub budget: usize,
    pub coeff_buf: Vec<T>,
    pub sign_array: Bitmask,
    pub lsp_mask: Bitmask,
    pub lsp_new: Vec<usize>,
    pub lip_mask: Bitmask,
    pub bit_buffer: Bitstream,
    pub num_bitplanes: u8,
    pub total_bits: u64,
    pub avail_bits: u64,
    pub threshold: T,
}

impl<T: Uint> Default for Core<T> {
    fn default() -> Self {
        Core {
            dims: Dims::new(0, 0, 0),
            budget: usize::MAX,
            coeff_buf: Vec::new(),
            sign_array: Bitmask::new(0),
            lsp_mask: Bitmask::new(0),
            lsp_new: Vec::new(),
            lip_mask: Bitmask::new(0),
            bit_buffer: Bitstream::new(0),
            num_bitplanes: 0,
            total_bits: 0,
            avail_bits: 0,
            threshold: T::ZERO,
        }
    }
}

impl<T: Uint> Core<T> {
    fn set_budget(&mut self, mode: EncodeMode) {
        let bud = mode.budget_bits();
        if bud == 0 {
            self.budget = usize::MAX;
        } else {
            self.budget = bud + (8 - bud % 8) % 8;
        }
    }

    /// Sets up encoder state and computes the starting threshold. Returns
    /// `false` when every coefficient is zero, in which case the bitplane
    /// loop must be skipped entirely.
    pub fn begin_encode(&mut self, coeffs: Vec<T>, signs: Bitmask, dims: Dims, mode: EncodeMode) -> bool {
        self.dims = dims;
        self.set_budget(mode);
        self.coeff_buf = coeffs;
        self.sign_array = signs;
        let coeff_len = dims.len();
        self.bit_buffer = Bitstream::new(coeff_len);
        self.bit_buffer.rewind();
        self.total_bits = 0;
        self.lsp_mask = Bitmask::new(coeff_len);
        self.lsp_new.clear();
        self.lip_mask = Bitmask::new(coeff_len);

        if self.coeff_buf.iter().all(|&v| v == T::ZERO) {
            self.num_bitplanes = 0;
            return false;
        }

        let max_coeff = *self.coeff_buf.iter().max().unwrap();
        self.num_bitplanes = 1;
        self.threshold = T::ONE;
        while max_coeff.wrapping_sub(self.threshold) >= self.threshold {
            self.threshold = self.threshold.wrapping_double();
            self.num_bitplanes += 1;
        }
        true
    }

    pub fn over_budget(&self) -> bool {
        self.bit_buffer.wtell() >= self.budget
    }

    pub fn finish_encode(&mut self) {
        self.total_bits = self.bit_buffer.wtell() as u64;
        self.bit_buffer.flush();
    }

    /// Parses the 9-byte header plus payload, padding with zeros when a
    /// progressively-truncated stream is shorter than `total_bits`.
    pub fn use_bitstream(&mut self, buf: &[u8]) {
        assert!(buf.len() >= SPECK_HEADER_SIZE);
        self.num_bitplanes = buf[0];
        let mut tb_bytes = [0u8; 8];
        tb_bytes.copy_from_slice(&buf[1..9]);
        self.total_bits = u64::from_le_bytes(tb_bytes);

        let avail = (buf.len() - SPECK_HEADER_SIZE) as u64 * 8;
        if avail < self.total_bits {
            self.bit_buffer.reserve(self.total_bits as usize);
            self.bit_buffer.reset();
            self.bit_buffer.parse_bitstream(&buf[SPECK_HEADER_SIZE..], avail as usize);
            self.avail_bits = avail;
        } else {
            self.avail_bits = self.total_bits;
            self.bit_buffer.parse_bitstream(&buf[SPECK_HEADER_SIZE..], self.total_bits as usize);
        }
    }

    /// Sets up decoder state from an already-parsed header (via
    /// [`Core::use_bitstream`]). Returns `false` when the stream encodes an
    /// all-zero coefficient buffer, in which case the bitplane loop must be
    /// skipped.
    pub fn begin_decode(&mut self, buf: &[u8], dims: Dims) -> bool {
        self.dims = dims;
        self.use_bitstream(buf);
        self.bit_buffer.rewind();

        let coeff_len = dims.len();
        self.coeff_buf = vec![T::ZERO; coeff_len];
        self.sign_array = Bitmask::new(coeff_len);
        self.sign_array.reset_true();
        self.lsp_mask = Bitmask::new(coeff_len);
        self.lsp_new.clear();
        self.lip_mask = Bitmask::new(coeff_len);

        if self.num_bitplanes == 0 {
            return false;
        }

        self.threshold = T::ONE;
        for _ in 1..self.num_bitplanes {
            self.threshold = self.threshold.wrapping_double();
        }
        true
    }

    pub fn read_exhausted(&self) -> bool {
        self.bit_buffer.rtell() as u64 >= self.avail_bits
    }

    /// Initializes any significant points discovered but not yet refined
    /// when the bitplane loop broke early (progressive/fixed-rate decode).
    pub fn finish_decode_leftover_lsp(&mut self) {
        let init_val = self.midpoint_init_value();
        let news = std::mem::take(&mut self.lsp_new);
        for idx in &news {
            self.coeff_buf[*idx] = init_val;
        }
        for idx in news {
            self.lsp_mask.wtrue(idx);
        }
    }

    fn midpoint_init_value(&self) -> T {
        midpoint(self.threshold)
    }

    fn lsp_true_indices(&self) -> Vec<usize> {
        (0..self.lsp_mask.size()).filter(|&i| self.lsp_mask.rbit(i)).collect()
    }

    pub fn refinement_pass_encode(&mut self) {
        for idx in self.lsp_true_indices() {
            let sig = self.coeff_buf[idx] >= self.threshold;
            if sig {
                self.coeff_buf[idx] = self.coeff_buf[idx].wrapping_sub(self.threshold);
            }
            self.bit_buffer.wbit(sig);
        }
        let news = std::mem::take(&mut self.lsp_new);
        for idx in news {
            self.lsp_mask.wtrue(idx);
        }
    }

    pub fn refinement_pass_decode(&mut self) {
        let indices = self.lsp_true_indices();
        let two = T::ONE.wrapping_add(T::ONE);
        if self.threshold >= two {
            let half_t = self.threshold.half();
            for idx in indices {
                if self.read_exhausted() {
                    break;
                }
                if self.bit_buffer.rbit() {
                    self.coeff_buf[idx] = self.coeff_buf[idx].wrapping_add(half_t);
                } else {
                    self.coeff_buf[idx] = self.coeff_buf[idx].wrapping_sub(half_t);
                }
            }
        } else {
            for idx in indices {
                if self.read_exhausted() {
                    break;
                }
                if self.bit_buffer.rbit() {
                    self.coeff_buf[idx] = self.coeff_buf[idx].wrapping_add(T::ONE);
                }
            }
        }
        self.finish_decode_leftover_lsp();
    }

    pub fn encoded_bitstream_len(&self) -> usize {
        let bits_to_pack = self.budget.min(self.total_bits as usize);
        SPECK_HEADER_SIZE + bits_to_pack.div_ceil(8)
    }

    pub fn append_encoded_bitstream(&self, out: &mut Vec<u8>) {
        out.push(self.num_bitplanes);
        out.extend_from_slice(&self.total_bits.to_le_bytes());
        let bits_to_pack = self.budget.min(self.total_bits as usize);
        let nbytes = bits_to_pack.div_ceil(8);
        let start = out.len();
        out.resize(start + nbytes, 0);
        self.bit_buffer.write_bitstream(bits_to_pack, &mut out[start..]);
    }
}

/// The value a newly-significant coefficient is initialized to: the
/// midpoint of `[threshold, 2*threshold)`, rounded down when there are two
/// candidates (matches `threshold == 1` initializing to `1`, not `0`).
pub fn midpoint<T: Uint>(threshold: T) -> T {
    threshold
        .wrapping_add(threshold)
        .wrapping_sub(threshold.half())
        .wrapping_sub(T::ONE)
}
