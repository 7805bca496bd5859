//! Per-chunk pre/post-processing: constant-field detection and mean
//! removal, with the chosen stride count and subtracted mean recorded in a
//! fixed 17-byte header (§4.C).

use crate::config::{COND_DEFAULT_STRIDE, COND_MAX_STRIDE};
use crate::dims::Dims;

/// Fixed-size conditioner header: byte 0 packed flags, bytes 1..9 either
/// `(element count: u64)` or `(subtracted mean: f64)`, bytes 9..17 either
/// `(constant value: f64)` or `(quantization step q: f64, written later)`.
pub type CondiType = [u8; 17];

const CONSTANT_FIELD_BIT: u8 = 7;

fn pack_constant_flag(is_constant: bool) -> u8 {
    if is_constant {
        1 << CONSTANT_FIELD_BIT
    } else {
        0
    }
}

fn is_constant_flag(byte: u8) -> bool {
    (byte & (1 << CONSTANT_FIELD_BIT)) != 0
}

/// Remembers the stride count chosen by the last `condition()` call, in
/// case a caller wants to inspect it. Each chunk gets its own instance.
#[derive(Debug, Default)]
pub struct Conditioner {
    num_strides: usize,
}

impl Conditioner {
    pub fn new() -> Self {
        Conditioner { num_strides: 0 }
    }

    /// Detects a constant field, or removes the two-level strided mean.
    /// `dims` is accepted for interface symmetry with callers that track
    /// shape, but is not consulted: conditioning is shape-agnostic over the
    /// flattened buffer.
    pub fn condition(&mut self, buf: &mut [f64], _dims: Dims) -> CondiType {
        debug_assert!(!buf.is_empty());

        let v0 = buf[0];
        if buf.iter().all(|&v| v == v0) {
            let mut header = [0u8; 17];
            header[0] = pack_constant_flag(true);
            let nval = buf.len() as u64;
            header[1..9].copy_from_slice(&nval.to_le_bytes());
            header[9..17].copy_from_slice(&v0.to_le_bytes());
            return header;
        }

        self.adjust_strides(buf.len());
        let mean = self.calc_mean(buf);
        for v in buf.iter_mut() {
            *v -= mean;
        }

        let mut header = [0u8; 17];
        header[0] = pack_constant_flag(false);
        header[1..9].copy_from_slice(&mean.to_le_bytes());
        header
    }

    /// Reverses `condition`: restores a constant field or adds the
    /// subtracted mean back.
    pub fn inverse_condition(&self, buf: &mut Vec<f64>, header: CondiType) {
        if is_constant_flag(header[0]) {
            let mut nval_bytes = [0u8; 8];
            nval_bytes.copy_from_slice(&header[1..9]);
            let nval = u64::from_le_bytes(nval_bytes) as usize;

            let mut val_bytes = [0u8; 8];
            val_bytes.copy_from_slice(&header[9..17]);
            let val = f64::from_le_bytes(val_bytes);

            buf.resize(nval, val);
            buf.fill(val);
            return;
        }

        let mut mean_bytes = [0u8; 8];
        mean_bytes.copy_from_slice(&header[1..9]);
        let mean = f64::from_le_bytes(mean_bytes);
        for v in buf.iter_mut() {
            *v += mean;
        }
    }

    pub fn is_constant(&self, byte: u8) -> bool {
        is_constant_flag(byte)
    }

    /// Writes the quantization step into the header at byte offset 9.
    pub fn save_q(&self, header: &mut CondiType, q: f64) {
        header[9..17].copy_from_slice(&q.to_le_bytes());
    }

    /// Reads the quantization step from byte offset 9. Only meaningful on a
    /// non-constant header.
    pub fn retrieve_q(&self, header: CondiType) -> f64 {
        debug_assert!(!is_constant_flag(header[0]));
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&header[9..17]);
        f64::from_le_bytes(bytes)
    }

    fn calc_mean(&mut self, buf: &[f64]) -> f64 {
        debug_assert_eq!(buf.len() % self.num_strides, 0);
        let stride_size = buf.len() / self.num_strides;
        let mut stride_means = vec![0.0f64; self.num_strides];
        for (s, mean) in stride_means.iter_mut().enumerate() {
            let start = stride_size * s;
            let slice = &buf[start..start + stride_size];
            *mean = slice.iter().sum::<f64>() / stride_size as f64;
        }
        let sum: f64 = stride_means.iter().sum();
        sum / stride_means.len() as f64
    }

    /// Picks a stride count near [`COND_DEFAULT_STRIDE`] that evenly divides
    /// `len`, to keep the two-level mean computation well-defined.
    fn adjust_strides(&mut self, len: usize) {
        self.num_strides = COND_DEFAULT_STRIDE;
        if len % self.num_strides == 0 {
            return;
        }

        let mut num = self.num_strides;
        while num <= COND_MAX_STRIDE {
            if len % num == 0 {
                self.num_strides = num;
                return;
            }
            num += 1;
        }

        num = self.num_strides;
        while num > 0 {
            if len % num == 0 {
                break;
            }
            num -= 1;
        }
        self.num_strides = num.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_field_round_trips_exactly() {
        let mut buf = vec![4.332f64; 12 * 13];
        let mut c = Conditioner::new();
        let header = c.condition(&mut buf, Dims::new(12, 13, 1));
        assert!(c.is_constant(header[0]));

        let mut out = Vec::new();
        c.inverse_condition(&mut out, header);
        assert_eq!(out, vec![4.332f64; 12 * 13]);
    }

    #[test]
    fn non_constant_round_trips_after_adding_mean_back() {
        let orig: Vec<f64> = (0..4096).map(|i| (i as f64) * 0.01).collect();
        let mut buf = orig.clone();
        let mut c = Conditioner::new();
        let header = c.condition(&mut buf, Dims::new(4096, 1, 1));
        assert!(!c.is_constant(header[0]));

        let mut out = buf.clone();
        c.inverse_condition(&mut out, header);

        for (a, b) in orig.iter().zip(out.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn adjust_strides_falls_back_to_a_divisor() {
        let mut c = Conditioner::new();
        c.adjust_strides(4099); // prime; only divisors are 1 and itself
        assert_eq!(4099 % c.num_strides, 0);
    }

    #[test]
    fn save_and_retrieve_q_round_trip() {
        let c = Conditioner::new();
        let mut header = [0u8; 17];
        c.save_q(&mut header, 0.0078125);
        assert_eq!(c.retrieve_q(header), 0.0078125);
    }
}
