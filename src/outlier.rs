//! Outlier correction (§4.F): a secondary, exact-integer SPECK stream that
//! patches the handful of coefficients the main wavelet+SPECK pass left
//! outside the error tolerance, without forcing the whole array through a
//! tighter (and much more expensive) bitplane budget.

use crate::bitmask::Bitmask;
use crate::config::SPECK_HEADER_SIZE;
use crate::dims::Dims;
use crate::error::{Result, SperrError};
use crate::speck::{EncodeMode, Speck1D, Width};

/// A single correction: the flat array position and the signed error
/// (original value minus reconstructed value) that needs patching in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outlier {
    pub pos: usize,
    pub err: f64,
}

impl Outlier {
    pub fn new(pos: usize, err: f64) -> Self {
        Outlier { pos, err }
    }
}

/// Encodes/decodes a list of [`Outlier`]s as a quantized, signed 1D SPECK
/// stream. `total_len` and `tol` are carried alongside the stream by the
/// caller (the container header, per §4.H) rather than inside it — a
/// decoder must have both set before calling [`OutlierCoder::decode`].
pub struct OutlierCoder {
    total_len: usize,
    tol: f64,
    los: Vec<Outlier>,
}

impl OutlierCoder {
    pub fn new(total_len: usize, tol: f64) -> Self {
        OutlierCoder { total_len, tol, los: Vec::new() }
    }

    pub fn use_outlier_list(&mut self, los: Vec<Outlier>) {
        self.los = los;
    }

    pub fn view_outlier_list(&self) -> &[Outlier] {
        &self.los
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.total_len == 0 || self.tol <= 0.0 || self.los.is_empty() {
            return Err(SperrError::WrongLength);
        }
        if self.los.iter().any(|o| o.pos >= self.total_len || o.err.abs() <= self.tol) {
            return Err(SperrError::WrongLength);
        }

        let max_err = self.los.iter().fold(0.0_f64, |acc, o| acc.max(o.err.abs()));
        if !max_err.is_finite() {
            return Err(SperrError::FeInvalid);
        }
        let max_int = max_err.round();
        if !max_int.is_finite() || max_int < 0.0 {
            return Err(SperrError::FeInvalid);
        }

        match Width::smallest_for_max(max_int as u64) {
            Width::U8 => Ok(self.encode_with::<u8>()),
            Width::U16 => Ok(self.encode_with::<u16>()),
            Width::U32 => Ok(self.encode_with::<u32>()),
            Width::U64 => Ok(self.encode_with::<u64>()),
        }
    }

    fn encode_with<T: crate::speck::Uint>(&self) -> Vec<u8> {
        let mut vals = vec![T::ZERO; self.total_len];
        let mut signs = Bitmask::new(self.total_len);
        signs.reset_true();
        let inv = 1.0 / self.tol;
        for out in &self.los {
            let ll = (out.err * inv).round();
            signs.wbit(out.pos, ll >= 0.0);
            vals[out.pos] = T::from_u64(ll.abs() as u64);
        }
        let dims = Dims::new(self.total_len, 1, 1);
        Speck1D::<T>::new().encode(vals, signs, dims, EncodeMode::Unbounded)
    }

    pub fn decode(&mut self, bytes: &[u8]) -> Result<()> {
        if self.total_len == 0 || self.tol <= 0.0 {
            return Err(SperrError::WrongLength);
        }
        if bytes.len() < SPECK_HEADER_SIZE {
            return Err(SperrError::WrongLength);
        }
        let num_bitplanes = bytes[0];
        let dims = Dims::new(self.total_len, 1, 1);

        let (vals_u64, signs): (Vec<u64>, Bitmask) = if num_bitplanes <= 8 {
            let (v, s) = Speck1D::<u8>::new().decode(bytes, dims);
            (v.into_iter().map(|x| x as u64).collect(), s)
        } else if num_bitplanes <= 16 {
            let (v, s) = Speck1D::<u16>::new().decode(bytes, dims);
            (v.into_iter().map(|x| x as u64).collect(), s)
        } else if num_bitplanes <= 32 {
            let (v, s) = Speck1D::<u32>::new().decode(bytes, dims);
            (v.into_iter().map(|x| x as u64).collect(), s)
        } else {
            Speck1D::<u64>::new().decode(bytes, dims)
        };

        let mut los = Vec::new();
        for (i, &v) in vals_u64.iter().enumerate() {
            match v {
                0 => {}
                1 => los.push(Outlier::new(i, 1.1)),
                _ => los.push(Outlier::new(i, v as f64 - 0.25)),
            }
        }
        for out in los.iter_mut() {
            let sign = if signs.rbit(out.pos) { 1.0 } else { -1.0 };
            out.err *= self.tol * sign;
        }
        self.los = los;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_small_outlier_list() {
        let tol = 0.5;
        let los = vec![Outlier::new(2, 3.2), Outlier::new(5, -1.7), Outlier::new(9, 2.0)];
        let mut enc = OutlierCoder::new(10, tol);
        enc.use_outlier_list(los.clone());
        let bytes = enc.encode().unwrap();

        let mut dec = OutlierCoder::new(10, tol);
        dec.decode(&bytes).unwrap();
        let recovered = dec.view_outlier_list();
        assert_eq!(recovered.len(), los.len());
        let mut recovered_sorted = recovered.to_vec();
        recovered_sorted.sort_by_key(|o| o.pos);
        for (orig, rec) in los.iter().zip(recovered_sorted.iter()) {
            assert_eq!(orig.pos, rec.pos);
            assert!((orig.err - rec.err).abs() < tol);
        }
    }

    #[test]
    fn rejects_empty_outlier_list() {
        let enc = OutlierCoder::new(10, 0.5);
        assert_eq!(enc.encode(), Err(SperrError::WrongLength));
    }

    #[test]
    fn rejects_error_within_tolerance() {
        let mut enc = OutlierCoder::new(10, 0.5);
        enc.use_outlier_list(vec![Outlier::new(0, 0.1)]);
        assert_eq!(enc.encode(), Err(SperrError::WrongLength));
    }

    #[test]
    fn round_trip_many_outliers_needs_wider_width() {
        let tol = 1e-4;
        let los: Vec<Outlier> = (0..200).map(|i| Outlier::new(i * 3, 0.01 * (i as f64 + 1.0))).collect();
        let mut enc = OutlierCoder::new(700, tol);
        enc.use_outlier_list(los.clone());
        let bytes = enc.encode().unwrap();

        let mut dec = OutlierCoder::new(700, tol);
        dec.decode(&bytes).unwrap();
        assert_eq!(dec.view_outlier_list().len(), los.len());
    }
}
