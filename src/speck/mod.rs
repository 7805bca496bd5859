//! SPECK: the bitplane coder that turns wavelet coefficients into a
//! progressive, embedded bitstream (§4.E).
//!
//! [`bitplane::Core`] holds the dimension-agnostic threshold/refinement
//! machinery; [`speck1d`], [`speck2d`], and [`speck3d`] each add the
//! set-partitioning sort for their arity on top of it.

mod bitplane;
pub mod sets;
pub mod speck1d;
pub mod speck2d;
pub mod speck3d;
pub mod uint;

pub use bitplane::{midpoint, EncodeMode};
pub use speck1d::Speck1D;
pub use speck2d::Speck2D;
pub use speck3d::Speck3D;
pub use uint::Uint;

/// Picks the narrowest unsigned integer width that can hold `max_value`,
/// used to size the quantized-coefficient buffer handed to a SPECK codec
/// after the float-to-integer mapping (§4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U8,
    U16,
    U32,
    U64,
}

impl Width {
    pub fn smallest_for_max(max_value: u64) -> Width {
        if max_value <= u8::MAX as u64 {
            Width::U8
        } else if max_value <= u16::MAX as u64 {
            Width::U16
        } else if max_value <= u32::MAX as u64 {
            Width::U32
        } else {
            Width::U64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_for_max_picks_narrowest_width() {
        assert_eq!(Width::smallest_for_max(0), Width::U8);
        assert_eq!(Width::smallest_for_max(255), Width::U8);
        assert_eq!(Width::smallest_for_max(256), Width::U16);
        assert_eq!(Width::smallest_for_max(u32::MAX as u64), Width::U32);
        assert_eq!(Width::smallest_for_max(u32::MAX as u64 + 1), Width::U64);
    }
}
