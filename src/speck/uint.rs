//! The unsigned integer types SPECK's bitplane codec can operate over.
//!
//! SPECK never needs checked arithmetic: every subtraction follows a
//! significance test that already proved the minuend is at least as large
//! as the subtrahend, and every doubling is bounded by
//! [`crate::config::MAX_XFORM_LEVELS`]-driven bitplane counts well under each
//! type's width. Plain wrapping ops are used defensively, not because
//! wraparound is expected.

pub trait Uint: Copy + Clone + Ord + Default + std::fmt::Debug + Send + Sync + 'static {
    const ZERO: Self;
    const ONE: Self;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
    fn wrapping_double(self) -> Self;
    fn half(self) -> Self;
    fn to_u64(self) -> u64;
    fn from_u64(v: u64) -> Self;
}

macro_rules! impl_uint {
    ($t:ty) => {
        impl Uint for $t {
            const ZERO: Self = 0;
            const ONE: Self = 1;

            fn wrapping_add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
            fn wrapping_sub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }
            fn wrapping_double(self) -> Self {
                self.wrapping_mul(2)
            }
            fn half(self) -> Self {
                self / 2
            }
            fn to_u64(self) -> u64 {
                self as u64
            }
            fn from_u64(v: u64) -> Self {
                v as $t
            }
        }
    };
}

impl_uint!(u8);
impl_uint!(u16);
impl_uint!(u32);
impl_uint!(u64);
