//! `sperr` — a lossy compressor for floating-point scientific data: 2D
//! slices and 3D volumes, targeting a fixed bitrate, PSNR, or point-wise
//! error tolerance via a CDF 9/7 wavelet transform and SPECK bitplane
//! coding.

#[cfg(feature = "c-abi")]
pub mod abi;
pub mod bitmask;
pub mod bitstream;
pub mod cdf97;
pub mod cli;
pub mod conditioner;
pub mod config;
pub mod dims;
pub mod display;
pub mod driver;
pub mod error;
pub mod mode;
pub mod outlier;
pub mod speck;
pub mod speck_flt;
pub mod util;

pub use driver::ChunkedVolume;
pub use error::{Result, SperrError};
pub use mode::CompMode;
pub use speck_flt::SpeckFlt;
