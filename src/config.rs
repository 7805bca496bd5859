//! Compile-time configuration constants for the compression pipeline.

/// Default stride count used by the conditioner's two-level mean computation.
pub const COND_DEFAULT_STRIDE: usize = 2048;

/// Upper bound the conditioner will scan upward to while looking for a stride
/// that evenly divides the element count.
pub const COND_MAX_STRIDE: usize = 32_768;

/// Maximum number of wavelet transform levels, regardless of how small the
/// halved dimension would still allow.
pub const MAX_XFORM_LEVELS: u32 = 6;

/// Smallest dimension length for which another wavelet transform level is
/// still worthwhile.
pub const MIN_XFORM_LEN: usize = 9;

/// Default number of worker threads used by the chunked driver.
/// Zero means "use the runtime default" (all available cores).
pub const NB_THREADS_DEFAULT: usize = 0;

/// Fixed size in bytes of the per-chunk conditioner header (§4.C).
pub const CONDITIONER_HEADER_SIZE: usize = 17;

/// Fixed size in bytes of the SPECK-INT stream header (§3).
pub const SPECK_HEADER_SIZE: usize = 9;

/// Minimum number of bytes retained per chunk during progressive truncation,
/// large enough that each chunk's own header block survives intact.
pub const PROGRESSIVE_TRUNCATE_MIN_BYTES: usize = 64;

/// Current major version number written into the container header.
pub const CONTAINER_VERSION_MAJOR: u8 = 1;
