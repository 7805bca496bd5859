//! Crate-wide error type (§7).
//!
//! Every fallible operation in the core pipeline returns `Result<T>` with
//! this enum as its error half. The abstract `Good` outcome is represented
//! as `Ok(..)` rather than as an explicit variant.

use std::fmt;

/// Error kinds surfaced by the core compression/decompression pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SperrError {
    /// A buffer's size was inconsistent with declared dims or a header.
    WrongLength,
    /// An encoder was asked to run without a quality target having been set.
    CompModeUnknown,
    /// A floating-to-integer conversion would be invalid (e.g. rounding a
    /// non-finite value).
    FeInvalid,
    /// The bitstream's major version does not match this build.
    VersionMismatch,
    /// A 2D bitstream was fed to a 3D decoder, or vice versa.
    SliceVolumeMismatch,
    /// An I/O failure at the outer (file/CLI) layer.
    Io(String),
}

impl fmt::Display for SperrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SperrError::WrongLength => write!(f, "buffer length inconsistent with declared dims or header"),
            SperrError::CompModeUnknown => write!(f, "no compression quality target was set"),
            SperrError::FeInvalid => write!(f, "invalid floating-point to integer conversion"),
            SperrError::VersionMismatch => write!(f, "bitstream major version is incompatible with this build"),
            SperrError::SliceVolumeMismatch => write!(f, "dimensionality mismatch between bitstream and decoder"),
            SperrError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for SperrError {}

impl From<std::io::Error> for SperrError {
    fn from(e: std::io::Error) -> Self {
        SperrError::Io(e.to_string())
    }
}

/// Result alias used throughout the core pipeline.
pub type Result<T> = std::result::Result<T, SperrError>;
