//! Verbosity-gated diagnostic output.
//!
//! A crate-level atomic level, the same shape as a production CLI
//! compressor's `DISPLAYLEVEL` mechanism: 0 = silent, 1 = errors only,
//! 2 = normal, 3 = progress, 4 = verbose.

use std::sync::atomic::{AtomicU32, Ordering};

/// Current verbosity level, shared across the driver and CLI binaries.
pub static DISPLAY_LEVEL: AtomicU32 = AtomicU32::new(2);

/// Returns the current display level.
#[inline]
pub fn display_level() -> u32 {
    DISPLAY_LEVEL.load(Ordering::Relaxed)
}

/// Sets the display level.
#[inline]
pub fn set_display_level(level: u32) {
    DISPLAY_LEVEL.store(level, Ordering::Relaxed);
}

/// Conditionally print to stderr at or above `level`.
#[macro_export]
macro_rules! displaylevel {
    ($level:expr, $($arg:tt)*) => {
        if $crate::display::display_level() >= $level {
            eprint!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_level_round_trips() {
        let prev = display_level();
        set_display_level(3);
        assert_eq!(display_level(), 3);
        set_display_level(prev);
    }
}
