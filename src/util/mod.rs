//! Cross-cutting utility functions shared by the driver and CLI layers.

pub mod cores;

pub use cores::count_cores;
