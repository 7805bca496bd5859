//! Flag parsing shared by `sperr2d` and `sperr3d` (§6.1). Explicitly a thin
//! wrapper: no directory traversal, no filename sniffing, no benchmark mode —
//! the binaries take explicit `--dims`/`--chunks`/quality flags.

pub mod args;

pub use args::{parse_args_from, Op, ParsedArgs};
