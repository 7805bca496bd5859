//! Command-line argument parsing for `sperr2d` / `sperr3d` (§6.1, informative).
//!
//! The entry point is [`parse_args_from`], which takes an explicit argument
//! slice (so it's testable without touching `std::env`). Long options use
//! `--option value` syntax only — no short-flag aggregation.

use std::path::PathBuf;

use anyhow::anyhow;

use crate::mode::CompMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Compress,
    Decompress,
}

/// Every option and filename discovered during the parse.
#[derive(Debug, Clone)]
pub struct ParsedArgs {
    pub op: Op,
    /// Bit width of the raw input/output samples: 32 (f32) or 64 (f64).
    pub ftype: u32,
    /// `(nx, ny, nz)`; `nz == 1` for a 2D slice.
    pub dims: (usize, usize, usize),
    /// 3D-only preferred chunk shape; defaults to `dims` (one chunk) if unset.
    pub chunks: Option<(usize, usize, usize)>,
    /// Required when `op == Op::Compress`.
    pub mode: Option<CompMode>,
    /// Raw input file for compression, or `None` when decompressing.
    pub input: Option<PathBuf>,
    /// The compressed bitstream: written on compress, read on decompress.
    pub bitstream: PathBuf,
    pub decomp_f: Option<PathBuf>,
    pub decomp_d: Option<PathBuf>,
    pub decomp_lowres_f: Option<PathBuf>,
    pub decomp_lowres_d: Option<PathBuf>,
    pub nb_threads: usize,
}

fn next_value<'a>(argv: &'a [String], idx: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *idx += 1;
    argv.get(*idx)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("bad usage: {flag} requires a value"))
}

fn parse_usize(s: &str, flag: &str) -> anyhow::Result<usize> {
    s.parse::<usize>().map_err(|_| anyhow!("bad usage: {flag}: expected an integer, got '{s}'"))
}

fn parse_f64(s: &str, flag: &str) -> anyhow::Result<f64> {
    s.parse::<f64>().map_err(|_| anyhow!("bad usage: {flag}: expected a number, got '{s}'"))
}

pub fn parse_args_from(argv: &[String]) -> anyhow::Result<ParsedArgs> {
    let mut op = None;
    let mut ftype: u32 = 32;
    let mut dims: Option<(usize, usize, usize)> = None;
    let mut chunks: Option<(usize, usize, usize)> = None;
    let mut mode: Option<CompMode> = None;
    let mut input: Option<PathBuf> = None;
    let mut bitstream: Option<PathBuf> = None;
    let mut decomp_f: Option<PathBuf> = None;
    let mut decomp_d: Option<PathBuf> = None;
    let mut decomp_lowres_f: Option<PathBuf> = None;
    let mut decomp_lowres_d: Option<PathBuf> = None;
    let mut nb_threads: usize = 0;

    let mut i = 0usize;
    while i < argv.len() {
        let arg = argv[i].as_str();
        match arg {
            "-c" => op = Some(Op::Compress),
            "-d" => op = Some(Op::Decompress),
            "--ftype" => {
                let v = parse_usize(next_value(argv, &mut i, "--ftype")?, "--ftype")? as u32;
                if v != 32 && v != 64 {
                    return Err(anyhow!("bad usage: --ftype must be 32 or 64"));
                }
                ftype = v;
            }
            "--dims" => {
                let nx = parse_usize(next_value(argv, &mut i, "--dims")?, "--dims")?;
                let ny = parse_usize(next_value(argv, &mut i, "--dims")?, "--dims")?;
                // nz is optional; a bare two-value --dims describes a 2D slice.
                let nz = match argv.get(i + 1) {
                    Some(s) if s.parse::<usize>().is_ok() => {
                        i += 1;
                        s.parse::<usize>().unwrap()
                    }
                    _ => 1,
                };
                dims = Some((nx, ny, nz));
            }
            "--chunks" => {
                let cx = parse_usize(next_value(argv, &mut i, "--chunks")?, "--chunks")?;
                let cy = parse_usize(next_value(argv, &mut i, "--chunks")?, "--chunks")?;
                let cz = parse_usize(next_value(argv, &mut i, "--chunks")?, "--chunks")?;
                chunks = Some((cx, cy, cz));
            }
            "--pwe" => {
                let q = parse_f64(next_value(argv, &mut i, "--pwe")?, "--pwe")?;
                mode = Some(CompMode::Pwe(q));
            }
            "--psnr" => {
                let q = parse_f64(next_value(argv, &mut i, "--psnr")?, "--psnr")?;
                mode = Some(CompMode::Psnr(q));
            }
            "--bpp" => {
                let q = parse_f64(next_value(argv, &mut i, "--bpp")?, "--bpp")?;
                mode = Some(CompMode::Rate(q));
            }
            "--bitstream" => bitstream = Some(PathBuf::from(next_value(argv, &mut i, "--bitstream")?)),
            "--decomp_f" => decomp_f = Some(PathBuf::from(next_value(argv, &mut i, "--decomp_f")?)),
            "--decomp_d" => decomp_d = Some(PathBuf::from(next_value(argv, &mut i, "--decomp_d")?)),
            "--decomp_lowres_f" => {
                decomp_lowres_f = Some(PathBuf::from(next_value(argv, &mut i, "--decomp_lowres_f")?))
            }
            "--decomp_lowres_d" => {
                decomp_lowres_d = Some(PathBuf::from(next_value(argv, &mut i, "--decomp_lowres_d")?))
            }
            "--threads" => nb_threads = parse_usize(next_value(argv, &mut i, "--threads")?, "--threads")?,
            "--input" => input = Some(PathBuf::from(next_value(argv, &mut i, "--input")?)),
            _ => return Err(anyhow!("bad usage: unknown option: {arg}")),
        }
        i += 1;
    }

    let op = op.ok_or_else(|| anyhow!("bad usage: one of -c / -d is required"))?;
    let dims = dims.ok_or_else(|| anyhow!("bad usage: --dims is required"))?;
    if op == Op::Compress && mode.is_none() {
        return Err(anyhow!("bad usage: one of --pwe / --psnr / --bpp is required to compress"));
    }
    if op == Op::Compress && input.is_none() {
        return Err(anyhow!("bad usage: --input is required to compress"));
    }
    let bitstream = bitstream.ok_or_else(|| anyhow!("bad usage: --bitstream is required"))?;

    Ok(ParsedArgs {
        op,
        ftype,
        dims,
        chunks,
        mode,
        input,
        bitstream,
        decomp_f,
        decomp_d,
        decomp_lowres_f,
        decomp_lowres_d,
        nb_threads,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn compress_2d_minimal() {
        let argv = make_args(&[
            "-c", "--dims", "16", "20", "--pwe", "0.01", "--input", "in.raw", "--bitstream",
            "out.bin",
        ]);
        let p = parse_args_from(&argv).unwrap();
        assert_eq!(p.op, Op::Compress);
        assert_eq!(p.dims, (16, 20, 1));
        assert_eq!(p.mode, Some(CompMode::Pwe(0.01)));
    }

    #[test]
    fn compress_3d_with_chunks_and_ftype() {
        let argv = make_args(&[
            "-c", "--ftype", "64", "--dims", "8", "8", "8", "--chunks", "4", "4", "4", "--bpp",
            "2.0", "--input", "in.raw", "--bitstream", "out.bin",
        ]);
        let p = parse_args_from(&argv).unwrap();
        assert_eq!(p.ftype, 64);
        assert_eq!(p.dims, (8, 8, 8));
        assert_eq!(p.chunks, Some((4, 4, 4)));
        assert_eq!(p.mode, Some(CompMode::Rate(2.0)));
    }

    #[test]
    fn decompress_requires_no_mode() {
        let argv = make_args(&[
            "-d", "--dims", "16", "20", "--bitstream", "out.bin", "--decomp_f", "out.f32",
        ]);
        let p = parse_args_from(&argv).unwrap();
        assert_eq!(p.op, Op::Decompress);
        assert_eq!(p.decomp_f.as_deref(), Some(std::path::Path::new("out.f32")));
    }

    #[test]
    fn missing_mode_on_compress_is_an_error() {
        let argv = make_args(&["-c", "--dims", "4", "4", "--input", "i", "--bitstream", "o"]);
        let e = parse_args_from(&argv).unwrap_err();
        assert!(e.to_string().contains("bad usage"));
    }

    #[test]
    fn unknown_option_is_an_error() {
        let argv = make_args(&["--nonsense"]);
        let e = parse_args_from(&argv).unwrap_err();
        assert!(e.to_string().contains("bad usage"));
    }
}
