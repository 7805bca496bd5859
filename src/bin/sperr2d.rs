//! `sperr2d` — compress/decompress a single 2D slice (§6.1, informative).
//!
//! A thin driver over [`sperr::speck_flt::SpeckFlt`]: reads a raw row-major
//! sample file, calls the library, writes the result back out. No directory
//! traversal, no filename sniffing — every dimension and path is explicit.

use std::path::Path;

use anyhow::anyhow;

use sperr::cli::{parse_args_from, Op, ParsedArgs};
use sperr::dims::Dims;
use sperr::speck_flt::SpeckFlt;

fn read_raw(path: &Path, ftype: u32, expected_len: usize) -> anyhow::Result<Vec<f64>> {
    let bytes = std::fs::read(path)?;
    match ftype {
        32 => {
            if bytes.len() != expected_len * 4 {
                return Err(anyhow!("{}: expected {} f32 samples, file has {} bytes", path.display(), expected_len, bytes.len()));
            }
            Ok(bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64).collect())
        }
        64 => {
            if bytes.len() != expected_len * 8 {
                return Err(anyhow!("{}: expected {} f64 samples, file has {} bytes", path.display(), expected_len, bytes.len()));
            }
            Ok(bytes.chunks_exact(8).map(|c| f64::from_le_bytes(c.try_into().unwrap())).collect())
        }
        _ => unreachable!("ParsedArgs::ftype is validated to 32 or 64"),
    }
}

fn write_raw(path: &Path, data: &[f64], as_float: bool) -> anyhow::Result<()> {
    let mut bytes = Vec::with_capacity(data.len() * if as_float { 4 } else { 8 });
    if as_float {
        for &v in data {
            bytes.extend_from_slice(&(v as f32).to_le_bytes());
        }
    } else {
        for &v in data {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

fn suffixed(path: &Path, suffix: &str) -> std::path::PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(format!(".{suffix}"));
    std::path::PathBuf::from(s)
}

fn run(args: ParsedArgs) -> anyhow::Result<()> {
    let (nx, ny, _) = args.dims;
    let dims = Dims::new(nx, ny, 1);

    match args.op {
        Op::Compress => {
            let input = args.input.as_ref().expect("validated by parse_args_from");
            let data = read_raw(input, args.ftype, dims.len())?;
            let mode = args.mode.expect("validated by parse_args_from");
            let bytes = SpeckFlt::new().compress(data, dims, mode)?;
            std::fs::write(&args.bitstream, bytes)?;
        }
        Op::Decompress => {
            let bytes = std::fs::read(&args.bitstream)?;
            let want_lowres = args.decomp_lowres_f.is_some() || args.decomp_lowres_d.is_some();
            let mut codec = SpeckFlt::new();
            let data = codec.decompress(&bytes, dims, want_lowres)?;

            if let Some(p) = &args.decomp_f {
                write_raw(p, &data, true)?;
            }
            if let Some(p) = &args.decomp_d {
                write_raw(p, &data, false)?;
            }
            for (level, low) in codec.view_hierarchy().iter().enumerate() {
                if let Some(p) = &args.decomp_lowres_f {
                    write_raw(&suffixed(p, &level.to_string()), low, true)?;
                }
                if let Some(p) = &args.decomp_lowres_d {
                    write_raw(&suffixed(p, &level.to_string()), low, false)?;
                }
            }
        }
    }
    Ok(())
}

fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args_from(&argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("sperr2d: {e}");
            std::process::exit((line!() as i32) % 256);
        }
    };
    if let Err(e) = run(args) {
        eprintln!("sperr2d: {e}");
        std::process::exit((line!() as i32) % 256);
    }
}
