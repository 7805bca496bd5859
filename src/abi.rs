//! C ABI (§6.2) — the symbols a non-Rust caller (C, Fortran, Python via
//! ctypes, the HDF5 filter plugin) links against directly.
//!
//! Enabled with:
//!   cargo build --release --features c-abi
//!
//! Follows `SPERR_C_API.h`/`SPERR_C_API.cpp` for the exact signatures,
//! return-code conventions, and the "`*dst` must be a null pointer on entry,
//! caller frees with `free()`" memory contract; the `#[no_mangle] unsafe
//! extern "C" fn` shape and null-check-then-`slice::from_raw_parts` idiom
//! matches this crate's other FFI boundary code.

use std::os::raw::c_int;
use std::slice;

use crate::config::CONTAINER_VERSION_MAJOR;
use crate::dims::Dims;
use crate::driver::ChunkedVolume;
use crate::mode::CompMode;
use crate::speck_flt::SpeckFlt;

fn mode_from_code(mode: c_int, quality: f64) -> Option<CompMode> {
    match mode {
        1 => Some(CompMode::Rate(quality)),
        2 => Some(CompMode::Psnr(quality)),
        3 => Some(CompMode::Pwe(quality)),
        _ => None,
    }
}

/// Reads `len` values out of `src` as `f32` (if `is_float != 0`) or `f64`,
/// widening to `f64` either way — the precision [`SpeckFlt`] operates in.
unsafe fn read_src(src: *const std::os::raw::c_void, is_float: bool, len: usize) -> Vec<f64> {
    if is_float {
        let s = slice::from_raw_parts(src as *const f32, len);
        s.iter().map(|&v| v as f64).collect()
    } else {
        let s = slice::from_raw_parts(src as *const f64, len);
        s.to_vec()
    }
}

/// Allocates a `malloc`'d buffer holding `vals` narrowed to `f32` (if
/// `output_float`) or kept as `f64`, and hands it back through `dst`. The
/// caller owns the buffer and must release it with `free()`.
unsafe fn write_dst(vals: &[f64], output_float: bool, dst: *mut *mut std::os::raw::c_void) {
    if output_float {
        let buf = libc::malloc(vals.len() * std::mem::size_of::<f32>()) as *mut f32;
        for (i, &v) in vals.iter().enumerate() {
            *buf.add(i) = v as f32;
        }
        *dst = buf as *mut std::os::raw::c_void;
    } else {
        let buf = libc::malloc(vals.len() * std::mem::size_of::<f64>()) as *mut f64;
        for (i, &v) in vals.iter().enumerate() {
            *buf.add(i) = v;
        }
        *dst = buf as *mut std::os::raw::c_void;
    }
}

unsafe fn write_bytes_dst(bytes: &[u8], dst: *mut *mut std::os::raw::c_void, dst_len: *mut usize) {
    let buf = libc::malloc(bytes.len()) as *mut u8;
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf, bytes.len());
    *dst = buf as *mut std::os::raw::c_void;
    *dst_len = bytes.len();
}

/// Packs the 10-byte header `sperr_comp_2d`/`sperr_comp_3d` can optionally
/// prepend: version byte, a flags byte (bit0 portion, bit1 is_3d, bit2
/// is_float), then the dimensions as little-endian `u32`s.
fn pack_2d_header(is_float: bool, dimx: usize, dimy: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    out.push(CONTAINER_VERSION_MAJOR);
    out.push((is_float as u8) << 2);
    out.extend_from_slice(&(dimx as u32).to_le_bytes());
    out.extend_from_slice(&(dimy as u32).to_le_bytes());
    out
}

/// Compresses a 2D slice. Returns 0 on success, 1 if `*dst` wasn't null, 2 on
/// an invalid mode/quality, -1 on any other failure.
///
/// # Safety
/// `src` must point to `dimx * dimy` contiguous values of the type selected
/// by `is_float`. `dst` must point to a `NULL` pointer; `dst_len` must be
/// writable.
#[no_mangle]
pub unsafe extern "C" fn sperr_comp_2d(
    src: *const std::os::raw::c_void,
    is_float: c_int,
    dimx: usize,
    dimy: usize,
    mode: c_int,
    quality: f64,
    out_inc_header: c_int,
    dst: *mut *mut std::os::raw::c_void,
    dst_len: *mut usize,
) -> c_int {
    if (*dst) != std::ptr::null_mut() {
        return 1;
    }
    if quality <= 0.0 {
        return 2;
    }
    let Some(comp_mode) = mode_from_code(mode, quality) else {
        return 2;
    };

    let data = read_src(src, is_float != 0, dimx * dimy);
    let dims = Dims::new(dimx, dimy, 1);
    let stream = match SpeckFlt::new().compress(data, dims, comp_mode) {
        Ok(s) => s,
        Err(_) => return -1,
    };

    let mut out = if out_inc_header != 0 { pack_2d_header(is_float != 0, dimx, dimy) } else { Vec::new() };
    out.extend_from_slice(&stream);
    write_bytes_dst(&out, dst, dst_len);
    0
}

/// Decompresses a headerless 2D bitstream produced by [`sperr_comp_2d`].
///
/// # Safety
/// `src` must point to `src_len` readable bytes with no header prefix.
/// `dst` must point to a `NULL` pointer.
#[no_mangle]
pub unsafe extern "C" fn sperr_decomp_2d(
    src: *const std::os::raw::c_void,
    src_len: usize,
    output_float: c_int,
    dimx: usize,
    dimy: usize,
    dst: *mut *mut std::os::raw::c_void,
) -> c_int {
    if (*dst) != std::ptr::null_mut() {
        return 1;
    }
    let bytes = slice::from_raw_parts(src as *const u8, src_len);
    let dims = Dims::new(dimx, dimy, 1);
    let vals = match SpeckFlt::new().decompress(bytes, dims, false) {
        Ok(v) => v,
        Err(_) => return -1,
    };
    write_dst(&vals, output_float != 0, dst);
    0
}

/// Parses the flags/dims header shared by [`sperr_comp_2d`] (with
/// `out_inc_header = 1`) and [`sperr_comp_3d`]'s container.
///
/// # Safety
/// `src` must point to at least 14 readable bytes. The four output pointers
/// must be writable.
#[no_mangle]
pub unsafe extern "C" fn sperr_parse_header(
    src: *const std::os::raw::c_void,
    dimx: *mut usize,
    dimy: *mut usize,
    dimz: *mut usize,
    is_float: *mut c_int,
) {
    let p = src as *const u8;
    let flags = *p.add(1);
    let is_3d = flags & (1 << 1) != 0;
    *is_float = ((flags & (1 << 2)) != 0) as c_int;

    let read_u32 = |off: usize| -> usize {
        let b = slice::from_raw_parts(p.add(off), 4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize
    };
    *dimx = read_u32(2);
    *dimy = read_u32(6);
    *dimz = if is_3d { read_u32(10) } else { 1 };
}

/// Compresses a 3D volume, chunked per `chunk_x`/`chunk_y`/`chunk_z`.
///
/// # Safety
/// `src` must point to `dimx * dimy * dimz` contiguous values of the type
/// selected by `is_float`. `dst` must point to a `NULL` pointer; `dst_len`
/// must be writable.
#[no_mangle]
pub unsafe extern "C" fn sperr_comp_3d(
    src: *const std::os::raw::c_void,
    is_float: c_int,
    dimx: usize,
    dimy: usize,
    dimz: usize,
    chunk_x: usize,
    chunk_y: usize,
    chunk_z: usize,
    mode: c_int,
    quality: f64,
    nthreads: usize,
    dst: *mut *mut std::os::raw::c_void,
    dst_len: *mut usize,
) -> c_int {
    if (*dst) != std::ptr::null_mut() {
        return 1;
    }
    if quality <= 0.0 {
        return 2;
    }
    let Some(comp_mode) = mode_from_code(mode, quality) else {
        return 2;
    };

    let vol_dims = Dims::new(dimx, dimy, dimz);
    let chunk_dims = Dims::new(chunk_x, chunk_y, chunk_z);
    let data = read_src(src, is_float != 0, vol_dims.len());

    let stream =
        match ChunkedVolume::compress(&data, vol_dims, chunk_dims, is_float != 0, comp_mode, nthreads) {
            Ok(s) => s,
            Err(_) => return -1,
        };
    write_bytes_dst(&stream, dst, dst_len);
    0
}

/// Decompresses a 3D bitstream produced by [`sperr_comp_3d`].
///
/// # Safety
/// `src` must point to `src_len` readable bytes. `dst` must point to a
/// `NULL` pointer; `dimx`/`dimy`/`dimz` must be writable.
#[no_mangle]
pub unsafe extern "C" fn sperr_decomp_3d(
    src: *const std::os::raw::c_void,
    src_len: usize,
    output_float: c_int,
    nthreads: usize,
    dimx: *mut usize,
    dimy: *mut usize,
    dimz: *mut usize,
    dst: *mut *mut std::os::raw::c_void,
) -> c_int {
    if (*dst) != std::ptr::null_mut() {
        return 1;
    }
    let bytes = slice::from_raw_parts(src as *const u8, src_len);
    let volume = match ChunkedVolume::decode(bytes, nthreads) {
        Ok(v) => v,
        Err(_) => return -1,
    };
    *dimx = volume.dims.x;
    *dimy = volume.dims.y;
    *dimz = volume.dims.z;
    write_dst(volume.data(), output_float != 0, dst);
    0
}

/// Truncates a 3D bitstream to `pct` percent of its original length.
///
/// # Safety
/// `src` must point to `src_len` readable bytes, long enough to cover the
/// requested truncation (see header doc for the exact bound). `dst` must
/// point to a `NULL` pointer; `dst_len` must be writable.
#[no_mangle]
pub unsafe extern "C" fn sperr_trunc_3d(
    src: *const std::os::raw::c_void,
    src_len: usize,
    pct: std::os::raw::c_uint,
    dst: *mut *mut std::os::raw::c_void,
    dst_len: *mut usize,
) -> c_int {
    if (*dst) != std::ptr::null_mut() {
        return 1;
    }
    let bytes = slice::from_raw_parts(src as *const u8, src_len);
    let truncated = match ChunkedVolume::progressive_truncate(bytes, pct as u32) {
        Ok(t) => t,
        Err(_) => return -1,
    };
    write_bytes_dst(&truncated, dst, dst_len);
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::raw::c_void;

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|i| (i as f32 * 0.11).sin() * 20.0).collect()
    }

    #[test]
    fn comp_decomp_2d_round_trip_no_header() {
        let dimx = 16;
        let dimy = 12;
        let src = ramp(dimx * dimy);
        let mut dst: *mut c_void = std::ptr::null_mut();
        let mut dst_len: usize = 0;
        unsafe {
            let rtn = sperr_comp_2d(
                src.as_ptr() as *const c_void,
                1,
                dimx,
                dimy,
                3,
                0.1,
                0,
                &mut dst,
                &mut dst_len,
            );
            assert_eq!(rtn, 0);
            assert!(!dst.is_null());

            let mut out: *mut c_void = std::ptr::null_mut();
            let rtn = sperr_decomp_2d(dst, dst_len, 1, dimx, dimy, &mut out);
            assert_eq!(rtn, 0);
            let out_slice = slice::from_raw_parts(out as *const f32, dimx * dimy);
            for (a, b) in src.iter().zip(out_slice.iter()) {
                assert!((*a as f64 - *b as f64).abs() <= 0.1 * 1.5);
            }
            libc::free(dst);
            libc::free(out);
        }
    }

    #[test]
    fn comp_2d_rejects_non_null_dst() {
        let src = ramp(4);
        let mut sentinel = 1u8;
        let mut dst: *mut c_void = &mut sentinel as *mut u8 as *mut c_void;
        let mut dst_len: usize = 0;
        unsafe {
            let rtn =
                sperr_comp_2d(src.as_ptr() as *const c_void, 1, 2, 2, 3, 0.1, 0, &mut dst, &mut dst_len);
            assert_eq!(rtn, 1);
        }
    }

    #[test]
    fn comp_2d_rejects_unknown_mode() {
        let src = ramp(4);
        let mut dst: *mut c_void = std::ptr::null_mut();
        let mut dst_len: usize = 0;
        unsafe {
            let rtn =
                sperr_comp_2d(src.as_ptr() as *const c_void, 1, 2, 2, 9, 0.1, 0, &mut dst, &mut dst_len);
            assert_eq!(rtn, 2);
        }
    }

    #[test]
    fn comp_decomp_3d_round_trip_with_chunks() {
        let dims = Dims::new(8, 8, 8);
        let src: Vec<f64> = (0..dims.len()).map(|i| (i as f64 * 0.05).cos() * 10.0).collect();
        let mut dst: *mut c_void = std::ptr::null_mut();
        let mut dst_len: usize = 0;
        unsafe {
            let rtn = sperr_comp_3d(
                src.as_ptr() as *const c_void,
                0,
                8,
                8,
                8,
                4,
                4,
                4,
                3,
                0.2,
                2,
                &mut dst,
                &mut dst_len,
            );
            assert_eq!(rtn, 0);

            let mut out: *mut c_void = std::ptr::null_mut();
            let mut ox = 0usize;
            let mut oy = 0usize;
            let mut oz = 0usize;
            let rtn = sperr_decomp_3d(dst, dst_len, 0, 2, &mut ox, &mut oy, &mut oz, &mut out);
            assert_eq!(rtn, 0);
            assert_eq!((ox, oy, oz), (8, 8, 8));
            libc::free(dst);
            libc::free(out);
        }
    }

    #[test]
    fn parse_header_reads_2d_dims() {
        let header = pack_2d_header(true, 100, 50);
        let mut dimx = 0usize;
        let mut dimy = 0usize;
        let mut dimz = 0usize;
        let mut is_float = 0 as c_int;
        unsafe {
            sperr_parse_header(
                header.as_ptr() as *const c_void,
                &mut dimx,
                &mut dimy,
                &mut dimz,
                &mut is_float,
            );
        }
        assert_eq!((dimx, dimy, dimz), (100, 50, 1));
        assert_eq!(is_float, 1);
    }
}
