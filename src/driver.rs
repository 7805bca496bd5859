//! The chunked driver (§4.H): splits a volume into independent chunks, runs
//! one [`SpeckFlt`] instance per chunk on a sized `rayon` pool, and stitches
//! the per-chunk bitstreams into one container with a small header.
//!
//! Header layout, chunk gather/scatter loops, and multi-resolution hierarchy
//! scatter follow `SPERR3D_OMP_C.cpp`/`SPERR3D_OMP_D.cpp`; the
//! `rayon::ThreadPool` + `par_iter` parallel section shape follows
//! `io/compress_mt.rs`'s batch-parallel compression loop, adapted from a
//! batched-and-ordered file pipeline to an in-memory, independent-chunk one
//! (streaming is out of scope here, so there's no backpressure/ordering
//! problem left to solve).

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::config::CONTAINER_VERSION_MAJOR;
use crate::dims::{chunk_volume, coarsened_resolutions_2d, coarsened_resolutions_3d, ChunkDesc, Dims};
use crate::error::{Result, SperrError};
use crate::mode::CompMode;
use crate::speck_flt::SpeckFlt;
use crate::util::cores::count_cores;

const IS_PORTION_BIT: u8 = 0;
const IS_3D_BIT: u8 = 1;
const IS_FLOAT_BIT: u8 = 2;
const MULTI_CHUNK_BIT: u8 = 3;

fn pack_flags(is_portion: bool, is_3d: bool, is_float: bool, multi_chunk: bool) -> u8 {
    (is_portion as u8) << IS_PORTION_BIT
        | (is_3d as u8) << IS_3D_BIT
        | (is_float as u8) << IS_FLOAT_BIT
        | (multi_chunk as u8) << MULTI_CHUNK_BIT
}

fn resolve_threads(nb_threads: usize) -> usize {
    if nb_threads == 0 {
        count_cores()
    } else {
        nb_threads
    }
}

fn build_pool(nb_threads: usize) -> rayon::ThreadPool {
    ThreadPoolBuilder::new()
        .num_threads(resolve_threads(nb_threads))
        .build()
        .expect("rayon thread pool construction")
}

fn gather_chunk(vol: &[f64], vol_dims: Dims, desc: &ChunkDesc) -> Vec<f64> {
    let mut buf = Vec::with_capacity(desc.len_x * desc.len_y * desc.len_z);
    let plane_size = vol_dims.x * vol_dims.y;
    for z in desc.start_z..desc.start_z + desc.len_z {
        let plane_offset = z * plane_size;
        for y in desc.start_y..desc.start_y + desc.len_y {
            let start = plane_offset + y * vol_dims.x + desc.start_x;
            buf.extend_from_slice(&vol[start..start + desc.len_x]);
        }
    }
    buf
}

fn scatter_chunk(vol: &mut [f64], vol_dims: Dims, small: &[f64], desc: &ChunkDesc) {
    let mut idx = 0;
    let plane_size = vol_dims.x * vol_dims.y;
    for z in desc.start_z..desc.start_z + desc.len_z {
        let plane_offset = z * plane_size;
        for y in desc.start_y..desc.start_y + desc.len_y {
            let start = plane_offset + y * vol_dims.x + desc.start_x;
            vol[start..start + desc.len_x].copy_from_slice(&small[idx..idx + desc.len_x]);
            idx += desc.len_x;
        }
    }
}

/// Chunk layout for a volume: either one chunk spanning the whole array (2D,
/// or a 3D volume whose caller asked for a single chunk) or the grid
/// produced by [`chunk_volume`].
fn chunk_layout(vol_dims: Dims, chunk_dims: Dims) -> Vec<ChunkDesc> {
    if vol_dims.is_3d() {
        chunk_volume(vol_dims, chunk_dims)
    } else {
        vec![ChunkDesc { start_x: 0, len_x: vol_dims.x, start_y: 0, len_y: vol_dims.y, start_z: 0, len_z: 1 }]
    }
}

struct ParsedHeader {
    is_portion: bool,
    is_3d: bool,
    is_float: bool,
    multi_chunk: bool,
    vol_dims: Dims,
    chunk_dims: Dims,
    chunk_lens: Vec<u32>,
    payload_offset: usize,
}

fn parse_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn parse_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn parse_header(bytes: &[u8]) -> Result<ParsedHeader> {
    if bytes.len() < 14 {
        return Err(SperrError::WrongLength);
    }
    if bytes[0] != CONTAINER_VERSION_MAJOR {
        return Err(SperrError::VersionMismatch);
    }
    let flags = bytes[1];
    let is_portion = flags & (1 << IS_PORTION_BIT) != 0;
    let is_3d = flags & (1 << IS_3D_BIT) != 0;
    let is_float = flags & (1 << IS_FLOAT_BIT) != 0;
    let multi_chunk = flags & (1 << MULTI_CHUNK_BIT) != 0;

    let vol_dims = Dims::new(
        parse_u32(&bytes[2..6]) as usize,
        parse_u32(&bytes[6..10]) as usize,
        parse_u32(&bytes[10..14]) as usize,
    );

    let mut pos = 14;
    let chunk_dims = if multi_chunk {
        if bytes.len() < pos + 6 {
            return Err(SperrError::WrongLength);
        }
        let cx = parse_u16(&bytes[pos..pos + 2]) as usize;
        let cy = parse_u16(&bytes[pos + 2..pos + 4]) as usize;
        let cz = parse_u16(&bytes[pos + 4..pos + 6]) as usize;
        pos += 6;
        Dims::new(cx, cy, cz)
    } else {
        vol_dims
    };

    let num_chunks = if multi_chunk { chunk_layout(vol_dims, chunk_dims).len() } else { 1 };
    if bytes.len() < pos + 4 * num_chunks {
        return Err(SperrError::WrongLength);
    }
    let mut chunk_lens = Vec::with_capacity(num_chunks);
    for i in 0..num_chunks {
        let start = pos + i * 4;
        chunk_lens.push(parse_u32(&bytes[start..start + 4]));
    }
    pos += 4 * num_chunks;

    Ok(ParsedHeader { is_portion, is_3d, is_float, multi_chunk, vol_dims, chunk_dims, chunk_lens, payload_offset: pos })
}

/// A decoded (or partially decoded, multi-resolution) volume.
pub struct ChunkedVolume {
    pub dims: Dims,
    pub is_float: bool,
    data: Vec<f64>,
    hierarchy: Vec<Vec<f64>>,
}

impl ChunkedVolume {
    /// Compresses `data` (row-major, `x` fastest-varying) into a container
    /// byte stream. `chunk_dims` is only consulted for 3D volumes; 2D
    /// volumes always encode as a single chunk (§4.H).
    pub fn compress(
        data: &[f64],
        vol_dims: Dims,
        chunk_dims: Dims,
        is_float: bool,
        mode: CompMode,
        nb_threads: usize,
    ) -> Result<Vec<u8>> {
        if data.len() != vol_dims.len() {
            return Err(SperrError::WrongLength);
        }
        let chunks = chunk_layout(vol_dims, chunk_dims);
        let multi_chunk = chunks.len() > 1;

        let pool = build_pool(nb_threads);
        let encoded: Vec<Vec<u8>> = pool.install(|| {
            chunks
                .par_iter()
                .map(|desc| {
                    let chunk_data = gather_chunk(data, vol_dims, desc);
                    SpeckFlt::new().compress(chunk_data, desc.dims(), mode)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut header = Vec::new();
        header.push(CONTAINER_VERSION_MAJOR);
        header.push(pack_flags(false, vol_dims.is_3d(), is_float, multi_chunk));
        header.extend_from_slice(&(vol_dims.x as u32).to_le_bytes());
        header.extend_from_slice(&(vol_dims.y as u32).to_le_bytes());
        header.extend_from_slice(&(vol_dims.z as u32).to_le_bytes());
        if multi_chunk {
            header.extend_from_slice(&(chunk_dims.x as u16).to_le_bytes());
            header.extend_from_slice(&(chunk_dims.y as u16).to_le_bytes());
            header.extend_from_slice(&(chunk_dims.z as u16).to_le_bytes());
        }
        for stream in &encoded {
            header.extend_from_slice(&(stream.len() as u32).to_le_bytes());
        }

        let total_size: usize = header.len() + encoded.iter().map(Vec::len).sum::<usize>();
        let mut out = Vec::with_capacity(total_size);
        out.extend_from_slice(&header);
        for stream in encoded {
            out.extend_from_slice(&stream);
        }

        crate::displaylevel!(3, "driver: encoded {} chunk(s), {} bytes total\n", chunks.len(), out.len());
        Ok(out)
    }

    fn decode_impl(bytes: &[u8], nb_threads: usize, multi_res: bool) -> Result<Self> {
        let header = parse_header(bytes)?;
        let chunk_dims = header.chunk_dims;
        let chunks = chunk_layout(header.vol_dims, chunk_dims);
        if chunks.len() != header.chunk_lens.len() {
            return Err(SperrError::WrongLength);
        }

        let mut offset = header.payload_offset;
        let mut slices = Vec::with_capacity(chunks.len());
        for &len in &header.chunk_lens {
            let len = len as usize;
            if bytes.len() < offset + len {
                return Err(SperrError::WrongLength);
            }
            slices.push(&bytes[offset..offset + len]);
            offset += len;
        }

        let pool = build_pool(nb_threads);
        let results: Vec<(Vec<f64>, Vec<Vec<f64>>)> = pool.install(|| {
            chunks
                .par_iter()
                .zip(slices.par_iter())
                .map(|(desc, slice)| {
                    let mut codec = SpeckFlt::new();
                    let out = codec.decompress(slice, desc.dims(), multi_res)?;
                    Ok((out, codec.view_hierarchy().to_vec()))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut vol = vec![0.0; header.vol_dims.len()];
        for (desc, (chunk_out, _)) in chunks.iter().zip(&results) {
            scatter_chunk(&mut vol, header.vol_dims, chunk_out, desc);
        }

        let hierarchy = if !multi_res {
            Vec::new()
        } else if chunks.len() == 1 {
            results[0].1.clone()
        } else {
            let vol_res = if header.is_3d {
                coarsened_resolutions_3d(header.vol_dims)
            } else {
                coarsened_resolutions_2d(header.vol_dims)
            };
            let chunk_res = if header.is_3d {
                coarsened_resolutions_3d(chunk_dims)
            } else {
                coarsened_resolutions_2d(chunk_dims)
            };
            let num_levels = vol_res.len().min(chunk_res.len());
            let mut levels = Vec::with_capacity(num_levels);
            for h in 0..num_levels {
                let mut level_vol = vec![0.0; vol_res[h].len()];
                let level_chunks = chunk_volume(vol_res[h], chunk_res[h]);
                for (desc, (_, chunk_hierarchy)) in level_chunks.iter().zip(&results) {
                    if let Some(small) = chunk_hierarchy.get(h) {
                        scatter_chunk(&mut level_vol, vol_res[h], small, desc);
                    }
                }
                levels.push(level_vol);
            }
            levels
        };

        crate::displaylevel!(3, "driver: decoded {} chunk(s), portion={}\n", chunks.len(), header.is_portion);

        Ok(ChunkedVolume { dims: header.vol_dims, is_float: header.is_float, data: vol, hierarchy })
    }

    /// Full-resolution decode; [`ChunkedVolume::decode_low_res`] is empty.
    pub fn decode(bytes: &[u8], nb_threads: usize) -> Result<Self> {
        Self::decode_impl(bytes, nb_threads, false)
    }

    /// Decode that also reconstructs the coarsened hierarchy exposed by each
    /// chunk's inverse wavelet transform, for progressive-resolution access.
    pub fn decode_multi_res(bytes: &[u8], nb_threads: usize) -> Result<Self> {
        Self::decode_impl(bytes, nb_threads, true)
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// The coarsened array at hierarchy index `level` (0 = coarsest), or
    /// `None` if `decode` (not `decode_multi_res`) was used, or the level is
    /// out of range.
    pub fn decode_low_res(&self, level: usize) -> Option<&[f64]> {
        self.hierarchy.get(level).map(Vec::as_slice)
    }

    /// Truncates each chunk's payload to `max(PROGRESSIVE_TRUNCATE_MIN_BYTES,
    /// floor(orig_len * pct / 100))` bytes, rewrites the per-chunk length
    /// table, and flips the `is_portion` flag (§4.H step 4).
    pub fn progressive_truncate(bytes: &[u8], pct: u32) -> Result<Vec<u8>> {
        use crate::config::PROGRESSIVE_TRUNCATE_MIN_BYTES;

        let header = parse_header(bytes)?;
        let mut offset = header.payload_offset;
        let mut kept_payloads = Vec::with_capacity(header.chunk_lens.len());
        for &len in &header.chunk_lens {
            let len = len as usize;
            if bytes.len() < offset + len {
                return Err(SperrError::WrongLength);
            }
            let keep = (len * pct as usize / 100).max(PROGRESSIVE_TRUNCATE_MIN_BYTES).min(len);
            kept_payloads.push(&bytes[offset..offset + keep]);
            offset += len;
        }

        let mut out = Vec::new();
        out.push(CONTAINER_VERSION_MAJOR);
        out.push(pack_flags(true, header.is_3d, header.is_float, header.multi_chunk));
        out.extend_from_slice(&(header.vol_dims.x as u32).to_le_bytes());
        out.extend_from_slice(&(header.vol_dims.y as u32).to_le_bytes());
        out.extend_from_slice(&(header.vol_dims.z as u32).to_le_bytes());
        if header.multi_chunk {
            out.extend_from_slice(&(header.chunk_dims.x as u16).to_le_bytes());
            out.extend_from_slice(&(header.chunk_dims.y as u16).to_le_bytes());
            out.extend_from_slice(&(header.chunk_dims.z as u16).to_le_bytes());
        }
        for p in &kept_payloads {
            out.extend_from_slice(&(p.len() as u32).to_le_bytes());
        }
        for p in kept_payloads {
            out.extend_from_slice(p);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * 0.13).cos() * 50.0 + i as f64 * 0.002).collect()
    }

    #[test]
    fn single_chunk_2d_round_trip() {
        let dims = Dims::new(20, 24, 1);
        let data = ramp(dims.len());
        let bytes =
            ChunkedVolume::compress(&data, dims, dims, true, CompMode::Pwe(0.05), 2).unwrap();

        let decoded = ChunkedVolume::decode(&bytes, 2).unwrap();
        assert_eq!(decoded.dims, dims);
        assert!(decoded.is_float);
        for (a, b) in data.iter().zip(decoded.data().iter()) {
            assert!((a - b).abs() <= 0.05 * 1.2, "{a} vs {b}");
        }
    }

    #[test]
    fn multi_chunk_3d_round_trip() {
        let vol_dims = Dims::new(16, 16, 16);
        let chunk_dims = Dims::new(8, 8, 8);
        let data = ramp(vol_dims.len());
        let bytes =
            ChunkedVolume::compress(&data, vol_dims, chunk_dims, false, CompMode::Pwe(0.05), 4)
                .unwrap();

        let decoded = ChunkedVolume::decode(&bytes, 4).unwrap();
        assert_eq!(decoded.dims, vol_dims);
        assert!(!decoded.is_float);
        for (a, b) in data.iter().zip(decoded.data().iter()) {
            assert!((a - b).abs() <= 0.05 * 1.2, "{a} vs {b}");
        }
    }

    #[test]
    fn multi_res_decode_exposes_coarsened_levels() {
        let vol_dims = Dims::new(32, 32, 32);
        let chunk_dims = Dims::new(16, 16, 16);
        let data = ramp(vol_dims.len());
        let bytes =
            ChunkedVolume::compress(&data, vol_dims, chunk_dims, true, CompMode::Psnr(40.0), 1)
                .unwrap();

        let decoded = ChunkedVolume::decode_multi_res(&bytes, 1).unwrap();
        let expected = coarsened_resolutions_3d(vol_dims);
        for (level, dims) in expected.iter().enumerate() {
            let low_res = decoded.decode_low_res(level).expect("level present");
            assert_eq!(low_res.len(), dims.len());
        }
    }

    #[test]
    fn progressive_truncate_shrinks_and_marks_portion() {
        let dims = Dims::new(16, 16, 16);
        let chunk_dims = Dims::new(8, 8, 8);
        let data = ramp(dims.len());
        let bytes =
            ChunkedVolume::compress(&data, dims, chunk_dims, true, CompMode::Rate(4.0), 2).unwrap();

        let truncated = ChunkedVolume::progressive_truncate(&bytes, 50).unwrap();
        assert!(truncated.len() < bytes.len());

        let header = parse_header(&truncated).unwrap();
        assert!(header.is_portion);

        // A truncated container must still decode to *something* finite.
        let decoded = ChunkedVolume::decode(&truncated, 2).unwrap();
        assert!(decoded.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn decode_rejects_version_mismatch() {
        let mut bytes = vec![0u8; 20];
        bytes[0] = CONTAINER_VERSION_MAJOR.wrapping_add(1);
        let err = ChunkedVolume::decode(&bytes, 1).unwrap_err();
        assert_eq!(err, SperrError::VersionMismatch);
    }
}
