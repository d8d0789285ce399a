//! Binary NBT plumbing shared by every schematic format.
//!
//! All on-disk formats here are (optionally gzipped) named NBT. fastnbt does
//! the tag codec; this module adds the compression framing, a cheap root-name
//! probe for format detection, and the packed-index storage used by the
//! litematic and blueprint block arrays.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Gunzip `bytes` if they carry the gzip magic, otherwise return them as-is.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    } else {
        Ok(bytes.to_vec())
    }
}

/// Deserialize a named NBT payload, transparently handling gzip.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let raw = decompress(bytes)?;
    Ok(fastnbt::from_bytes(&raw)?)
}

/// Serialize `value` as uncompressed named NBT with the given root name.
pub fn to_bytes<T: Serialize>(value: &T, root_name: &str) -> Result<Vec<u8>> {
    Ok(fastnbt::to_bytes_with_opts(
        value,
        fastnbt::SerOpts::new().root_name(root_name),
    )?)
}

/// Serialize `value` as gzipped named NBT, the on-disk framing of every
/// NBT-based schematic format.
pub fn to_gzip_bytes<T: Serialize>(value: &T, root_name: &str) -> Result<Vec<u8>> {
    let raw = to_bytes(value, root_name)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

/// Read the name of the root compound without parsing the whole payload.
/// Expects uncompressed bytes; returns `None` if they don't start with a
/// compound tag.
pub fn root_name(bytes: &[u8]) -> Option<String> {
    if bytes.len() < 3 || bytes[0] != 0x0a {
        return None;
    }
    let len = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
    let name = bytes.get(3..3 + len)?;
    String::from_utf8(name.to_vec()).ok()
}

/// Bits needed for indices into a palette of `len` entries, never less than
/// two (the litematic floor).
pub fn width_for(len: usize) -> u32 {
    if len <= 1 {
        2
    } else {
        ((len - 1).ilog2() + 1).max(2)
    }
}

/// Fixed-width unsigned entries packed into `i64` storage.
///
/// Entries are laid out LSB-first and may straddle a long boundary, matching
/// the litematic `BlockStates` layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBits {
    storage: Vec<i64>,
    width: u32,
    len: usize,
}

impl PackedBits {
    pub fn new(len: usize, width: u32) -> Self {
        let longs = ((len as u64 * width as u64) as usize).div_ceil(64);
        PackedBits {
            storage: vec![0; longs],
            width,
            len,
        }
    }

    pub fn from_longs(storage: Vec<i64>, width: u32, len: usize) -> Self {
        PackedBits {
            storage,
            width,
            len,
        }
    }

    pub fn pack(values: &[u64], width: u32) -> Self {
        let mut packed = PackedBits::new(values.len(), width);
        for (i, &v) in values.iter().enumerate() {
            packed.set(i, v);
        }
        packed
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, idx: usize) -> u64 {
        let mask = self.mask();
        let bit = idx as u64 * self.width as u64;
        let start = (bit / 64) as usize;
        let end = ((bit + self.width as u64 - 1) / 64) as usize;
        let offset = bit % 64;

        let lo = (self.storage[start] as u64) >> offset;
        if start == end {
            lo & mask
        } else {
            (lo | (self.storage[end] as u64) << (64 - offset)) & mask
        }
    }

    pub fn set(&mut self, idx: usize, value: u64) {
        let mask = self.mask();
        let value = value & mask;
        let bit = idx as u64 * self.width as u64;
        let start = (bit / 64) as usize;
        let end = ((bit + self.width as u64 - 1) / 64) as usize;
        let offset = bit % 64;

        let lo = (self.storage[start] as u64) & !(mask << offset) | value << offset;
        self.storage[start] = lo as i64;
        if start != end {
            let spill = 64 - offset;
            let hi = (self.storage[end] as u64) & !(mask >> spill) | value >> spill;
            self.storage[end] = hi as i64;
        }
    }

    pub fn into_longs(self) -> Vec<i64> {
        self.storage
    }

    fn mask(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1 << self.width) - 1
        }
    }
}

/// Pack 16-bit palette indices two-per-int, big half first, the layout of the
/// Structurize blueprint `blocks` array.
pub fn pack_u16_pairs(values: &[u16]) -> Vec<i32> {
    values
        .chunks(2)
        .map(|pair| {
            let hi = pair[0] as u32;
            let lo = pair.get(1).copied().unwrap_or(0) as u32;
            (hi << 16 | lo) as i32
        })
        .collect()
}

/// Inverse of [`pack_u16_pairs`], truncated to `len` entries.
pub fn unpack_u16_pairs(words: &[i32], len: usize) -> Vec<u16> {
    let mut out = Vec::with_capacity(len);
    for &word in words {
        out.push((word as u32 >> 16) as u16);
        out.push((word as u32 & 0xFFFF) as u16);
    }
    out.truncate(len);
    out
}
