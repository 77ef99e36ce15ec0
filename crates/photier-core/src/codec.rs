//! Binary serialization of encoding and location vectors.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! u8  version        (= 1)
//! u32 row_count
//! repeat row_count:
//!     u32 len
//!     len × f64
//! ```
//!
//! Decoding is strict: anything that does not match the layout exactly is
//! rejected.

use crate::types::Location;
use thiserror::Error;

const CODEC_VERSION: u8 = 1;
const F64_SIZE: usize = std::mem::size_of::<f64>();
const U32_SIZE: usize = std::mem::size_of::<u32>();
const LOCATION_LEN: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("unsupported vector blob version {0}")]
    UnsupportedVersion(u8),
    #[error("vector blob truncated at byte {0}")]
    Truncated(usize),
    #[error("vector blob has {0} trailing bytes")]
    TrailingBytes(usize),
    #[error("non-finite value in row {row} at index {index}")]
    NonFinite { row: usize, index: usize },
    #[error("location row {row} has {len} values, expected 4")]
    BadLocationLength { row: usize, len: usize },
    #[error("location row {row} holds a non-integral or out-of-range coordinate")]
    BadCoordinate { row: usize },
    #[error("row too long to encode: {0}")]
    TooLong(usize),
    #[error("expected {expected} rows, found {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },
}

/// Encode rows of floats.
pub fn encode_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Vec<u8>, CodecError> {
    let total: usize = rows.iter().map(|r| U32_SIZE + r.as_ref().len() * F64_SIZE).sum();
    let mut out = Vec::with_capacity(1 + U32_SIZE + total);
    out.push(CODEC_VERSION);
    out.extend_from_slice(&len_u32(rows.len())?.to_le_bytes());
    for row in rows {
        let row = row.as_ref();
        out.extend_from_slice(&len_u32(row.len())?.to_le_bytes());
        for v in row {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    Ok(out)
}

/// Decode rows of floats written by [`encode_rows`].
pub fn decode_rows(blob: &[u8]) -> Result<Vec<Vec<f64>>, CodecError> {
    let mut reader = Reader { blob, pos: 0 };
    let version = reader.take(1)?[0];
    if version != CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let count = reader.u32()? as usize;
    // Each row needs at least its length prefix; reject absurd counts early.
    if count > reader.remaining() / U32_SIZE {
        return Err(CodecError::Truncated(blob.len()));
    }
    let mut rows = Vec::with_capacity(count);
    for row in 0..count {
        let len = reader.u32()? as usize;
        let bytes = reader.take(len.checked_mul(F64_SIZE).ok_or(CodecError::Truncated(reader.pos))?)?;
        let values: Vec<f64> = bytes
            .chunks_exact(F64_SIZE)
            .map(|c| {
                let mut buf = [0u8; F64_SIZE];
                buf.copy_from_slice(c);
                f64::from_le_bytes(buf)
            })
            .collect();
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(CodecError::NonFinite { row, index });
        }
        rows.push(values);
    }
    if reader.remaining() > 0 {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }
    Ok(rows)
}

pub fn encode_locations(locations: &[Location]) -> Result<Vec<u8>, CodecError> {
    let rows: Vec<[f64; LOCATION_LEN]> = locations
        .iter()
        .map(|l| {
            [
                f64::from(l.top),
                f64::from(l.right),
                f64::from(l.bottom),
                f64::from(l.left),
            ]
        })
        .collect();
    encode_rows(&rows)
}

pub fn decode_locations(blob: &[u8]) -> Result<Vec<Location>, CodecError> {
    decode_rows(blob)?
        .into_iter()
        .enumerate()
        .map(|(row, values)| {
            if values.len() != LOCATION_LEN {
                return Err(CodecError::BadLocationLength {
                    row,
                    len: values.len(),
                });
            }
            let mut coords = [0u32; LOCATION_LEN];
            for (slot, v) in coords.iter_mut().zip(values) {
                if v.fract() != 0.0 || v < 0.0 || v > f64::from(u32::MAX) {
                    return Err(CodecError::BadCoordinate { row });
                }
                *slot = v as u32;
            }
            Ok(Location::from(coords))
        })
        .collect()
}

fn len_u32(len: usize) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| CodecError::TooLong(len))
}

struct Reader<'a> {
    blob: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.blob.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::Truncated(self.pos));
        }
        let blob = self.blob;
        let slice = &blob[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        let mut buf = [0u8; U32_SIZE];
        buf.copy_from_slice(self.take(U32_SIZE)?);
        Ok(u32::from_le_bytes(buf))
    }
}
