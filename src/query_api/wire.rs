// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned binary encoding of queries
//!
//! ```text
//! ┌──────────┬───────────────┬──────────────────────────────────────┐
//! │ "EFPQ"   │ version (u16) │ bincode body (serde enum discriminant │
//! │ 4 bytes  │ little endian │ + fields for every tree node)         │
//! └──────────┴───────────────┴──────────────────────────────────────┘
//! ```
//!
//! Every tree is a closed enum, so the discriminant written by serde is the
//! only type tag needed. Bump [`WIRE_FORMAT_VERSION`] whenever a variant is
//! added, removed or reordered.

use super::query::Query;
use thiserror::Error;

pub const WIRE_MAGIC: [u8; 4] = *b"EFPQ";
pub const WIRE_FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 6;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Payload too short for a query header ({0} bytes)")]
    Truncated(usize),

    #[error("Bad magic bytes {0:?}")]
    BadMagic([u8; 4]),

    #[error("Unsupported wire format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u16, supported: u16 },

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),
}

pub fn encode_query(query: &Query) -> Result<Vec<u8>, WireError> {
    let body = bincode::serialize(query)?;
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&WIRE_MAGIC);
    out.extend_from_slice(&WIRE_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

pub fn decode_query(bytes: &[u8]) -> Result<Query, WireError> {
    if bytes.len() < HEADER_LEN {
        return Err(WireError::Truncated(bytes.len()));
    }
    let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if magic != WIRE_MAGIC {
        return Err(WireError::BadMagic(magic));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != WIRE_FORMAT_VERSION {
        return Err(WireError::UnsupportedVersion {
            found: version,
            supported: WIRE_FORMAT_VERSION,
        });
    }
    Ok(bincode::deserialize(&bytes[HEADER_LEN..])?)
}
