//! Content hashing and picture identifiers.
//!
//! A picture's id is the SHA-256 digest of its canonical PNG encoding. The raw
//! 32 digest bytes are the row key in the store; the lowercase hex rendering is
//! what callers see and pass back in.
//!
//! Hashing the canonical encoding (not the upload) is what makes re-uploads of
//! the same pixels land on the same row, whatever container they arrived in.

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a picture id in raw digest bytes.
pub const DIGEST_LEN: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidIdError {
    #[error("picture id is not valid hex: {0}")]
    NotHex(String),
    #[error("picture id must be {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Content-derived identifier of a picture.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PictureId([u8; DIGEST_LEN]);

impl PictureId {
    /// Digest canonical image bytes into an id.
    pub fn digest(canonical: &[u8]) -> Self {
        let mut raw = [0u8; DIGEST_LEN];
        raw.copy_from_slice(&Sha256::digest(canonical));
        Self(raw)
    }

    /// Rebuild an id from a raw row key.
    pub fn from_row_key(key: &[u8]) -> Result<Self, InvalidIdError> {
        let raw: [u8; DIGEST_LEN] = key.try_into().map_err(|_| InvalidIdError::WrongLength {
            expected: DIGEST_LEN,
            actual: key.len(),
        })?;
        Ok(Self(raw))
    }

    /// Parse a client-supplied hex id.
    pub fn from_hex(hex_id: &str) -> Result<Self, InvalidIdError> {
        let bytes = hex::decode(hex_id).map_err(|e| InvalidIdError::NotHex(e.to_string()))?;
        Self::from_row_key(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw digest bytes, used verbatim as the store row key.
    pub fn row_key(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for PictureId {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for PictureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PictureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PictureId({})", &self.to_hex()[..12])
    }
}

impl Serialize for PictureId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
