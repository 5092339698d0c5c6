//! MD5 checksum type for artifact verification
//!
//! Manifests may pin the decompressed artifact with an `md5` field. The hash
//! is stored as its raw 16 bytes and (de)serialized as a lowercase hex string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// MD5 hash stored as a 16-byte array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Md5Hash([u8; 16]);

/// Rejected hex input for [`Md5Hash::from_hex`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid hash format: {hash}. Expected MD5 hex string")]
pub struct InvalidHash {
    pub hash: String,
}

impl Md5Hash {
    /// Create an MD5 hash from a 32-character hex string (case insensitive)
    pub fn from_hex(hex: &str) -> Result<Self, InvalidHash> {
        if hex.len() != 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidHash {
                hash: hex.to_string(),
            });
        }

        let mut bytes = [0u8; 16];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|_| InvalidHash {
                hash: hex.to_string(),
            })?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| InvalidHash {
                hash: hex.to_string(),
            })?;
        }

        Ok(Md5Hash(bytes))
    }

    /// Lowercase 32-character hex representation
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Hash a complete buffer
    pub fn compute(data: &[u8]) -> Self {
        Md5Hash(md5::compute(data).0)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Md5Hash(bytes)
    }
}

impl fmt::Display for Md5Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Md5Hash {
    type Err = InvalidHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Md5Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Md5Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex_string = String::deserialize(deserializer)?;
        Self::from_hex(&hex_string).map_err(serde::de::Error::custom)
    }
}

/// Incremental MD5 over a stream of chunks
pub struct Md5Hasher(md5::Context);

impl Md5Hasher {
    pub fn new() -> Self {
        Self(md5::Context::new())
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.0.consume(chunk);
    }

    pub fn finish(self) -> Md5Hash {
        Md5Hash(self.0.compute().0)
    }
}

impl Default for Md5Hasher {
    fn default() -> Self {
        Self::new()
    }
}
