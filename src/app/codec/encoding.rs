//! Content encodings a manifest source can declare

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Encoding applied to a source's bytes on the wire
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Bytes are the artifact itself
    #[default]
    Identity,
    /// gzip (RFC 1952)
    Gzip,
    /// Brotli (RFC 7932)
    Brotli,
}

/// Encoding name that is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown encoding: {0}")]
pub struct UnknownEncoding(pub String);

impl Encoding {
    /// Canonical token, matching HTTP content-coding names
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Identity => "identity",
            Encoding::Gzip => "gzip",
            Encoding::Brotli => "br",
        }
    }

    /// All encodings, in the order used for capability reports
    pub fn all() -> [Encoding; 3] {
        [Encoding::Brotli, Encoding::Gzip, Encoding::Identity]
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "identity" | "none" => Ok(Encoding::Identity),
            "gzip" | "gz" | "x-gzip" => Ok(Encoding::Gzip),
            "br" | "brotli" => Ok(Encoding::Brotli),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}

impl Serialize for Encoding {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Encoding {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
