//! Outcome of ensuring the artifact is available

use std::fmt;

use serde::Serialize;

use crate::app::selector::ResolvedSource;
use crate::app::store::FileHandle;

/// Where the artifact bytes ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// Persisted in durable storage, reusable across sessions
    Durable,
    /// Held in memory for this session only
    Memory,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Durable => f.write_str("durable"),
            Location::Memory => f.write_str("memory"),
        }
    }
}

/// Artifact bytes together with the source and version that produced them
#[derive(Clone)]
pub enum StoreResult {
    Durable {
        handle: FileHandle,
        source: ResolvedSource,
        version: String,
    },
    Transient {
        bytes: Vec<u8>,
        source: ResolvedSource,
        version: String,
    },
}

impl StoreResult {
    pub fn location(&self) -> Location {
        match self {
            StoreResult::Durable { .. } => Location::Durable,
            StoreResult::Transient { .. } => Location::Memory,
        }
    }

    pub fn source(&self) -> &ResolvedSource {
        match self {
            StoreResult::Durable { source, .. } | StoreResult::Transient { source, .. } => source,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            StoreResult::Durable { version, .. } | StoreResult::Transient { version, .. } => {
                version
            }
        }
    }

    /// Durable handle, if the artifact was persisted
    pub fn handle(&self) -> Option<&FileHandle> {
        match self {
            StoreResult::Durable { handle, .. } => Some(handle),
            StoreResult::Transient { .. } => None,
        }
    }
}

impl fmt::Debug for StoreResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreResult::Durable {
                handle,
                source,
                version,
            } => f
                .debug_struct("Durable")
                .field("handle", handle)
                .field("source", source)
                .field("version", version)
                .finish(),
            StoreResult::Transient {
                bytes,
                source,
                version,
            } => f
                .debug_struct("Transient")
                .field("bytes", &format_args!("<{} bytes>", bytes.len()))
                .field("source", source)
                .field("version", version)
                .finish(),
        }
    }
}
