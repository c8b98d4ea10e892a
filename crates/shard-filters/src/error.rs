//! Error types for the sharded filter subsystem
//!
//! Every variant is fatal to the operation that produced it. In particular a
//! `Decode` failure is never turned into a negative membership answer.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ShardKey;

/// Errors that can occur while building or querying shard filters
#[derive(Debug, Error)]
pub enum FilterError {
    /// Malformed invocation argument or missing required field
    #[error("Invalid input: {0}")]
    Input(String),

    /// Digest is not exactly 40 hexadecimal characters
    #[error("Invalid digest {value:?}: {reason}")]
    DigestFormat { value: String, reason: DigestFault },

    /// No shard file exists for the requested key
    #[error("Shard {key} not found at {}", path.display())]
    ShardNotFound { key: ShardKey, path: PathBuf },

    /// File missing, unreadable or unwritable
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corrupt or incompatible serialized filter
    #[error("Failed to decode shard filter: {0}")]
    Decode(#[from] DecodeError),

    /// Rejected sizing or build configuration
    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),
}

impl FilterError {
    /// Wrap an I/O error with the path it happened at
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FilterError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a digest string was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigestFault {
    /// Length other than 40
    Length(usize),
    /// Non-hex character at the given byte offset
    NonHex(usize),
}

impl std::fmt::Display for DigestFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestFault::Length(len) => write!(f, "length {} != 40", len),
            DigestFault::NonHex(offset) => write!(f, "non-hex character at offset {}", offset),
        }
    }
}

/// Errors from decoding a serialized shard filter
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated input: {len} bytes, need at least {needed}")]
    Truncated { len: usize, needed: usize },

    #[error("Bad magic bytes: {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u16),

    #[error("Unknown hash family: {0}")]
    UnknownHashFamily(u8),

    #[error("Reserved header byte is {0:#04x}, expected 0")]
    ReservedNotZero(u8),

    #[error("Invalid filter parameters in header: m={m}, k={k}")]
    InvalidParameters { m: u64, k: u32 },

    #[error("Length mismatch: header declares {declared} bytes, found {actual}")]
    LengthMismatch { declared: u64, actual: u64 },

    #[error("Checksum mismatch: stored {stored:08x}, computed {computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("Non-zero padding bits after bit {m}")]
    NonZeroPadding { m: u64 },

    #[error("Invalid build manifest: {0}")]
    InvalidManifest(String),
}
