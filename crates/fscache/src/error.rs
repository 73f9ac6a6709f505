//! Cache error types.

use std::io;
use std::path::PathBuf;

use crate::storage::Mode;

/// Errors that can occur during cache operations.
///
/// A missing cache file is never reported through this type by path
/// resolution or validity checks. Only loading a file that does not exist
/// fails, with [`CacheError::Io`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An explicitly supplied base directory does not exist
    #[error("Cache directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// The platform reports no per-user cache directory
    #[error("Could not determine a default cache directory")]
    NoCacheDirectory,

    /// The cache id does not yield a usable file name
    #[error("Invalid cache id: {0:?}")]
    InvalidKey(String),

    /// Unrecognized access mode name
    #[error("Unknown cache mode: {0:?} (expected \"text\", \"binary\" or \"json\")")]
    UnknownMode(String),

    /// Unrecognized alphabetical index name
    #[error("Unknown alpha index: {0:?} (expected \"none\" or \"name\")")]
    UnknownAlphaIndex(String),

    /// Freshly produced content does not match the requested mode
    #[error("Cache mode mismatch: expected {expected}, found {found}")]
    ModeMismatch { expected: Mode, found: Mode },

    /// Structured save of a value JSON cannot represent
    #[error("Unsupported value for JSON cache file: {0}")]
    SerializationUnsupported(#[source] serde_json::Error),

    /// Structured load of malformed content
    #[error("Malformed JSON cache file: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for cache operations.
pub type Result<T, E = CacheError> = std::result::Result<T, E>;

impl PartialEq for CacheError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CacheError::DirectoryNotFound(a), CacheError::DirectoryNotFound(b)) => a == b,
            (CacheError::NoCacheDirectory, CacheError::NoCacheDirectory) => true,
            (CacheError::InvalidKey(a), CacheError::InvalidKey(b)) => a == b,
            (CacheError::UnknownMode(a), CacheError::UnknownMode(b)) => a == b,
            (CacheError::UnknownAlphaIndex(a), CacheError::UnknownAlphaIndex(b)) => a == b,
            (
                CacheError::ModeMismatch {
                    expected: a,
                    found: b,
                },
                CacheError::ModeMismatch {
                    expected: c,
                    found: d,
                },
            ) => a == c && b == d,
            (CacheError::SerializationUnsupported(a), CacheError::SerializationUnsupported(b))
            | (CacheError::Deserialization(a), CacheError::Deserialization(b)) => {
                a.to_string() == b.to_string()
            }
            (CacheError::Io(a), CacheError::Io(b)) => a.kind() == b.kind(),
            _ => false,
        }
    }
}
