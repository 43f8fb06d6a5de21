use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad category of a media fetch failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaErrorCategory {
    /// Media does not exist on the server.
    NotFound,
    /// Invalid request parameters.
    InvalidRequest,
    /// Internal client bug or unexpected response.
    Internal,
}

/// Media fetch error reported by a thumbnail client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct MediaError {
    /// High-level error category.
    pub category: MediaErrorCategory,
    /// Machine-readable protocol error code, for example `M_NOT_FOUND`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl MediaError {
    /// Construct a new media error.
    pub fn new(
        category: MediaErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Standard error for a missing media item.
    pub fn not_found(mxc_url: &str) -> Self {
        Self::new(
            MediaErrorCategory::NotFound,
            "M_NOT_FOUND",
            format!("media '{mxc_url}' was not found"),
        )
    }
}

/// Errors produced by image cache implementations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem access failed.
    #[error("cache i/o failure: {0}")]
    Io(#[from] io::Error),
    /// Cache index could not be encoded or decoded.
    #[error("cache index serialization failure: {0}")]
    Serialization(String),
    /// Bytes are not a supported image format.
    #[error("unsupported image format for '{0}'")]
    UnsupportedFormat(String),
    /// Shared cache state is unusable.
    #[error("cache backend failure: {0}")]
    Backend(String),
}
