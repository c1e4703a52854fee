//! Error types for the slideshow engine
//!
//! The taxonomy is deliberately small: the only failure a caller can act on
//! is an empty catalog. Individual decode failures are recovered locally by
//! the loading pipeline and never propagate past it.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced while building the photo catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No usable images were discovered. The host should show a message
    /// prompting the user to add photos and skip starting the slideshow.
    #[error("no photos found - add .jpg or .png images to the photo folder")]
    NoPhotosFound,

    /// The image source itself failed (unreadable directory, etc.).
    #[error("photo enumeration failed: {0}")]
    Source(#[from] std::io::Error),
}

/// Errors from decoding a single photo.
///
/// These are logged and swallowed at the load call site: the tile slot stays
/// empty and the pipeline moves on to the next candidate.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// The decode worker was dropped before producing a result.
    #[error("decode task was cancelled")]
    Cancelled,
}
