//! Error types for the alignment engine.

use thiserror::Error;

/// Errors raised while classifying or committing candidates.
#[derive(Debug, Error)]
pub enum Error {
    /// A version string could not be read as a semantic version
    #[error("invalid version for {name}: {version:?}")]
    InvalidVersion {
        /// Item the version belongs to
        name: String,
        /// The offending version string
        version: String,
    },

    /// A commit for one item failed
    #[error("unable to update {key}: {message}")]
    Commit {
        /// Display form of the item key
        key: String,
        /// Underlying cause
        message: String,
    },
}

/// Result type for alignment operations.
pub type Result<T> = std::result::Result<T, Error>;
