//! Error types for configuration-server and working-copy operations.
//!
//! Errors are categorized so callers can recover from a missing remote
//! object locally instead of aborting, and can tell transient network
//! failures apart from malformed data.

use std::path::PathBuf;
use thiserror::Error;

/// Categories of errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, timeout, DNS, 5xx (transient, retryable)
    Network,
    /// Object or path does not exist
    NotFound,
    /// Object already exists or was changed concurrently
    Conflict,
    /// Authentication or authorization refused
    Permission,
    /// Malformed JSON, metadata or version string
    Format,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Not found",
            Self::Conflict => "Conflict",
            Self::Permission => "Permission denied",
            Self::Format => "Malformed data",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check the server URL and your connection, then try again",
            Self::NotFound => "Check the name, or the path configured for this kind",
            Self::Conflict => "Reload the object and try again",
            Self::Permission => "Check node_name and client key for the active server",
            Self::Format => "Fix the file or value reported in the message",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while talking to the server or reading the working copy.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-related error (connection, timeout, DNS, 5xx)
    #[error("network error: {message}")]
    Network {
        /// Detailed error message from the failed request
        message: String,
    },

    /// Remote object not found (HTTP 404)
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up, e.g. `roles/web`
        what: String,
    },

    /// Conflict (HTTP 409)
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflict
        message: String,
    },

    /// Permission denied (HTTP 401/403)
    #[error("permission denied: {message}")]
    Permission {
        /// Details about what was refused
        message: String,
    },

    /// Any other non-success HTTP status
    #[error("server returned HTTP {status}")]
    Http {
        /// The status code
        status: u16,
    },

    /// A configured local directory does not exist
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    /// A local file could not be parsed
    #[error("invalid file {path}: {message}")]
    InvalidFile {
        /// Offending file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network { .. } => ErrorCategory::Network,
            Error::NotFound { .. } | Error::PathNotFound(_) => ErrorCategory::NotFound,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::Http { status } if *status >= 500 => ErrorCategory::Network,
            Error::InvalidFile { .. } | Error::Json(_) => ErrorCategory::Format,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether this error means the object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Map an HTTP status to an error, naming the object requested.
    pub fn from_status(status: u16, what: &str) -> Self {
        match status {
            404 => Error::NotFound {
                what: what.to_string(),
            },
            409 => Error::Conflict {
                message: format!("{what} already exists"),
            },
            401 | 403 => Error::Permission {
                message: format!("HTTP {status} on {what}"),
            },
            _ => Error::Http { status },
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::from_status(code, "request"),
            ureq::Error::Io(e) => Self::Network {
                message: e.to_string(),
            },
            other => Self::Network {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for chefkit operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Format.is_retryable());
    }

    #[test]
    fn test_from_status() {
        assert!(Error::from_status(404, "roles/web").is_not_found());
        assert_eq!(
            Error::from_status(409, "data/users").category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            Error::from_status(401, "roles").category(),
            ErrorCategory::Permission
        );
        assert!(Error::from_status(503, "roles").is_retryable());
        assert_eq!(Error::from_status(400, "roles").category(), ErrorCategory::Other);
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::from_status(404, "environments/prod");
        assert_eq!(err.to_string(), "not found: environments/prod");
    }

    #[test]
    fn test_path_not_found_is_not_found() {
        let err = Error::PathNotFound(PathBuf::from("/nope/roles"));
        assert!(err.is_not_found());
    }
}
