//! Error types for detection operations.
//!
//! A directory that turns out not to be a JDK is never an error: validation
//! reports it as `None`. The variants here cover the two cases that are
//! surfaced to callers: malformed input and failures of the scan/watch
//! machinery itself.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DetectError>;

/// Errors that can occur while detecting or watching JDKs.
///
/// # Example
///
/// ```rust
/// use jdk_discovery::{DetectError, DetectOptions};
///
/// let err = DetectOptions::from_json(serde_json::json!({ "jdkPaths": 42 })).unwrap_err();
/// assert!(matches!(err, DetectError::InvalidJdkPaths { .. }));
/// assert!(err.is_input_error());
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DetectError {
    /// The caller-supplied JDK paths were neither a string nor a list of strings.
    #[error("jdkPaths must be a string or a list of strings, found {found}")]
    InvalidJdkPaths {
        /// Short description of the value that was supplied (e.g. "number").
        found: String,
    },

    /// The detection options could not be deserialized.
    #[error("Invalid detection options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    /// A search root exists but could not be listed.
    #[error("Failed to scan {}: {source}", path.display())]
    Scan {
        /// The search root being scanned.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The filesystem watcher could not be installed or reported a failure.
    #[error("Filesystem watch failed for {}: {source}", path.display())]
    Watch {
        /// The directory being watched.
        path: PathBuf,
        /// Underlying watcher failure.
        #[source]
        source: notify::Error,
    },
}

impl DetectError {
    /// Whether this error is a caller contract violation rather than an
    /// operational failure. Input errors are never worth retrying.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidJdkPaths { .. } | Self::InvalidOptions(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_jdk_paths_display() {
        let error = DetectError::InvalidJdkPaths {
            found: "number".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "jdkPaths must be a string or a list of strings, found number"
        );
        assert!(error.is_input_error());
    }

    #[test]
    fn test_scan_error_display() {
        let error = DetectError::Scan {
            path: PathBuf::from("/usr/lib/jvm"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(error.to_string().starts_with("Failed to scan /usr/lib/jvm"));
        assert!(!error.is_input_error());
    }

    #[test]
    fn test_watch_error_is_operational() {
        let error = DetectError::Watch {
            path: PathBuf::from("/opt"),
            source: notify::Error::path_not_found(),
        };
        assert!(error.to_string().contains("/opt"));
        assert!(!error.is_input_error());
    }
}
