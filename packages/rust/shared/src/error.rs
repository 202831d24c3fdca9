//! Error types for ProxyHarvest.
//!
//! Library crates use [`HarvestError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-source fetch failures are not represented here: they are recovered
//! inside the aggregation step and never reach the caller as errors.

use std::path::PathBuf;

use crate::types::Category;

/// Top-level error type for all ProxyHarvest operations.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The source list for a category could not be found.
    #[error("no source list for {category} at {}", .path.display())]
    MissingSources { category: Category, path: PathBuf },

    /// The source list for a category exists but could not be read.
    #[error("unreadable source list for {category} at {}: {source}", .path.display())]
    UnreadableSources {
        category: Category,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Unknown category name.
    #[error("unknown category '{0}': expected http, socks4 or socks5")]
    UnknownCategory(String),

    /// Network setup error (e.g. the HTTP client could not be built).
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HarvestError>;

impl HarvestError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the run was refused before any fetch.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::MissingSources { .. } | Self::UnreadableSources { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = HarvestError::config("timeout_secs must be positive");
        assert_eq!(err.to_string(), "config error: timeout_secs must be positive");

        let err = HarvestError::MissingSources {
            category: Category::Socks4,
            path: PathBuf::from("/tmp/source/socks4.txt"),
        };
        assert_eq!(
            err.to_string(),
            "no source list for socks4 at /tmp/source/socks4.txt"
        );
    }

    #[test]
    fn configuration_errors_are_classified() {
        let missing = HarvestError::MissingSources {
            category: Category::Http,
            path: PathBuf::from("http.txt"),
        };
        assert!(missing.is_configuration());
        assert!(HarvestError::config("bad").is_configuration());

        let unreadable = HarvestError::UnreadableSources {
            category: Category::Http,
            path: PathBuf::from("http.txt"),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "not UTF-8"),
        };
        assert!(unreadable.is_configuration());

        let io = HarvestError::io(
            "out.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!io.is_configuration());
    }
}
