//! Error types for repodocs.
//!
//! Library crates use [`RepoDocsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all repodocs operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoDocsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Git metadata could not be read.
    #[error("git error: {0}")]
    Git(String),

    /// Manifest or text parsing error (package.json, frontmatter, ...).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// AI text-completion error (transport, API, or response shape).
    #[error("enhancement error: {0}")]
    Enhancement(String),

    /// Markdown-to-MDX transform invariant violation.
    #[error("transform error: {0}")]
    Transform(String),

    /// External command (npm) failed to spawn or exited non-zero.
    #[error("command error: {0}")]
    Command(String),

    /// Data validation error (bad model id, missing repository, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RepoDocsError>;

impl RepoDocsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = RepoDocsError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = RepoDocsError::validation("model id must be provider/model");
        assert!(err.to_string().contains("provider/model"));
    }

    #[test]
    fn io_error_includes_path() {
        let err = RepoDocsError::io(
            "/tmp/missing.md",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("missing.md"));
        assert!(msg.contains("gone"));
    }
}
