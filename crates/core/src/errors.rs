//! Error types for the mergewise core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from `git` subprocess invocations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// The configured path is not inside a git work tree.
    #[error("not a git repository: '{0}'")]
    NotARepository(String),

    /// A `git` command exited with a non-zero status.
    #[error("git {command} failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Oracle errors
// ---------------------------------------------------------------------------

/// Errors from the external text-generation service.
#[derive(Debug, Error)]
pub enum OracleError {
    /// HTTP-level transport error (network, TLS, timeout).
    #[error("oracle HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The endpoint returned a non-success status code.
    #[error("oracle API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("oracle response parse error: {0}")]
    ParseError(String),

    /// The endpoint answered but produced no text.
    #[error("oracle returned an empty completion")]
    EmptyResponse,

    /// No API token was configured.
    #[error("oracle token not configured (set the variable named by '{0}')")]
    MissingToken(String),
}

// ---------------------------------------------------------------------------
// Conflict errors
// ---------------------------------------------------------------------------

/// Errors from conflict parsing and resolution.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The working-tree file could not be read or written.
    #[error("failed to access '{path}': {source}")]
    FileAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A conflict block was opened but never closed.
    #[error("malformed conflict in '{path}' at line {line}: {detail}")]
    Malformed {
        path: String,
        line: usize,
        detail: String,
    },

    /// The reassembled file did not pass syntax validation.
    #[error("Final validation failed: {0}")]
    FinalValidation(String),

    /// Resolutions must pair one-to-one with parsed conflicts.
    #[error("expected {expected} resolutions for '{path}', got {actual}")]
    ResolutionCountMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    /// The placeholder `interactive` strategy was requested.
    #[error("the interactive strategy is not a resolution mode; list conflicts first, then choose: current, incoming, or both")]
    InteractiveStrategy,

    /// The strategy name is not recognised.
    #[error("invalid strategy '{0}'; valid options: current, incoming, both")]
    UnknownStrategy(String),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = GitError::CommandFailed {
            command: "add".into(),
            exit_code: 128,
            stderr: "fatal: pathspec".into(),
        };
        assert_eq!(err.to_string(), "git add failed (exit 128): fatal: pathspec");

        let err = ConflictError::UnknownStrategy("merge-all".into());
        assert!(err.to_string().contains("current, incoming, both"));

        let err = ConflictError::Malformed {
            path: "a.py".into(),
            line: 3,
            detail: "missing end marker".into(),
        };
        assert!(err.to_string().contains("line 3"));

        let err = OracleError::ApiError {
            status: 503,
            body: "loading".into(),
        };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let git_err = GitError::NotARepository("/tmp".into());
        let core_err: CoreError = git_err.into();
        assert!(matches!(core_err, CoreError::Git(_)));

        let core_err: CoreError = ConflictError::InteractiveStrategy.into();
        assert!(matches!(core_err, CoreError::Conflict(_)));
    }
}
