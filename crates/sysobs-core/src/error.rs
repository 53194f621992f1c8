//! Error taxonomy shared by every sysobs computation.
//!
//! Validation and numerical failures are returned to the caller immediately.
//! [`SysobsError::MissingRecord`] is the one variant batch loops treat as a
//! per-item skip rather than a fatal error.

use std::path::PathBuf;

/// Errors produced by driver synthesis, model reduction, simulation and
/// result persistence.
#[derive(Debug, thiserror::Error)]
pub enum SysobsError {
    /// Degenerate or malformed input (bad sample count, scene source, window).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A vector or matrix does not match the parameter dimension.
    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// A covariance or precision matrix failed its Cholesky factorization.
    #[error("{0} is not positive-definite")]
    NotPositiveDefinite(&'static str),

    /// No persisted inversion exists for this subject and noise level.
    #[error("no inversion record for subject '{subject}' at log-precision {log_precision}")]
    MissingRecord { subject: String, log_precision: i32 },

    /// A scene-cut file row could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The external inversion engine reported a failure.
    #[error("inversion engine '{engine}' failed: {message}")]
    Engine { engine: String, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SysobsError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn dimension(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected,
            found,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout `sysobs-core`.
pub type Result<T> = std::result::Result<T, SysobsError>;
