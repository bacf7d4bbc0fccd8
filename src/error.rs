//! Error taxonomy for the propagation pipeline.
//!
//! Nothing in the pipeline recovers locally: windowing, filtering, solver
//! and persistence failures all reach the caller unchanged.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SeisError>;

#[derive(Error, Debug)]
pub enum SeisError {
    /// Malformed or inconsistent geometry descriptor.
    #[error("geometry error: {reason}")]
    Geometry { reason: String },

    /// Field or data shape does not match what it describes.
    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    Dimension {
        what: String,
        expected: String,
        found: String,
    },

    /// Option values outside their accepted range.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// Receivers left nothing inside the active model domain.
    #[error("domain error: {reason}")]
    Domain { reason: String },

    /// Opaque failure reported by the propagation engine.
    #[error("solver error: {0}")]
    Solver(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace container error: {0}")]
    Container(#[from] serde_json::Error),
}

impl SeisError {
    pub fn geometry(reason: impl Into<String>) -> Self {
        SeisError::Geometry {
            reason: reason.into(),
        }
    }

    pub fn dimension(
        what: impl Into<String>,
        expected: impl std::fmt::Debug,
        found: impl std::fmt::Debug,
    ) -> Self {
        SeisError::Dimension {
            what: what.into(),
            expected: format!("{expected:?}"),
            found: format!("{found:?}"),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        SeisError::Config {
            reason: reason.into(),
        }
    }

    pub fn domain(reason: impl Into<String>) -> Self {
        SeisError::Domain {
            reason: reason.into(),
        }
    }

    pub fn solver<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        SeisError::Solver(error.into())
    }
}
