//! Fatal errors surfaced by pipeline stages.
//!
//! Tolerated invariant violations (tag mismatches, outlier points) are logged,
//! not returned; only configuration and boundary errors end up here.

use std::fmt;

/// Errors shared by all stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A parameter is outside its admissible range.
    InvalidParams { reason: String },
    /// The solver returned a vector whose length does not match the pool.
    SolutionLength { expected: usize, got: usize },
    /// The external solver failed.
    Solver { reason: String },
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParams { reason } => write!(f, "invalid params: {reason}"),
            Self::SolutionLength { expected, got } => write!(
                f,
                "solution has {got} entries but the candidate pool holds {expected}"
            ),
            Self::Solver { reason } => write!(f, "solver failed: {reason}"),
        }
    }
}

impl std::error::Error for Error {}
