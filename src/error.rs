use std::fmt;

use thiserror::Error;

/// Failure reported by a forward-model solve.
///
/// Returned by every `solve_*` method of [`PdeProblem`](crate::PdeProblem).
/// The engine never retries; it wraps the error with the stage it came from.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("solver did not converge after {iterations} iterations (residual {residual:.3e})")]
    NotConverged { iterations: usize, residual: f64 },
    #[error("operator is singular")]
    Singular,
    #[error("solver breakdown: {0}")]
    Breakdown(String),
}

/// Which of the two second-order adjoint solves failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementalStage {
    /// `r_u û = -r_m δm`.
    Forward,
    /// `r_uᵀ p̂ = -(L_uu û + L_um δm)`.
    Adjoint,
}

impl fmt::Display for IncrementalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncrementalStage::Forward => write!(f, "forward"),
            IncrementalStage::Adjoint => write!(f, "adjoint"),
        }
    }
}

/// Errors surfaced by [`ReducedQoi`](crate::ReducedQoi) and the Taylor verifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QoiError {
    #[error("forward solve failed: {0}")]
    ForwardSolve(#[source] SolveError),

    #[error("adjoint solve failed: {0}")]
    AdjointSolve(#[source] SolveError),

    #[error("incremental {stage} solve failed: {source}")]
    IncrementalSolve {
        stage: IncrementalStage,
        #[source]
        source: SolveError,
    },

    /// Vectors from incompatible spaces were combined. This is a programming
    /// error in the caller or in a collaborator, not a numerical failure.
    #[error("dimension mismatch in {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid step sizes: {0}")]
    InvalidStepSize(String),

    #[error("verification cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, QoiError>;

/// Fail with [`QoiError::DimensionMismatch`] unless `found == expected`.
pub(crate) fn check_dim(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(QoiError::DimensionMismatch {
            what,
            expected,
            found,
        })
    }
}
