//! Error type shared by the estimation and decomposition routines.

use thiserror::Error;

/// Errors surfaced by homography estimation and decomposition.
///
/// Nothing is retried internally: a degenerate or non-converging input is
/// reported to the caller, who owns any resampling or robust re-estimation
/// strategy.
#[derive(Debug, Error)]
pub enum HomographyError {
    /// Correspondence matrix shapes do not match the configured feature count.
    #[error(
        "correspondence matrices must be 3x{expected}, got {rows1}x{cols1} and {rows2}x{cols2}"
    )]
    InvalidDimensions {
        expected: usize,
        rows1: usize,
        cols1: usize,
        rows2: usize,
        cols2: usize,
    },
    /// Fewer correspondences than the selected method requires.
    #[error("need at least {needed} correspondences for {context}, got {got}")]
    NotEnoughPoints {
        needed: usize,
        got: usize,
        context: &'static str,
    },
    /// Input geometry admits no unique solution.
    #[error("degenerate configuration: {0}")]
    SingularConfiguration(&'static str),
    /// The renormalization loop exhausted its iteration budget.
    #[error("renormalization did not converge within {max_iters} iterations")]
    NumericalNonConvergence { max_iters: usize },
    /// The underlying SVD or eigendecomposition failed.
    #[error("svd/eigendecomposition failed")]
    SolverFailure,
}
