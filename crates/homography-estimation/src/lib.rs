//! Two-view homography estimation and decomposition.
//!
//! Three estimators share one facade, [`HomographyEstimator`]: a direct
//! least-squares fit, a statistically optimal renormalization scheme, and
//! a virtual parallax method for non-coplanar feature points. The
//! estimated projective homography maps homogeneous pixels of the first
//! view onto the second, `p₂ = s·H·p₁`, with the per-point scale `s`
//! reported alongside.
//!
//! Decomposition recovers the rigid motion and plane normal from a
//! Euclidean homography, either as the classical two-candidate solution
//! or uniquely when the plane normal is known.
//!
//! # Example
//!
//! ```
//! use homography_core::synthetic::{
//!     default_intrinsics, planar_grid, project_two_views, TwoViewGeometry,
//! };
//! use homography_estimation::{EstimationMethod, HomographyEstimator};
//!
//! let geometry = TwoViewGeometry::small_motion();
//! let k = default_intrinsics();
//! let points = planar_grid(&geometry, 3, 3, 0.5);
//! let (p1, p2, _) = project_two_views(&points, &k, &geometry, None);
//!
//! let mut estimator =
//!     HomographyEstimator::new(points.len(), EstimationMethod::DirectLinear).unwrap();
//! let estimate = estimator.compute(&p2, &p1).unwrap();
//! assert_eq!(estimate.homography[(2, 2)], 1.0);
//! ```

/// Homography decomposition and intrinsics conversions.
mod decompose;
/// Direct linear (least squares) estimation.
mod direct;
/// Error type.
mod error;
/// Estimator facade and configuration.
mod estimator;
/// Optimal estimation by renormalization.
mod optimal;
/// Virtual parallax estimation.
mod parallax;

pub use decompose::{
    decompose_homography, decompose_homography_known_normal, euclidean_from_projective,
    projective_from_euclidean, MotionParams,
};
pub use error::HomographyError;
pub use estimator::{EstimationMethod, HomographyEstimate, HomographyEstimator, OptimalOptions};
