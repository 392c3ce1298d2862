//! Estimator facade: method selection, input validation, and scratch
//! buffer ownership.

use homography_core::{Mat3, Real, Vec3};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::HomographyError;
use crate::parallax::ParallaxScratch;
use crate::{direct, optimal, parallax};

/// Homography estimation algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimationMethod {
    /// Plain least squares on the transfer equations, denominator fixed to 1.
    DirectLinear,
    /// Statistically optimal estimation by tensor renormalization.
    Optimal,
    /// Virtual parallax estimation for non-coplanar features.
    ///
    /// The first three columns of the correspondence matrices span the
    /// virtual reference plane; every 3-combination of the remaining
    /// points contributes one constraint.
    VirtualParallax,
}

/// Tuning knobs for the [`EstimationMethod::Optimal`] renormalization loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimalOptions {
    /// Convergence threshold on the smallest eigenvalue.
    pub epsilon: Real,
    /// Iteration budget before giving up.
    pub max_iters: usize,
}

impl Default for OptimalOptions {
    fn default() -> Self {
        Self {
            epsilon: 1e-10,
            max_iters: 100,
        }
    }
}

/// Result of a homography estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomographyEstimate {
    /// Estimated projective homography, normalized so the (3,3) entry is 1.
    ///
    /// Maps first-view pixels to second-view pixels up to the per-point
    /// depth-ratio scale: `p₂ = scale[i] · H · p₁`.
    pub homography: Mat3,
    /// Per-correspondence scale factor `z₁/z₂` recovered alongside `H`.
    ///
    /// The parallax method only determines the scale of its three
    /// reference-plane points; the remaining entries are NaN.
    pub scale: DVector<Real>,
    /// First-order deviation of the optimal solution, in the normalized
    /// data frame. `None` for the non-iterative methods.
    pub deviation: Option<Mat3>,
    /// Renormalization iterations spent (1 for the direct method, 0 for
    /// virtual parallax).
    pub iterations: usize,
}

/// Homography estimator for a fixed number of correspondences.
///
/// All working memory is sized at construction, so repeated calls to
/// [`HomographyEstimator::compute`] on same-shaped inputs allocate only
/// what `nalgebra` decompositions allocate internally.
#[derive(Debug)]
pub struct HomographyEstimator {
    n_features: usize,
    method: EstimationMethod,
    options: OptimalOptions,
    scratch: Scratch,
}

#[derive(Debug)]
enum Scratch {
    Direct {
        design: DMatrix<Real>,
        rhs: DVector<Real>,
    },
    Optimal {
        x1: Vec<Vec3>,
        x2: Vec<Vec3>,
    },
    Parallax(ParallaxScratch),
}

impl HomographyEstimator {
    /// Create an estimator for `n_features` correspondences.
    ///
    /// The direct and optimal methods need at least 4 correspondences, the
    /// virtual parallax method at least 8.
    pub fn new(n_features: usize, method: EstimationMethod) -> Result<Self, HomographyError> {
        Self::with_options(n_features, method, OptimalOptions::default())
    }

    /// Like [`HomographyEstimator::new`] with explicit renormalization
    /// options (ignored by the non-iterative methods).
    pub fn with_options(
        n_features: usize,
        method: EstimationMethod,
        options: OptimalOptions,
    ) -> Result<Self, HomographyError> {
        let (needed, context) = match method {
            EstimationMethod::DirectLinear => (4, "direct linear estimation"),
            EstimationMethod::Optimal => (4, "optimal estimation"),
            EstimationMethod::VirtualParallax => (8, "virtual parallax estimation"),
        };
        if n_features < needed {
            return Err(HomographyError::NotEnoughPoints {
                needed,
                got: n_features,
                context,
            });
        }

        let scratch = match method {
            EstimationMethod::DirectLinear => Scratch::Direct {
                design: DMatrix::zeros(2 * n_features, 8),
                rhs: DVector::zeros(2 * n_features),
            },
            EstimationMethod::Optimal => Scratch::Optimal {
                x1: vec![Vec3::zeros(); n_features],
                x2: vec![Vec3::zeros(); n_features],
            },
            EstimationMethod::VirtualParallax => Scratch::Parallax(ParallaxScratch::new(n_features)),
        };

        Ok(Self {
            n_features,
            method,
            options,
            scratch,
        })
    }

    /// Number of correspondences this estimator was sized for.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Selected estimation method.
    pub fn method(&self) -> EstimationMethod {
        self.method
    }

    /// Estimate the homography mapping `p1` to `p2`.
    ///
    /// Both inputs are 3×N matrices of homogeneous pixel columns with the
    /// third row equal to 1, where N is the configured feature count. The
    /// returned homography satisfies `p2[:, i] = scale[i] · H · p1[:, i]`
    /// for noise-free input.
    pub fn compute(
        &mut self,
        p2: &DMatrix<Real>,
        p1: &DMatrix<Real>,
    ) -> Result<HomographyEstimate, HomographyError> {
        let n = self.n_features;
        if p1.nrows() != 3 || p1.ncols() != n || p2.nrows() != 3 || p2.ncols() != n {
            return Err(HomographyError::InvalidDimensions {
                expected: n,
                rows1: p1.nrows(),
                cols1: p1.ncols(),
                rows2: p2.nrows(),
                cols2: p2.ncols(),
            });
        }

        match &mut self.scratch {
            Scratch::Direct { design, rhs } => direct::compute(design, rhs, p2, p1),
            Scratch::Optimal { x1, x2 } => optimal::compute(x1, x2, p2, p1, &self.options),
            Scratch::Parallax(scratch) => parallax::compute(scratch, p2, p1),
        }
    }
}
