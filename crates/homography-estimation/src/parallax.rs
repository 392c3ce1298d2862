//! Virtual parallax estimation for non-coplanar features.
//!
//! The first three correspondences define a virtual reference plane; in
//! the projective bases spanned by those points the plane-induced
//! homography is diagonal. Every 3-combination of the remaining points
//! contributes one trilinear epipolar constraint on seven monomials of the
//! diagonal entries, and the diagonal is read off the near-null space of
//! the stacked constraints.

use homography_core::{symmetric_eigen_sorted, EigenSort, Mat3, Real};
use itertools::Itertools;
use log::warn;
use nalgebra::{DMatrix, DVector, SMatrix};

use crate::error::HomographyError;
use crate::estimator::HomographyEstimate;

/// Determinant threshold below which the reference triangle is rejected.
const BASIS_DET_EPS: Real = 1e-5;
/// Threshold on the second-largest constraint eigenvalue separating the
/// rank-1 shortcut from the general null-space solve.
const RANK_ONE_EPS: Real = 1e-5;

/// Working memory for the parallax solve, sized once per feature count.
#[derive(Debug)]
pub(crate) struct ParallaxScratch {
    /// All 3-combinations of the free point indices `3..n`.
    combos: Vec<[usize; 3]>,
    /// Constraint matrix, one row of seven monomial coefficients per combo.
    coeff: DMatrix<Real>,
    coeff_t: DMatrix<Real>,
    /// 7×7 normal matrix `coeffᵀ · coeff`.
    normal: DMatrix<Real>,
    /// Points of both views expressed in their reference-triangle bases.
    q1: DMatrix<Real>,
    q2: DMatrix<Real>,
}

impl ParallaxScratch {
    pub(crate) fn new(n_features: usize) -> Self {
        // Everything after the reference triple is free: choose(N-3, 3)
        // rows, which keeps the 7x7 eigenproblem overdetermined at the
        // 8-point minimum (10 equations).
        let combos: Vec<[usize; 3]> = (3..n_features)
            .combinations(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        let rows = combos.len();
        Self {
            combos,
            coeff: DMatrix::zeros(rows, 7),
            coeff_t: DMatrix::zeros(7, rows),
            normal: DMatrix::zeros(7, 7),
            q1: DMatrix::zeros(3, n_features),
            q2: DMatrix::zeros(3, n_features),
        }
    }
}

pub(crate) fn compute(
    scratch: &mut ParallaxScratch,
    p2: &DMatrix<Real>,
    p1: &DMatrix<Real>,
) -> Result<HomographyEstimate, HomographyError> {
    let n = p1.ncols();

    // Reference-triangle bases from the first three columns of each view.
    let basis2: Mat3 = p2.fixed_view::<3, 3>(0, 0).into_owned();
    let basis1: Mat3 = p1.fixed_view::<3, 3>(0, 0).into_owned();
    if basis2.determinant().abs() < BASIS_DET_EPS || basis1.determinant().abs() < BASIS_DET_EPS {
        warn!("virtual parallax reference points are (near-)collinear");
        return Err(HomographyError::SingularConfiguration(
            "collinear virtual-plane reference points",
        ));
    }
    let basis2_inv = basis2.try_inverse().ok_or(HomographyError::SolverFailure)?;
    let basis1_inv = basis1.try_inverse().ok_or(HomographyError::SolverFailure)?;

    scratch.q2.gemm(1.0, &basis2_inv, p2, 0.0);
    scratch.q1.gemm(1.0, &basis1_inv, p1, 0.0);

    for (eqn, &[i, j, k]) in scratch.combos.iter().enumerate() {
        let a = |r: usize, c: usize| scratch.q2[(r, c)];
        let b = |r: usize, c: usize| scratch.q1[(r, c)];

        scratch.coeff[(eqn, 0)] = a(2, i) * a(2, j) * a(1, k) * b(0, k)
            * (b(0, j) * b(1, i) - b(0, i) * b(1, j))
            + a(2, i) * a(2, k) * a(1, j) * b(0, j) * (b(0, i) * b(1, k) - b(0, k) * b(1, i))
            + a(2, j) * a(2, k) * a(1, i) * b(0, i) * (b(0, k) * b(1, j) - b(0, j) * b(1, k));

        scratch.coeff[(eqn, 1)] = a(2, i) * a(2, j) * a(0, k) * b(1, k)
            * (b(0, i) * b(1, j) - b(0, j) * b(1, i))
            + a(2, i) * a(2, k) * a(0, j) * b(1, j) * (b(0, k) * b(1, i) - b(0, i) * b(1, k))
            + a(2, j) * a(2, k) * a(0, i) * b(1, i) * (b(0, j) * b(1, k) - b(0, k) * b(1, j));

        scratch.coeff[(eqn, 2)] = a(1, i) * a(1, k) * a(2, j) * b(0, j)
            * (b(0, i) * b(2, k) - b(0, k) * b(2, i))
            + a(1, i) * a(1, j) * a(2, k) * b(0, k) * (b(0, j) * b(2, i) - b(0, i) * b(2, j))
            + a(1, j) * a(1, k) * a(2, i) * b(0, i) * (b(0, k) * b(2, j) - b(0, j) * b(2, k));

        scratch.coeff[(eqn, 3)] = a(0, i) * a(0, k) * a(2, j) * b(1, j)
            * (b(1, i) * b(2, k) - b(1, k) * b(2, i))
            + a(0, i) * a(0, j) * a(2, k) * b(1, k) * (b(1, j) * b(2, i) - b(1, i) * b(2, j))
            + a(0, j) * a(0, k) * a(2, i) * b(1, i) * (b(1, k) * b(2, j) - b(1, j) * b(2, k));

        scratch.coeff[(eqn, 4)] = a(1, j) * a(1, k) * a(0, i) * b(2, i)
            * (b(0, j) * b(2, k) - b(0, k) * b(2, j))
            + a(1, i) * a(1, k) * a(0, j) * b(2, j) * (b(0, k) * b(2, i) - b(0, i) * b(2, k))
            + a(1, i) * a(1, j) * a(0, k) * b(2, k) * (b(0, i) * b(2, j) - b(0, j) * b(2, i));

        scratch.coeff[(eqn, 5)] = a(0, j) * a(0, k) * a(1, i) * b(2, i)
            * (b(1, j) * b(2, k) - b(1, k) * b(2, j))
            + a(0, i) * a(0, k) * a(1, j) * b(2, j) * (b(1, k) * b(2, i) - b(1, i) * b(2, k))
            + a(0, i) * a(0, j) * a(1, k) * b(2, k) * (b(1, i) * b(2, j) - b(1, j) * b(2, i));

        scratch.coeff[(eqn, 6)] = a(0, i) * a(1, k) * a(2, j)
            * (b(0, k) * b(1, j) * b(2, i) - b(0, j) * b(1, i) * b(2, k))
            + a(0, k) * a(1, i) * a(2, j) * (b(0, j) * b(1, k) * b(2, i) - b(0, i) * b(1, j) * b(2, k))
            + a(0, i) * a(1, j) * a(2, k) * (b(0, k) * b(1, i) * b(2, j) - b(0, j) * b(1, k) * b(2, i))
            + a(0, j) * a(1, i) * a(2, k) * (b(0, i) * b(1, k) * b(2, j) - b(0, k) * b(1, j) * b(2, i))
            + a(0, k) * a(1, j) * a(2, i) * (b(0, j) * b(1, i) * b(2, k) - b(0, i) * b(1, k) * b(2, j))
            + a(0, j) * a(1, k) * a(2, i) * (b(0, i) * b(1, j) * b(2, k) - b(0, k) * b(1, i) * b(2, j));
    }

    scratch.coeff_t.tr_copy_from(&scratch.coeff);
    scratch.normal.gemm(1.0, &scratch.coeff_t, &scratch.coeff, 0.0);

    let (values, vectors) =
        symmetric_eigen_sorted(scratch.normal.clone(), EigenSort::AbsAscending)
            .ok_or(HomographyError::SolverFailure)?;

    let mut g = Mat3::identity();
    if values[5].abs() < RANK_ONE_EPS {
        // Rank-1 constraint matrix: the diagonal follows from any single
        // row's coefficient ratios. The divisors are unguarded; a zero
        // coefficient propagates non-finite entries into the result.
        g[(0, 0)] = -scratch.coeff[(0, 4)] / scratch.coeff[(0, 2)];
        g[(1, 1)] = -scratch.coeff[(0, 5)] / scratch.coeff[(0, 3)];
    } else {
        // The null vector holds products of the diagonal entries; arrange
        // them as cross-product style constraints on the diagonal itself
        // and take the near-null direction.
        let e = |r: usize| vectors[(r, 0)];
        #[rustfmt::skip]
        let x = SMatrix::<Real, 10, 3>::from_row_slice(&[
            e(1),  -e(0), 0.0,
            0.0,   -e(2), e(0),
            e(3),  0.0,   -e(1),
            e(6),  0.0,   -e(0),
            e(4),  0.0,   -e(2),
            e(6),  -e(2), 0.0,
            e(3),  -e(6), 0.0,
            0.0,   e(5),  -e(3),
            e(5),  0.0,   -e(6),
            e(5),  -e(4), 0.0,
        ]);
        let xtx = x.transpose() * x;

        let (_, diag_vectors) = symmetric_eigen_sorted(
            DMatrix::from_column_slice(3, 3, xtx.as_slice()),
            EigenSort::AbsAscending,
        )
        .ok_or(HomographyError::SolverFailure)?;

        let sign = if diag_vectors[(0, 0)] < 0.0 { -1.0 } else { 1.0 };
        g[(0, 0)] = sign * diag_vectors[(0, 0)];
        g[(1, 1)] = sign * diag_vectors[(1, 0)];
        g[(2, 2)] = sign * diag_vectors[(2, 0)];
    }

    let unnormalized = basis2 * g * basis1_inv;
    let h33 = unnormalized[(2, 2)];

    // Only the three reference points carry a determined scale.
    let mut scale = DVector::from_element(n, Real::NAN);
    scale[0] = h33 / g[(0, 0)];
    scale[1] = h33 / g[(1, 1)];
    scale[2] = h33 / g[(2, 2)];

    Ok(HomographyEstimate {
        homography: unnormalized / h33,
        scale,
        deviation: None,
        iterations: 0,
    })
}

#[cfg(test)]
mod tests {
    use homography_core::synthetic::{
        default_intrinsics, non_coplanar_cloud, plane_through, project_two_views, TwoViewGeometry,
    };
    use nalgebra::DMatrix;

    use crate::estimator::{EstimationMethod, HomographyEstimator};
    use crate::error::HomographyError;

    #[test]
    fn recovers_the_virtual_plane_homography() {
        let base = TwoViewGeometry::small_motion();
        let cloud = non_coplanar_cloud();
        let (plane_normal, plane_distance) =
            plane_through(&cloud[0], &cloud[1], &cloud[2]).unwrap();
        let geometry = TwoViewGeometry {
            plane_normal,
            plane_distance,
            ..base
        };

        let k = default_intrinsics();
        let (p1, p2, depth_ratio) = project_two_views(&cloud, &k, &geometry, None);

        let mut estimator =
            HomographyEstimator::new(cloud.len(), EstimationMethod::VirtualParallax).unwrap();
        let estimate = estimator.compute(&p2, &p1).unwrap();

        let hp = geometry.projective_homography(&k).unwrap();
        let truth = hp / hp[(2, 2)];
        let relative = (estimate.homography - truth).norm() / truth.norm();
        assert!(relative < 1e-6, "relative error {relative}");

        // Scales are determined for the reference points only.
        for i in 0..3 {
            let expected = depth_ratio[i] * hp[(2, 2)];
            assert!(
                (estimate.scale[i] - expected).abs() < 1e-6,
                "scale {i}: {} vs {expected}",
                estimate.scale[i]
            );
        }
        for i in 3..cloud.len() {
            assert!(estimate.scale[i].is_nan());
        }
        assert_eq!(estimate.iterations, 0);
        assert!(estimate.deviation.is_none());
    }

    #[test]
    fn recovers_at_the_eight_point_minimum() {
        let base = TwoViewGeometry::small_motion();
        let cloud: Vec<_> = non_coplanar_cloud().into_iter().take(8).collect();
        let (plane_normal, plane_distance) =
            plane_through(&cloud[0], &cloud[1], &cloud[2]).unwrap();
        let geometry = TwoViewGeometry {
            plane_normal,
            plane_distance,
            ..base
        };

        let k = default_intrinsics();
        let (p1, p2, _) = project_two_views(&cloud, &k, &geometry, None);

        // Eight points leave five free ones, ten constraint rows: still
        // enough to pin the null direction uniquely.
        let mut estimator =
            HomographyEstimator::new(cloud.len(), EstimationMethod::VirtualParallax).unwrap();
        let estimate = estimator.compute(&p2, &p1).unwrap();

        let hp = geometry.projective_homography(&k).unwrap();
        let truth = hp / hp[(2, 2)];
        let relative = (estimate.homography - truth).norm() / truth.norm();
        assert!(relative < 1e-6, "relative error {relative}");
    }

    #[test]
    fn rejects_collinear_reference_points() {
        let n = 8;
        let mut p1 = DMatrix::from_element(3, n, 1.0);
        let mut p2 = DMatrix::from_element(3, n, 1.0);
        for i in 0..n {
            // First three columns of each view lie on a line.
            p1[(0, i)] = i as f64;
            p1[(1, i)] = 2.0 * i as f64;
            p2[(0, i)] = 1.0 + i as f64;
            p2[(1, i)] = 3.0 * i as f64 + 0.1 * (i as f64).powi(2);
        }

        let mut estimator =
            HomographyEstimator::new(n, EstimationMethod::VirtualParallax).unwrap();
        let err = estimator.compute(&p2, &p1).unwrap_err();
        assert!(matches!(err, HomographyError::SingularConfiguration(_)));
    }
}
