//! Direct linear estimation: least squares on the transfer equations with
//! the homography denominator fixed to 1.

use homography_core::{Mat3, Real};
use nalgebra::{DMatrix, DVector};

use crate::error::HomographyError;
use crate::estimator::HomographyEstimate;

/// Singular value threshold for the least-squares solve.
const SOLVE_EPS: Real = 1e-12;

/// Solve for the eight free homography entries from the 2N transfer
/// equations, then recover the per-point scales from the third row.
///
/// Each correspondence contributes two rows of the design matrix, one for
/// the x transfer equation and one for y, with `h₃₃` pinned to 1.
pub(crate) fn compute(
    design: &mut DMatrix<Real>,
    rhs: &mut DVector<Real>,
    p2: &DMatrix<Real>,
    p1: &DMatrix<Real>,
) -> Result<HomographyEstimate, HomographyError> {
    let n = p1.ncols();

    for i in 0..n {
        let x1 = p1[(0, i)];
        let y1 = p1[(1, i)];
        let x2 = p2[(0, i)];
        let y2 = p2[(1, i)];

        let rx = 2 * i;
        design[(rx, 0)] = x1;
        design[(rx, 1)] = y1;
        design[(rx, 2)] = 1.0;
        design[(rx, 3)] = 0.0;
        design[(rx, 4)] = 0.0;
        design[(rx, 5)] = 0.0;
        design[(rx, 6)] = -x1 * x2;
        design[(rx, 7)] = -y1 * x2;
        rhs[rx] = x2;

        let ry = rx + 1;
        design[(ry, 0)] = 0.0;
        design[(ry, 1)] = 0.0;
        design[(ry, 2)] = 0.0;
        design[(ry, 3)] = x1;
        design[(ry, 4)] = y1;
        design[(ry, 5)] = 1.0;
        design[(ry, 6)] = -x1 * y2;
        design[(ry, 7)] = -y1 * y2;
        rhs[ry] = y2;
    }

    let svd = design.clone().svd(true, true);
    let h = svd
        .solve(rhs, SOLVE_EPS)
        .map_err(|_| HomographyError::SolverFailure)?;

    let homography = Mat3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);

    let mut scale = DVector::zeros(n);
    for i in 0..n {
        scale[i] = 1.0 / (h[6] * p1[(0, i)] + h[7] * p1[(1, i)] + 1.0);
    }

    Ok(HomographyEstimate {
        homography,
        scale,
        deviation: None,
        iterations: 1,
    })
}

#[cfg(test)]
mod tests {
    use homography_core::synthetic::{
        default_intrinsics, planar_grid, project_two_views, TwoViewGeometry,
    };
    use homography_core::Vec3;

    use crate::estimator::{EstimationMethod, HomographyEstimator};

    #[test]
    fn recovers_a_planar_homography_exactly() {
        let geometry = TwoViewGeometry::small_motion();
        let k = default_intrinsics();
        let points = planar_grid(&geometry, 3, 3, 0.5);
        let (p1, p2, _) = project_two_views(&points, &k, &geometry, None);

        let mut estimator =
            HomographyEstimator::new(points.len(), EstimationMethod::DirectLinear).unwrap();
        let estimate = estimator.compute(&p2, &p1).unwrap();

        let hp = geometry.projective_homography(&k).unwrap();
        let truth = hp / hp[(2, 2)];
        assert!(
            (estimate.homography - truth).norm() < 1e-8 * truth.norm(),
            "homography mismatch: {:?}",
            estimate.homography
        );
        assert_eq!(estimate.iterations, 1);
        assert!(estimate.deviation.is_none());
    }

    #[test]
    fn scale_reproduces_the_transfer_relation() {
        let geometry = TwoViewGeometry::small_motion();
        let k = default_intrinsics();
        let points = planar_grid(&geometry, 4, 3, 0.4);
        let (p1, p2, depth_ratio) = project_two_views(&points, &k, &geometry, None);

        let mut estimator =
            HomographyEstimator::new(points.len(), EstimationMethod::DirectLinear).unwrap();
        let estimate = estimator.compute(&p2, &p1).unwrap();

        let hp = geometry.projective_homography(&k).unwrap();
        for i in 0..points.len() {
            let q1 = Vec3::new(p1[(0, i)], p1[(1, i)], 1.0);
            let q2 = Vec3::new(p2[(0, i)], p2[(1, i)], 1.0);
            let mapped = estimate.scale[i] * (estimate.homography * q1);
            assert!((mapped - q2).norm() < 1e-8, "point {i}");
            // The estimated scale is the depth ratio weighted by the
            // normalization of H.
            let expected = depth_ratio[i] * hp[(2, 2)];
            assert!((estimate.scale[i] - expected).abs() < 1e-8, "scale {i}");
        }
    }
}
