//! Statistically optimal homography estimation by renormalization.
//!
//! The transfer constraint is written as a fourth-order data tensor acting
//! on the unknown 3×3 matrix. Each iteration reweights the data tensor `M`
//! with per-point covariance inverses, subtracts `c` times the noise tensor
//! `N`, and takes the eigenmatrix of the smallest eigenvalue; `c` grows
//! until that eigenvalue vanishes, which removes the statistical bias of
//! the plain algebraic fit.

use homography_core::{
    exterior_product_mv, exterior_product_vm, levi_civita, spectral_inverse, symmetrize,
    tensor_product, Mat3, Real, Tensor3333, Vec3, Vec9,
};
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use crate::error::HomographyError;
use crate::estimator::{HomographyEstimate, OptimalOptions};

/// Condition number cap for the per-point covariance inverses.
const WEIGHT_MAX_CONDITION: Real = 1e10;

pub(crate) fn compute(
    x1s: &mut [Vec3],
    x2s: &mut [Vec3],
    p2: &DMatrix<Real>,
    p1: &DMatrix<Real>,
    options: &OptimalOptions,
) -> Result<HomographyEstimate, HomographyError> {
    let n = p1.ncols();
    let nf = n as Real;

    let (ic1, ic2, f0) = normalize_points(p1, p2, x1s, x2s)?;

    // Covariance template of a homogeneous image point: unit noise in the
    // image plane, none along the homogeneous coordinate.
    let v0 = Mat3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0);

    let mut weight = Mat3::identity();
    let mut h_mats = [Mat3::zeros(); 9];
    let mut lambda = Vec9::zeros();
    let mut c = 0.0;
    let mut iterations = 0;
    let mut converged = false;

    for it in 1..=options.max_iters {
        let mut m_tensor = Tensor3333::zeros();
        let mut n_tensor = Tensor3333::zeros();

        for a in 0..n {
            let x1 = x1s[a];
            let x2 = x2s[a];

            if it != 1 {
                // Covariance of the transfer residual under the current H,
                // inverted on its rank-2 image-plane support. A failed
                // inversion keeps the previous point's weight.
                let h = &h_mats[8];
                let m1 =
                    exterior_product_vm(&x2, &exterior_product_mv(&(h * v0 * h.transpose()), &x2));
                let hx1 = h * x1;
                let m2 = exterior_product_vm(&hx1, &exterior_product_mv(&v0, &hx1));
                if let Some(inv) = spectral_inverse(&symmetrize(&(m1 + m2)), 2, WEIGHT_MAX_CONDITION)
                {
                    weight = inv;
                }
            }

            // Noise tensor; only the upper half in the (3i+j, 3k+l)
            // ordering is accumulated and mirrored afterwards.
            for i in 0..3 {
                for j in 0..3 {
                    for k in 0..3 {
                        for l in 0..3 {
                            if 3 * i + j > 3 * k + l {
                                continue;
                            }
                            let mut sum = 0.0;
                            for m in 0..3 {
                                for p in 0..3 {
                                    let e1 = levi_civita(i, m, p);
                                    if e1 == 0 {
                                        continue;
                                    }
                                    for q in 0..3 {
                                        for r in 0..3 {
                                            let e = e1 * levi_civita(k, q, r);
                                            if e == 0 {
                                                continue;
                                            }
                                            sum += (e as Real)
                                                * weight[(m, q)]
                                                * (v0[(j, l)] * x2[p] * x2[r]
                                                    + v0[(p, r)] * x1[j] * x1[l]);
                                        }
                                    }
                                }
                            }
                            n_tensor[(i, j, k, l)] += sum;
                        }
                    }
                }
            }

            // Data tensor: the three rows of the transfer constraint,
            // combined with the weight matrix.
            let outer = x2 * x1.transpose();
            let rows = [
                exterior_product_vm(&Vec3::x(), &outer),
                exterior_product_vm(&Vec3::y(), &outer),
                exterior_product_vm(&Vec3::z(), &outer),
            ];
            for k in 0..3 {
                for l in 0..3 {
                    m_tensor += &(tensor_product(&rows[k], &rows[l]) * weight[(k, l)]);
                }
            }
        }

        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    for l in 0..3 {
                        if 3 * i + j > 3 * k + l {
                            n_tensor[(i, j, k, l)] = n_tensor[(k, l, i, j)];
                        }
                    }
                }
            }
        }
        m_tensor /= nf;
        n_tensor /= nf;

        let target = &m_tensor - &(&n_tensor * c);
        let (mats, values) = target
            .eigenmatrices()
            .ok_or(HomographyError::SolverFailure)?;
        h_mats = mats;
        lambda = values;
        iterations = it;

        debug!(
            "renormalization iteration {it}: lambda_min = {:.3e}, c = {:.3e}",
            lambda[8], c
        );

        if lambda[8].abs() < options.epsilon {
            converged = true;
            break;
        }
        if it == options.max_iters {
            break;
        }

        let n_h = n_tensor.contract(&h_mats[8]);
        c += lambda[8] / h_mats[8].dot(&n_h);
    }

    if !converged {
        warn!(
            "renormalization stalled after {} iterations (lambda_min = {:.3e})",
            options.max_iters, lambda[8]
        );
        return Err(HomographyError::NumericalNonConvergence {
            max_iters: options.max_iters,
        });
    }

    let mut h = h_mats[8];
    if h.determinant() < 0.0 {
        h = -h;
    }

    // First-order deviation from the second-smallest eigen-pair, kept in
    // the normalized data frame.
    let eps2 = c / (1.0 - 4.0 / nf);
    let deviation = h_mats[7] * (eps2 / (lambda[7] * nf)).sqrt();

    let homography = denormalize(&h, &ic1, &ic2, f0);
    let homography = homography / homography[(2, 2)];

    let mut scale = DVector::zeros(n);
    for i in 0..n {
        scale[i] = 1.0
            / (homography[(2, 0)] * p1[(0, i)]
                + homography[(2, 1)] * p1[(1, i)]
                + homography[(2, 2)]);
    }

    Ok(HomographyEstimate {
        homography,
        scale,
        deviation: Some(deviation),
        iterations,
    })
}

/// Center both point sets on their image centroids and scale by a shared
/// factor `f0` (twice the largest coordinate spread), flipping the x axis.
///
/// Returns the two centroids and `f0`, which [`denormalize`] undoes.
fn normalize_points(
    p1: &DMatrix<Real>,
    p2: &DMatrix<Real>,
    x1s: &mut [Vec3],
    x2s: &mut [Vec3],
) -> Result<(Vec3, Vec3, Real), HomographyError> {
    let n = p1.ncols();
    let nf = n as Real;

    let mut ic1 = Vec3::zeros();
    let mut ic2 = Vec3::zeros();
    for i in 0..n {
        ic1 += Vec3::new(p1[(0, i)], p1[(1, i)], p1[(2, i)]);
        ic2 += Vec3::new(p2[(0, i)], p2[(1, i)], p2[(2, i)]);
    }
    ic1 /= nf;
    ic2 /= nf;

    let mut spread: Real = 0.0;
    for row in 0..2 {
        for m in [p1, p2] {
            let mut lo = m[(row, 0)];
            let mut hi = lo;
            for i in 1..n {
                lo = lo.min(m[(row, i)]);
                hi = hi.max(m[(row, i)]);
            }
            spread = spread.max(hi - lo);
        }
    }
    if spread <= 0.0 {
        return Err(HomographyError::SingularConfiguration(
            "all correspondences coincide",
        ));
    }
    let f0 = 2.0 * spread;

    for i in 0..n {
        x1s[i] = Vec3::new((ic1.x - p1[(0, i)]) / f0, (p1[(1, i)] - ic1.y) / f0, 1.0);
        x2s[i] = Vec3::new((ic2.x - p2[(0, i)]) / f0, (p2[(1, i)] - ic2.y) / f0, 1.0);
    }

    Ok((ic1, ic2, f0))
}

/// Map the homography from the normalized frame back to pixel coordinates
/// and fix its Frobenius norm to 1.
fn denormalize(h: &Mat3, ic1: &Vec3, ic2: &Vec3, f0: Real) -> Mat3 {
    let a = Mat3::new(
        -1.0 / f0,
        0.0,
        ic1.x / f0,
        0.0,
        1.0 / f0,
        -ic1.y / f0,
        0.0,
        0.0,
        1.0,
    );
    let b = Mat3::new(-f0, 0.0, ic2.x, 0.0, f0, ic2.y, 0.0, 0.0, 1.0);
    let product = b * h * a;
    product / product.norm()
}

#[cfg(test)]
mod tests {
    use homography_core::synthetic::{
        default_intrinsics, planar_grid, project_two_views, TwoViewGeometry, UniformPixelNoise,
    };

    use crate::estimator::{EstimationMethod, HomographyEstimator};

    #[test]
    fn noise_free_data_converges_immediately() {
        let geometry = TwoViewGeometry::small_motion();
        let k = default_intrinsics();
        let points = planar_grid(&geometry, 3, 3, 0.5);
        let (p1, p2, _) = project_two_views(&points, &k, &geometry, None);

        let mut estimator =
            HomographyEstimator::new(points.len(), EstimationMethod::Optimal).unwrap();
        let estimate = estimator.compute(&p2, &p1).unwrap();

        let hp = geometry.projective_homography(&k).unwrap();
        let truth = hp / hp[(2, 2)];
        assert!(
            (estimate.homography - truth).norm() < 1e-6 * truth.norm(),
            "homography mismatch:\n{}\nvs\n{}",
            estimate.homography,
            truth
        );
        assert!(estimate.iterations <= 2, "took {}", estimate.iterations);
        assert!(estimate.deviation.is_some());
    }

    #[test]
    fn noisy_data_converges_within_the_budget() {
        let geometry = TwoViewGeometry::small_motion();
        let k = default_intrinsics();
        let points = planar_grid(&geometry, 4, 4, 0.5);
        let noise = UniformPixelNoise {
            seed: 42,
            max_abs_px: 0.3,
        };
        let (p1, p2, _) = project_two_views(&points, &k, &geometry, Some(&noise));

        let mut estimator =
            HomographyEstimator::new(points.len(), EstimationMethod::Optimal).unwrap();
        let estimate = estimator.compute(&p2, &p1).unwrap();

        assert!(estimate.iterations < 50, "took {}", estimate.iterations);

        let hp = geometry.projective_homography(&k).unwrap();
        let truth = hp / hp[(2, 2)];
        let relative = (estimate.homography - truth).norm() / truth.norm();
        assert!(relative < 1e-2, "relative error {relative}");
    }
}
