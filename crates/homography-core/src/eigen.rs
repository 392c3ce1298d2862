//! Sorted symmetric eigendecomposition and the spectral generalized inverse.
//!
//! The estimation algorithms need eigen-pairs of symmetric matrices in two
//! different orders: signed value descending (the tensor renormalization
//! takes the *last* eigenmatrix) and absolute value ascending (the virtual
//! parallax method takes the near-null eigenvector). Both are thin adapters
//! over [`nalgebra::linalg::SymmetricEigen`].

use nalgebra::linalg::SymmetricEigen;
use nalgebra::{DMatrix, DVector};

use crate::math::{Mat3, Real};

/// Iteration cap handed to the underlying tridiagonal QL solver.
const EIGEN_MAX_SWEEPS: usize = 250;

/// Ordering applied to the eigen-pairs of a symmetric decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigenSort {
    /// Largest signed eigenvalue first.
    SignedDescending,
    /// Smallest `|eigenvalue|` first.
    AbsAscending,
    /// Largest `|eigenvalue|` first.
    AbsDescending,
}

/// Eigen-pairs of a symmetric matrix, sorted by the requested order.
///
/// Eigenvectors are returned as the columns of the second matrix, in the
/// same order as the eigenvalues. The input is assumed symmetric; no check
/// is performed. Returns `None` when the decomposition fails to converge.
pub fn symmetric_eigen_sorted(
    m: DMatrix<Real>,
    sort: EigenSort,
) -> Option<(DVector<Real>, DMatrix<Real>)> {
    let n = m.nrows();
    debug_assert_eq!(n, m.ncols());

    let eig = SymmetricEigen::try_new(m, Real::EPSILON, EIGEN_MAX_SWEEPS)?;
    let values = eig.eigenvalues;
    let vectors = eig.eigenvectors;

    let mut order: Vec<usize> = (0..n).collect();
    match sort {
        EigenSort::SignedDescending => {
            order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
        }
        EigenSort::AbsAscending => {
            order.sort_by(|&a, &b| values[a].abs().total_cmp(&values[b].abs()));
        }
        EigenSort::AbsDescending => {
            order.sort_by(|&a, &b| values[b].abs().total_cmp(&values[a].abs()));
        }
    }

    let mut sorted_values = DVector::zeros(n);
    let mut sorted_vectors = DMatrix::zeros(n, n);
    for (dst, &src) in order.iter().enumerate() {
        sorted_values[dst] = values[src];
        sorted_vectors.set_column(dst, &vectors.column(src));
    }
    Some((sorted_values, sorted_vectors))
}

/// Rank-limited generalized inverse of a symmetric 3×3 matrix.
///
/// Inverts the `rank` spectrally largest components and discards the rest,
/// so that rank-deficient covariance matrices can be used as weights.
/// Returns `None` for an invalid rank, a failed decomposition, or when the
/// retained spectrum is ill-conditioned (ratio above `max_condition`).
pub fn spectral_inverse(m: &Mat3, rank: usize, max_condition: Real) -> Option<Mat3> {
    if rank < 1 || rank > 3 || max_condition < 1.0 {
        return None;
    }

    let (values, vectors) = symmetric_eigen_sorted(
        DMatrix::from_column_slice(3, 3, m.as_slice()),
        EigenSort::AbsDescending,
    )?;

    let emax = values[0].abs();
    let emin = values[rank - 1].abs();
    if emax >= max_condition * emin {
        return None;
    }

    let mut inv = Mat3::zeros();
    for i in 0..rank {
        let u = crate::math::Vec3::new(vectors[(0, i)], vectors[(1, i)], vectors[(2, i)]);
        inv += u * u.transpose() / values[i];
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn sorted_eigen_orders_as_requested() {
        let m = DMatrix::from_row_slice(3, 3, &[2.0, 0.0, 0.0, 0.0, -5.0, 0.0, 0.0, 0.0, 1.0]);

        let (vals, _) = symmetric_eigen_sorted(m.clone(), EigenSort::SignedDescending).unwrap();
        assert!((vals[0] - 2.0).abs() < 1e-12);
        assert!((vals[2] + 5.0).abs() < 1e-12);

        let (vals, vecs) = symmetric_eigen_sorted(m, EigenSort::AbsAscending).unwrap();
        assert!((vals[0] - 1.0).abs() < 1e-12);
        assert!((vals[2] + 5.0).abs() < 1e-12);
        // The eigenvector of the smallest |eigenvalue| is the z axis.
        assert!(vecs[(2, 0)].abs() > 0.99);
    }

    #[test]
    fn spectral_inverse_of_full_rank_matrix_is_the_inverse() {
        let m = Mat3::new(4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0);
        let inv = spectral_inverse(&m, 3, 1e10).unwrap();
        assert!((m * inv - Mat3::identity()).norm() < 1e-10);
    }

    #[test]
    fn spectral_inverse_respects_rank() {
        // Rank-2 matrix: u uᵀ + w wᵀ with orthogonal u, w.
        let u = Vec3::new(1.0, 0.0, 0.0);
        let w = Vec3::new(0.0, 1.0, 0.0);
        let m = u * u.transpose() * 2.0 + w * w.transpose() * 0.5;

        let inv = spectral_inverse(&m, 2, 1e10).unwrap();
        // On the span of {u, w} the result acts as an inverse.
        assert!((inv * (m * u) - u).norm() < 1e-10);
        assert!((inv * (m * w) - w).norm() < 1e-10);
        // The null direction stays null.
        let z = Vec3::new(0.0, 0.0, 1.0);
        assert!((inv * z).norm() < 1e-10);
    }

    #[test]
    fn spectral_inverse_rejects_ill_conditioned_input() {
        let m = Mat3::new(1.0, 0.0, 0.0, 0.0, 1e-14, 0.0, 0.0, 0.0, 1e-14);
        assert!(spectral_inverse(&m, 3, 1e10).is_none());
    }
}
