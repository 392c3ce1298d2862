//! Linear algebra type aliases and small matrix helpers.
//!
//! This module fixes the scalar type used throughout the workspace and
//! provides the handful of 3×3 matrix operations the estimation algorithms
//! rely on but that are not part of a dense linear-algebra library:
//! the co-factor style *exterior products* and the (anti)symmetrization
//! helpers used by the tensor layer.

use nalgebra::{Matrix3, SMatrix, SVector, Vector2, Vector3};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 6D vector (packed symmetric 3×3 matrix).
pub type Vec6 = SVector<Real, 6>;
/// 9D vector (packed 3×3 matrix, row-major).
pub type Vec9 = SVector<Real, 9>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 6×6 matrix (packed symmetric form of a [`crate::Tensor3333`]).
pub type Mat6 = SMatrix<Real, 6, 6>;
/// 9×9 matrix (packed form of a [`crate::Tensor3333`]).
pub type Mat9 = SMatrix<Real, 9, 9>;

/// Lift image coordinates `(x, y)` to a homogeneous column `(x, y, 1)`.
#[inline]
pub fn to_homogeneous(p: &Vec2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

/// Project a homogeneous column `(x, y, w)` back to `(x / w, y / w)`.
///
/// The caller is responsible for ensuring that `w != 0`.
#[inline]
pub fn from_homogeneous(v: &Vec3) -> Vec2 {
    Vec2::new(v.x / v.z, v.y / v.z)
}

/// Symmetric part of a square matrix, `(m + mᵀ) / 2`.
#[inline]
pub fn symmetrize<const D: usize>(m: &SMatrix<Real, D, D>) -> SMatrix<Real, D, D> {
    (m + m.transpose()) / 2.0
}

/// Antisymmetric part of a square matrix, `(m − mᵀ) / 2`.
#[inline]
pub fn antisymmetrize<const D: usize>(m: &SMatrix<Real, D, D>) -> SMatrix<Real, D, D> {
    (m - m.transpose()) / 2.0
}

/// Exterior product of two 3×3 matrices.
///
/// Entry `(i, j)` contracts the complementary 2×2 blocks of `m1` and `m2`,
/// generalizing the vector cross product to matrix arguments. With
/// `m1 == m2` this is twice the co-factor matrix.
pub fn exterior_product(m1: &Mat3, m2: &Mat3) -> Mat3 {
    let mut n = Mat3::zeros();
    n[(0, 0)] = m1[(1, 1)] * m2[(2, 2)] - m1[(1, 2)] * m2[(2, 1)] - m1[(2, 1)] * m2[(1, 2)]
        + m1[(2, 2)] * m2[(1, 1)];
    n[(0, 1)] = -m1[(1, 0)] * m2[(2, 2)] + m1[(1, 2)] * m2[(2, 0)] + m1[(2, 0)] * m2[(1, 2)]
        - m1[(2, 2)] * m2[(1, 0)];
    n[(0, 2)] = m1[(1, 0)] * m2[(2, 1)] - m1[(1, 1)] * m2[(2, 0)] - m1[(2, 0)] * m2[(1, 1)]
        + m1[(2, 1)] * m2[(1, 0)];
    n[(1, 0)] = -m1[(0, 1)] * m2[(2, 2)] + m1[(0, 2)] * m2[(2, 1)] + m1[(2, 1)] * m2[(0, 2)]
        - m1[(2, 2)] * m2[(0, 1)];
    n[(1, 1)] = m1[(0, 0)] * m2[(2, 2)] - m1[(0, 2)] * m2[(2, 0)] - m1[(2, 0)] * m2[(0, 2)]
        + m1[(2, 2)] * m2[(0, 0)];
    n[(1, 2)] = -m1[(0, 0)] * m2[(2, 1)] + m1[(0, 1)] * m2[(2, 0)] + m1[(2, 0)] * m2[(0, 1)]
        - m1[(2, 1)] * m2[(0, 0)];
    n[(2, 0)] = m1[(0, 1)] * m2[(1, 2)] - m1[(0, 2)] * m2[(1, 1)] - m1[(1, 1)] * m2[(0, 2)]
        + m1[(1, 2)] * m2[(0, 1)];
    n[(2, 1)] = -m1[(0, 0)] * m2[(1, 2)] + m1[(0, 2)] * m2[(1, 0)] + m1[(1, 0)] * m2[(0, 2)]
        - m1[(1, 2)] * m2[(0, 0)];
    n[(2, 2)] = m1[(0, 0)] * m2[(1, 1)] - m1[(0, 1)] * m2[(1, 0)] - m1[(1, 0)] * m2[(0, 1)]
        + m1[(1, 1)] * m2[(0, 0)];
    n
}

/// Exterior product of a 3×3 matrix and a 3-vector.
///
/// Each row of the result is the cross product of `v` with the
/// corresponding row of `m`.
pub fn exterior_product_mv(m: &Mat3, v: &Vec3) -> Mat3 {
    let mut n = Mat3::zeros();
    for i in 0..3 {
        n[(i, 0)] = m[(i, 2)] * v[1] - m[(i, 1)] * v[2];
        n[(i, 1)] = m[(i, 0)] * v[2] - m[(i, 2)] * v[0];
        n[(i, 2)] = m[(i, 1)] * v[0] - m[(i, 0)] * v[1];
    }
    n
}

/// Exterior product of a 3-vector and a 3×3 matrix.
///
/// Each column of the result is the cross product of `v` with the
/// corresponding column of `m`.
pub fn exterior_product_vm(v: &Vec3, m: &Mat3) -> Mat3 {
    let mut n = Mat3::zeros();
    for i in 0..3 {
        n[(0, i)] = v[1] * m[(2, i)] - v[2] * m[(1, i)];
        n[(1, i)] = v[2] * m[(0, i)] - v[0] * m[(2, i)];
        n[(2, i)] = v[0] * m[(1, i)] - v[1] * m[(0, i)];
    }
    n
}

/// Levi-Civita permutation symbol for indices in `{0, 1, 2}`.
///
/// Returns `+1` for even permutations of `(0, 1, 2)`, `-1` for odd ones,
/// and `0` whenever two indices coincide.
#[inline]
pub fn levi_civita(i: usize, j: usize, k: usize) -> i32 {
    match (i, j, k) {
        (0, 1, 2) | (1, 2, 0) | (2, 0, 1) => 1,
        (0, 2, 1) | (1, 0, 2) | (2, 1, 0) => -1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exterior_product_of_vectors_matches_cross_product() {
        // With rank-one arguments v·wᵀ the matrix exterior products reduce
        // to ordinary cross products on the factor vectors.
        let v = Vec3::new(1.0, -2.0, 0.5);
        let w = Vec3::new(0.3, 0.7, -1.1);
        let m = w * v.transpose();

        let a = exterior_product_vm(&v, &m);
        let expected = v.cross(&w) * v.transpose();
        assert!((a - expected).norm() < 1e-12);

        let u = Vec3::new(-0.4, 1.2, 0.9);
        let b = exterior_product_mv(&(w * u.transpose()), &v);
        let expected = w * v.cross(&u).transpose();
        assert!((b - expected).norm() < 1e-12);
    }

    #[test]
    fn exterior_product_is_symmetric_in_arguments() {
        let m1 = Mat3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0);
        let m2 = Mat3::new(-1.0, 0.5, 0.0, 2.0, 1.0, -3.0, 0.7, 0.2, 1.5);
        let a = exterior_product(&m1, &m2);
        let b = exterior_product(&m2, &m1);
        assert!((a - b).norm() < 1e-12);
    }

    #[test]
    fn symmetrize_splits_a_matrix() {
        let m = Mat3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let s = symmetrize(&m);
        let a = antisymmetrize(&m);
        assert!(((s + a) - m).norm() < 1e-12);
        assert!((s - s.transpose()).norm() < 1e-12);
        assert!((a + a.transpose()).norm() < 1e-12);
    }

    #[test]
    fn levi_civita_values() {
        assert_eq!(levi_civita(0, 1, 2), 1);
        assert_eq!(levi_civita(2, 1, 0), -1);
        assert_eq!(levi_civita(0, 0, 1), 0);
    }
}
