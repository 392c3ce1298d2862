//! Fourth-order 3×3×3×3 tensor algebra for the optimal homography estimator.
//!
//! [`Tensor3333`] is a plain 81-scalar value type with arithmetic operators
//! and the packing conversions the renormalization algorithm needs: the
//! general 9×9 matrix form, the symmetric 6×6 form (for tensors symmetric in
//! both index pairs), and the matrix↔vector packings that go with them.
//! Index-swap symmetries are relied upon by the symmetric conversions but
//! never checked at runtime.

use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

use nalgebra::DMatrix;

use crate::eigen::{symmetric_eigen_sorted, EigenSort};
use crate::math::{symmetrize, Mat3, Mat6, Mat9, Real, Vec3, Vec6, Vec9};

const SQRT_2: Real = std::f64::consts::SQRT_2;

/// Index pairs backing the packed symmetric 6-dimensional representation,
/// in the order `(00, 11, 22, 12, 20, 01)`, with their packing weights.
const SYM_PAIRS: [(usize, usize, Real); 6] = [
    (0, 0, 1.0),
    (1, 1, 1.0),
    (2, 2, 1.0),
    (1, 2, SQRT_2),
    (2, 0, SQRT_2),
    (0, 1, SQRT_2),
];

/// A 3×3×3×3 tensor of [`Real`] scalars.
///
/// Stored flat in lexicographic index order; entry `(i, j, k, l)` lives at
/// `27i + 9j + 3k + l`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor3333 {
    t: [Real; 81],
}

impl Default for Tensor3333 {
    fn default() -> Self {
        Self { t: [0.0; 81] }
    }
}

impl Tensor3333 {
    /// The zero tensor.
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Reset every component to zero.
    pub fn clear(&mut self) {
        self.t = [0.0; 81];
    }

    /// Contract the trailing index pair with a 3×3 matrix:
    /// `out(i, j) = Σ_{k,l} t(i, j, k, l) · m(k, l)`.
    pub fn contract(&self, m: &Mat3) -> Mat3 {
        let mut out = Mat3::zeros();
        for i in 0..3 {
            for j in 0..3 {
                let mut sum = 0.0;
                for k in 0..3 {
                    for l in 0..3 {
                        sum += self.t[27 * i + 9 * j + 3 * k + l] * m[(k, l)];
                    }
                }
                out[(i, j)] = sum;
            }
        }
        out
    }

    /// Pack into the general 9×9 matrix form:
    /// `m(3i + j, 3k + l) = t(i, j, k, l)`.
    pub fn to_mat9(&self) -> Mat9 {
        let mut m = Mat9::zeros();
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    for l in 0..3 {
                        m[(3 * i + j, 3 * k + l)] = self[(i, j, k, l)];
                    }
                }
            }
        }
        m
    }

    /// Inverse of [`Tensor3333::to_mat9`].
    pub fn from_mat9(m: &Mat9) -> Self {
        let mut t = Self::zeros();
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    for l in 0..3 {
                        t[(i, j, k, l)] = m[(3 * i + j, 3 * k + l)];
                    }
                }
            }
        }
        t
    }

    /// Pack a doubly-symmetric tensor (`t(i,j,k,l) = t(j,i,k,l) = t(i,j,l,k)`)
    /// into its 6×6 matrix form, with `√2`-weighted off-diagonal slots.
    ///
    /// The symmetry assumption is not verified.
    pub fn to_mat6(&self) -> Mat6 {
        let mut m = Mat6::zeros();
        for (r, &(i, j, wr)) in SYM_PAIRS.iter().enumerate() {
            for (c, &(k, l, wc)) in SYM_PAIRS.iter().enumerate() {
                m[(r, c)] = wr * wc * self[(i, j, k, l)];
            }
        }
        m
    }

    /// Inverse of [`Tensor3333::to_mat6`]; expands every index-swap copy.
    pub fn from_mat6(m: &Mat6) -> Self {
        let mut t = Self::zeros();
        for (r, &(i, j, wr)) in SYM_PAIRS.iter().enumerate() {
            for (c, &(k, l, wc)) in SYM_PAIRS.iter().enumerate() {
                let value = m[(r, c)] / (wr * wc);
                t[(i, j, k, l)] = value;
                t[(j, i, k, l)] = value;
                t[(i, j, l, k)] = value;
                t[(j, i, l, k)] = value;
            }
        }
        t
    }

    /// Eigenvalues and eigenmatrices of the tensor seen as a symmetric
    /// operator on 3×3 matrices.
    ///
    /// The 9×9 packing is symmetrized and decomposed; eigenvalues come out
    /// in descending signed order, each with the corresponding eigenvector
    /// reshaped into a 3×3 eigenmatrix. Returns `None` when the underlying
    /// decomposition fails.
    pub fn eigenmatrices(&self) -> Option<([Mat3; 9], Vec9)> {
        let packed = symmetrize(&self.to_mat9());
        let dynm = DMatrix::from_column_slice(9, 9, packed.as_slice());
        let (values, vectors) = symmetric_eigen_sorted(dynm, EigenSort::SignedDescending)?;

        let mut lambda = Vec9::zeros();
        let mut mats = [Mat3::zeros(); 9];
        for idx in 0..9 {
            lambda[idx] = values[idx];
            for r in 0..3 {
                for c in 0..3 {
                    mats[idx][(r, c)] = vectors[(3 * r + c, idx)];
                }
            }
        }
        Some((mats, lambda))
    }
}

impl Index<(usize, usize, usize, usize)> for Tensor3333 {
    type Output = Real;

    #[inline]
    fn index(&self, (i, j, k, l): (usize, usize, usize, usize)) -> &Real {
        &self.t[27 * i + 9 * j + 3 * k + l]
    }
}

impl IndexMut<(usize, usize, usize, usize)> for Tensor3333 {
    #[inline]
    fn index_mut(&mut self, (i, j, k, l): (usize, usize, usize, usize)) -> &mut Real {
        &mut self.t[27 * i + 9 * j + 3 * k + l]
    }
}

impl Add for Tensor3333 {
    type Output = Tensor3333;

    fn add(mut self, rhs: Tensor3333) -> Tensor3333 {
        self += &rhs;
        self
    }
}

impl AddAssign<&Tensor3333> for Tensor3333 {
    fn add_assign(&mut self, rhs: &Tensor3333) {
        for (a, b) in self.t.iter_mut().zip(rhs.t.iter()) {
            *a += b;
        }
    }
}

impl Sub for Tensor3333 {
    type Output = Tensor3333;

    fn sub(mut self, rhs: Tensor3333) -> Tensor3333 {
        self -= &rhs;
        self
    }
}

impl Sub<&Tensor3333> for &Tensor3333 {
    type Output = Tensor3333;

    fn sub(self, rhs: &Tensor3333) -> Tensor3333 {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl SubAssign<&Tensor3333> for Tensor3333 {
    fn sub_assign(&mut self, rhs: &Tensor3333) {
        for (a, b) in self.t.iter_mut().zip(rhs.t.iter()) {
            *a -= b;
        }
    }
}

impl Neg for Tensor3333 {
    type Output = Tensor3333;

    fn neg(mut self) -> Tensor3333 {
        for a in self.t.iter_mut() {
            *a = -*a;
        }
        self
    }
}

impl Mul<Real> for Tensor3333 {
    type Output = Tensor3333;

    fn mul(mut self, rhs: Real) -> Tensor3333 {
        self *= rhs;
        self
    }
}

impl Mul<Real> for &Tensor3333 {
    type Output = Tensor3333;

    fn mul(self, rhs: Real) -> Tensor3333 {
        let mut out = self.clone();
        out *= rhs;
        out
    }
}

impl MulAssign<Real> for Tensor3333 {
    fn mul_assign(&mut self, rhs: Real) {
        for a in self.t.iter_mut() {
            *a *= rhs;
        }
    }
}

impl Div<Real> for Tensor3333 {
    type Output = Tensor3333;

    fn div(mut self, rhs: Real) -> Tensor3333 {
        self /= rhs;
        self
    }
}

impl DivAssign<Real> for Tensor3333 {
    fn div_assign(&mut self, rhs: Real) {
        for a in self.t.iter_mut() {
            *a /= rhs;
        }
    }
}

/// Tensor (outer) product of two 3×3 matrices:
/// `out(i, j, k, l) = m1(i, j) · m2(k, l)`.
pub fn tensor_product(m1: &Mat3, m2: &Mat3) -> Tensor3333 {
    let mut t = Tensor3333::zeros();
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                for l in 0..3 {
                    t[(i, j, k, l)] = m1[(i, j)] * m2[(k, l)];
                }
            }
        }
    }
    t
}

/// Pack a 3×3 matrix into a 9-vector, row-major.
pub fn pack_vec9(m: &Mat3) -> Vec9 {
    let mut v = Vec9::zeros();
    for i in 0..3 {
        for j in 0..3 {
            v[3 * i + j] = m[(i, j)];
        }
    }
    v
}

/// Inverse of [`pack_vec9`].
pub fn mat3_from_vec9(v: &Vec9) -> Mat3 {
    let mut m = Mat3::zeros();
    for i in 0..3 {
        for j in 0..3 {
            m[(i, j)] = v[3 * i + j];
        }
    }
    m
}

/// Pack a symmetric 3×3 matrix into a 6-vector with `√2`-weighted
/// off-diagonal slots. Symmetry of the input is not verified.
pub fn pack_sym_vec6(m: &Mat3) -> Vec6 {
    Vec6::from_column_slice(&[
        m[(0, 0)],
        m[(1, 1)],
        m[(2, 2)],
        SQRT_2 * m[(1, 2)],
        SQRT_2 * m[(2, 0)],
        SQRT_2 * m[(0, 1)],
    ])
}

/// Inverse of [`pack_sym_vec6`].
pub fn mat3_from_sym_vec6(v: &Vec6) -> Mat3 {
    let d12 = v[3] / SQRT_2;
    let d20 = v[4] / SQRT_2;
    let d01 = v[5] / SQRT_2;
    Mat3::new(v[0], d01, d20, d01, v[1], d12, d20, d12, v[2])
}

/// Read the 3-vector out of an antisymmetric 3×3 matrix:
/// `v = (m(2,1), m(0,2), m(1,0))`. Antisymmetry is not verified.
pub fn pack_antisym_vec3(m: &Mat3) -> Vec3 {
    Vec3::new(m[(2, 1)], m[(0, 2)], m[(1, 0)])
}

/// Expand a 3-vector into its antisymmetric matrix representation.
///
/// TODO: entry (2,0) is never written (stays zero) and (1,0) carries `v.z`
/// instead of `-v.y`, so for `v.y != 0` the result is not skew-symmetric
/// and does not invert [`pack_antisym_vec3`] on the (0,2)/(2,0) pair.
/// Confirm the intended packing against a consumer before changing it.
pub fn mat3_from_antisym_vec3(v: &Vec3) -> Mat3 {
    let mut m = Mat3::zeros();
    m[(2, 1)] = v[0];
    m[(1, 2)] = -v[0];
    m[(0, 2)] = v[1];
    m[(1, 0)] = v[2];
    m[(0, 1)] = -v[2];
    m
}
