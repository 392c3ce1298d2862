//! Ground-truth two-view scenes: a rigid camera motion, a feature plane,
//! and projections of 3D points into both views.

use nalgebra::{DMatrix, DVector, Rotation3};

use crate::math::{Mat3, Real, Vec3};

use super::UniformPixelNoise;

/// Rigid motion between two camera frames together with the feature plane,
/// everything a plane-induced homography is made of.
///
/// The Euclidean homography maps frame-1 coordinates of plane points to
/// frame-2 coordinates: `X₂ = (R + t·nᵀ/d) X₁` whenever `nᵀX₁ = d`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoViewGeometry {
    /// Rotation from the first camera frame to the second.
    pub rotation: Mat3,
    /// Translation between the frames, expressed in the second frame.
    pub translation: Vec3,
    /// Unit normal of the feature plane in the first camera frame.
    pub plane_normal: Vec3,
    /// Distance from the first optical center to the feature plane.
    pub plane_distance: Real,
}

impl TwoViewGeometry {
    /// A small, generic motion useful as a default test scene.
    pub fn small_motion() -> Self {
        Self {
            rotation: rotation_from_euler(0.08, -0.05, 0.1),
            translation: Vec3::new(0.08, -0.04, 0.05),
            plane_normal: Vec3::new(0.1, -0.05, 1.0).normalize(),
            plane_distance: 2.0,
        }
    }

    /// The Euclidean homography `R + t·nᵀ/d` induced by the feature plane.
    pub fn euclidean_homography(&self) -> Mat3 {
        self.rotation + self.translation * self.plane_normal.transpose() / self.plane_distance
    }

    /// The projective homography `K·He·K⁻¹`, unnormalized.
    ///
    /// This is the exact matrix in `p₂ = (z₁/z₂)·Hp·p₁`; scale it by its
    /// (3,3) entry before comparing against estimator output. Returns
    /// `None` when `K` is not invertible.
    pub fn projective_homography(&self, k: &Mat3) -> Option<Mat3> {
        let k_inv = k.try_inverse()?;
        Some(k * self.euclidean_homography() * k_inv)
    }

    /// Map a frame-1 point into the second camera frame.
    #[inline]
    pub fn transfer(&self, x1: &Vec3) -> Vec3 {
        self.rotation * x1 + self.translation
    }
}

/// Rotation matrix from roll/pitch/yaw Euler angles (radians).
pub fn rotation_from_euler(roll: Real, pitch: Real, yaw: Real) -> Mat3 {
    *Rotation3::from_euler_angles(roll, pitch, yaw).matrix()
}

/// A plain pinhole intrinsics matrix for synthetic scenes.
pub fn default_intrinsics() -> Mat3 {
    Mat3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0)
}

/// 3D points on the scene's feature plane, laid out as a `cols × rows`
/// grid of half-width `extent`, in the first camera frame.
pub fn planar_grid(geometry: &TwoViewGeometry, cols: usize, rows: usize, extent: Real) -> Vec<Vec3> {
    let n = geometry.plane_normal;
    // In-plane basis.
    let seed = if n.x.abs() < 0.9 {
        Vec3::new(1.0, 0.0, 0.0)
    } else {
        Vec3::new(0.0, 1.0, 0.0)
    };
    let u = n.cross(&seed).normalize();
    let v = n.cross(&u);
    let base = n * geometry.plane_distance;

    let mut points = Vec::with_capacity(cols * rows);
    for r in 0..rows {
        for c in 0..cols {
            let a = if cols > 1 {
                -extent + 2.0 * extent * (c as Real) / ((cols - 1) as Real)
            } else {
                0.0
            };
            let b = if rows > 1 {
                -extent + 2.0 * extent * (r as Real) / ((rows - 1) as Real)
            } else {
                0.0
            };
            points.push(base + u * a + v * b);
        }
    }
    points
}

/// A fixed cloud of ten non-coplanar points in the first camera frame.
///
/// The first three points are in general position and define the virtual
/// plane used by the parallax estimator; the remaining points are spread
/// in depth around it.
pub fn non_coplanar_cloud() -> Vec<Vec3> {
    vec![
        Vec3::new(-0.40, -0.30, 1.8),
        Vec3::new(0.40, -0.35, 2.2),
        Vec3::new(0.35, 0.40, 2.0),
        Vec3::new(-0.30, 0.35, 2.4),
        Vec3::new(0.10, -0.10, 1.6),
        Vec3::new(-0.20, 0.00, 2.6),
        Vec3::new(0.25, 0.15, 1.9),
        Vec3::new(0.00, 0.30, 2.3),
        Vec3::new(-0.35, -0.05, 2.1),
        Vec3::new(0.15, -0.30, 2.5),
    ]
}

/// Plane through three points, as `(unit_normal, distance)` with the
/// normal oriented so the distance is positive.
///
/// Returns `None` for (near-)collinear points.
pub fn plane_through(a: &Vec3, b: &Vec3, c: &Vec3) -> Option<(Vec3, Real)> {
    let n = (b - a).cross(&(c - a));
    if n.norm() <= 1e-12 {
        return None;
    }
    let mut n = n.normalize();
    let mut d = n.dot(a);
    if d < 0.0 {
        n = -n;
        d = -d;
    }
    Some((n, d))
}

/// Project 3D frame-1 points into both views.
///
/// Returns the two 3×N homogeneous pixel matrices (third row of ones) and
/// the vector of true depth ratios `z₁/z₂`, in the convention
/// `p₂ ≈ (z₁/z₂)·H·p₁`. Optional noise perturbs the pixel coordinates of
/// both views (view keys 0 and 1).
pub fn project_two_views(
    points: &[Vec3],
    k: &Mat3,
    geometry: &TwoViewGeometry,
    noise: Option<&UniformPixelNoise>,
) -> (DMatrix<Real>, DMatrix<Real>, DVector<Real>) {
    let n = points.len();
    let mut p1 = DMatrix::zeros(3, n);
    let mut p2 = DMatrix::zeros(3, n);
    let mut depth_ratio = DVector::zeros(n);

    for (idx, x1) in points.iter().enumerate() {
        let x2 = geometry.transfer(x1);
        depth_ratio[idx] = x1.z / x2.z;

        let mut uv1 = project(k, x1);
        let mut uv2 = project(k, &x2);
        if let Some(noise) = noise {
            let d1 = noise.sample(0, idx);
            let d2 = noise.sample(1, idx);
            uv1 += d1;
            uv2 += d2;
        }

        p1[(0, idx)] = uv1.x;
        p1[(1, idx)] = uv1.y;
        p1[(2, idx)] = 1.0;
        p2[(0, idx)] = uv2.x;
        p2[(1, idx)] = uv2.y;
        p2[(2, idx)] = 1.0;
    }

    (p1, p2, depth_ratio)
}

#[inline]
fn project(k: &Mat3, x: &Vec3) -> crate::math::Vec2 {
    let q = k * x;
    crate::math::Vec2::new(q.x / q.z, q.y / q.z)
}
