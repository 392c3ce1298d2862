//! Euclidean homography decomposition into rigid motion and plane normal,
//! plus the projective/Euclidean conversion helpers.

use homography_core::{Mat3, Real, Vec3};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::HomographyError;

/// Singular value spread below which a homography carries no recoverable
/// translation direction.
const DEGENERATE_EPS: Real = 1e-5;
/// Threshold for treating all three singular values as equal.
const EQUAL_SV_EPS: Real = 1e-5;

/// One rigid-motion interpretation of a Euclidean homography
/// `He = R + (t/d)·nᵀ`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionParams {
    /// Rotation from the first camera frame to the second.
    pub rotation: Mat3,
    /// Translation divided by the plane distance, `t/d`.
    pub scaled_translation: Vec3,
    /// Unit normal of the plane in the first camera frame.
    pub normal: Vec3,
}

/// Strip the camera intrinsics from a projective homography:
/// `He = K⁻¹·Hp·K`.
pub fn euclidean_from_projective(hp: &Mat3, k: &Mat3) -> Result<Mat3, HomographyError> {
    let k_inv = k.try_inverse().ok_or(HomographyError::SingularConfiguration(
        "intrinsics matrix is not invertible",
    ))?;
    Ok(k_inv * hp * k)
}

/// Apply camera intrinsics to a Euclidean homography: `Hp = K·He·K⁻¹`.
pub fn projective_from_euclidean(he: &Mat3, k: &Mat3) -> Result<Mat3, HomographyError> {
    let k_inv = k.try_inverse().ok_or(HomographyError::SingularConfiguration(
        "intrinsics matrix is not invertible",
    ))?;
    Ok(k * he * k_inv)
}

/// Decompose a Euclidean homography into its two physically plausible
/// motion interpretations.
///
/// The input may carry an arbitrary scale; the decomposition fixes it from
/// the middle singular value of `HeᵀHe`. Both returned candidates satisfy
/// the composition `s·He = R + (t/d)·nᵀ` with the plane normal oriented
/// towards the camera (`n.z >= 0`); additional cues (for example visibility
/// of the feature points) are needed to pick the true one. Fails when the
/// singular values collapse, which happens for pure rotation or no motion.
pub fn decompose_homography(he: &Mat3) -> Result<(MotionParams, MotionParams), HomographyError> {
    let hth = he.transpose() * he;
    let svd = hth.svd(true, false);
    let u = svd.u.ok_or(HomographyError::SolverFailure)?;
    let s = svd.singular_values;

    if s[0] - s[2] < DEGENERATE_EPS {
        warn!("homography decomposition: no motion or pure rotation");
        return Err(HomographyError::SingularConfiguration(
            "no motion or pure rotation",
        ));
    }

    let scale_sq = 1.0 / s[1];
    let scale = scale_sq.sqrt();
    let s0 = s[0] * scale_sq;
    let s2 = s[2] * scale_sq;

    let v1 = u.column(0).into_owned();
    let v2 = u.column(1).into_owned();
    let v3 = u.column(2).into_owned();

    // Clamped against floating point drift around the unit middle value.
    let t1 = v1 * (1.0 - s2).max(0.0).sqrt();
    let t2 = v3 * (s0 - 1.0).max(0.0).sqrt();
    let t3 = 1.0 / (s0 - s2).sqrt();
    let u1 = (t1 + t2) * t3;
    let u2 = (t1 - t2) * t3;

    let sh = he * scale;
    Ok((candidate(&sh, &v2, &u1), candidate(&sh, &v2, &u2)))
}

fn candidate(sh: &Mat3, v2: &Vec3, u: &Vec3) -> MotionParams {
    let frame1 = Mat3::from_columns(&[*v2, *u, v2.cross(u)]);
    let w1 = sh * v2;
    let w2 = sh * u;
    let frame2 = Mat3::from_columns(&[w1, w2, w1.cross(&w2)]);

    let rotation = frame2 * frame1.transpose();
    let mut normal = v2.cross(u);
    if normal.z < 0.0 {
        normal = -normal;
    }
    let scaled_translation = (sh - rotation) * normal;

    MotionParams {
        rotation,
        scaled_translation,
        normal,
    }
}

/// Decompose a Euclidean homography when the plane normal is known,
/// resolving the two-fold ambiguity of [`decompose_homography`].
///
/// The sign of the plane distance is fixed by requiring the plane to be in
/// front of the camera. Degenerate singular value patterns (pure rotation,
/// translation along the normal) are handled explicitly.
pub fn decompose_homography_known_normal(
    he: &Mat3,
    normal: &Vec3,
) -> Result<MotionParams, HomographyError> {
    let svd = he.svd(true, true);
    let u = svd.u.ok_or(HomographyError::SolverFailure)?;
    let v_t = svd.v_t.ok_or(HomographyError::SolverFailure)?;
    let d = svd.singular_values;

    let sign = u.determinant() * v_t.determinant();
    let n_d = v_t * normal;

    // The object plane sits in front of the camera, which fixes the sign
    // of the plane distance.
    let mut scale_factor = sign * d[1];
    let d_dash = if scale_factor >= 0.0 {
        d[1]
    } else {
        scale_factor = -scale_factor;
        -d[1]
    };

    let (r_dash, x_dash) = if (d[0] - d[1]).abs() <= EQUAL_SV_EPS
        && (d[1] - d[2]).abs() <= EQUAL_SV_EPS
    {
        // All singular values equal: pure rotation, or a reflection when
        // the plane distance comes out negative.
        if d_dash > 0.0 {
            (Mat3::identity(), Vec3::zeros())
        } else {
            let r = n_d * n_d.transpose() * 2.0 - Mat3::identity();
            let x = Vec3::new(-2.0 * d_dash * n_d.x, 0.0, -2.0 * d_dash * n_d.z);
            (r, x)
        }
    } else if d_dash > 0.0 {
        let st = (d[0] - d[2]) * n_d.x * n_d.z / d[1];
        let ct = (d[1] * d[1] + d[0] * d[2]) / (d[1] * (d[0] + d[2]));
        let r = Mat3::new(ct, 0.0, -st, 0.0, 1.0, 0.0, st, 0.0, ct);
        let x = Vec3::new((d[0] - d[2]) * n_d.x, 0.0, -(d[0] - d[2]) * n_d.z);
        (r, x)
    } else {
        let st = (d[0] + d[2]) * n_d.x * n_d.z / d[1];
        let ct = (d[0] * d[2] - d[1] * d[1]) / (d[1] * (d[0] - d[2]));
        let r = Mat3::new(ct, 0.0, st, 0.0, -1.0, 0.0, st, 0.0, -ct);
        let x = Vec3::new((d[0] + d[2]) * n_d.x, 0.0, (d[0] + d[2]) * n_d.z);
        (r, x)
    };

    Ok(MotionParams {
        rotation: u * r_dash * v_t * sign,
        scaled_translation: u * x_dash / scale_factor,
        normal: *normal,
    })
}

#[cfg(test)]
mod tests {
    use homography_core::synthetic::rotation_from_euler;

    use super::*;

    fn sample_geometry() -> (Mat3, Vec3, Vec3) {
        let rotation = rotation_from_euler(0.0, std::f64::consts::FRAC_PI_6, -0.3);
        let t_over_d = Vec3::new(-0.1, 0.05, 0.02);
        let normal = Vec3::new(0.2, -0.1, 1.0).normalize();
        (rotation, t_over_d, normal)
    }

    fn compose(rotation: &Mat3, t_over_d: &Vec3, normal: &Vec3) -> Mat3 {
        rotation + t_over_d * normal.transpose()
    }

    #[test]
    fn two_solution_decomposition_contains_the_true_motion() {
        let (rotation, t_over_d, normal) = sample_geometry();
        let he = compose(&rotation, &t_over_d, &normal);

        let (m0, m1) = decompose_homography(&he).unwrap();
        let best = if (m0.normal - normal).norm() < (m1.normal - normal).norm() {
            m0
        } else {
            m1
        };

        assert!((best.normal - normal).norm() < 1e-8);
        assert!((best.rotation - rotation).norm() < 1e-8);
        assert!((best.scaled_translation - t_over_d).norm() < 1e-8);
    }

    #[test]
    fn both_candidates_recompose_the_homography() {
        let (rotation, t_over_d, normal) = sample_geometry();
        // Arbitrary input scale must not matter.
        let he = compose(&rotation, &t_over_d, &normal) * 3.7;

        let hth = he.transpose() * he;
        let scale = 1.0 / hth.svd(false, false).singular_values[1].sqrt();

        let (m0, m1) = decompose_homography(&he).unwrap();
        for m in [m0, m1] {
            let recomposed = m.rotation + m.scaled_translation * m.normal.transpose();
            assert!((he * scale - recomposed).norm() < 1e-8);
        }
    }

    #[test]
    fn pure_rotation_is_rejected() {
        let rotation = rotation_from_euler(0.1, -0.2, 0.3);
        let err = decompose_homography(&rotation).unwrap_err();
        assert!(matches!(err, HomographyError::SingularConfiguration(_)));
    }

    #[test]
    fn known_normal_decomposition_recovers_the_motion() {
        let (rotation, t_over_d, normal) = sample_geometry();
        let he = compose(&rotation, &t_over_d, &normal);

        let motion = decompose_homography_known_normal(&he, &normal).unwrap();
        assert!((motion.rotation - rotation).norm() < 1e-8);
        assert!((motion.scaled_translation - t_over_d).norm() < 1e-8);
        assert_eq!(motion.normal, normal);
    }

    #[test]
    fn known_normal_identity_homography_means_no_motion() {
        let normal = Vec3::new(0.0, 0.0, 1.0);
        let motion = decompose_homography_known_normal(&Mat3::identity(), &normal).unwrap();
        assert!((motion.rotation - Mat3::identity()).norm() < 1e-12);
        assert!(motion.scaled_translation.norm() < 1e-12);
    }

    #[test]
    fn intrinsics_conversion_round_trips() {
        let (rotation, t_over_d, normal) = sample_geometry();
        let he = compose(&rotation, &t_over_d, &normal);
        let k = Mat3::new(700.0, 0.0, 300.0, 0.0, 700.0, 200.0, 0.0, 0.0, 1.0);

        let hp = projective_from_euclidean(&he, &k).unwrap();
        let back = euclidean_from_projective(&hp, &k).unwrap();
        assert!((back - he).norm() < 1e-9 * he.norm());
    }
}
