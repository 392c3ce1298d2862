//! End-to-end demo: synthesize a two-view scene, estimate the homography
//! with each method, and decompose it back into motion and plane normal.

use anyhow::Result;
use homography_core::synthetic::{
    default_intrinsics, non_coplanar_cloud, planar_grid, project_two_views, TwoViewGeometry,
    UniformPixelNoise,
};
use homography_estimation::{
    decompose_homography, decompose_homography_known_normal, euclidean_from_projective,
    EstimationMethod, HomographyEstimator,
};

fn main() -> Result<()> {
    let geometry = TwoViewGeometry::small_motion();
    let k = default_intrinsics();
    let noise = UniformPixelNoise {
        seed: 1,
        max_abs_px: 0.2,
    };

    println!("ground truth rotation:\n{}", geometry.rotation);
    println!(
        "ground truth t/d: {:?}, normal: {:?}",
        (geometry.translation / geometry.plane_distance).as_slice(),
        geometry.plane_normal.as_slice()
    );

    // Planar features: direct and optimal estimation.
    let points = planar_grid(&geometry, 4, 4, 0.5);
    let (p1, p2, _) = project_two_views(&points, &k, &geometry, Some(&noise));

    for method in [EstimationMethod::DirectLinear, EstimationMethod::Optimal] {
        let mut estimator = HomographyEstimator::new(points.len(), method)?;
        let estimate = estimator.compute(&p2, &p1)?;
        println!(
            "\n{method:?} ({} iterations):\n{}",
            estimate.iterations, estimate.homography
        );

        let he = euclidean_from_projective(&estimate.homography, &k)?;
        let (m0, m1) = decompose_homography(&he)?;
        println!(
            "candidate normals: {:?} / {:?}",
            m0.normal.as_slice(),
            m1.normal.as_slice()
        );

        let unique = decompose_homography_known_normal(&he, &geometry.plane_normal)?;
        println!(
            "known-normal motion: t/d = {:?}",
            unique.scaled_translation.as_slice()
        );
    }

    // Non-coplanar features: virtual parallax estimation.
    let cloud = non_coplanar_cloud();
    let (p1, p2, _) = project_two_views(&cloud, &k, &geometry, None);
    let mut estimator =
        HomographyEstimator::new(cloud.len(), EstimationMethod::VirtualParallax)?;
    let estimate = estimator.compute(&p2, &p1)?;
    println!(
        "\nVirtualParallax (plane through the first three points):\n{}",
        estimate.homography
    );

    Ok(())
}
