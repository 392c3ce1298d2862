//! Core math and geometry primitives for `homography-rs`.
//!
//! This crate provides the foundational building blocks used by the
//! estimation crate:
//!
//! - linear algebra type aliases (`Real`, `Vec3`, `Mat3`, and friends) and
//!   the exterior-product helpers the optimal estimator is written in,
//! - sorted symmetric eigendecomposition and a rank-limited spectral
//!   inverse on top of `nalgebra`,
//! - the fourth-order [`Tensor3333`] value type with its packed matrix and
//!   vector conversions,
//! - deterministic synthetic two-view scenes for tests and examples.
//!
//! # Example
//!
//! ```
//! use homography_core::synthetic::{default_intrinsics, TwoViewGeometry};
//!
//! let geometry = TwoViewGeometry::small_motion();
//! let hp = geometry.projective_homography(&default_intrinsics()).unwrap();
//! assert!(hp[(2, 2)].abs() > 0.5);
//! ```

/// Sorted symmetric eigendecomposition and spectral inverse.
mod eigen;
/// Linear algebra type aliases and matrix helpers.
mod math;
/// Deterministic synthetic two-view data.
///
/// Public so workspace tests and examples can build ground-truth scenes;
/// not intended for production use.
pub mod synthetic;
/// Fourth-order tensor algebra for the optimal estimator.
mod tensor;

pub use eigen::*;
pub use math::*;
pub use tensor::*;
