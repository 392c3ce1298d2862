//! Deterministic synthetic two-view data for tests and examples.
//!
//! This module is public so integration tests across the workspace can
//! build ground-truth scenes; it is not intended for production use.

mod noise;
mod scene;

pub use noise::*;
pub use scene::*;
