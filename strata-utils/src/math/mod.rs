//! Small math helpers shared across crates.

mod vector3;

pub use vector3::Vector3;

use std::f64::consts::{PI, TAU};

/// Smallest absolute angle between two bearings, in `[0, π]`.
#[must_use]
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(TAU);
    if diff > PI { TAU - diff } else { diff }
}
