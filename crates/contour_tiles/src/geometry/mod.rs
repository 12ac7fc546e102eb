//! Planar geometry used by contour trees and height evaluation.
pub mod aabb;
pub mod curve;
pub mod polygon;

pub use aabb::Aabb;
pub use curve::{catmull_rom, sample_closed_curve};
