//! Contours and their sampled boundaries.
use glam::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{polygon, sample_closed_curve, Aabb};

/// Minimum number of control points for a contour to enclose an area.
pub const MIN_CONTOUR_POINTS: usize = 3;

/// A closed curve through `control_points` carrying a scalar field value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    /// Ordered control points; the curve closes from the last back to the first.
    pub control_points: Vec<Vec2>,
    /// Field value on the contour line.
    pub height: f32,
}

impl Contour {
    pub fn new(control_points: Vec<Vec2>, height: f32) -> Self {
        Self {
            control_points,
            height,
        }
    }

    /// Regular polygon approximation of a circle, handy for tests and demos.
    pub fn circle(center: Vec2, radius: f32, points: usize, height: f32) -> Self {
        let control_points = (0..points)
            .map(|i| {
                let a = i as f32 / points as f32 * std::f32::consts::TAU;
                center + Vec2::new(a.cos(), a.sin()) * radius
            })
            .collect();
        Self::new(control_points, height)
    }

    /// `true` when the contour has too few points to enclose anything.
    pub fn is_degenerate(&self) -> bool {
        self.control_points.len() < MIN_CONTOUR_POINTS
    }
}

/// Options controlling how contour curves are turned into polygons.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingConfig {
    /// Polygon points generated per control segment.
    pub samples_per_segment: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            samples_per_segment: 8,
        }
    }
}

impl SamplingConfig {
    pub fn new(samples_per_segment: usize) -> Self {
        Self {
            samples_per_segment,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.samples_per_segment == 0 {
            return Err(Error::InvalidConfig(
                "samples_per_segment must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// A contour's boundary sampled into a dense polygon, with cached bounds and area.
#[derive(Clone, Debug)]
pub struct SampledContour {
    pub points: Vec<Vec2>,
    pub height: f32,
    pub bounds: Option<Aabb>,
    pub area: f32,
    pub degenerate: bool,
}

impl SampledContour {
    pub fn from_contour(contour: &Contour, sampling: &SamplingConfig) -> Self {
        let degenerate = contour.is_degenerate();
        let points = if degenerate {
            contour.control_points.clone()
        } else {
            sample_closed_curve(&contour.control_points, sampling.samples_per_segment)
        };
        let bounds = Aabb::from_points(&points);
        let area = if degenerate { 0.0 } else { polygon::area(&points) };
        Self {
            points,
            height: contour.height,
            bounds,
            area,
            degenerate,
        }
    }

    /// `true` if this contour's polygon fully contains `inner`'s polygon.
    ///
    /// Both must be non-degenerate; the bounds must nest, no pair of sampled segments
    /// may touch, and a sample of `inner` must have non-zero winding against `self`.
    pub fn contains(&self, inner: &SampledContour) -> bool {
        if self.degenerate || inner.degenerate {
            return false;
        }
        let (Some(outer_bounds), Some(inner_bounds)) = (self.bounds, inner.bounds) else {
            return false;
        };
        if !outer_bounds.contains_aabb(&inner_bounds) {
            return false;
        }
        if polygon::polygons_intersect(&self.points, &inner.points) {
            return false;
        }
        polygon::contains_point(&self.points, inner.points[0])
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        !self.degenerate
            && self.bounds.is_some_and(|b| b.contains_point(p))
            && polygon::contains_point(&self.points, p)
    }

    pub fn boundary_distance(&self, p: Vec2) -> f32 {
        polygon::boundary_distance(&self.points, p)
    }
}
