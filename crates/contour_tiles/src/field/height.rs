//! The height algorithm, written once over [`ContourSource`].
//!
//! For a point `p`:
//!
//! 1. Descend from the roots into whichever child contains `p`; the deepest
//!    containing contour is the *floor*.
//! 2. Inside a floor, blend the floor height with each child's height using inverse
//!    distance weights. A child's contribution fades from the floor height to its own
//!    height over `transition_distance`, so crossing into a child is continuous.
//! 3. Outside every contour, blend `default_depth` towards each root the same way.
//!
//! Points within `boundary_snap` of a contour line return that contour's height.
use glam::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::noise::HillNoise;
use crate::field::source::ContourSource;
use crate::geometry::polygon;

/// Tuning of the height blend.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct HeightParams {
    /// Lower bound on distances used as inverse weights.
    pub min_distance: f32,
    /// Distance over which a child contour's height fades in.
    pub transition_distance: f32,
    /// Distance to a contour line under which its height is returned exactly.
    pub boundary_snap: f32,
    /// Optional small-scale variation inside the floor contour.
    pub hill_noise: Option<HillNoise>,
}

impl Default for HeightParams {
    fn default() -> Self {
        Self {
            min_distance: 0.1,
            transition_distance: 50.0,
            boundary_snap: 1e-3,
            hill_noise: None,
        }
    }
}

impl HeightParams {
    pub fn with_min_distance(mut self, min_distance: f32) -> Self {
        self.min_distance = min_distance;
        self
    }

    pub fn with_transition_distance(mut self, transition_distance: f32) -> Self {
        self.transition_distance = transition_distance;
        self
    }

    pub fn with_boundary_snap(mut self, boundary_snap: f32) -> Self {
        self.boundary_snap = boundary_snap;
        self
    }

    pub fn with_hill_noise(mut self, hill_noise: Option<HillNoise>) -> Self {
        self.hill_noise = hill_noise;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_distance.is_finite() && self.min_distance > 0.0) {
            return Err(Error::InvalidConfig("min_distance must be > 0".into()));
        }
        if !(self.transition_distance.is_finite() && self.transition_distance > 0.0) {
            return Err(Error::InvalidConfig(
                "transition_distance must be > 0".into(),
            ));
        }
        if !(self.boundary_snap.is_finite() && self.boundary_snap >= 0.0) {
            return Err(Error::InvalidConfig("boundary_snap must be >= 0".into()));
        }
        if let Some(noise) = &self.hill_noise {
            noise.validate()?;
        }
        Ok(())
    }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite step from 0 at `edge0` to 1 at `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Deepest contour whose polygon contains `p`, if any.
pub fn find_floor<S: ContourSource + ?Sized>(source: &S, p: Vec2) -> Option<usize> {
    let mut level = source.roots();
    let mut floor = None;
    while let Some(i) = level.iter().map(|&i| i as usize).find(|&i| {
        !source.is_degenerate(i) && polygon::contains_point(source.points(i), p)
    }) {
        floor = Some(i);
        level = source.children(i);
    }
    floor
}

/// Accumulates an inverse-distance-weighted mean.
#[derive(Default)]
struct Idw {
    sum: f32,
    weight: f32,
}

impl Idw {
    #[inline]
    fn add(&mut self, value: f32, distance: f32, min_distance: f32) {
        let w = 1.0 / distance.max(min_distance);
        self.sum += value * w;
        self.weight += w;
    }

    #[inline]
    fn mean(&self) -> Option<f32> {
        (self.weight > 0.0 && self.weight.is_finite()).then(|| self.sum / self.weight)
    }
}

/// Height at `p`.
pub fn evaluate_height<S: ContourSource + ?Sized>(
    source: &S,
    p: Vec2,
    params: &HeightParams,
) -> f32 {
    match find_floor(source, p) {
        Some(floor) => height_inside(source, floor, p, params),
        None => height_outside(source, p, params),
    }
}

fn height_inside<S: ContourSource + ?Sized>(
    source: &S,
    floor: usize,
    p: Vec2,
    params: &HeightParams,
) -> f32 {
    let floor_height = source.height(floor);
    let floor_distance = polygon::boundary_distance(source.points(floor), p);
    if floor_distance <= params.boundary_snap {
        return floor_height;
    }

    let children = source.children(floor);
    let base = if children.is_empty() {
        floor_height
    } else {
        let mut idw = Idw::default();
        idw.add(floor_height, floor_distance, params.min_distance);
        for &child in children {
            let child = child as usize;
            let d = polygon::boundary_distance(source.points(child), p);
            if d <= params.boundary_snap {
                return source.height(child);
            }
            let t = smoothstep(0.0, 1.0, 1.0 - d / params.transition_distance);
            idw.add(
                lerp(floor_height, source.height(child), t),
                d,
                params.min_distance,
            );
        }
        idw.mean().unwrap_or(floor_height)
    };

    match &params.hill_noise {
        Some(noise) => {
            base + noise.sample(p) * smoothstep(0.0, params.transition_distance, floor_distance)
        }
        None => base,
    }
}

fn height_outside<S: ContourSource + ?Sized>(
    source: &S,
    p: Vec2,
    params: &HeightParams,
) -> f32 {
    let default_depth = source.default_depth();
    let mut idw = Idw::default();
    for &root in source.roots() {
        let root = root as usize;
        let d = polygon::boundary_distance(source.points(root), p);
        if d <= params.boundary_snap {
            return source.height(root);
        }
        let t = smoothstep(0.0, 1.0, 1.0 - d / params.transition_distance);
        idw.add(
            lerp(default_depth, source.height(root), t),
            d,
            params.min_distance,
        );
    }
    idw.mean().unwrap_or(default_depth)
}
