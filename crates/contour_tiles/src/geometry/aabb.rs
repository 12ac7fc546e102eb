//! Axis-aligned rectangles in world space.
use glam::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in world coordinates (`min` inclusive, `max` inclusive).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` with the given full extent.
    pub fn from_center_extent(center: Vec2, extent: Vec2) -> Self {
        let half = extent * 0.5;
        Self::new(center - half, center + half)
    }

    /// Smallest box enclosing all points, or `None` for an empty slice.
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut min = *first;
        let mut max = *first;
        for p in rest {
            min = min.min(*p);
            max = max.max(*p);
        }
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn area(&self) -> f32 {
        let s = self.size();
        s.x.max(0.0) * s.y.max(0.0)
    }

    /// `true` if the box has a non-positive extent on either axis or is not finite.
    pub fn is_degenerate(&self) -> bool {
        !(self.min.is_finite() && self.max.is_finite())
            || self.max.x <= self.min.x
            || self.max.y <= self.min.y
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        other.min.x >= self.min.x
            && other.max.x <= self.max.x
            && other.min.y >= self.min.y
            && other.max.y <= self.max.y
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.max.x >= other.min.x
            && self.min.x <= other.max.x
            && self.max.y >= other.min.y
            && self.min.y <= other.max.y
    }

    /// Grow the box by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self::new(self.min - Vec2::splat(margin), self.max + Vec2::splat(margin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_encloses_everything() {
        let pts = [Vec2::new(1.0, -2.0), Vec2::new(-3.0, 4.0), Vec2::new(0.5, 0.5)];
        let b = Aabb::from_points(&pts).expect("non-empty");
        assert_eq!(b.min, Vec2::new(-3.0, -2.0));
        assert_eq!(b.max, Vec2::new(1.0, 4.0));
        assert!(Aabb::from_points(&[]).is_none());
    }

    #[test]
    fn containment_and_intersection() {
        let outer = Aabb::new(Vec2::ZERO, Vec2::splat(10.0));
        let inner = Aabb::new(Vec2::splat(2.0), Vec2::splat(3.0));
        let apart = Aabb::new(Vec2::splat(11.0), Vec2::splat(12.0));

        assert!(outer.contains_aabb(&inner));
        assert!(!inner.contains_aabb(&outer));
        assert!(outer.intersects(&inner));
        assert!(!outer.intersects(&apart));
        assert!(outer.contains_point(Vec2::new(10.0, 0.0)));
    }

    #[test]
    fn degenerate_boxes_are_detected() {
        assert!(Aabb::new(Vec2::ZERO, Vec2::new(0.0, 5.0)).is_degenerate());
        assert!(Aabb::new(Vec2::ZERO, Vec2::new(f32::NAN, 5.0)).is_degenerate());
        assert!(!Aabb::from_center_extent(Vec2::ZERO, Vec2::splat(2.0)).is_degenerate());
    }
}
