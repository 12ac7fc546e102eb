//! The minimal numeric view of a contour set that the height algorithm runs on.
//!
//! Everything [`crate::field::height::evaluate_height`] needs is behind
//! [`ContourSource`]; the scalar evaluator implements it over sampled contours and the
//! contour tree, the batch evaluator over the packed terrain buffer.
use glam::Vec2;

use crate::terrain::contour::MIN_CONTOUR_POINTS;

pub trait ContourSource {
    /// Number of contours.
    fn contour_count(&self) -> usize;

    /// Sampled boundary of contour `index`.
    fn points(&self, index: usize) -> &[Vec2];

    /// Field value on contour `index`.
    fn height(&self, index: usize) -> f32;

    /// Direct children of contour `index` in the containment tree.
    fn children(&self, index: usize) -> &[u32];

    /// Contours without an enclosing contour.
    fn roots(&self) -> &[u32];

    /// Value used outside every contour.
    fn default_depth(&self) -> f32;

    /// Contours that cannot enclose an area take no part in containment.
    #[inline]
    fn is_degenerate(&self, index: usize) -> bool {
        self.points(index).len() < MIN_CONTOUR_POINTS
    }
}
