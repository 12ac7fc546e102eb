//! Immutable, evaluation-ready view of one terrain definition version.
use glam::Vec2;

use crate::field::source::ContourSource;
use crate::terrain::contour::{SampledContour, SamplingConfig};
use crate::terrain::definition::{TerrainDefinition, ValidationReport};
use crate::terrain::tree::ContourTree;

/// Sampled contours, their containment tree and the validation report for a definition.
#[derive(Clone, Debug)]
pub struct TerrainSnapshot {
    pub contours: Vec<SampledContour>,
    pub tree: ContourTree,
    pub default_depth: f32,
    pub report: ValidationReport,
}

impl TerrainSnapshot {
    /// Sample every contour, validate the set and build its containment tree.
    pub fn build(definition: &TerrainDefinition, sampling: &SamplingConfig) -> Self {
        let contours: Vec<SampledContour> = definition
            .contours
            .iter()
            .map(|c| SampledContour::from_contour(c, sampling))
            .collect();
        let report = ValidationReport::inspect(&contours);
        report.log();
        let tree = ContourTree::build(&contours);
        Self {
            contours,
            tree,
            default_depth: definition.default_depth,
            report,
        }
    }

    /// Snapshot with no contours; every query yields `default_depth`.
    pub fn empty(default_depth: f32) -> Self {
        Self {
            contours: Vec::new(),
            tree: ContourTree::default(),
            default_depth,
            report: ValidationReport::default(),
        }
    }

    /// Total sampled boundary points over all contours.
    pub fn point_count(&self) -> usize {
        self.contours.iter().map(|c| c.points.len()).sum()
    }
}

impl ContourSource for TerrainSnapshot {
    #[inline]
    fn contour_count(&self) -> usize {
        self.contours.len()
    }

    #[inline]
    fn points(&self, index: usize) -> &[Vec2] {
        &self.contours[index].points
    }

    #[inline]
    fn height(&self, index: usize) -> f32 {
        self.contours[index].height
    }

    #[inline]
    fn children(&self, index: usize) -> &[u32] {
        self.tree.children(index)
    }

    #[inline]
    fn roots(&self) -> &[u32] {
        self.tree.roots()
    }

    #[inline]
    fn default_depth(&self) -> f32 {
        self.default_depth
    }
}
