//! Owner of the current terrain definition and everything derived from it.
use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::terrain::contour::{Contour, SamplingConfig};
use crate::terrain::definition::{TerrainDefinition, ValidationReport};
use crate::terrain::packed::{PackLimits, PackedTerrain};
use crate::terrain::snapshot::TerrainSnapshot;

/// Holds the definition, its snapshot and packed buffer, and a version that
/// increases with every accepted edit.
///
/// Edits are all-or-nothing: if the new definition does not fit the
/// [`PackLimits`], the previous definition and version stay in place.
#[derive(Debug)]
pub struct TerrainProvider {
    definition: TerrainDefinition,
    snapshot: Arc<TerrainSnapshot>,
    packed: Arc<PackedTerrain>,
    version: u64,
    sampling: SamplingConfig,
    limits: PackLimits,
}

impl TerrainProvider {
    /// Provider over an empty definition at version 0.
    pub fn new(default_depth: f32, sampling: SamplingConfig, limits: PackLimits) -> Result<Self> {
        sampling.validate()?;
        let definition = TerrainDefinition::new(default_depth);
        let snapshot = TerrainSnapshot::build(&definition, &sampling);
        let packed = PackedTerrain::pack(&snapshot, &limits)?;
        Ok(Self {
            definition,
            snapshot: Arc::new(snapshot),
            packed: Arc::new(packed),
            version: 0,
            sampling,
            limits,
        })
    }

    /// Replace the definition. Returns the new version.
    pub fn set_definition(&mut self, definition: TerrainDefinition) -> Result<u64> {
        let snapshot = TerrainSnapshot::build(&definition, &self.sampling);
        let packed = PackedTerrain::pack(&snapshot, &self.limits)?;

        self.version += 1;
        info!(
            "Terrain version {}: {} contours, {} roots, max depth {}.",
            self.version,
            snapshot.contours.len(),
            snapshot.tree.roots().len(),
            snapshot.tree.max_depth()
        );
        self.definition = definition;
        self.snapshot = Arc::new(snapshot);
        self.packed = Arc::new(packed);
        Ok(self.version)
    }

    /// Append one contour to the current definition. Returns the new version.
    pub fn add_contour(&mut self, contour: Contour) -> Result<u64> {
        let mut definition = self.definition.clone();
        definition.push(contour);
        self.set_definition(definition)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn definition(&self) -> &TerrainDefinition {
        &self.definition
    }

    pub fn snapshot(&self) -> &Arc<TerrainSnapshot> {
        &self.snapshot
    }

    pub fn packed(&self) -> &Arc<PackedTerrain> {
        &self.packed
    }

    pub fn validation_report(&self) -> &ValidationReport {
        &self.snapshot.report
    }

    pub fn default_depth(&self) -> f32 {
        self.definition.default_depth
    }

    pub fn limits(&self) -> &PackLimits {
        &self.limits
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::error::Error;

    fn provider(limits: PackLimits) -> TerrainProvider {
        TerrainProvider::new(-5.0, SamplingConfig::default(), limits).unwrap()
    }

    #[test]
    fn edits_bump_the_version() {
        let mut p = provider(PackLimits::default());
        assert_eq!(p.version(), 0);
        assert!(p.snapshot().contours.is_empty());

        let v = p
            .add_contour(Contour::circle(Vec2::ZERO, 50.0, 12, 1.0))
            .unwrap();
        assert_eq!(v, 1);
        assert_eq!(p.definition().len(), 1);
        assert_eq!(p.snapshot().contours.len(), 1);
        assert_eq!(p.packed().view().unwrap().records().len(), 1);

        let v = p.set_definition(TerrainDefinition::new(2.0)).unwrap();
        assert_eq!(v, 2);
        assert_eq!(p.default_depth(), 2.0);
    }

    #[test]
    fn capacity_overflow_keeps_previous_state() {
        let mut p = provider(PackLimits::default().with_max_contours(1));
        p.add_contour(Contour::circle(Vec2::ZERO, 50.0, 12, 1.0))
            .unwrap();
        let before = p.definition().clone();

        let err = p
            .add_contour(Contour::circle(Vec2::ZERO, 10.0, 12, 2.0))
            .expect_err("second contour exceeds max_contours");
        assert!(matches!(err, Error::CapacityExceeded { .. }));
        assert_eq!(p.version(), 1);
        assert_eq!(p.definition(), &before);
        assert_eq!(p.snapshot().contours.len(), 1);
    }

    #[test]
    fn rejects_zero_sampling() {
        let err = TerrainProvider::new(0.0, SamplingConfig::new(0), PackLimits::default());
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
    }
}
