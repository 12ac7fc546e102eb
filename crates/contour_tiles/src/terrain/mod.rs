//! Terrain definitions and the structures derived from them.
//!
//! A [`TerrainDefinition`] is sampled into [`SampledContour`]s, organized into a
//! [`ContourTree`], and packed into a flat [`PackedTerrain`] buffer for the batch
//! evaluator. [`TerrainProvider`] keeps all of these in sync under a version counter.
pub mod contour;
pub mod definition;
pub mod packed;
pub mod provider;
pub mod snapshot;
pub mod tree;

pub use contour::{Contour, SampledContour, SamplingConfig, MIN_CONTOUR_POINTS};
pub use definition::{TerrainDefinition, ValidationReport};
pub use packed::{ContourRecord, PackLimits, PackedTerrain, PackedTerrainView};
pub use provider::TerrainProvider;
pub use snapshot::TerrainSnapshot;
pub use tree::{ContourTree, ContourTreeNode, NO_PARENT};
