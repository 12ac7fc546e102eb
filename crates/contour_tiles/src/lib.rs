#![forbid(unsafe_code)]
//! contour_tiles: Height fields from nested contour lines, cached in scored, LOD-aware tiles.
//!
//! Modules:
//! - geometry: bounding boxes, closed Catmull-Rom curves, polygon queries
//! - terrain: contour definitions, the containment tree, packed buffers, versioned provider
//! - field: the height function, CPU and batch evaluators, hill noise
//! - tiles: tile grid, scoring manager, compute devices, readback pipeline, LOD levels
//! - cache: the [`cache::HeightFieldCache`] facade consumers query
//!
//! For examples, see the `contour_tiles_examples` crate.
pub mod cache;
pub mod config;
pub mod error;
pub mod field;
pub mod geometry;
pub mod terrain;
pub mod tiles;

/// Convenient re-exports for common types. Import with `use contour_tiles::prelude::*;`.
pub mod prelude {
    pub use crate::cache::{FrameInput, HeightFieldCache};
    pub use crate::config::CacheConfig;
    pub use crate::error::{Error, Result};
    pub use crate::field::{
        BatchEvaluator, CpuEvaluator, HeightFieldEvaluator, HeightParams, HillNoise, TileJobSpec,
        TileKernel,
    };
    pub use crate::geometry::Aabb;
    pub use crate::terrain::{
        Contour, PackLimits, PackedTerrain, SamplingConfig, TerrainDefinition, TerrainProvider,
        ValidationReport,
    };
    pub use crate::tiles::{
        gather_forecasts, ComputeDevice, ForecastSource, InlineDevice, LodConfig, LodLevel,
        LodTileCache, ParallelDevice, PipelineStats, QueryForecast, TileCoord, TileGrid,
        TileState, UnavailableDevice,
    };
}
