//! Tile cache: scoring, compute dispatch, readback and multi-resolution levels.
pub mod device;
pub mod forecast;
pub mod grid;
pub mod lod;
pub mod manager;
pub mod pipeline;
pub mod tile;

pub use device::{
    ComputeDevice, InlineDevice, ParallelDevice, ReadbackHandle, ReadbackPoll, TileJob,
    UnavailableDevice,
};
pub use forecast::{gather_forecasts, ForecastSource, QueryForecast};
pub use grid::{TileCoord, TileGrid};
pub use lod::{LodConfig, LodLevel, LodTileCache};
pub use manager::{Selection, TileManager, TileManagerConfig};
pub use pipeline::{PipelineStats, TileComputePipeline};
pub use tile::{TileBuffer, TileId, TileMeta, TileState};
