//! Multi-resolution tile grids with hysteresis.
//!
//! Each [`LodLevel`] has its own [`TileComputePipeline`]; all share one device. Only
//! the active level is scored and dispatched, while every level keeps draining its
//! readbacks and tracking the field version so nothing stale survives a switch back.
use std::sync::Arc;

use glam::Vec2;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::batch::{TileKernel, MIN_TILE_RESOLUTION};
use crate::geometry::Aabb;
use crate::tiles::device::ComputeDevice;
use crate::tiles::forecast::QueryForecast;
use crate::tiles::grid::TileGrid;
use crate::tiles::manager::TileManagerConfig;
use crate::tiles::pipeline::TileComputePipeline;

/// One detail level.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct LodLevel {
    pub world_units_per_tile: f32,
    pub max_tiles: usize,
    /// Smallest zoom at which this level is ideal.
    pub min_zoom: f32,
}

impl LodLevel {
    pub fn new(world_units_per_tile: f32, max_tiles: usize, min_zoom: f32) -> Self {
        Self {
            world_units_per_tile,
            max_tiles,
            min_zoom,
        }
    }
}

/// Level list and the settings shared by every level.
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct LodConfig {
    /// Most detailed first; `min_zoom` strictly descending.
    pub levels: Vec<LodLevel>,
    /// Relative zoom margin required before switching, in `[0, 1)`.
    pub hysteresis: f32,
    /// Samples per tile side on every level.
    pub resolution: usize,
    pub max_tiles_per_frame: usize,
    pub min_score_threshold: f32,
    /// Expected queries attributed to the viewport each frame.
    pub viewport_query_weight: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            levels: vec![
                LodLevel::new(32.0, 256, 4.0),
                LodLevel::new(128.0, 128, 1.0),
                LodLevel::new(512.0, 64, 0.0),
            ],
            hysteresis: 0.1,
            resolution: 65,
            max_tiles_per_frame: 8,
            min_score_threshold: 0.0,
            viewport_query_weight: 64.0,
        }
    }
}

impl LodConfig {
    pub fn new(levels: Vec<LodLevel>) -> Self {
        Self {
            levels,
            ..Default::default()
        }
    }

    pub fn with_hysteresis(mut self, hysteresis: f32) -> Self {
        self.hysteresis = hysteresis;
        self
    }

    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_max_tiles_per_frame(mut self, max_tiles_per_frame: usize) -> Self {
        self.max_tiles_per_frame = max_tiles_per_frame;
        self
    }

    pub fn with_min_score_threshold(mut self, min_score_threshold: f32) -> Self {
        self.min_score_threshold = min_score_threshold;
        self
    }

    pub fn with_viewport_query_weight(mut self, viewport_query_weight: f32) -> Self {
        self.viewport_query_weight = viewport_query_weight;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(Error::InvalidConfig("at least one LOD level is required".into()));
        }
        for (i, level) in self.levels.iter().enumerate() {
            if !(level.world_units_per_tile.is_finite() && level.world_units_per_tile > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "LOD level {i}: world_units_per_tile must be > 0"
                )));
            }
            if level.max_tiles == 0 {
                return Err(Error::InvalidConfig(format!(
                    "LOD level {i}: max_tiles must be > 0"
                )));
            }
            if !level.min_zoom.is_finite() {
                return Err(Error::InvalidConfig(format!(
                    "LOD level {i}: min_zoom must be finite"
                )));
            }
        }
        if self.levels.windows(2).any(|w| w[1].min_zoom >= w[0].min_zoom) {
            return Err(Error::InvalidConfig(
                "LOD levels must be ordered by strictly descending min_zoom".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.hysteresis) {
            return Err(Error::InvalidConfig("hysteresis must be in [0, 1)".into()));
        }
        if self.resolution < MIN_TILE_RESOLUTION {
            return Err(Error::InvalidConfig(format!(
                "resolution must be >= {MIN_TILE_RESOLUTION}"
            )));
        }
        if !(self.viewport_query_weight.is_finite() && self.viewport_query_weight >= 0.0) {
            return Err(Error::InvalidConfig(
                "viewport_query_weight must be finite and >= 0".into(),
            ));
        }
        Ok(())
    }
}

/// One pipeline per level, exactly one active.
#[derive(Debug)]
pub struct LodTileCache {
    levels: Vec<LodLevel>,
    pipelines: Vec<TileComputePipeline>,
    active: usize,
    hysteresis: f32,
    viewport_query_weight: f32,
}

impl LodTileCache {
    /// Build every level's pipeline. Starts on the least detailed level.
    pub fn new(config: LodConfig, device: Arc<dyn ComputeDevice>) -> Result<Self> {
        config.validate()?;
        let pipelines = config
            .levels
            .iter()
            .map(|level| {
                TileComputePipeline::new(
                    TileGrid::new(level.world_units_per_tile, config.resolution),
                    TileManagerConfig::new(level.max_tiles, config.max_tiles_per_frame)
                        .with_min_score_threshold(config.min_score_threshold),
                    device.clone(),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            active: config.levels.len() - 1,
            levels: config.levels,
            pipelines,
            hysteresis: config.hysteresis,
            viewport_query_weight: config.viewport_query_weight,
        })
    }

    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    pub fn active_level(&self) -> usize {
        self.active
    }

    pub fn pipeline(&self, level: usize) -> Option<&TileComputePipeline> {
        self.pipelines.get(level)
    }

    pub fn active_pipeline(&self) -> &TileComputePipeline {
        &self.pipelines[self.active]
    }

    /// Level whose `min_zoom` is the first one `zoom` reaches, else the least detailed.
    pub fn ideal_level(&self, zoom: f32) -> usize {
        self.levels
            .iter()
            .position(|l| zoom >= l.min_zoom)
            .unwrap_or(self.levels.len() - 1)
    }

    /// Update the active level for `zoom` and return it.
    ///
    /// Switching to more detail requires clearing the target level's `min_zoom` by the
    /// hysteresis margin; switching to less detail requires dropping below the active
    /// level's `min_zoom` by the same margin.
    pub fn select_lod(&mut self, zoom: f32) -> usize {
        let ideal = self.ideal_level(zoom);
        let current = self.active;
        let next = if ideal < current {
            (ideal..current)
                .find(|&j| zoom >= self.levels[j].min_zoom * (1.0 + self.hysteresis))
                .unwrap_or(current)
        } else if ideal > current
            && zoom <= self.levels[current].min_zoom * (1.0 - self.hysteresis)
        {
            ideal
        } else {
            current
        };
        if next != current {
            debug!("LOD switch {} -> {} at zoom {}.", current, next, zoom);
            self.active = next;
        }
        next
    }

    /// Run one frame: every level drains readbacks and tracks `field_version`; the
    /// active level is scored from the viewport and `forecasts`, then selects and
    /// dispatches. Returns the number of dispatches.
    pub fn update(
        &mut self,
        viewport: Aabb,
        zoom: f32,
        field_version: u64,
        time: f32,
        kernel: &Arc<dyn TileKernel>,
        forecasts: &[QueryForecast],
    ) -> usize {
        for pipeline in &mut self.pipelines {
            pipeline.begin_frame();
            pipeline.set_field_version(field_version);
        }

        let active = self.select_lod(zoom);
        let pipeline = &mut self.pipelines[active];
        pipeline.reset_scores();
        pipeline.submit_forecast(&QueryForecast::new(viewport, self.viewport_query_weight));
        for forecast in forecasts {
            pipeline.submit_forecast(forecast);
        }
        pipeline.select_tiles();
        pipeline.compute_tiles(time, kernel)
    }

    /// Tile sample from the active level only.
    pub fn sample_at_world_point(&self, p: Vec2) -> Option<f32> {
        self.active_pipeline().sample_at_world_point(p)
    }
}
