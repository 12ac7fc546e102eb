//! The height field cache: the API query consumers talk to.
//!
//! [`HeightFieldCache::height_at_point`] answers from a materialized tile when one is
//! Ready for the current terrain version and otherwise evaluates on the CPU, so it
//! always returns a value. [`HeightFieldCache::tick`] runs once per frame and decides
//! which tiles to materialize next.
use std::sync::Arc;

use glam::Vec2;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::field::batch::TileKernel;
use crate::field::HeightFieldEvaluator;
use crate::geometry::Aabb;
use crate::terrain::contour::Contour;
use crate::terrain::definition::{TerrainDefinition, ValidationReport};
use crate::terrain::provider::TerrainProvider;
use crate::tiles::device::ComputeDevice;
use crate::tiles::forecast::{self, ForecastSource, QueryForecast};
use crate::tiles::lod::LodTileCache;
use crate::tiles::pipeline::PipelineStats;

/// Per-frame input to [`HeightFieldCache::tick`].
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct FrameInput {
    /// Visible world rectangle.
    pub viewport: Aabb,
    pub zoom: f32,
    /// Simulation time handed to tile kernels.
    pub time: f32,
    /// Consumer forecasts for this frame.
    pub forecasts: Vec<QueryForecast>,
}

impl FrameInput {
    pub fn new(viewport: Aabb, zoom: f32) -> Self {
        Self {
            viewport,
            zoom,
            time: 0.0,
            forecasts: Vec::new(),
        }
    }

    pub fn with_time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    pub fn with_forecasts(mut self, forecasts: Vec<QueryForecast>) -> Self {
        self.forecasts = forecasts;
        self
    }

    pub fn with_forecast(mut self, forecast: QueryForecast) -> Self {
        self.forecasts.push(forecast);
        self
    }
}

/// Terrain definition, evaluators and LOD tile cache behind one query API.
pub struct HeightFieldCache {
    config: CacheConfig,
    provider: TerrainProvider,
    evaluator: HeightFieldEvaluator,
    kernel: Arc<dyn TileKernel>,
    lod: LodTileCache,
}

impl HeightFieldCache {
    /// Cache over an empty terrain; tiles are computed on `device`.
    pub fn new(config: CacheConfig, device: Arc<dyn ComputeDevice>) -> Result<Self> {
        config.validate()?;
        let provider = TerrainProvider::new(
            config.default_depth,
            config.sampling.clone(),
            config.pack_limits.clone(),
        )?;
        let evaluator = HeightFieldEvaluator::from_provider(&provider, &config.height);
        let kernel = evaluator.kernel();
        let lod = LodTileCache::new(config.lod.clone(), device)?;
        Ok(Self {
            config,
            provider,
            evaluator,
            kernel,
            lod,
        })
    }

    /// Replace the terrain. Returns the new version.
    ///
    /// On error (e.g. [`crate::error::Error::CapacityExceeded`]) the previous
    /// terrain and version remain in effect.
    pub fn set_field_definition(&mut self, definition: TerrainDefinition) -> Result<u64> {
        let version = self.provider.set_definition(definition)?;
        self.refresh_evaluator();
        Ok(version)
    }

    /// Add one contour to the terrain. Returns the new version.
    pub fn add_contour(&mut self, contour: Contour) -> Result<u64> {
        let version = self.provider.add_contour(contour)?;
        self.refresh_evaluator();
        Ok(version)
    }

    fn refresh_evaluator(&mut self) {
        self.evaluator = HeightFieldEvaluator::from_provider(&self.provider, &self.config.height);
        self.kernel = self.evaluator.kernel();
    }

    /// Height at `p`: a tile sample when one is Ready for the current version,
    /// otherwise the CPU evaluation.
    pub fn height_at_point(&self, p: impl Into<mint::Vector2<f32>>) -> f32 {
        let p = Vec2::from(p.into());
        if let Some(h) = self.tile_sample(p) {
            return h;
        }
        let h = self.evaluator.height_at(p);
        if h.is_finite() {
            h
        } else {
            self.provider.default_depth()
        }
    }

    /// Tile sample at `p` if the active level has one for the current version.
    pub fn tile_sample(&self, p: Vec2) -> Option<f32> {
        // Tiles only learn about a new version on the next tick.
        if self.lod.active_pipeline().field_version() != self.provider.version() {
            return None;
        }
        self.lod.sample_at_world_point(p)
    }

    /// Advance one frame: complete readbacks, invalidate, score, select, dispatch.
    /// Returns the number of tiles dispatched.
    pub fn tick(&mut self, frame: &FrameInput) -> usize {
        self.lod.update(
            frame.viewport,
            frame.zoom,
            self.provider.version(),
            frame.time,
            &self.kernel,
            &frame.forecasts,
        )
    }

    /// Forecasts of every consumer that announces one.
    pub fn gather_forecasts(sources: &[&dyn ForecastSource]) -> Vec<QueryForecast> {
        forecast::gather_forecasts(sources)
    }

    pub fn version(&self) -> u64 {
        self.provider.version()
    }

    pub fn definition(&self) -> &TerrainDefinition {
        self.provider.definition()
    }

    pub fn validation_report(&self) -> &ValidationReport {
        self.provider.validation_report()
    }

    pub fn lod(&self) -> &LodTileCache {
        &self.lod
    }

    pub fn evaluator(&self) -> &HeightFieldEvaluator {
        &self.evaluator
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Statistics of the active level's pipeline.
    pub fn stats(&self) -> PipelineStats {
        self.lod.active_pipeline().stats()
    }
}

impl std::fmt::Debug for HeightFieldCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeightFieldCache")
            .field("version", &self.provider.version())
            .field("contours", &self.provider.definition().len())
            .field("kernel", &self.kernel.name())
            .field("lod", &self.lod)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::error::Error;
    use crate::terrain::packed::PackLimits;
    use crate::tiles::device::{InlineDevice, ParallelDevice, UnavailableDevice};

    fn concentric() -> TerrainDefinition {
        TerrainDefinition::new(-10.0)
            .with_contour(Contour::circle(Vec2::ZERO, 100.0, 16, 0.0))
            .with_contour(Contour::circle(Vec2::ZERO, 50.0, 16, 5.0))
            .with_contour(Contour::circle(Vec2::ZERO, 10.0, 16, 10.0))
    }

    fn frame() -> FrameInput {
        FrameInput::new(Aabb::from_center_extent(Vec2::ZERO, Vec2::splat(100.0)), 0.5)
    }

    fn rand01(rng: &mut StdRng) -> f32 {
        (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
    }

    fn cache(device: Arc<dyn ComputeDevice>) -> HeightFieldCache {
        let mut cache = HeightFieldCache::new(CacheConfig::default(), device).unwrap();
        cache.set_field_definition(concentric()).unwrap();
        cache
    }

    #[test]
    fn empty_terrain_answers_default_depth() {
        let cache = HeightFieldCache::new(
            CacheConfig::default().with_default_depth(-7.0),
            Arc::new(InlineDevice::new()),
        )
        .unwrap();
        assert_eq!(cache.version(), 0);
        assert_eq!(cache.height_at_point(Vec2::new(3.0, 4.0)), -7.0);
    }

    #[test]
    fn concentric_scenario_through_the_facade() {
        let mut cache = cache(Arc::new(InlineDevice::new()));
        let center = cache.height_at_point(Vec2::ZERO);
        assert!((5.0..=10.0).contains(&center), "{center}");
        let shelf = cache.height_at_point([75.0, 0.0]);
        assert!((0.0..=5.0).contains(&shelf), "{shelf}");

        assert!(cache.tick(&frame()) > 0);
        assert_eq!(cache.tile_sample(Vec2::ZERO), None);
        cache.tick(&frame());
        assert!(cache.stats().ready > 0);

        // Grid nodes reproduce the scalar evaluation.
        let tile = cache.tile_sample(Vec2::ZERO).expect("tile ready");
        let cpu = cache.evaluator().height_at(Vec2::ZERO);
        assert!((tile - cpu).abs() < 1e-4);
        assert_eq!(cache.height_at_point(mint::Vector2 { x: 0.0, y: 0.0 }), tile);
    }

    #[test]
    fn tile_samples_track_the_cpu_between_nodes() {
        let mut cache = cache(Arc::new(InlineDevice::new()));
        cache.tick(&frame());
        cache.tick(&frame());
        let spacing = cache.lod().active_pipeline().grid().sample_spacing();
        assert_eq!(spacing, 8.0);
        let eps = 0.1 * spacing;

        let area = Aabb::from_center_extent(Vec2::ZERO, Vec2::splat(240.0));
        let mut rng = StdRng::seed_from_u64(11);
        let mut worst = 0.0f32;
        for _ in 0..1000 {
            let p = area.min + Vec2::new(rand01(&mut rng), rand01(&mut rng)) * area.size();
            let tile = cache.tile_sample(p).expect("viewport tiles are ready");
            let cpu = cache.evaluator().height_at(p);
            worst = worst.max((tile - cpu).abs());
        }
        assert!(worst <= eps, "max deviation {worst} exceeds {eps}");
    }

    #[test]
    fn edits_are_visible_before_the_next_tick() {
        let mut cache = cache(Arc::new(InlineDevice::new()));
        cache.tick(&frame());
        cache.tick(&frame());
        let island = Vec2::new(200.0, 200.0);
        assert!(cache.tile_sample(island).is_some());

        cache
            .add_contour(Contour::circle(island, 30.0, 12, 20.0))
            .unwrap();
        assert_eq!(cache.version(), 2);
        assert_eq!(cache.tile_sample(island), None);
        assert_eq!(cache.height_at_point(island), 20.0);

        cache.tick(&frame());
        assert_eq!(cache.tile_sample(island), None);
        cache.tick(&frame());
        let tile = cache.tile_sample(island).expect("recomputed");
        assert!((tile - 20.0).abs() < 1e-4);
    }

    #[test]
    fn capacity_overflow_keeps_the_previous_terrain() {
        let config =
            CacheConfig::default().with_pack_limits(PackLimits::default().with_max_contours(3));
        let mut cache = HeightFieldCache::new(config, Arc::new(InlineDevice::new())).unwrap();
        cache.set_field_definition(concentric()).unwrap();

        let err = cache
            .add_contour(Contour::circle(Vec2::new(300.0, 0.0), 10.0, 8, 1.0))
            .expect_err("fourth contour exceeds the limit");
        assert!(matches!(err, Error::CapacityExceeded { .. }));
        assert_eq!(cache.version(), 1);
        assert_eq!(cache.definition().len(), 3);
    }

    #[test]
    fn unavailable_device_falls_back_to_cpu() {
        let mut cache = cache(Arc::new(UnavailableDevice::new()));
        for _ in 0..3 {
            assert_eq!(cache.tick(&frame()), 0);
        }
        assert_eq!(cache.stats().ready, 0);
        assert_eq!(cache.height_at_point(Vec2::ZERO), 10.0);
    }

    #[test]
    fn parallel_device_materializes_tiles() {
        let device = Arc::new(ParallelDevice::new(2).unwrap());
        let mut cache = cache(device);
        let deadline = Instant::now() + Duration::from_secs(10);
        cache.tick(&frame());
        while cache.stats().ready == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
            cache.tick(&frame());
        }
        assert!(cache.stats().ready > 0);
        assert!(cache.tile_sample(Vec2::ZERO).is_some());
    }

    #[test]
    fn forecast_sources_reach_the_tick() {
        struct Walker(Vec2);
        impl ForecastSource for Walker {
            fn query_forecast(&self) -> Option<QueryForecast> {
                Some(QueryForecast::new(
                    Aabb::from_center_extent(self.0, Vec2::splat(4.0)),
                    100.0,
                ))
            }
        }

        let mut cache = cache(Arc::new(InlineDevice::new()));
        let far = Walker(Vec2::new(5000.0, 5000.0));
        let forecasts = HeightFieldCache::gather_forecasts(&[&far]);
        assert_eq!(forecasts.len(), 1);

        let input = frame().with_forecasts(forecasts);
        cache.tick(&input);
        cache.tick(&input);
        assert!(cache.tile_sample(far.0).is_some());
    }
}
