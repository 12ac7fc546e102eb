//! Data-parallel height evaluation over the packed terrain buffer.
//!
//! [`BatchEvaluator`] runs the same [`evaluate_height`] as the scalar path, but reads
//! contours through a [`crate::terrain::PackedTerrainView`] and spreads tile rows across the rayon
//! pool. It is the terrain implementation of [`TileKernel`], the unit of work a
//! compute device executes.
use std::sync::Arc;

use glam::Vec2;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::field::height::{evaluate_height, HeightParams};
use crate::geometry::Aabb;
use crate::terrain::packed::PackedTerrain;

/// Smallest supported tile resolution (samples per side).
pub const MIN_TILE_RESOLUTION: usize = 2;

/// Everything a kernel needs to fill one tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileJobSpec {
    /// World-space rectangle; samples include both edges.
    pub bounds: Aabb,
    /// Samples per side.
    pub resolution: usize,
    /// Field version the result will be tagged with.
    pub version: u64,
    /// Simulation time, for time-varying fields.
    pub time: f32,
}

impl TileJobSpec {
    /// World position of grid node `(col, row)`.
    #[inline]
    pub fn sample_position(&self, col: usize, row: usize) -> Vec2 {
        sample_position(&self.bounds, self.resolution, col, row)
    }
}

/// World position of node `(col, row)` on a vertex-aligned `resolution`² grid.
#[inline]
pub fn sample_position(bounds: &Aabb, resolution: usize, col: usize, row: usize) -> Vec2 {
    let step = bounds.size() / (resolution.max(MIN_TILE_RESOLUTION) - 1) as f32;
    bounds.min + Vec2::new(col as f32, row as f32) * step
}

/// Fills a tile buffer (row-major, `resolution * resolution` values).
pub trait TileKernel: Send + Sync {
    fn evaluate_tile(&self, spec: &TileJobSpec) -> Result<Vec<f32>>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "kernel"
    }
}

/// Batch evaluator bound to one packed terrain buffer.
#[derive(Clone, Debug)]
pub struct BatchEvaluator {
    packed: Arc<PackedTerrain>,
    params: HeightParams,
}

impl BatchEvaluator {
    pub fn new(packed: Arc<PackedTerrain>, params: HeightParams) -> Self {
        Self { packed, params }
    }

    pub fn packed(&self) -> &Arc<PackedTerrain> {
        &self.packed
    }

    pub fn params(&self) -> &HeightParams {
        &self.params
    }

    /// Heights at arbitrary points, evaluated in parallel.
    pub fn evaluate_points(&self, points: &[Vec2]) -> Result<Vec<f32>> {
        let view = self.packed.view()?;
        Ok(points
            .par_iter()
            .map(|&p| evaluate_height(&view, p, &self.params))
            .collect())
    }

    /// Heights on a vertex-aligned `resolution`² grid over `bounds`, one rayon task per row.
    pub fn evaluate_grid(&self, bounds: &Aabb, resolution: usize) -> Result<Vec<f32>> {
        if resolution < MIN_TILE_RESOLUTION {
            return Err(Error::InvalidConfig(format!(
                "tile resolution must be >= {MIN_TILE_RESOLUTION}, got {resolution}"
            )));
        }
        let view = self.packed.view()?;
        let mut out = vec![0.0f32; resolution * resolution];
        out.par_chunks_mut(resolution)
            .enumerate()
            .for_each(|(row, values)| {
                for (col, value) in values.iter_mut().enumerate() {
                    let p = sample_position(bounds, resolution, col, row);
                    *value = evaluate_height(&view, p, &self.params);
                }
            });
        Ok(out)
    }
}

impl TileKernel for BatchEvaluator {
    fn evaluate_tile(&self, spec: &TileJobSpec) -> Result<Vec<f32>> {
        self.evaluate_grid(&spec.bounds, spec.resolution)
    }

    fn name(&self) -> &str {
        "terrain"
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::field::cpu::CpuEvaluator;
    use crate::field::noise::HillNoise;
    use crate::terrain::contour::{Contour, SamplingConfig};
    use crate::terrain::definition::TerrainDefinition;
    use crate::terrain::packed::PackLimits;
    use crate::terrain::snapshot::TerrainSnapshot;

    const EPS: f32 = 1e-4;

    fn rand01(rng: &mut StdRng) -> f32 {
        (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
    }

    fn archipelago() -> TerrainSnapshot {
        let def = TerrainDefinition::new(-20.0)
            .with_contour(Contour::circle(Vec2::ZERO, 100.0, 16, 0.0))
            .with_contour(Contour::circle(Vec2::new(-35.0, 10.0), 40.0, 12, 5.0))
            .with_contour(Contour::circle(Vec2::new(-35.0, 10.0), 12.0, 10, 14.0))
            .with_contour(Contour::circle(Vec2::new(45.0, -20.0), 25.0, 12, 7.0))
            .with_contour(Contour::circle(Vec2::new(180.0, 60.0), 30.0, 12, 3.0))
            .with_contour(Contour::new(
                vec![Vec2::new(150.0, -90.0), Vec2::new(190.0, -70.0)],
                2.0,
            ));
        TerrainSnapshot::build(&def, &SamplingConfig::default())
    }

    fn evaluators(params: HeightParams) -> (CpuEvaluator, BatchEvaluator) {
        let snapshot = Arc::new(archipelago());
        let packed = Arc::new(PackedTerrain::pack(&snapshot, &PackLimits::default()).unwrap());
        (
            CpuEvaluator::new(snapshot, params.clone()),
            BatchEvaluator::new(packed, params),
        )
    }

    fn assert_agreement(params: HeightParams, seed: u64) {
        let (cpu, batch) = evaluators(params);
        let bounds = Aabb::new(Vec2::new(-150.0, -150.0), Vec2::new(250.0, 150.0));
        let mut rng = StdRng::seed_from_u64(seed);
        let points: Vec<Vec2> = (0..1000)
            .map(|_| {
                bounds.min + Vec2::new(rand01(&mut rng), rand01(&mut rng)) * bounds.size()
            })
            .collect();

        let batched = batch.evaluate_points(&points).unwrap();
        for (p, b) in points.iter().zip(&batched) {
            let c = cpu.height_at(*p);
            assert!((c - b).abs() < EPS, "at {p:?}: cpu {c} vs batch {b}");
        }
    }

    #[test]
    fn cpu_and_batch_agree_without_noise() {
        assert_agreement(HeightParams::default(), 42);
    }

    #[test]
    fn cpu_and_batch_agree_with_noise() {
        let params =
            HeightParams::default().with_hill_noise(Some(HillNoise::new(9, 1.5, 0.08)));
        assert_agreement(params, 7);
    }

    #[test]
    fn grid_nodes_match_scalar_evaluation() {
        let (cpu, batch) = evaluators(HeightParams::default());
        let spec = TileJobSpec {
            bounds: Aabb::new(Vec2::new(-64.0, -32.0), Vec2::new(0.0, 32.0)),
            resolution: 9,
            version: 1,
            time: 0.0,
        };
        let tile = batch.evaluate_tile(&spec).unwrap();
        assert_eq!(tile.len(), 81);
        for row in 0..9 {
            for col in 0..9 {
                let p = spec.sample_position(col, row);
                assert!((tile[row * 9 + col] - cpu.height_at(p)).abs() < EPS);
            }
        }
        assert_eq!(spec.sample_position(0, 0), spec.bounds.min);
        assert_eq!(spec.sample_position(8, 8), spec.bounds.max);
    }

    #[test]
    fn rejects_single_sample_tiles() {
        let (_, batch) = evaluators(HeightParams::default());
        let bounds = Aabb::new(Vec2::ZERO, Vec2::ONE);
        assert!(matches!(
            batch.evaluate_grid(&bounds, 1),
            Err(Error::InvalidConfig(_))
        ));
    }
}
