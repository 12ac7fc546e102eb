//! Height field evaluation.
//!
//! One algorithm ([`height::evaluate_height`]) runs over two data backings: the
//! scalar [`CpuEvaluator`] reads the sampled contours and tree directly, the
//! [`BatchEvaluator`] reads the packed buffer a compute device receives.
//! [`HeightFieldEvaluator`] pairs both for one terrain version.
use std::sync::Arc;

use glam::Vec2;

use crate::terrain::provider::TerrainProvider;

pub mod batch;
pub mod cpu;
pub mod height;
pub mod noise;
pub mod source;

pub use batch::{BatchEvaluator, TileJobSpec, TileKernel};
pub use cpu::CpuEvaluator;
pub use height::{evaluate_height, HeightParams};
pub use noise::HillNoise;
pub use source::ContourSource;

/// Scalar and batch evaluators built from the same terrain version.
#[derive(Clone, Debug)]
pub struct HeightFieldEvaluator {
    version: u64,
    cpu: CpuEvaluator,
    batch: Arc<BatchEvaluator>,
}

impl HeightFieldEvaluator {
    /// Evaluators for the provider's current version.
    pub fn from_provider(provider: &TerrainProvider, params: &HeightParams) -> Self {
        Self {
            version: provider.version(),
            cpu: CpuEvaluator::new(provider.snapshot().clone(), params.clone()),
            batch: Arc::new(BatchEvaluator::new(
                provider.packed().clone(),
                params.clone(),
            )),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Synchronous height at `p`.
    #[inline]
    pub fn height_at(&self, p: Vec2) -> f32 {
        self.cpu.height_at(p)
    }

    pub fn cpu(&self) -> &CpuEvaluator {
        &self.cpu
    }

    /// Tile kernel handed to compute devices.
    pub fn kernel(&self) -> Arc<dyn TileKernel> {
        self.batch.clone()
    }

    pub fn batch(&self) -> &Arc<BatchEvaluator> {
        &self.batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::contour::{Contour, SamplingConfig};
    use crate::terrain::packed::PackLimits;

    #[test]
    fn tracks_provider_version() {
        let mut provider =
            TerrainProvider::new(-1.0, SamplingConfig::default(), PackLimits::default()).unwrap();
        provider
            .add_contour(Contour::circle(Vec2::ZERO, 30.0, 12, 6.0))
            .unwrap();

        let eval = HeightFieldEvaluator::from_provider(&provider, &HeightParams::default());
        assert_eq!(eval.version(), 1);
        assert_eq!(eval.height_at(Vec2::ZERO), 6.0);
        assert_eq!(eval.kernel().name(), "terrain");

        let batch = eval.batch().evaluate_points(&[Vec2::ZERO]).unwrap();
        assert_eq!(batch, vec![6.0]);
    }
}
