//! Scalar, per-point height evaluation over a [`TerrainSnapshot`].
use std::sync::Arc;

use glam::Vec2;

use crate::field::height::{evaluate_height, HeightParams};
use crate::terrain::snapshot::TerrainSnapshot;

/// Synchronous evaluator used as the fallback when no tile covers a query.
#[derive(Clone, Debug)]
pub struct CpuEvaluator {
    snapshot: Arc<TerrainSnapshot>,
    params: HeightParams,
}

impl CpuEvaluator {
    pub fn new(snapshot: Arc<TerrainSnapshot>, params: HeightParams) -> Self {
        Self { snapshot, params }
    }

    #[inline]
    pub fn height_at(&self, p: Vec2) -> f32 {
        evaluate_height(self.snapshot.as_ref(), p, &self.params)
    }

    pub fn snapshot(&self) -> &Arc<TerrainSnapshot> {
        &self.snapshot
    }

    pub fn params(&self) -> &HeightParams {
        &self.params
    }
}
