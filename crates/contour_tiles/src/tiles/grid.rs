//! Tile grid: mapping between world space and tile cells.
//!
//! Cells are square, `world_units_per_tile` wide, anchored at the world origin.
//! [`TileCoord`] `(0, 0)` covers `[0, size) x [0, size)`.
use glam::Vec2;

use crate::error::{Error, Result};
use crate::field::batch::MIN_TILE_RESOLUTION;
use crate::geometry::Aabb;

/// Integer cell coordinate in a [`TileGrid`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord(
    /// Cell index along the X axis.
    pub i32,
    /// Cell index along the Y axis.
    pub i32,
);

/// Partition of the plane into square tiles sampled at `resolution`² nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct TileGrid {
    /// Tile edge length in world units.
    pub world_units_per_tile: f32,
    /// Samples per tile side, including both edges.
    pub resolution: usize,
}

impl TileGrid {
    pub fn new(world_units_per_tile: f32, resolution: usize) -> Self {
        Self {
            world_units_per_tile,
            resolution,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.world_units_per_tile.is_finite() && self.world_units_per_tile > 0.0) {
            return Err(Error::InvalidConfig(
                "world_units_per_tile must be > 0".into(),
            ));
        }
        if self.resolution < MIN_TILE_RESOLUTION {
            return Err(Error::InvalidConfig(format!(
                "tile resolution must be >= {MIN_TILE_RESOLUTION}"
            )));
        }
        Ok(())
    }

    /// Tile containing `p`.
    pub fn coord_for_point(&self, p: Vec2) -> TileCoord {
        let s = self.world_units_per_tile;
        TileCoord((p.x / s).floor() as i32, (p.y / s).floor() as i32)
    }

    /// World-space origin (lower-left corner) of a tile.
    pub fn origin(&self, coord: TileCoord) -> Vec2 {
        Vec2::new(coord.0 as f32, coord.1 as f32) * self.world_units_per_tile
    }

    /// Closed world-space bounds of a tile.
    pub fn bounds(&self, coord: TileCoord) -> Aabb {
        let min = self.origin(coord);
        Aabb::new(min, min + Vec2::splat(self.world_units_per_tile))
    }

    /// Spacing between adjacent samples.
    pub fn sample_spacing(&self) -> f32 {
        self.world_units_per_tile / (self.resolution.max(MIN_TILE_RESOLUTION) - 1) as f32
    }

    /// Inclusive corner cells of the tiles overlapping `aabb`, or `None` for a
    /// non-finite box.
    ///
    /// An `aabb` whose max lies exactly on a tile edge does not reach into the next tile.
    pub fn cell_range(&self, aabb: &Aabb) -> Option<(TileCoord, TileCoord)> {
        if !(aabb.min.is_finite() && aabb.max.is_finite()) {
            return None;
        }
        let s = self.world_units_per_tile;
        let lo = self.coord_for_point(aabb.min);
        let x1 = ((aabb.max.x / s).ceil() as i32).saturating_sub(1).max(lo.0);
        let y1 = ((aabb.max.y / s).ceil() as i32).saturating_sub(1).max(lo.1);
        Some((lo, TileCoord(x1, y1)))
    }

    /// Every tile whose area overlaps `aabb`, in row-major order.
    pub fn coords_overlapping(&self, aabb: &Aabb) -> impl Iterator<Item = TileCoord> {
        let (lo, hi) = self
            .cell_range(aabb)
            .unwrap_or((TileCoord(0, 0), TileCoord(-1, -1)));
        (lo.1..=hi.1).flat_map(move |y| (lo.0..=hi.0).map(move |x| TileCoord(x, y)))
    }

    /// Number of tiles [`Self::coords_overlapping`] yields, without walking them.
    pub fn count_overlapping(&self, aabb: &Aabb) -> usize {
        let Some((lo, hi)) = self.cell_range(aabb) else {
            return 0;
        };
        let w = i64::from(hi.0) - i64::from(lo.0) + 1;
        let h = i64::from(hi.1) - i64::from(lo.1) + 1;
        usize::try_from(w.saturating_mul(h)).unwrap_or(usize::MAX)
    }
}
