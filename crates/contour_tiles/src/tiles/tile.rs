//! Tile identity, lifecycle state and sample storage.
use std::fmt;

use glam::Vec2;

use crate::geometry::Aabb;
use crate::tiles::grid::TileCoord;

/// Unique tile identity. Never reused, so a result addressed to an evicted tile
/// cannot land on a later tile at the same coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u64);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile#{}", self.0)
    }
}

/// Lifecycle of a tile.
///
/// `Empty -> Queued -> Computing -> Ready`, and `Ready -> Stale` on a field version
/// change. Stale tiles are recomputed or evicted; failures also land in `Stale`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileState {
    Empty,
    Queued,
    Computing,
    Ready,
    Stale,
}

impl TileState {
    /// Queued or computing.
    pub fn is_in_flight(self) -> bool {
        matches!(self, TileState::Queued | TileState::Computing)
    }

    /// Holds no usable samples yet.
    pub fn needs_materialization(self) -> bool {
        matches!(self, TileState::Empty | TileState::Stale)
    }
}

/// Book-keeping for one tile, owned by the tile manager.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMeta {
    pub id: TileId,
    pub coord: TileCoord,
    pub bounds: Aabb,
    pub resolution: usize,
    /// Field version of the samples currently in the tile's buffer, if any.
    pub version: Option<u64>,
    pub state: TileState,
    /// Expected queries this frame.
    pub score: f32,
    pub last_used_frame: u64,
}

impl TileMeta {
    /// `true` when the tile should be (re)computed for `field_version`.
    pub fn needs_compute(&self, field_version: u64) -> bool {
        match self.state {
            TileState::Empty | TileState::Stale => true,
            TileState::Ready => self.version != Some(field_version),
            TileState::Queued | TileState::Computing => false,
        }
    }

    pub fn is_ready_for(&self, field_version: u64) -> bool {
        self.state == TileState::Ready && self.version == Some(field_version)
    }
}

/// Dense `resolution`² samples over a tile's closed bounds, row-major from `bounds.min`.
#[derive(Clone, Debug, PartialEq)]
pub struct TileBuffer {
    pub bounds: Aabb,
    pub resolution: usize,
    pub data: Vec<f32>,
}

impl TileBuffer {
    pub fn new(bounds: Aabb, resolution: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), resolution * resolution);
        Self {
            bounds,
            resolution,
            data,
        }
    }

    /// Sample at grid node `(col, row)`.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.resolution || row >= self.resolution {
            return None;
        }
        self.data.get(row * self.resolution + col).copied()
    }

    /// Bilinear sample at world position `p`, `None` outside the bounds.
    pub fn sample_bilinear(&self, p: Vec2) -> Option<f32> {
        if self.resolution < 2 || !self.bounds.contains_point(p) {
            return None;
        }
        let extent = self.bounds.size();
        if extent.x <= 0.0 || extent.y <= 0.0 {
            return None;
        }

        let last = (self.resolution - 1) as f32;
        let x = ((p.x - self.bounds.min.x) / extent.x).clamp(0.0, 1.0) * last;
        let y = ((p.y - self.bounds.min.y) / extent.y).clamp(0.0, 1.0) * last;

        let x0 = (x.floor() as usize).min(self.resolution - 1);
        let y0 = (y.floor() as usize).min(self.resolution - 1);
        let x1 = (x0 + 1).min(self.resolution - 1);
        let y1 = (y0 + 1).min(self.resolution - 1);
        let tx = x - x0 as f32;
        let ty = y - y0 as f32;

        let v00 = self.get(x0, y0)?;
        let v10 = self.get(x1, y0)?;
        let v01 = self.get(x0, y1)?;
        let v11 = self.get(x1, y1)?;

        let a = v00 + (v10 - v00) * tx;
        let b = v01 + (v11 - v01) * tx;
        Some(a + (b - a) * ty)
    }
}
