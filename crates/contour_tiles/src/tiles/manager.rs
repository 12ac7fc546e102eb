//! Tile scoring, selection and eviction.
//!
//! Each frame the manager's scores are reset, forecasts are spread over the tiles
//! they overlap, and [`TileManager::select`] picks the tiles worth computing within
//! the per-frame budget. Tiles are created lazily the first time a forecast makes
//! them worth computing; when the tile budget is full a newcomer may evict the
//! lowest-scoring idle tile, but never one that scores at least as high.
use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::tiles::forecast::QueryForecast;
use crate::tiles::grid::{TileCoord, TileGrid};
use crate::tiles::tile::{TileId, TileMeta, TileState};

/// Budgets for one tile grid.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct TileManagerConfig {
    /// Maximum number of tiles alive at once.
    pub max_tiles: usize,
    /// Maximum number of tiles queued per frame.
    pub max_tiles_per_frame: usize,
    /// Tiles scoring below this are never selected. Unforecast tiles never are.
    pub min_score_threshold: f32,
}

impl Default for TileManagerConfig {
    fn default() -> Self {
        Self {
            max_tiles: 256,
            max_tiles_per_frame: 8,
            min_score_threshold: 0.0,
        }
    }
}

impl TileManagerConfig {
    pub fn new(max_tiles: usize, max_tiles_per_frame: usize) -> Self {
        Self {
            max_tiles,
            max_tiles_per_frame,
            ..Default::default()
        }
    }

    pub fn with_max_tiles(mut self, max_tiles: usize) -> Self {
        self.max_tiles = max_tiles;
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

    pub fn validate(&self) -> Result<()> {
        if self.max_tiles == 0 {
            return Err(Error::InvalidConfig("max_tiles must be > 0".into()));
        }
        if self.max_tiles_per_frame == 0 {
            return Err(Error::InvalidConfig(
                "max_tiles_per_frame must be > 0".into(),
            ));
        }
        if !self.min_score_threshold.is_finite() || self.min_score_threshold < 0.0 {
            return Err(Error::InvalidConfig(
                "min_score_threshold must be finite and >= 0".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one [`TileManager::select`] call.
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    /// Tiles moved to `Queued`, in priority order.
    pub queued: Vec<TileId>,
    /// Tiles removed to make room for new ones.
    pub evicted: Vec<TileId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty() && self.evicted.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
enum Candidate {
    Existing(TileId),
    New(TileCoord),
}

#[derive(Clone, Copy, Debug)]
struct Ranked {
    needs_materialization: bool,
    score: f32,
    coord: TileCoord,
    candidate: Candidate,
}

impl Ranked {
    fn priority(&self, other: &Self) -> Ordering {
        other
            .needs_materialization
            .cmp(&self.needs_materialization)
            .then_with(|| other.score.total_cmp(&self.score))
            .then_with(|| self.coord.cmp(&other.coord))
    }
}

/// Owns the metadata of every tile on one grid.
#[derive(Debug)]
pub struct TileManager {
    grid: TileGrid,
    config: TileManagerConfig,
    tiles: HashMap<TileId, TileMeta>,
    by_coord: HashMap<TileCoord, TileId>,
    /// Forecast interest in cells that have no tile yet, reset every frame.
    candidates: HashMap<TileCoord, f32>,
    next_id: u64,
}

impl TileManager {
    pub fn new(grid: TileGrid, config: TileManagerConfig) -> Result<Self> {
        grid.validate()?;
        config.validate()?;
        Ok(Self {
            grid,
            config,
            tiles: HashMap::new(),
            by_coord: HashMap::new(),
            candidates: HashMap::new(),
            next_id: 1,
        })
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn config(&self) -> &TileManagerConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, id: TileId) -> Option<&TileMeta> {
        self.tiles.get(&id)
    }

    pub fn tile_at(&self, coord: TileCoord) -> Option<&TileMeta> {
        self.by_coord.get(&coord).and_then(|id| self.tiles.get(id))
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileMeta> {
        self.tiles.values()
    }

    /// Score accumulated this frame by a cell that has no tile yet.
    pub fn candidate_score(&self, coord: TileCoord) -> Option<f32> {
        self.candidates.get(&coord).copied()
    }

    /// Zero every score and forget this frame's uncreated candidates.
    pub fn reset_scores(&mut self) {
        for tile in self.tiles.values_mut() {
            tile.score = 0.0;
        }
        self.candidates.clear();
    }

    /// Spread `forecast.expected_query_count` evenly over the tiles it overlaps.
    ///
    /// When the box covers more cells than the manager could ever hold, every existing
    /// tile inside it still gets its share but new candidates are only recorded for a
    /// window of cells around the box centre.
    pub fn submit_forecast(&mut self, forecast: &QueryForecast, frame: u64) {
        if !forecast.is_meaningful() {
            return;
        }
        let Some((lo, hi)) = self.grid.cell_range(&forecast.aabb) else {
            return;
        };
        let cells = self.grid.count_overlapping(&forecast.aabb);
        let share = forecast.expected_query_count / cells as f32;

        if cells <= self.candidate_budget() {
            for coord in self.grid.coords_overlapping(&forecast.aabb) {
                match self.by_coord.get(&coord).and_then(|id| self.tiles.get_mut(id)) {
                    Some(tile) => {
                        tile.score += share;
                        tile.last_used_frame = frame;
                    }
                    None => *self.candidates.entry(coord).or_insert(0.0) += share,
                }
            }
            return;
        }

        for tile in self.tiles.values_mut() {
            let TileCoord(x, y) = tile.coord;
            if (lo.0..=hi.0).contains(&x) && (lo.1..=hi.1).contains(&y) {
                tile.score += share;
                tile.last_used_frame = frame;
            }
        }
        let centre = self.grid.coord_for_point(forecast.aabb.center());
        let side = (self.candidate_budget() as f64).sqrt().ceil() as i64;
        let (x0, x1) = window(lo.0, hi.0, centre.0, side);
        let (y0, y1) = window(lo.1, hi.1, centre.1, side);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let coord = TileCoord(x, y);
                if !self.by_coord.contains_key(&coord) {
                    *self.candidates.entry(coord).or_insert(0.0) += share;
                }
            }
        }
        debug!(
            "Forecast over {} cells; candidates limited to {}x{} around {:?}.",
            cells,
            x1 - x0 + 1,
            y1 - y0 + 1,
            centre
        );
    }

    /// Most cells one forecast records as candidates.
    fn candidate_budget(&self) -> usize {
        self.config.max_tiles.max(self.config.max_tiles_per_frame)
    }

    /// Cells with forecast interest but no tile yet.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    fn qualifies(&self, score: f32) -> bool {
        score > 0.0 && score >= self.config.min_score_threshold
    }

    /// Choose up to `max_tiles_per_frame` tiles to compute and move them to `Queued`.
    ///
    /// Tiles without usable samples come first, then higher scores, then lower
    /// coordinates. Consumes this frame's uncreated candidates.
    pub fn select(&mut self, frame: u64, field_version: u64) -> Selection {
        let mut ranked: Vec<Ranked> = self
            .tiles
            .values()
            .filter(|t| t.needs_compute(field_version) && self.qualifies(t.score))
            .map(|t| Ranked {
                needs_materialization: t.state.needs_materialization(),
                score: t.score,
                coord: t.coord,
                candidate: Candidate::Existing(t.id),
            })
            .collect();

        let candidates = std::mem::take(&mut self.candidates);
        ranked.extend(
            candidates
                .into_iter()
                .filter(|&(_, score)| self.qualifies(score))
                .map(|(coord, score)| Ranked {
                    needs_materialization: true,
                    score,
                    coord,
                    candidate: Candidate::New(coord),
                }),
        );
        ranked.sort_by(Ranked::priority);

        let mut selection = Selection::default();
        for entry in ranked {
            if selection.queued.len() >= self.config.max_tiles_per_frame {
                break;
            }
            let id = match entry.candidate {
                Candidate::Existing(id) => id,
                Candidate::New(coord) => {
                    if self.tiles.len() >= self.config.max_tiles {
                        let Some(victim) = self.eviction_victim(entry.score) else {
                            continue;
                        };
                        self.evict(victim);
                        selection.evicted.push(victim);
                    }
                    self.create(coord, entry.score)
                }
            };
            if let Some(tile) = self.tiles.get_mut(&id) {
                tile.state = TileState::Queued;
                tile.last_used_frame = frame;
                selection.queued.push(id);
            }
        }

        if !selection.is_empty() {
            debug!(
                "Frame {}: queued {} tiles, evicted {}.",
                frame,
                selection.queued.len(),
                selection.evicted.len()
            );
        }
        selection
    }

    /// Lowest-scoring idle tile scoring below `score`; least recently used on ties.
    fn eviction_victim(&self, score: f32) -> Option<TileId> {
        self.tiles
            .values()
            .filter(|t| !t.state.is_in_flight() && t.score < score)
            .min_by(|a, b| {
                a.score
                    .total_cmp(&b.score)
                    .then_with(|| a.last_used_frame.cmp(&b.last_used_frame))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|t| t.id)
    }

    fn create(&mut self, coord: TileCoord, score: f32) -> TileId {
        let id = TileId(self.next_id);
        self.next_id += 1;
        self.tiles.insert(
            id,
            TileMeta {
                id,
                coord,
                bounds: self.grid.bounds(coord),
                resolution: self.grid.resolution,
                version: None,
                state: TileState::Empty,
                score,
                last_used_frame: 0,
            },
        );
        self.by_coord.insert(coord, id);
        id
    }

    fn evict(&mut self, id: TileId) {
        if let Some(tile) = self.tiles.remove(&id) {
            self.by_coord.remove(&tile.coord);
            debug!("Evicted {} at {:?} (score {}).", id, tile.coord, tile.score);
        }
    }

    /// Mark every Ready tile computed against another version as Stale.
    pub fn invalidate(&mut self, field_version: u64) -> usize {
        let mut count = 0;
        for tile in self.tiles.values_mut() {
            if tile.state == TileState::Ready && tile.version != Some(field_version) {
                tile.state = TileState::Stale;
                count += 1;
            }
        }
        count
    }

    pub fn mark_computing(&mut self, id: TileId) -> bool {
        self.set_state(id, TileState::Computing, None)
    }

    pub fn mark_ready(&mut self, id: TileId, version: u64) -> bool {
        self.set_state(id, TileState::Ready, Some(version))
    }

    pub fn mark_stale(&mut self, id: TileId) -> bool {
        self.set_state(id, TileState::Stale, None)
    }

    fn set_state(&mut self, id: TileId, state: TileState, version: Option<u64>) -> bool {
        match self.tiles.get_mut(&id) {
            Some(tile) => {
                tile.state = state;
                if version.is_some() {
                    tile.version = version;
                }
                true
            }
            None => false,
        }
    }
}

/// Up to `side` cells of `lo..=hi` around `centre`, shifted inward at the edges.
fn window(lo: i32, hi: i32, centre: i32, side: i64) -> (i32, i32) {
    let (lo, hi) = (i64::from(lo), i64::from(hi));
    let start = (i64::from(centre) - side / 2).min(hi - side + 1).max(lo);
    let end = (start + side - 1).min(hi);
    // Both ends lie within the i32 inputs.
    (start as i32, end as i32)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use glam::Vec2;

    use super::*;
    use crate::geometry::Aabb;

    fn manager(max_tiles: usize, per_frame: usize) -> TileManager {
        TileManager::new(
            TileGrid::new(10.0, 5),
            TileManagerConfig::new(max_tiles, per_frame),
        )
        .unwrap()
    }

    /// Forecast covering exactly one tile.
    fn cell(x: i32, y: i32, count: f32) -> QueryForecast {
        let min = Vec2::new(x as f32, y as f32) * 10.0;
        QueryForecast::new(Aabb::new(min, min + Vec2::splat(10.0)), count)
    }

    #[test]
    fn forecasts_split_evenly_across_cells() {
        let mut m = manager(16, 16);
        let aabb = Aabb::new(Vec2::ZERO, Vec2::new(20.0, 20.0));
        m.submit_forecast(&QueryForecast::new(aabb, 8.0), 1);
        for c in [TileCoord(0, 0), TileCoord(1, 0), TileCoord(0, 1), TileCoord(1, 1)] {
            assert_eq!(m.candidate_score(c), Some(2.0));
        }
        assert_eq!(m.candidate_score(TileCoord(2, 0)), None);
    }

    #[test]
    fn select_creates_and_queues_tiles_by_score() {
        let mut m = manager(16, 2);
        m.submit_forecast(&cell(0, 0, 1.0), 1);
        m.submit_forecast(&cell(1, 0, 5.0), 1);
        m.submit_forecast(&cell(2, 0, 3.0), 1);

        let sel = m.select(1, 1);
        assert_eq!(sel.queued.len(), 2);
        assert!(sel.evicted.is_empty());
        let coords: Vec<_> = sel.queued.iter().map(|id| m.tile(*id).unwrap().coord).collect();
        assert_eq!(coords, vec![TileCoord(1, 0), TileCoord(2, 0)]);
        assert!(sel
            .queued
            .iter()
            .all(|id| m.tile(*id).unwrap().state == TileState::Queued));
        assert!(m.tile_at(TileCoord(0, 0)).is_none());

        // Candidates are consumed; a second select in the same frame finds nothing.
        assert!(m.select(1, 1).is_empty());
    }

    #[test]
    fn unforecast_and_below_threshold_tiles_are_skipped() {
        let mut m = TileManager::new(
            TileGrid::new(10.0, 5),
            TileManagerConfig::new(8, 8).with_min_score_threshold(2.0),
        )
        .unwrap();
        m.submit_forecast(&cell(0, 0, 1.0), 1);
        m.submit_forecast(&cell(1, 0, 2.0), 1);
        m.submit_forecast(&QueryForecast::new(Aabb::new(Vec2::ONE, Vec2::ONE), 50.0), 1);
        let sel = m.select(1, 1);
        assert_eq!(sel.queued.len(), 1);
        assert_eq!(m.tile(sel.queued[0]).unwrap().coord, TileCoord(1, 0));
    }

    #[test]
    fn stale_tiles_come_before_version_refreshes() {
        let mut m = manager(8, 1);
        m.submit_forecast(&cell(0, 0, 1.0), 1);
        m.submit_forecast(&cell(1, 0, 1.0), 1);
        let sel = m.select(1, 1);
        assert_eq!(sel.queued.len(), 1);
        let ready = sel.queued[0];
        m.mark_computing(ready);
        m.mark_ready(ready, 1);

        // Version 2: the Ready tile needs a refresh, but a brand new cell outranks it
        // despite its lower score.
        m.reset_scores();
        m.submit_forecast(&cell(0, 0, 10.0), 2);
        m.submit_forecast(&cell(5, 5, 1.0), 2);
        let sel = m.select(2, 2);
        assert_eq!(sel.queued.len(), 1);
        assert_ne!(sel.queued[0], ready);
        assert_eq!(m.tile(sel.queued[0]).unwrap().coord, TileCoord(5, 5));
        assert_eq!(m.tile(ready).unwrap().state, TileState::Ready);

        // Next frame the refresh gets its turn.
        m.reset_scores();
        m.submit_forecast(&cell(0, 0, 10.0), 3);
        assert_eq!(m.select(3, 2).queued, vec![ready]);
    }

    #[test]
    fn eviction_takes_lowest_score_then_least_recent() {
        let mut m = manager(2, 4);
        m.submit_forecast(&cell(0, 0, 1.0), 1);
        m.submit_forecast(&cell(1, 0, 1.0), 1);
        let first = m.select(1, 1).queued;
        assert_eq!(first.len(), 2);
        for &id in &first {
            m.mark_computing(id);
            m.mark_ready(id, 1);
        }
        let older = m.tile_at(TileCoord(0, 0)).unwrap().id;

        // Frame 2 only touches (1, 0), so both score zero in frame 3 but (0, 0) is
        // less recently used.
        m.reset_scores();
        m.submit_forecast(&cell(1, 0, 0.5), 2);
        m.reset_scores();
        m.submit_forecast(&cell(3, 3, 4.0), 3);
        let sel = m.select(3, 1);
        assert_eq!(sel.evicted, vec![older]);
        assert!(m.tile(older).is_none());
        assert!(m.tile_at(TileCoord(3, 3)).is_some());
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn eviction_never_removes_higher_scores_or_in_flight_tiles() {
        let mut m = manager(1, 4);
        m.submit_forecast(&cell(0, 0, 5.0), 1);
        let held = m.select(1, 1).queued[0];

        // In flight: cannot be evicted at any score.
        m.submit_forecast(&cell(1, 0, 100.0), 1);
        let sel = m.select(1, 1);
        assert!(sel.queued.is_empty() && sel.evicted.is_empty());

        // Ready with a higher score than the newcomer: kept.
        m.mark_computing(held);
        m.mark_ready(held, 1);
        m.reset_scores();
        m.submit_forecast(&cell(0, 0, 5.0), 2);
        m.submit_forecast(&cell(1, 0, 2.0), 2);
        let sel = m.select(2, 1);
        assert!(sel.queued.is_empty() && sel.evicted.is_empty());
        assert!(m.tile(held).is_some());
    }

    #[test]
    fn invalidate_marks_other_versions_stale() {
        let mut m = manager(4, 4);
        m.submit_forecast(&cell(0, 0, 1.0), 1);
        let id = m.select(1, 1).queued[0];
        m.mark_computing(id);
        assert_eq!(m.invalidate(2), 0);
        m.mark_ready(id, 1);
        assert_eq!(m.invalidate(1), 0);
        assert_eq!(m.invalidate(2), 1);
        assert_eq!(m.tile(id).unwrap().state, TileState::Stale);
        assert_eq!(m.tile(id).unwrap().version, Some(1));
    }

    #[test]
    fn tile_ids_are_never_reused() {
        let mut m = manager(1, 1);
        m.submit_forecast(&cell(0, 0, 1.0), 1);
        let a = m.select(1, 1).queued[0];
        m.mark_stale(a);
        m.reset_scores();
        m.submit_forecast(&cell(1, 0, 2.0), 2);
        let sel = m.select(2, 1);
        assert_eq!(sel.evicted, vec![a]);

        m.mark_stale(sel.queued[0]);
        m.reset_scores();
        m.submit_forecast(&cell(0, 0, 3.0), 3);
        let again = m.select(3, 1).queued[0];
        assert_ne!(again, a);
        assert_eq!(m.tile(again).unwrap().coord, TileCoord(0, 0));
    }

    #[test]
    fn huge_forecasts_stay_bounded() {
        let mut m = TileManager::new(TileGrid::new(32.0, 33), TileManagerConfig::new(256, 8))
            .unwrap();
        // A tile far from the centre, created by an earlier small forecast.
        let far = TileCoord(3000, -3000);
        let far_box = m.grid().bounds(far);
        m.submit_forecast(&QueryForecast::new(far_box, 1.0), 1);
        let far_id = m.select(1, 1).queued[0];
        m.mark_computing(far_id);
        m.mark_ready(far_id, 1);
        m.reset_scores();

        let started = Instant::now();
        let aabb = Aabb::new(Vec2::splat(-1.0e5), Vec2::splat(1.0e5));
        m.submit_forecast(&QueryForecast::new(aabb, 100.0), 2);
        let share = 100.0 / (6250.0 * 6250.0);

        assert!(m.candidate_count() <= 256);
        assert!(m.candidate_count() > 0);
        assert_eq!(m.candidate_score(TileCoord(0, 0)), Some(share));
        assert_eq!(m.candidate_score(TileCoord(-3125, -3125)), None);
        let far_tile = m.tile(far_id).unwrap();
        assert_eq!(far_tile.score, share);
        assert_eq!(far_tile.last_used_frame, 2);

        let sel = m.select(2, 1);
        assert_eq!(sel.queued.len(), 8);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn candidate_window_shifts_inside_the_box() {
        assert_eq!(window(0, 100, 50, 16), (42, 57));
        assert_eq!(window(0, 100, 2, 16), (0, 15));
        assert_eq!(window(0, 100, 99, 16), (85, 100));
        assert_eq!(window(0, 3, 1, 16), (0, 3));
    }

    #[test]
    fn rejects_zero_budgets() {
        let grid = TileGrid::new(10.0, 5);
        assert!(TileManager::new(grid.clone(), TileManagerConfig::new(0, 1)).is_err());
        assert!(TileManager::new(grid, TileManagerConfig::new(1, 0)).is_err());
    }
}
