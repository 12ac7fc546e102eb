//! Per-grid tile pipeline: selection, dispatch, readback and sampling.
//!
//! Frame protocol, in order:
//!
//! 1. [`TileComputePipeline::begin_frame`] advances the frame and completes readbacks
//!    submitted in earlier frames.
//! 2. [`TileComputePipeline::set_field_version`] records the current version and
//!    marks older Ready tiles Stale.
//! 3. [`TileComputePipeline::reset_scores`] and [`TileComputePipeline::submit_forecast`]
//!    score the grid.
//! 4. [`TileComputePipeline::select_tiles`] picks this frame's tiles.
//! 5. [`TileComputePipeline::compute_tiles`] dispatches them to the device.
//!
//! A readback is never completed in the frame it was dispatched, so a tile computed
//! in frame N is first sampleable in frame N + 1.
use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::field::batch::{TileJobSpec, TileKernel};
use crate::tiles::device::{ComputeDevice, ReadbackHandle, ReadbackPoll, TileJob};
use crate::tiles::forecast::QueryForecast;
use crate::tiles::grid::TileGrid;
use crate::tiles::manager::{Selection, TileManager, TileManagerConfig};
use crate::tiles::tile::{TileBuffer, TileId, TileState};

/// Counters describing a pipeline's current state and history.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Tiles Ready for the current field version.
    pub ready: usize,
    /// Dispatched jobs whose readback has not completed.
    pub in_flight: usize,
    pub dispatched_total: usize,
    pub readbacks_completed: usize,
    pub readbacks_failed: usize,
    /// Results dropped because their tile was evicted or their version is outdated.
    pub discarded: usize,
}

#[derive(Debug)]
struct PendingReadback {
    tile: TileId,
    version: u64,
    submitted_frame: u64,
    handle: ReadbackHandle,
}

/// Tiles of one grid, their sample buffers and outstanding readbacks.
pub struct TileComputePipeline {
    manager: TileManager,
    device: Arc<dyn ComputeDevice>,
    buffers: HashMap<TileId, TileBuffer>,
    pending: Vec<PendingReadback>,
    queued: Vec<TileId>,
    frame: u64,
    field_version: u64,
    stats: PipelineStats,
    warned_unavailable: bool,
}

impl TileComputePipeline {
    pub fn new(
        grid: TileGrid,
        config: TileManagerConfig,
        device: Arc<dyn ComputeDevice>,
    ) -> Result<Self> {
        Ok(Self {
            manager: TileManager::new(grid, config)?,
            device,
            buffers: HashMap::new(),
            pending: Vec::new(),
            queued: Vec::new(),
            frame: 0,
            field_version: 0,
            stats: PipelineStats::default(),
            warned_unavailable: false,
        })
    }

    pub fn manager(&self) -> &TileManager {
        &self.manager
    }

    pub fn grid(&self) -> &TileGrid {
        self.manager.grid()
    }

    pub fn device(&self) -> &Arc<dyn ComputeDevice> {
        &self.device
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn field_version(&self) -> u64 {
        self.field_version
    }

    pub fn buffer(&self, id: TileId) -> Option<&TileBuffer> {
        self.buffers.get(&id)
    }

    /// Advance to the next frame and complete readbacks from earlier frames.
    pub fn begin_frame(&mut self) -> usize {
        self.frame += 1;
        self.complete_readbacks()
    }

    /// Poll readbacks submitted before the current frame. Returns how many tiles
    /// became Ready.
    pub fn complete_readbacks(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut completed = 0;
        for readback in pending {
            if readback.submitted_frame >= self.frame {
                self.pending.push(readback);
                continue;
            }
            match readback.handle.poll() {
                ReadbackPoll::Pending => self.pending.push(readback),
                ReadbackPoll::Ready(values) => {
                    let Some(meta) = self.manager.tile(readback.tile) else {
                        debug!("Dropping result for evicted {}.", readback.tile);
                        self.stats.discarded += 1;
                        continue;
                    };
                    if readback.version != self.field_version {
                        debug!(
                            "Dropping result for {} computed at version {} (current {}).",
                            readback.tile, readback.version, self.field_version
                        );
                        self.manager.mark_stale(readback.tile);
                        self.stats.discarded += 1;
                        continue;
                    }
                    let buffer = TileBuffer::new(meta.bounds, meta.resolution, values);
                    self.buffers.insert(readback.tile, buffer);
                    self.manager.mark_ready(readback.tile, readback.version);
                    self.stats.readbacks_completed += 1;
                    completed += 1;
                }
                ReadbackPoll::Failed(err) => {
                    warn!("Readback for {} failed: {}", readback.tile, err);
                    self.manager.mark_stale(readback.tile);
                    self.stats.readbacks_failed += 1;
                }
            }
        }
        completed
    }

    /// Record the current field version and mark older Ready tiles Stale.
    pub fn set_field_version(&mut self, version: u64) {
        if version != self.field_version {
            let invalidated = self.manager.invalidate(version);
            debug!(
                "Field version {} -> {}: {} tiles stale.",
                self.field_version, version, invalidated
            );
            self.field_version = version;
        }
    }

    pub fn reset_scores(&mut self) {
        self.manager.reset_scores();
    }

    pub fn submit_forecast(&mut self, forecast: &QueryForecast) {
        self.manager.submit_forecast(forecast, self.frame);
    }

    /// Select this frame's tiles; evicted tiles lose their buffers.
    pub fn select_tiles(&mut self) -> Selection {
        let selection = self.manager.select(self.frame, self.field_version);
        for id in &selection.evicted {
            self.buffers.remove(id);
        }
        self.queued.extend_from_slice(&selection.queued);
        selection
    }

    /// `false` only for a tile that is Ready at the current field version.
    pub fn should_compute(&self, id: TileId) -> bool {
        self.manager
            .tile(id)
            .is_some_and(|t| !t.is_ready_for(self.field_version))
    }

    /// Dispatch every selected tile that still needs computing. Returns the number
    /// of dispatches.
    pub fn compute_tiles(&mut self, time: f32, kernel: &Arc<dyn TileKernel>) -> usize {
        let queued = std::mem::take(&mut self.queued);
        let mut dispatched = 0;
        for id in queued {
            if !self.should_compute(id) {
                continue;
            }
            let Some(meta) = self.manager.tile(id) else {
                continue;
            };
            let job = TileJob {
                tile: id,
                spec: TileJobSpec {
                    bounds: meta.bounds,
                    resolution: meta.resolution,
                    version: self.field_version,
                    time,
                },
                kernel: kernel.clone(),
            };
            match self.device.dispatch(job) {
                Ok(handle) => {
                    self.manager.mark_computing(id);
                    self.pending.push(PendingReadback {
                        tile: id,
                        version: self.field_version,
                        submitted_frame: self.frame,
                        handle,
                    });
                    dispatched += 1;
                }
                Err(Error::DeviceUnavailable) => {
                    if !self.warned_unavailable {
                        warn!(
                            "Device '{}' unavailable; tiles stay unmaterialized.",
                            self.device.name()
                        );
                        self.warned_unavailable = true;
                    }
                    self.manager.mark_stale(id);
                }
                Err(err) => {
                    warn!("Dispatch of {} failed: {}", id, err);
                    self.manager.mark_stale(id);
                }
            }
        }
        self.stats.dispatched_total += dispatched;
        dispatched
    }

    /// Bilinear sample of the covering tile, only if it is Ready at the current version.
    pub fn sample_at_world_point(&self, p: Vec2) -> Option<f32> {
        let coord = self.manager.grid().coord_for_point(p);
        let meta = self.manager.tile_at(coord)?;
        if !meta.is_ready_for(self.field_version) {
            return None;
        }
        self.buffers.get(&meta.id)?.sample_bilinear(p)
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            ready: self
                .manager
                .tiles()
                .filter(|t| t.state == TileState::Ready && t.version == Some(self.field_version))
                .count(),
            in_flight: self.pending.len(),
            ..self.stats
        }
    }
}

impl std::fmt::Debug for TileComputePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileComputePipeline")
            .field("device", &self.device.name())
            .field("frame", &self.frame)
            .field("field_version", &self.field_version)
            .field("tiles", &self.manager.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
