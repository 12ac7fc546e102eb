//! Compute devices: where tile kernels run and how their results come back.
//!
//! A device takes a [`TileJob`] and returns a [`ReadbackHandle`] immediately. The
//! result is delivered through a channel and observed by polling, so the caller never
//! blocks on a dispatch.
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::error::{Error, Result};
use crate::field::batch::{TileJobSpec, TileKernel};
use crate::tiles::tile::TileId;

/// One tile's worth of work.
#[derive(Clone)]
pub struct TileJob {
    pub tile: TileId,
    pub spec: TileJobSpec,
    pub kernel: Arc<dyn TileKernel>,
}

impl TileJob {
    fn run(&self) -> Result<Vec<f32>> {
        let values = self.kernel.evaluate_tile(&self.spec)?;
        let expected = self.spec.resolution * self.spec.resolution;
        if values.len() != expected {
            return Err(Error::Readback(format!(
                "{} produced {} samples for {}, expected {}",
                self.kernel.name(),
                values.len(),
                self.tile,
                expected
            )));
        }
        Ok(values)
    }
}

impl fmt::Debug for TileJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileJob")
            .field("tile", &self.tile)
            .field("spec", &self.spec)
            .field("kernel", &self.kernel.name())
            .finish()
    }
}

/// State of an outstanding readback.
#[derive(Debug)]
pub enum ReadbackPoll {
    Pending,
    Ready(Vec<f32>),
    Failed(Error),
}

/// Receiving end of one dispatched job.
#[derive(Debug)]
pub struct ReadbackHandle {
    rx: Receiver<Result<Vec<f32>>>,
}

impl ReadbackHandle {
    /// Handle plus the sender a device completes it with.
    pub fn channel() -> (Sender<Result<Vec<f32>>>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (tx, Self { rx })
    }

    /// Handle that is already complete.
    pub fn completed(result: Result<Vec<f32>>) -> Self {
        let (tx, handle) = Self::channel();
        let _ = tx.send(result);
        handle
    }

    /// Non-blocking check for the result. After `Ready` or `Failed` the handle is spent.
    pub fn poll(&self) -> ReadbackPoll {
        match self.rx.try_recv() {
            Ok(Ok(values)) => ReadbackPoll::Ready(values),
            Ok(Err(err)) => ReadbackPoll::Failed(err),
            Err(TryRecvError::Empty) => ReadbackPoll::Pending,
            Err(TryRecvError::Disconnected) => ReadbackPoll::Failed(Error::Readback(
                "device dropped the job without a result".into(),
            )),
        }
    }
}

/// Executes tile jobs.
pub trait ComputeDevice: Send + Sync {
    /// Start `job`; the result arrives through the returned handle.
    fn dispatch(&self, job: TileJob) -> Result<ReadbackHandle>;

    fn name(&self) -> &str;

    /// Jobs accepted so far.
    fn dispatch_count(&self) -> usize;

    fn is_available(&self) -> bool {
        true
    }
}

/// Runs jobs on a dedicated rayon pool.
pub struct ParallelDevice {
    pool: rayon::ThreadPool,
    dispatched: AtomicUsize,
}

impl ParallelDevice {
    /// Device with `threads` workers; `0` lets rayon pick.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("contour-tiles-{i}"))
            .build()
            .map_err(|e| Error::Other(format!("failed to build tile thread pool: {e}")))?;
        Ok(Self {
            pool,
            dispatched: AtomicUsize::new(0),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ComputeDevice for ParallelDevice {
    fn dispatch(&self, job: TileJob) -> Result<ReadbackHandle> {
        let (tx, handle) = ReadbackHandle::channel();
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.pool.spawn(move || {
            let _ = tx.send(job.run());
        });
        Ok(handle)
    }

    fn name(&self) -> &str {
        "parallel"
    }

    fn dispatch_count(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for ParallelDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelDevice")
            .field("threads", &self.threads())
            .field("dispatched", &self.dispatch_count())
            .finish()
    }
}

/// Evaluates each job during `dispatch`. The result is still only observed by polling.
#[derive(Debug, Default)]
pub struct InlineDevice {
    dispatched: AtomicUsize,
}

impl InlineDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ComputeDevice for InlineDevice {
    fn dispatch(&self, job: TileJob) -> Result<ReadbackHandle> {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        Ok(ReadbackHandle::completed(job.run()))
    }

    fn name(&self) -> &str {
        "inline"
    }

    fn dispatch_count(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }
}

/// Stand-in when no accelerator exists; every dispatch fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableDevice;

impl UnavailableDevice {
    pub fn new() -> Self {
        Self
    }
}

impl ComputeDevice for UnavailableDevice {
    fn dispatch(&self, _job: TileJob) -> Result<ReadbackHandle> {
        Err(Error::DeviceUnavailable)
    }

    fn name(&self) -> &str {
        "unavailable"
    }

    fn dispatch_count(&self) -> usize {
        0
    }

    fn is_available(&self) -> bool {
        false
    }
}
