//! Bounded-concurrency tile fetch loop.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coord::{TileKey, TileSize};
use crate::error::FetchError;
use crate::grid::{LoadRequest, TileGrid};
use crate::provider::TileSource;
use crate::tile::TileImage;

/// Result of a single load task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Loaded,
    Placeholder,
    Failed,
    Cancelled,
}

/// Totals reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Requests taken off the load channel
    pub received: u64,
    /// Tiles fetched and stored
    pub loaded: u64,
    /// Missing tiles replaced by placeholders
    pub placeholders: u64,
    /// Fetches that failed
    pub failed: u64,
    /// Requests skipped or stopped by cancellation
    pub cancelled: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Loaded => self.loaded += 1,
            Outcome::Placeholder => self.placeholders += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Cancelled => self.cancelled += 1,
        }
    }

    fn record_join(&mut self, result: Result<Outcome, JoinError>) {
        match result {
            Ok(outcome) => self.record(outcome),
            // Aborted at shutdown
            Err(e) if e.is_cancelled() => self.cancelled += 1,
            Err(e) => {
                warn!(error = %e, "Load task panicked");
                self.failed += 1;
            }
        }
    }
}

impl fmt::Display for WorkerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} received, {} loaded, {} placeholders, {} failed, {} cancelled",
            self.received, self.loaded, self.placeholders, self.failed, self.cancelled
        )
    }
}

/// Fetches tiles for a grid.
///
/// At most `max_concurrent` fetches run at once; further requests wait in
/// the load channel, which in turn applies backpressure to the grid.
pub struct FetchWorker<S: TileSource + 'static> {
    grid: Arc<TileGrid>,
    source: Arc<S>,
    limiter: Arc<Semaphore>,
    tile_size: TileSize,
}

impl<S: TileSource + 'static> FetchWorker<S> {
    /// Creates a worker delivering into `grid`.
    ///
    /// `max_concurrent` is raised to 1 if zero.
    pub fn new(grid: Arc<TileGrid>, source: S, max_concurrent: usize) -> Self {
        let tile_size = grid.tile_size();
        Self {
            grid,
            source: Arc::new(source),
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tile_size,
        }
    }

    /// Spawns the worker loop on the current runtime.
    ///
    /// The loop ends when `shutdown` fires (running fetches are aborted) or
    /// when the load channel closes (running fetches are drained).
    pub fn spawn(
        self,
        loads: mpsc::Receiver<LoadRequest>,
        shutdown: CancellationToken,
    ) -> JoinHandle<WorkerStats> {
        tokio::spawn(self.run(loads, shutdown))
    }

    /// Runs the worker loop until shutdown or channel close.
    pub async fn run(
        self,
        mut loads: mpsc::Receiver<LoadRequest>,
        shutdown: CancellationToken,
    ) -> WorkerStats {
        info!(
            max_concurrent = self.limiter.available_permits(),
            "Fetch worker starting"
        );

        let mut stats = WorkerStats::default();
        let mut tasks: JoinSet<Outcome> = JoinSet::new();

        loop {
            let request = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Fetch worker shutting down");
                    tasks.abort_all();
                    break;
                }

                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    stats.record_join(result);
                    continue;
                }

                request = loads.recv() => match request {
                    Some(request) => request,
                    None => {
                        debug!("Load channel closed");
                        break;
                    }
                },
            };
            stats.received += 1;

            if request.is_cancelled() {
                debug!(tile = %request.key, "Request already cancelled");
                release_cancelled(&self.grid, request.key, request.generation);
                stats.cancelled += 1;
                continue;
            }

            let permit = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    release_cancelled(&self.grid, request.key, request.generation);
                    tasks.abort_all();
                    break;
                }

                _ = request.cancellation.cancelled() => {
                    debug!(tile = %request.key, "Request cancelled while queued");
                    release_cancelled(&self.grid, request.key, request.generation);
                    stats.cancelled += 1;
                    continue;
                }

                permit = Arc::clone(&self.limiter).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            tasks.spawn(load_tile(
                Arc::clone(&self.grid),
                Arc::clone(&self.source),
                request,
                self.tile_size,
                permit,
            ));
        }

        while let Some(result) = tasks.join_next().await {
            stats.record_join(result);
        }

        info!(%stats, "Fetch worker stopped");
        stats
    }
}

/// Releases the slot of a cancelled load.
///
/// A zoom change or close drops loading slots itself and counts them; only a
/// slot this call actually removes is still uncounted.
fn release_cancelled(grid: &TileGrid, key: TileKey, generation: u64) {
    if grid.abandon(key, generation) {
        grid.metrics().load_cancelled();
    }
}

/// Fetches one tile and hands the result to the grid.
async fn load_tile<S: TileSource>(
    grid: Arc<TileGrid>,
    source: Arc<S>,
    request: LoadRequest,
    tile_size: TileSize,
    _permit: OwnedSemaphorePermit,
) -> Outcome {
    let LoadRequest {
        key,
        generation,
        cancellation,
    } = request;

    let result = tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(FetchError::Cancelled),
        result = source.fetch(key) => result,
    };

    match result {
        Ok(image) => {
            grid.set_tile(key, image);
            Outcome::Loaded
        }
        Err(e) if e.is_not_found() => {
            debug!(tile = %key, "Tile not found, using placeholder");
            grid.set_tile(key, TileImage::placeholder(tile_size));
            Outcome::Placeholder
        }
        Err(e) if e.is_cancelled() => {
            debug!(tile = %key, generation, "Fetch cancelled");
            release_cancelled(&grid, key, generation);
            Outcome::Cancelled
        }
        Err(e) => {
            warn!(tile = %key, error = %e, "Tile fetch failed");
            grid.abandon(key, generation);
            grid.metrics().load_failed();
            Outcome::Failed
        }
    }
}
