//! Serial delta consumer.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coord::MoveDelta;
use crate::grid::TileGrid;

/// Spawns a task applying each received delta to `grid` in order.
///
/// Deltas are applied one at a time: the next is not taken until the grid
/// has finished dispatching loads for the previous one. The task ends when
/// the delta channel closes, `shutdown` fires or the grid is closed, and
/// yields the number of deltas applied.
pub fn spawn_input_loop(
    grid: Arc<TileGrid>,
    mut deltas: mpsc::Receiver<MoveDelta>,
    shutdown: CancellationToken,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut applied = 0u64;
        loop {
            let delta = tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                delta = deltas.recv() => match delta {
                    Some(delta) => delta,
                    None => break,
                },
            };

            match grid.move_by(delta).await {
                Ok(dispatched) => {
                    applied += 1;
                    debug!(
                        dx = delta.dx,
                        dy = delta.dy,
                        dz = delta.dz,
                        dispatched,
                        location = %grid.location(),
                        "Delta applied"
                    );
                }
                Err(e) => {
                    info!(error = %e, "Input loop stopping");
                    break;
                }
            }
        }
        applied
    })
}
