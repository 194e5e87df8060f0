//! Load requests and the channels the grid hands to its collaborators.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::coord::TileKey;
use crate::tile::CachedTile;

/// A request to fetch one tile.
///
/// `cancellation` fires when the request becomes obsolete (a zoom change
/// started a new generation, or the grid closed). A fetch for a cancelled
/// request must not be started, and one in progress should stop.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub key: TileKey,
    /// Grid generation the request was issued in.
    pub generation: u64,
    pub cancellation: CancellationToken,
}

impl LoadRequest {
    /// Returns true if the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Receiving ends created together with a grid.
#[derive(Debug)]
pub struct GridChannels {
    /// Load requests for the fetch worker. Bounded: a full channel makes
    /// `set_location` wait.
    pub loads: mpsc::Receiver<LoadRequest>,
    /// Tiles evicted from the cache. The renderer releases their handles.
    pub expired: mpsc::UnboundedReceiver<CachedTile>,
}
