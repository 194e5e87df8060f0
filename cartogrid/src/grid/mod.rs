//! Viewport-driven tile grid.
//!
//! [`TileGrid`] owns the view location, decides which tiles are on screen,
//! caches fetched tiles and issues [`LoadRequest`]s for missing ones.
//!
//! # Architecture
//!
//! ```text
//! move_by / set_location ──► visible_tiles ──► TileStore::try_insert_loading
//!                                                   │
//!                                     LoadRequest ◄─┘ (bounded mpsc)
//!                                          │
//!                                    FetchWorker ──► set_tile / abandon
//!
//! drawable() ◄── renderer          expired ──► renderer releases handles
//! ```
//!
//! # Cancellation
//!
//! Tokens form a tree: the grid's root token, one child per generation, one
//! grandchild per request. A zoom change cancels the generation token, which
//! signals every queued and running load at once, then starts a new
//! generation. Closing the grid cancels the root.
//!
//! # Locking
//!
//! View state sits behind a `parking_lot::Mutex` that is never held across
//! an `.await`. Loading slots are only created while that lock is held, so a
//! generation bump and the slot cleanup that follows it cannot interleave
//! with a visibility scan.

mod eviction;
mod request;
mod store;

pub use eviction::{EvictionPolicy, VisibilityClock};
pub use request::{GridChannels, LoadRequest};
pub use store::{Completion, TileSlot, TileStore};

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::GridConfig;
use crate::coord::{self, Location, MoveDelta, TileKey, TileSize, Viewport, ZoomRange};
use crate::error::GridError;
use crate::telemetry::GridMetrics;
use crate::tile::{CachedTile, RenderHandle, TileImage};

/// Mutable view state guarded by one lock.
struct ViewState {
    location: Location,
    viewport: Viewport,
    tiles_across: (u32, u32),
    generation: u64,
    generation_token: CancellationToken,
    clock: VisibilityClock,
}

/// Tile cache and visibility tracker for a single viewport.
///
/// Shared as `Arc<TileGrid>` between the input loop, the fetch worker and the
/// renderer.
pub struct TileGrid {
    tile: TileSize,
    zoom: ZoomRange,
    eviction: EvictionPolicy,
    store: TileStore,
    view: Mutex<ViewState>,
    loads: Mutex<Option<mpsc::Sender<LoadRequest>>>,
    expired: Mutex<Option<mpsc::UnboundedSender<CachedTile>>>,
    root: CancellationToken,
    closed: AtomicBool,
    metrics: Arc<GridMetrics>,
}

impl TileGrid {
    /// Creates a grid at `location`.
    ///
    /// No tiles are requested until the first [`set_location`](Self::set_location)
    /// or [`move_by`](Self::move_by).
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidDimension`] if a tile or viewport size is zero.
    pub fn new(location: Location, config: GridConfig) -> Result<(Self, GridChannels), GridError> {
        config.validate()?;

        let (load_tx, load_rx) = mpsc::channel(config.load_channel_capacity);
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        let root = CancellationToken::new();

        let mut location = location;
        location.clamp_zoom(config.zoom);

        let view = ViewState {
            location,
            viewport: config.viewport,
            tiles_across: config.viewport.tiles_across(config.tile),
            generation: 0,
            generation_token: root.child_token(),
            clock: VisibilityClock::new(),
        };

        info!(
            location = %location,
            tile_width = config.tile.width,
            tile_height = config.tile.height,
            viewport_width = config.viewport.width,
            viewport_height = config.viewport.height,
            "Tile grid created"
        );

        let grid = Self {
            tile: config.tile,
            zoom: config.zoom,
            eviction: EvictionPolicy {
                retention_ticks: config.retention_ticks,
                max_cached_tiles: config.max_cached_tiles,
            },
            store: TileStore::new(),
            view: Mutex::new(view),
            loads: Mutex::new(Some(load_tx)),
            expired: Mutex::new(Some(expired_tx)),
            root,
            closed: AtomicBool::new(false),
            metrics: Arc::new(GridMetrics::new()),
        };

        let channels = GridChannels {
            loads: load_rx,
            expired: expired_rx,
        };

        Ok((grid, channels))
    }

    /// Creates a grid with explicit tile and viewport sizes and default
    /// settings otherwise.
    pub fn create(
        location: Location,
        tile_width: u32,
        tile_height: u32,
        viewport_width: u32,
        viewport_height: u32,
    ) -> Result<(Self, GridChannels), GridError> {
        let config = GridConfig::default()
            .with_tile_size(tile_width, tile_height)
            .with_viewport(viewport_width, viewport_height);
        Self::new(location, config)
    }

    /// Changes the viewport size. Does not request tiles; the next scan
    /// picks up the new extent.
    pub fn resize(&self, width: u32, height: u32) -> Result<(), GridError> {
        self.ensure_open()?;
        if width == 0 {
            return Err(GridError::InvalidDimension {
                name: "viewport_width",
                value: width,
            });
        }
        if height == 0 {
            return Err(GridError::InvalidDimension {
                name: "viewport_height",
                value: height,
            });
        }

        let mut view = self.view.lock();
        view.viewport = Viewport::new(width, height);
        view.tiles_across = view.viewport.tiles_across(self.tile);
        debug!(
            width,
            height,
            tiles_x = view.tiles_across.0,
            tiles_y = view.tiles_across.1,
            "Viewport resized"
        );
        Ok(())
    }

    /// Applies a relative pan/zoom and rescans.
    ///
    /// Any zoom component cancels every outstanding load and starts a new
    /// generation. When the integer zoom level changes the view is rescaled
    /// around the viewport centre.
    ///
    /// Returns the number of loads dispatched.
    pub async fn move_by(&self, delta: MoveDelta) -> Result<usize, GridError> {
        self.ensure_open()?;

        let location = {
            let mut view = self.view.lock();
            let mut location = view.location;
            let levels = location.apply(delta, self.zoom);

            if delta.is_zoom() {
                self.start_generation(&mut view);
            }

            if levels != 0 {
                // apply() already scaled the top-left corner; shift it so the
                // centre stays put: x' = (x + w/2)·2^k − w/2
                let shift = 2f64.powi(levels) - 1.0;
                location.x += view.viewport.width as f64 / 2.0 * shift;
                location.y += view.viewport.height as f64 / 2.0 * shift;
            }
            location
        };

        self.set_location(location).await
    }

    /// Cancels the current generation and drops its loading slots.
    fn start_generation(&self, view: &mut ViewState) {
        view.generation_token.cancel();
        view.generation += 1;
        view.generation_token = self.root.child_token();

        let cancelled = self.store.cancel_loading();
        self.metrics.loads_cancelled(cancelled as u64);
        info!(
            generation = view.generation,
            cancelled, "Zoom changed, outstanding loads cancelled"
        );
    }

    /// Moves the view to `location` (zoom clamped) and requests every visible
    /// tile that is neither cached nor loading.
    ///
    /// Sending waits while the load channel is full. Returns the number of
    /// loads dispatched.
    pub async fn set_location(&self, location: Location) -> Result<usize, GridError> {
        self.ensure_open()?;

        let (requests, visible, zoom) = {
            let mut view = self.view.lock();
            let mut location = location;
            location.clamp_zoom(self.zoom);
            view.location = location;

            let visible = coord::visible_tiles(&location, self.tile, view.viewport);
            view.clock.advance(&visible);

            let generation = view.generation;
            let requests: Vec<LoadRequest> = visible
                .iter()
                .filter(|key| self.store.try_insert_loading(**key, generation))
                .map(|key| LoadRequest {
                    key: *key,
                    generation,
                    cancellation: view.generation_token.child_token(),
                })
                .collect();

            (requests, visible, location.zoom_level())
        };

        let sender = self.loads.lock().clone();
        let mut dispatched = 0;
        for request in requests {
            let key = request.key;
            let generation = request.generation;

            let sent = match &sender {
                Some(tx) => tokio::select! {
                    biased;
                    _ = self.root.cancelled() => false,
                    result = tx.send(request) => result.is_ok(),
                },
                None => false,
            };

            if sent {
                dispatched += 1;
                self.metrics.load_requested();
                debug!(tile = %key, generation, "Load requested");
            } else {
                self.store.abandon(&key, generation);
                warn!(tile = %key, "Load channel closed, request dropped");
            }
        }

        self.evict(&visible, zoom);
        Ok(dispatched)
    }

    /// Evicts cached tiles according to the eviction policy and reports them
    /// on the expired channel.
    ///
    /// Also drops visibility stamps of keys that have neither a slot nor a
    /// stamp within the retention window, so keys whose loads were abandoned
    /// or cancelled are not tracked forever.
    fn evict(&self, visible: &[TileKey], zoom: u32) {
        let cached = self.store.ready_keys();
        let visible: HashSet<TileKey> = visible.iter().copied().collect();
        let victims = {
            let view = self.view.lock();
            self.eviction.select(&view.clock, &cached, &visible, zoom)
        };

        let mut evicted = Vec::with_capacity(victims.len());
        if !victims.is_empty() {
            let expired = self.expired.lock().clone();
            for key in victims {
                if let Some(tile) = self.store.remove_ready(&key) {
                    evicted.push(key);
                    if let Some(tx) = &expired {
                        // Receiver gone means nobody holds render resources
                        let _ = tx.send(tile);
                    }
                }
            }
        }

        {
            let mut view = self.view.lock();
            for key in &evicted {
                view.clock.forget(key);
            }
            let tick = view.clock.tick();
            let retention = self.eviction.retention_ticks;
            view.clock.retain(|key, stamp| {
                tick.saturating_sub(stamp) <= retention || self.store.contains(key)
            });
        }

        if !evicted.is_empty() {
            self.metrics.tiles_evicted(evicted.len() as u64);
            debug!(count = evicted.len(), "Evicted cached tiles");
        }
    }

    /// Stores a fetched tile.
    ///
    /// Safe to call from any task. A tile that arrives after its load was
    /// cancelled is still cached. Ignored once the grid is closed.
    pub fn set_tile(&self, key: TileKey, image: TileImage) {
        if self.is_closed() {
            debug!(tile = %key, "Grid closed, tile discarded");
            return;
        }

        let placeholder = image.is_placeholder();
        let completion = self.store.complete(key, image);
        match completion {
            Completion::Late => self.metrics.late_tile(),
            Completion::Loaded | Completion::Replaced => self.metrics.tile_loaded(),
        }
        if placeholder {
            self.metrics.placeholder_used();
        }
        debug!(tile = %key, ?completion, placeholder, "Tile stored");
    }

    /// Releases the loading slot of a load that failed or was cancelled.
    ///
    /// Only removes the slot if it still belongs to `generation`; a newer
    /// load for the same key is left alone.
    pub fn abandon(&self, key: TileKey, generation: u64) -> bool {
        self.store.abandon(&key, generation)
    }

    /// Cached tiles for the keys currently on screen, in draw order.
    pub fn drawable(&self) -> Vec<CachedTile> {
        let (location, viewport) = {
            let view = self.view.lock();
            (view.location, view.viewport)
        };
        coord::visible_tiles(&location, self.tile, viewport)
            .iter()
            .filter_map(|key| self.store.get(key))
            .collect()
    }

    /// Every cached tile, unordered.
    pub fn all(&self) -> Vec<CachedTile> {
        self.store.snapshot()
    }

    /// Records the renderer's resource for a cached tile.
    pub fn attach_render_handle(&self, key: TileKey, handle: RenderHandle) -> bool {
        self.store.attach_handle(&key, handle)
    }

    /// Takes the renderer's resource back from a cached tile.
    pub fn detach_render_handle(&self, key: TileKey) -> Option<RenderHandle> {
        self.store.detach_handle(&key)
    }

    /// Screen position of a tile's top-left corner.
    pub fn screen_offset(&self, key: &TileKey) -> (f64, f64) {
        let location = self.view.lock().location;
        coord::screen_offset(key, &location, self.tile)
    }

    /// Closes the grid: cancels every load and drops the channel senders.
    ///
    /// # Errors
    ///
    /// [`GridError::Closed`] if the grid was already closed.
    pub fn close(&self) -> Result<(), GridError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(GridError::Closed);
        }

        self.root.cancel();
        self.loads.lock().take();
        self.expired.lock().take();

        let cancelled = {
            let _view = self.view.lock();
            self.store.cancel_loading()
        };
        self.metrics.loads_cancelled(cancelled as u64);

        info!(
            cached = self.store.ready_count(),
            cancelled, "Tile grid closed"
        );
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), GridError> {
        if self.is_closed() {
            Err(GridError::Closed)
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn location(&self) -> Location {
        self.view.lock().location
    }

    pub fn viewport(&self) -> Viewport {
        self.view.lock().viewport
    }

    /// Whole tiles across and down the viewport.
    pub fn tiles_across(&self) -> (u32, u32) {
        self.view.lock().tiles_across
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile
    }

    pub fn zoom_range(&self) -> ZoomRange {
        self.zoom
    }

    /// Integer zoom level tiles are addressed at.
    pub fn zoom_level(&self) -> u32 {
        self.view.lock().location.zoom_level()
    }

    /// Current load generation. Bumped by every zoom.
    pub fn generation(&self) -> u64 {
        self.view.lock().generation
    }

    pub fn is_in_flight(&self, key: &TileKey) -> bool {
        self.store.is_loading(key)
    }

    pub fn is_cached(&self, key: &TileKey) -> bool {
        self.store.is_ready(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.store.loading_count()
    }

    pub fn cached_count(&self) -> usize {
        self.store.ready_count()
    }

    pub fn metrics(&self) -> Arc<GridMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_at(location: Location) -> (TileGrid, GridChannels) {
        TileGrid::create(location, 256, 256, 512, 512).unwrap()
    }

    fn image() -> TileImage {
        TileImage::placeholder(TileSize::new(1, 1))
    }

    fn drain(channels: &mut GridChannels) -> Vec<LoadRequest> {
        let mut requests = Vec::new();
        while let Ok(request) = channels.loads.try_recv() {
            requests.push(request);
        }
        requests
    }

    #[test]
    fn test_create_rejects_zero_dimensions() {
        let location = Location::new(0.0, 0.0, 6.0);
        assert_eq!(
            TileGrid::create(location, 0, 256, 800, 600).err(),
            Some(GridError::InvalidDimension {
                name: "tile_width",
                value: 0
            })
        );
        assert!(TileGrid::create(location, 256, 256, 800, 0).is_err());
    }

    #[test]
    fn test_create_clamps_initial_zoom() {
        let (grid, _channels) = grid_at(Location::new(0.0, 0.0, 30.0));
        assert_eq!(grid.zoom_level(), 17);
    }

    #[test]
    fn test_tiles_across() {
        let (grid, _channels) = TileGrid::create(Location::default(), 256, 256, 800, 600).unwrap();
        assert_eq!(grid.tiles_across(), (3, 2));
        grid.resize(1024, 1024).unwrap();
        assert_eq!(grid.tiles_across(), (4, 4));
        assert_eq!(grid.viewport(), Viewport::new(1024, 1024));
    }

    #[test]
    fn test_resize_rejects_zero() {
        let (grid, _channels) = grid_at(Location::default());
        assert!(matches!(
            grid.resize(0, 600),
            Err(GridError::InvalidDimension { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_location_requests_visible_tiles() {
        let (grid, mut channels) = grid_at(Location::new(0.0, 0.0, 6.0));

        let dispatched = grid.set_location(Location::new(0.0, 0.0, 6.0)).await.unwrap();
        assert_eq!(dispatched, 9);

        let keys: Vec<TileKey> = drain(&mut channels).iter().map(|r| r.key).collect();
        let expected: Vec<TileKey> = (0..=2)
            .flat_map(|x| (0..=2).map(move |y| TileKey::new(x, y, 6)))
            .collect();
        assert_eq!(keys, expected);
        assert!(expected.iter().all(|k| grid.is_in_flight(k)));
        assert_eq!(grid.in_flight_count(), 9);
    }

    #[tokio::test]
    async fn test_set_location_does_not_repeat_requests() {
        let (grid, mut channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        grid.set_location(Location::new(0.0, 0.0, 6.0)).await.unwrap();
        drain(&mut channels);

        let dispatched = grid.set_location(Location::new(0.0, 0.0, 6.0)).await.unwrap();
        assert_eq!(dispatched, 0);
        assert!(drain(&mut channels).is_empty());
    }

    #[tokio::test]
    async fn test_set_location_skips_cached_tiles() {
        let (grid, mut channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        grid.set_tile(TileKey::new(1, 1, 6), image());

        let dispatched = grid.set_location(Location::new(0.0, 0.0, 6.0)).await.unwrap();
        assert_eq!(dispatched, 8);
        assert!(drain(&mut channels)
            .iter()
            .all(|r| r.key != TileKey::new(1, 1, 6)));
    }

    #[tokio::test]
    async fn test_set_location_clamps_zoom() {
        let (grid, _channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        grid.set_location(Location::new(0.0, 0.0, -4.0)).await.unwrap();
        assert_eq!(grid.location().z, 2.0);
    }

    #[tokio::test]
    async fn test_set_tile_moves_key_from_in_flight_to_cache() {
        let (grid, mut channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        grid.set_location(Location::new(0.0, 0.0, 6.0)).await.unwrap();
        let request = drain(&mut channels).remove(0);

        grid.set_tile(request.key, image());
        assert!(grid.is_cached(&request.key));
        assert!(!grid.is_in_flight(&request.key));
        assert_eq!(grid.drawable().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_set_tile_is_idempotent() {
        let (grid, _channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        let key = TileKey::new(0, 0, 6);

        grid.set_tile(key, image());
        grid.attach_render_handle(key, RenderHandle(42));
        grid.set_tile(key, image());

        assert_eq!(grid.cached_count(), 1);
        assert_eq!(grid.all()[0].render_handle, Some(RenderHandle(42)));
    }

    #[tokio::test]
    async fn test_abandon_makes_key_absent() {
        let (grid, mut channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        grid.set_location(Location::new(0.0, 0.0, 6.0)).await.unwrap();
        let request = drain(&mut channels).remove(0);

        assert!(grid.abandon(request.key, request.generation));
        assert!(!grid.is_in_flight(&request.key));
        assert!(!grid.is_cached(&request.key));

        // Re-requested on the next scan
        let dispatched = grid.set_location(grid.location()).await.unwrap();
        assert_eq!(dispatched, 1);
    }

    #[tokio::test]
    async fn test_pan_keeps_generation() {
        let (grid, mut channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        grid.set_location(Location::new(0.0, 0.0, 6.0)).await.unwrap();
        let requests = drain(&mut channels);

        grid.move_by(MoveDelta::pan(300.0, 0.0)).await.unwrap();
        assert_eq!(grid.generation(), 0);
        assert!(requests.iter().all(|r| !r.is_cancelled()));
        assert_eq!(grid.location(), Location::new(300.0, 0.0, 6.0));
    }

    #[tokio::test]
    async fn test_zoom_cancels_outstanding_loads() {
        let (grid, mut channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        grid.set_location(Location::new(0.0, 0.0, 6.0)).await.unwrap();
        let requests = drain(&mut channels);
        assert_eq!(requests.len(), 9);

        grid.move_by(MoveDelta::zoom(1.0)).await.unwrap();

        assert_eq!(grid.generation(), 1);
        assert!(requests.iter().all(LoadRequest::is_cancelled));
        assert!(requests.iter().all(|r| !grid.is_in_flight(&r.key)));
        assert_eq!(grid.zoom_level(), 7);

        let fresh = drain(&mut channels);
        assert!(!fresh.is_empty());
        assert!(fresh.iter().all(|r| r.generation == 1 && r.key.z == 7));
        assert!(fresh.iter().all(|r| !r.is_cancelled()));
    }

    #[tokio::test]
    async fn test_late_tile_after_zoom_is_accepted() {
        let (grid, mut channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        grid.set_location(Location::new(0.0, 0.0, 6.0)).await.unwrap();
        let stale = drain(&mut channels).remove(0);

        grid.move_by(MoveDelta::zoom(-1.0)).await.unwrap();
        grid.set_tile(stale.key, image());

        assert!(grid.is_cached(&stale.key));
        let snapshot = grid.metrics().snapshot();
        assert_eq!(snapshot.late_tiles, 1);
        assert_eq!(snapshot.tiles_loaded, 0);
        // The stale generation cannot release anything any more
        assert!(!grid.abandon(stale.key, stale.generation));
    }

    #[tokio::test]
    async fn test_zoom_recenters_on_viewport() {
        let (grid, _channels) = grid_at(Location::new(1000.0, 1000.0, 6.0));

        grid.move_by(MoveDelta::zoom(1.0)).await.unwrap();
        // (1000 + 256)·2 − 256
        assert_eq!(grid.location(), Location::new(2256.0, 2256.0, 7.0));

        grid.move_by(MoveDelta::zoom(-1.0)).await.unwrap();
        assert_eq!(grid.location(), Location::new(1000.0, 1000.0, 6.0));
    }

    #[tokio::test]
    async fn test_zoom_at_limit_does_not_shift() {
        let (grid, _channels) = grid_at(Location::new(1000.0, 1000.0, 2.0));
        grid.move_by(MoveDelta::zoom(-1.0)).await.unwrap();
        assert_eq!(grid.location(), Location::new(1000.0, 1000.0, 2.0));
    }

    #[tokio::test]
    async fn test_drawable_follows_visible_order() {
        let (grid, _channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        grid.set_tile(TileKey::new(2, 0, 6), image());
        grid.set_tile(TileKey::new(0, 1, 6), image());
        grid.set_tile(TileKey::new(9, 9, 6), image());

        let keys: Vec<TileKey> = grid.drawable().iter().map(|t| t.key).collect();
        assert_eq!(keys, vec![TileKey::new(0, 1, 6), TileKey::new(2, 0, 6)]);
        assert_eq!(grid.all().len(), 3);
    }

    #[tokio::test]
    async fn test_off_zoom_tiles_are_evicted_to_expired_channel() {
        let config = GridConfig::default()
            .with_viewport(256, 256)
            .with_retention_ticks(1);
        let (grid, mut channels) = TileGrid::new(Location::new(0.0, 0.0, 6.0), config).unwrap();

        grid.set_location(grid.location()).await.unwrap();
        let key = TileKey::new(0, 0, 6);
        grid.set_tile(key, image());
        grid.attach_render_handle(key, RenderHandle(5));

        grid.move_by(MoveDelta::zoom(1.0)).await.unwrap();
        assert!(grid.is_cached(&key), "retained within the retention window");

        grid.set_location(grid.location()).await.unwrap();
        assert!(!grid.is_cached(&key));

        let expired = channels.expired.try_recv().unwrap();
        assert_eq!(expired.key, key);
        assert_eq!(expired.render_handle, Some(RenderHandle(5)));
        assert_eq!(grid.metrics().snapshot().tiles_evicted, 1);
    }

    #[tokio::test]
    async fn test_cap_evicts_offscreen_tiles() {
        let config = GridConfig::default()
            .with_viewport(256, 256)
            .with_max_cached_tiles(4);
        let (grid, mut channels) = TileGrid::new(Location::new(0.0, 0.0, 6.0), config).unwrap();
        for x in 10..16 {
            grid.set_tile(TileKey::new(x, 10, 6), image());
        }

        grid.set_location(grid.location()).await.unwrap();
        assert_eq!(grid.cached_count(), 4);

        let mut evicted = 0;
        while channels.expired.try_recv().is_ok() {
            evicted += 1;
        }
        assert_eq!(evicted, 2);
    }

    fn abandon_all(grid: &TileGrid, channels: &mut GridChannels) {
        for request in drain(channels) {
            grid.abandon(request.key, request.generation);
        }
    }

    #[tokio::test]
    async fn test_stamps_of_abandoned_keys_are_dropped() {
        let config = GridConfig::default()
            .with_viewport(256, 256)
            .with_retention_ticks(2);
        let (grid, mut channels) = TileGrid::new(Location::new(0.0, 0.0, 6.0), config).unwrap();

        for _ in 0..200 {
            grid.move_by(MoveDelta::pan(300.0, 0.0)).await.unwrap();
            abandon_all(&grid, &mut channels);
        }
        for _ in 0..50 {
            grid.move_by(MoveDelta::zoom(1.0)).await.unwrap();
            abandon_all(&grid, &mut channels);
            grid.move_by(MoveDelta::zoom(-1.0)).await.unwrap();
            abandon_all(&grid, &mut channels);
        }

        assert_eq!(grid.cached_count(), 0);
        assert_eq!(grid.in_flight_count(), 0);
        // At most the keys of the last retention_ticks + 1 scans, each
        // covering no more than 4×4 tiles
        let tracked = grid.view.lock().clock.len();
        assert!(tracked <= 3 * 16, "{tracked} keys still tracked");
    }

    #[tokio::test]
    async fn test_stamps_of_cached_keys_survive_pruning() {
        let config = GridConfig::default()
            .with_viewport(256, 256)
            .with_retention_ticks(2);
        let (grid, mut channels) = TileGrid::new(Location::new(0.0, 0.0, 6.0), config).unwrap();
        grid.set_location(grid.location()).await.unwrap();
        let key = TileKey::new(0, 0, 6);
        grid.set_tile(key, image());
        abandon_all(&grid, &mut channels);

        for _ in 0..5 {
            grid.move_by(MoveDelta::pan(5000.0, 0.0)).await.unwrap();
            abandon_all(&grid, &mut channels);
        }

        // Same zoom, so retained; its stamp still dates from the first scan
        assert!(grid.is_cached(&key));
        assert_eq!(grid.view.lock().clock.last_seen(&key), 1);
    }

    #[tokio::test]
    async fn test_screen_offset() {
        let (grid, _channels) = grid_at(Location::new(300.0, 100.0, 6.0));
        assert_eq!(grid.screen_offset(&TileKey::new(1, 0, 6)), (-44.0, -100.0));
    }

    #[tokio::test]
    async fn test_close() {
        let (grid, mut channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        grid.set_location(grid.location()).await.unwrap();
        let requests = drain(&mut channels);

        grid.close().unwrap();
        assert_eq!(grid.close(), Err(GridError::Closed));
        assert!(requests.iter().all(LoadRequest::is_cancelled));
        assert_eq!(grid.in_flight_count(), 0);

        assert_eq!(grid.set_location(grid.location()).await, Err(GridError::Closed));
        assert_eq!(grid.move_by(MoveDelta::pan(1.0, 1.0)).await, Err(GridError::Closed));
        assert_eq!(grid.resize(100, 100), Err(GridError::Closed));

        grid.set_tile(TileKey::new(0, 0, 6), image());
        assert_eq!(grid.cached_count(), 0);

        assert!(channels.loads.recv().await.is_none());
        assert!(channels.expired.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_send_failure_abandons_slot() {
        let (grid, channels) = grid_at(Location::new(0.0, 0.0, 6.0));
        drop(channels);

        let dispatched = grid.set_location(grid.location()).await.unwrap();
        assert_eq!(dispatched, 0);
        assert_eq!(grid.in_flight_count(), 0);
    }
}
