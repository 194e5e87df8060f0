//! Headless stand-in for a GPU renderer.
//!
//! Each frame it takes the grid's drawable tiles, "uploads" the ones without
//! a render handle by attaching a fresh handle, and releases the handles of
//! tiles the grid reports as expired. The last frame can be composed into an
//! RGBA image for inspection.

use std::collections::HashMap;
use std::sync::Arc;

use image::{imageops, Rgba, RgbaImage};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use cartogrid::coord::TileKey;
use cartogrid::tile::{CachedTile, RenderHandle};
use cartogrid::TileGrid;

/// Canvas colour where no tile is drawn.
const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// What happened during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawn: usize,
    pub uploaded: usize,
    pub released: usize,
}

/// Handle bookkeeping for a grid without a real graphics backend.
pub struct HeadlessRenderer {
    grid: Arc<TileGrid>,
    expired: mpsc::UnboundedReceiver<CachedTile>,
    live: HashMap<RenderHandle, TileKey>,
    next_handle: u64,
    total_uploaded: u64,
    total_released: u64,
}

impl HeadlessRenderer {
    pub fn new(grid: Arc<TileGrid>, expired: mpsc::UnboundedReceiver<CachedTile>) -> Self {
        Self {
            grid,
            expired,
            live: HashMap::new(),
            next_handle: 1,
            total_uploaded: 0,
            total_released: 0,
        }
    }

    /// Renders one frame.
    pub fn frame(&mut self) -> FrameStats {
        let released = self.release_expired();

        let drawable = self.grid.drawable();
        let mut uploaded = 0;
        for tile in drawable.iter().filter(|t| !t.is_uploaded()) {
            let handle = RenderHandle(self.next_handle);
            // The tile may have been evicted since the snapshot
            if self.grid.attach_render_handle(tile.key, handle) {
                self.next_handle += 1;
                self.live.insert(handle, tile.key);
                uploaded += 1;
                trace!(tile = %tile.key, handle = handle.0, "Tile uploaded");
            }
        }
        self.total_uploaded += uploaded as u64;

        FrameStats {
            drawn: drawable.len(),
            uploaded,
            released,
        }
    }

    /// Frees the handles of tiles the grid has evicted.
    fn release_expired(&mut self) -> usize {
        let mut released = 0;
        while let Ok(tile) = self.expired.try_recv() {
            if let Some(handle) = tile.render_handle {
                if self.live.remove(&handle).is_some() {
                    released += 1;
                }
            }
        }
        if released > 0 {
            debug!(released, live = self.live.len(), "Released expired handles");
        }
        self.total_released += released as u64;
        released
    }

    /// Takes back every handle still attached to a cached tile.
    ///
    /// Call after the grid is closed; returns the number released.
    pub fn release_all(&mut self) -> usize {
        let expired = self.release_expired();
        let live: Vec<(RenderHandle, TileKey)> = self.live.drain().collect();
        let mut detached = 0;
        for (_, key) in live {
            if self.grid.detach_render_handle(key).is_some() {
                detached += 1;
            }
        }
        self.total_released += detached as u64;
        expired + detached
    }

    /// Composes the currently drawable tiles into a viewport-sized image.
    pub fn compose(&self) -> RgbaImage {
        let viewport = self.grid.viewport();
        let mut canvas = RgbaImage::from_pixel(viewport.width, viewport.height, BACKGROUND);
        for tile in self.grid.drawable() {
            let (x, y) = self.grid.screen_offset(&tile.key);
            imageops::overlay(&mut canvas, tile.image.pixels(), x.round() as i64, y.round() as i64);
        }
        canvas
    }

    /// Handles currently attached.
    pub fn live_handles(&self) -> usize {
        self.live.len()
    }

    pub fn total_uploaded(&self) -> u64 {
        self.total_uploaded
    }

    pub fn total_released(&self) -> u64 {
        self.total_released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartogrid::config::GridConfig;
    use cartogrid::coord::{Location, TileSize};
    use cartogrid::grid::GridChannels;
    use cartogrid::tile::TileImage;

    fn renderer(config: GridConfig) -> (HeadlessRenderer, Arc<TileGrid>) {
        let (grid, channels) = TileGrid::new(Location::new(0.0, 0.0, 6.0), config).unwrap();
        let grid = Arc::new(grid);
        let GridChannels { expired, .. } = channels;
        (HeadlessRenderer::new(Arc::clone(&grid), expired), grid)
    }

    fn solid(color: [u8; 4]) -> TileImage {
        TileImage::new(RgbaImage::from_pixel(256, 256, Rgba(color)))
    }

    #[test]
    fn test_frame_uploads_each_tile_once() {
        let (mut renderer, grid) = renderer(GridConfig::default().with_viewport(512, 512));
        grid.set_tile(TileKey::new(0, 0, 6), solid([255, 0, 0, 255]));
        grid.set_tile(TileKey::new(1, 0, 6), solid([0, 255, 0, 255]));

        let first = renderer.frame();
        assert_eq!(first.drawn, 2);
        assert_eq!(first.uploaded, 2);

        let second = renderer.frame();
        assert_eq!(second.uploaded, 0);
        assert_eq!(renderer.live_handles(), 2);
        assert!(grid.all().iter().all(|t| t.is_uploaded()));
    }

    #[test]
    fn test_release_all_detaches_handles() {
        let (mut renderer, grid) = renderer(GridConfig::default());
        grid.set_tile(TileKey::new(0, 0, 6), solid([1, 2, 3, 255]));
        renderer.frame();

        assert_eq!(renderer.release_all(), 1);
        assert_eq!(renderer.live_handles(), 0);
        assert!(grid.all().iter().all(|t| !t.is_uploaded()));
        assert_eq!(renderer.total_uploaded(), renderer.total_released());
    }

    #[test]
    fn test_compose_places_tiles_at_screen_offset() {
        let (renderer, grid) = renderer(GridConfig::default().with_viewport(300, 10));
        grid.set_tile(TileKey::new(0, 0, 6), solid([255, 0, 0, 255]));
        grid.set_tile(
            TileKey::new(1, 0, 6),
            TileImage::placeholder(TileSize::default()),
        );

        let canvas = renderer.compose();
        assert_eq!(canvas.dimensions(), (300, 10));
        assert_eq!(canvas.get_pixel(10, 5), &Rgba([255, 0, 0, 255]));
        assert_eq!(
            canvas.get_pixel(260, 5),
            &cartogrid::tile::PLACEHOLDER_COLOR
        );
    }

    #[test]
    fn test_compose_leaves_missing_tiles_blank() {
        let (renderer, _grid) = renderer(GridConfig::default().with_viewport(64, 64));
        assert_eq!(renderer.compose().get_pixel(0, 0), &BACKGROUND);
    }
}
