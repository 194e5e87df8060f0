//! Configuration
//!
//! Runtime settings for the grid ([`GridConfig`]) and the HTTP tile fetcher
//! ([`FetchConfig`]), plus [`ConfigFile`] which loads both from an INI file.

mod file;
mod parser;

pub use file::{config_directory, config_file_path, ConfigError, ConfigFile};

use crate::coord::{Location, TileSize, Viewport, ZoomRange, DEFAULT_TILE_SIZE};
use crate::error::GridError;

/// Number of visibility scans a tile from another zoom level survives
/// without being seen before it is evicted.
pub const DEFAULT_RETENTION_TICKS: u64 = 32;

/// Capacity of the bounded load-request channel.
pub const DEFAULT_LOAD_CHANNEL_CAPACITY: usize = 64;

/// Default tile server. Tiles are fetched from `{base}/{z}/{x}/{y}.png`.
pub const DEFAULT_BASE_URL: &str = "http://tile.openstreetmap.de";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of tile fetches running at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// User agent sent with tile requests. Public tile servers reject
/// anonymous clients.
pub const DEFAULT_USER_AGENT: &str = concat!("cartogrid/", env!("CARGO_PKG_VERSION"));

/// Initial view when nothing else is configured: zoom 6 over Europe.
pub fn default_start_location() -> Location {
    Location::new(
        31.0 * DEFAULT_TILE_SIZE as f64,
        22.0 * DEFAULT_TILE_SIZE as f64,
        6.0,
    )
}

/// Settings for a [`TileGrid`](crate::grid::TileGrid).
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig {
    /// Pixel size of one tile.
    pub tile: TileSize,
    /// Pixel size of the screen area.
    pub viewport: Viewport,
    /// Allowed zoom levels.
    pub zoom: ZoomRange,
    /// Visibility scans an off-zoom tile is kept after it was last seen.
    pub retention_ticks: u64,
    /// Optional hard cap on cached tiles.
    pub max_cached_tiles: Option<usize>,
    /// Capacity of the load-request channel.
    pub load_channel_capacity: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            tile: TileSize::default(),
            viewport: Viewport::default(),
            zoom: ZoomRange::default(),
            retention_ticks: DEFAULT_RETENTION_TICKS,
            max_cached_tiles: None,
            load_channel_capacity: DEFAULT_LOAD_CHANNEL_CAPACITY,
        }
    }
}

impl GridConfig {
    /// Set the tile size.
    pub fn with_tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile = TileSize::new(width, height);
        self
    }

    /// Set the viewport size.
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Viewport::new(width, height);
        self
    }

    /// Set the zoom range.
    pub fn with_zoom_range(mut self, zoom: ZoomRange) -> Self {
        self.zoom = zoom;
        self
    }

    /// Set the off-zoom retention in visibility scans.
    pub fn with_retention_ticks(mut self, ticks: u64) -> Self {
        self.retention_ticks = ticks;
        self
    }

    /// Cap the number of cached tiles.
    pub fn with_max_cached_tiles(mut self, max: usize) -> Self {
        self.max_cached_tiles = Some(max);
        self
    }

    /// Set the load channel capacity.
    pub fn with_load_channel_capacity(mut self, capacity: usize) -> Self {
        self.load_channel_capacity = capacity;
        self
    }

    /// Checks every size parameter is positive.
    pub fn validate(&self) -> Result<(), GridError> {
        let dims = [
            ("tile_width", self.tile.width),
            ("tile_height", self.tile.height),
            ("viewport_width", self.viewport.width),
            ("viewport_height", self.viewport.height),
        ];
        for (name, value) in dims {
            if value == 0 {
                return Err(GridError::InvalidDimension { name, value });
            }
        }
        if self.load_channel_capacity == 0 {
            return Err(GridError::InvalidDimension {
                name: "load_channel_capacity",
                value: 0,
            });
        }
        Ok(())
    }
}

/// Settings for the HTTP tile source and fetch worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Upper bound on fetches in progress at once.
    pub max_concurrent: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl FetchConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
