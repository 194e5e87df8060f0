//! cartogrid - viewport-driven slippy-map tile grid
//!
//! This library keeps a pannable, zoomable viewport over a tiled raster
//! plane supplied with imagery:
//!
//! - [`coord`] maps a view location to the tiles on screen
//! - [`grid`] caches tiles, tracks in-flight loads and cancels obsolete ones
//!   when the zoom level changes
//! - [`fetch`] runs the loads against a [`provider::TileSource`]
//! - [`input`] turns window events into pan/zoom steps
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cartogrid::config::{FetchConfig, GridConfig};
//! use cartogrid::coord::Location;
//! use cartogrid::fetch::FetchWorker;
//! use cartogrid::grid::TileGrid;
//! use cartogrid::provider::{AsyncReqwestClient, HttpTileSource};
//!
//! let (grid, channels) = TileGrid::new(Location::new(7936.0, 5632.0, 6.0), GridConfig::default())?;
//! let grid = Arc::new(grid);
//!
//! let fetch = FetchConfig::default();
//! let source = HttpTileSource::new(AsyncReqwestClient::new(&fetch)?, &fetch.base_url);
//! let worker = FetchWorker::new(Arc::clone(&grid), source, fetch.max_concurrent)
//!     .spawn(channels.loads, shutdown.clone());
//!
//! grid.set_location(grid.location()).await?;
//! for tile in grid.drawable() {
//!     let (x, y) = grid.screen_offset(&tile.key);
//!     // draw tile.image at (x, y)
//! }
//! ```

pub mod config;
pub mod coord;
pub mod error;
pub mod fetch;
pub mod grid;
pub mod input;
pub mod logging;
pub mod provider;
pub mod telemetry;
pub mod tile;

pub use error::{FetchError, GridError};
pub use grid::TileGrid;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
