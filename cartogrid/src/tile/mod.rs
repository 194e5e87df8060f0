//! Tile payloads
//!
//! [`TileImage`] is the decoded raster a [`TileSource`](crate::provider::TileSource)
//! produces; [`CachedTile`] is what the grid stores and hands to the renderer.

mod cached;
mod raster;

pub use cached::{CachedTile, RenderHandle};
pub use raster::{TileImage, PLACEHOLDER_COLOR};
