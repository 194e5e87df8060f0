//! Cache entries and render resource handles.

use std::sync::Arc;

use super::TileImage;
use crate::coord::TileKey;

/// Opaque identifier of a render resource (e.g. a GPU texture) owned by the
/// renderer.
///
/// The grid only stores and hands these back; it never creates or releases
/// the underlying resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);

/// A fetched tile held in the grid cache.
#[derive(Debug, Clone)]
pub struct CachedTile {
    pub key: TileKey,
    pub image: Arc<TileImage>,
    pub render_handle: Option<RenderHandle>,
}

impl CachedTile {
    pub fn new(key: TileKey, image: TileImage) -> Self {
        Self {
            key,
            image: Arc::new(image),
            render_handle: None,
        }
    }

    /// Returns true once the renderer has uploaded this tile.
    pub fn is_uploaded(&self) -> bool {
        self.render_handle.is_some()
    }
}
