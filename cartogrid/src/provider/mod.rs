//! Tile sources
//!
//! A [`TileSource`] turns a [`TileKey`] into a decoded [`TileImage`]. The
//! fetch worker is generic over it so tests can substitute an in-memory
//! source for the HTTP one.
//!
//! ```ignore
//! use cartogrid::provider::{AsyncReqwestClient, HttpTileSource};
//!
//! let client = AsyncReqwestClient::new(&fetch_config)?;
//! let source = HttpTileSource::new(client, &fetch_config.base_url);
//! let image = source.fetch(TileKey::new(31, 22, 6)).await?;
//! ```

mod http;
mod source;

use std::future::Future;

pub use http::{AsyncHttpClient, AsyncReqwestClient};
pub use source::HttpTileSource;

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;

use crate::coord::TileKey;
use crate::error::FetchError;
use crate::tile::TileImage;

/// Anything that can produce tile imagery.
pub trait TileSource: Send + Sync {
    /// Fetches and decodes the tile at `key`.
    ///
    /// # Returns
    ///
    /// The decoded image, or [`FetchError::NotFound`] if the source has no
    /// tile there.
    fn fetch(&self, key: TileKey) -> impl Future<Output = Result<TileImage, FetchError>> + Send;
}
