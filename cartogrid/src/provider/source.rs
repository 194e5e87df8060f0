//! Slippy-map tile server source.

use tracing::debug;

use super::{AsyncHttpClient, TileSource};
use crate::coord::TileKey;
use crate::error::FetchError;
use crate::tile::TileImage;

/// Fetches PNG tiles from `{base_url}/{z}/{x}/{y}.png`.
pub struct HttpTileSource<C: AsyncHttpClient> {
    client: C,
    base_url: String,
}

impl<C: AsyncHttpClient> HttpTileSource<C> {
    /// Creates a source for the tile server at `base_url`.
    ///
    /// A trailing slash on `base_url` is ignored.
    pub fn new(client: C, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Builds the request URL for `key`.
    pub fn tile_url(&self, key: &TileKey) -> String {
        format!("{}/{}/{}/{}.png", self.base_url, key.z, key.x, key.y)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl<C: AsyncHttpClient> TileSource for HttpTileSource<C> {
    async fn fetch(&self, key: TileKey) -> Result<TileImage, FetchError> {
        // Keys past the edge of the plane can never exist on the server
        if !key.is_in_bounds() {
            debug!(tile = %key, "Tile outside the plane");
            return Err(FetchError::NotFound);
        }

        let url = self.tile_url(&key);
        let bytes = self.client.get(&url).await?;
        let image = TileImage::decode(&bytes)?;

        debug!(
            tile = %key,
            bytes = bytes.len(),
            width = image.width(),
            height = image.height(),
            "Tile downloaded"
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_tile_url() {
        let source = HttpTileSource::new(
            MockAsyncHttpClient::new(Ok(Vec::new())),
            "http://tile.openstreetmap.de/",
        );
        assert_eq!(
            source.tile_url(&TileKey::new(31, 22, 6)),
            "http://tile.openstreetmap.de/6/31/22.png"
        );
    }

    #[tokio::test]
    async fn test_fetch_decodes_png() {
        let source = HttpTileSource::new(MockAsyncHttpClient::new(Ok(png_bytes())), "http://t");
        let image = source.fetch(TileKey::new(1, 1, 2)).await.unwrap();

        assert_eq!((image.width(), image.height()), (2, 2));
        assert!(!image.is_placeholder());
    }

    #[tokio::test]
    async fn test_fetch_propagates_status_errors() {
        let source = HttpTileSource::new(
            MockAsyncHttpClient::new(Err(FetchError::from_status(410))),
            "http://t",
        );
        assert_eq!(
            source.fetch(TileKey::new(0, 0, 2)).await.unwrap_err(),
            FetchError::Gone
        );
    }

    #[tokio::test]
    async fn test_fetch_rejects_undecodable_body() {
        let source = HttpTileSource::new(MockAsyncHttpClient::new(Ok(vec![0, 1, 2])), "http://t");
        assert!(matches!(
            source.fetch(TileKey::new(0, 0, 2)).await,
            Err(FetchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_out_of_bounds_skips_request() {
        let source = HttpTileSource::new(MockAsyncHttpClient::new(Ok(png_bytes())), "http://t");
        let result = source.fetch(TileKey::new(4, 0, 2)).await;

        assert_eq!(result.unwrap_err(), FetchError::NotFound);
        assert!(source.client.requested.lock().is_empty());
    }
}
