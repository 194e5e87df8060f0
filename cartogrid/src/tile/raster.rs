//! Decoded tile rasters and the placeholder used for missing tiles.

use std::fmt;

use image::{Rgba, RgbaImage};

use crate::coord::TileSize;
use crate::error::FetchError;

/// Fill colour of placeholder tiles (opaque mid gray).
pub const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([100, 100, 100, 255]);

/// A decoded RGBA tile raster.
#[derive(Clone, PartialEq)]
pub struct TileImage {
    pixels: RgbaImage,
    placeholder: bool,
}

impl TileImage {
    /// Wraps an already decoded raster.
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            placeholder: false,
        }
    }

    /// Decodes an encoded image (PNG, JPEG, ...) into RGBA.
    ///
    /// The format is sniffed from the leading bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, FetchError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    /// Creates a solid gray tile standing in for one the source does not have.
    pub fn placeholder(size: TileSize) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(size.width, size.height, PLACEHOLDER_COLOR),
            placeholder: true,
        }
    }

    /// Returns true if this is a placeholder rather than real imagery.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Borrows the underlying raster.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl fmt::Debug for TileImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("placeholder", &self.placeholder)
            .finish()
    }
}
