//! Coordinate model
//!
//! Pure value types for the viewport's world-space [`Location`] and discrete
//! [`TileKey`] addresses, plus the projection from a location and viewport
//! to the set of tiles that must be on screen.

mod types;

pub use types::{
    CoordError, Location, MoveDelta, TileKey, TileSize, Viewport, ZoomRange, DEFAULT_TILE_SIZE,
    MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;
use std::ops::RangeInclusive;

/// Computes the tiles covering the viewport at `location`.
///
/// The covered world rectangle is the half-open
/// `[x - tw, x + tw/2 + vw) × [y - th, y + th/2 + vh)`: one extra tile on
/// the left/top and half a tile on the right/bottom so no seam shows while
/// panning. Indices that would be negative clamp to 0 and the resulting
/// duplicates collapse.
///
/// Keys are yielded column by column (x outer, y inner) at zoom
/// `round(location.z)`. Draw order depends on this ordering.
pub fn visible_tiles(location: &Location, tile: TileSize, viewport: Viewport) -> Vec<TileKey> {
    let tw = tile.width as f64;
    let th = tile.height as f64;

    let cols = cell_span(location.x - tw, location.x + tw / 2.0 + viewport.width as f64, tw);
    let rows = cell_span(
        location.y - th,
        location.y + th / 2.0 + viewport.height as f64,
        th,
    );

    let z = location.zoom_level();
    let mut keys = Vec::with_capacity(span_len(&cols) * span_len(&rows));
    for x in cols {
        for y in rows.clone() {
            keys.push(TileKey::new(x, y, z));
        }
    }
    keys
}

/// Cell indices touched by the half-open interval `[start, end)`.
fn cell_span(start: f64, end: f64, size: f64) -> RangeInclusive<u32> {
    let first = (start / size).floor().max(0.0);
    let last = ((end / size).ceil() - 1.0).max(first);
    (first as u32)..=(last as u32)
}

fn span_len(span: &RangeInclusive<u32>) -> usize {
    (*span.end() as usize).saturating_sub(*span.start() as usize) + 1
}

/// Pixel offset of a tile's top-left corner relative to the viewport origin.
#[inline]
pub fn screen_offset(key: &TileKey, location: &Location, tile: TileSize) -> (f64, f64) {
    (
        key.x as f64 * tile.width as f64 - location.x,
        key.y as f64 * tile.height as f64 - location.y,
    )
}

impl Location {
    /// Converts geographic coordinates to a world-pixel location whose
    /// top-left corner sits on the given point.
    ///
    /// # Arguments
    ///
    /// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
    /// * `lon` - Longitude in degrees (-180.0 to 180.0)
    /// * `zoom` - Integer zoom level
    /// * `tile` - Tile pixel size used to scale tile units into pixels
    pub fn from_lat_lon(
        lat: f64,
        lon: f64,
        zoom: u32,
        tile: TileSize,
    ) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(CoordError::InvalidLatitude(lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(CoordError::InvalidLongitude(lon));
        }

        let n = 2.0_f64.powi(zoom as i32);
        let tile_x = (lon + 180.0) / 360.0 * n;
        let lat_rad = lat * PI / 180.0;
        let tile_y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

        Ok(Self::new(
            tile_x * tile.width as f64,
            tile_y * tile.height as f64,
            zoom as f64,
        ))
    }
}

impl TileKey {
    /// Converts tile coordinates back to geographic coordinates.
    ///
    /// Returns the latitude/longitude of the tile's northwest corner.
    #[inline]
    pub fn to_lat_lon(&self) -> (f64, f64) {
        let n = 2.0_f64.powi(self.z as i32);

        let lon = self.x as f64 / n * 360.0 - 180.0;

        let y = self.y as f64 / n;
        let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
        let lat = lat_rad * 180.0 / PI;

        (lat, lon)
    }
}
