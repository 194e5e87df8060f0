//! Visible command - list the tiles covering a viewport.

use cartogrid::coord::{visible_tiles, Location, TileSize, Viewport, ZoomRange};
use cartogrid::GridError;

use crate::error::CliError;

/// Arguments for the visible command.
pub struct VisibleArgs {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
}

/// Run the visible command.
pub fn run(args: VisibleArgs) -> Result<(), CliError> {
    for (name, value) in [
        ("width", args.width),
        ("height", args.height),
        ("tile_size", args.tile_size),
    ] {
        if value == 0 {
            return Err(GridError::InvalidDimension { name, value }.into());
        }
    }

    let mut location = Location::new(args.x, args.y, args.zoom);
    location.clamp_zoom(ZoomRange::default());

    let tile = TileSize::new(args.tile_size, args.tile_size);
    let viewport = Viewport::new(args.width, args.height);
    let keys = visible_tiles(&location, tile, viewport);

    println!("Location: {}", location);
    println!("Viewport: {}x{} ({}px tiles)", args.width, args.height, args.tile_size);
    println!("Tiles:    {}", keys.len());
    println!();
    for key in &keys {
        let (sx, sy) = cartogrid::coord::screen_offset(key, &location, tile);
        let marker = if key.is_in_bounds() { "" } else { "  (out of bounds)" };
        println!("  {:<14} at ({:>7.1}, {:>7.1}){}", key.to_string(), sx, sy, marker);
    }

    Ok(())
}
