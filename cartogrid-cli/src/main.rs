//! cartogrid CLI - headless driver for the tile grid.
//!
//! Two commands:
//! - `visible` prints the tile keys covering a viewport
//! - `run` drives a live grid against an HTTP tile server from a scripted
//!   sequence of pan/zoom steps

mod commands;
mod error;
mod render;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::run::RunArgs;
use commands::visible::VisibleArgs;

#[derive(Parser)]
#[command(name = "cartogrid")]
#[command(version = cartogrid::VERSION)]
#[command(about = "Viewport-driven slippy-map tile grid", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tiles covering a viewport
    Visible {
        /// World-pixel x of the viewport's top-left corner
        #[arg(long)]
        x: f64,

        /// World-pixel y of the viewport's top-left corner
        #[arg(long)]
        y: f64,

        /// Zoom level (rounded to the nearest integer)
        #[arg(long, default_value = "6")]
        zoom: f64,

        /// Viewport width in pixels
        #[arg(long, default_value = "800")]
        width: u32,

        /// Viewport height in pixels
        #[arg(long, default_value = "600")]
        height: u32,

        /// Square tile edge in pixels
        #[arg(long, default_value = "256")]
        tile_size: u32,
    },

    /// Run a headless session against a tile server
    Run {
        /// Config file (default: ~/.config/cartogrid/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Steps to apply, as "dx,dy,dz;dx,dy,dz;..."
        #[arg(long, default_value = "")]
        script: String,

        /// Maximum frames to render before stopping
        #[arg(long, default_value = "600")]
        frames: u32,

        /// Write the final frame to this PNG file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Visible {
            x,
            y,
            zoom,
            width,
            height,
            tile_size,
        } => commands::visible::run(VisibleArgs {
            x,
            y,
            zoom,
            width,
            height,
            tile_size,
        }),
        Commands::Run {
            config,
            script,
            frames,
            snapshot,
        } => commands::run::run(RunArgs {
            config,
            script,
            frames,
            snapshot,
        }),
    };

    if let Err(e) = result {
        e.exit();
    }
}
