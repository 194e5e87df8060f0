//! Run command - headless session against a tile server.
//!
//! Wires a grid, an HTTP fetch worker, the input loop and the headless
//! renderer together, feeds the input loop from a script of pan/zoom steps
//! and renders frames until loading settles or the frame budget runs out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cartogrid::config::ConfigFile;
use cartogrid::coord::MoveDelta;
use cartogrid::fetch::{FetchWorker, WorkerStats};
use cartogrid::grid::GridChannels;
use cartogrid::input::spawn_input_loop;
use cartogrid::provider::{AsyncReqwestClient, HttpTileSource};
use cartogrid::telemetry::MetricsSnapshot;
use cartogrid::TileGrid;
use image::RgbaImage;

use crate::error::CliError;
use crate::render::HeadlessRenderer;
use crate::runner::CliRunner;

/// Time between rendered frames.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Arguments for the run command.
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub script: String,
    pub frames: u32,
    pub snapshot: Option<PathBuf>,
}

/// Totals from a finished session.
struct SessionReport {
    frames: u32,
    deltas_applied: u64,
    worker: WorkerStats,
    metrics: MetricsSnapshot,
    uploaded: u64,
    released: u64,
    snapshot: Option<RgbaImage>,
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let script = parse_script(&args.script)?;

    let runner = CliRunner::new(args.config.as_deref())?;
    runner.log_startup("run");
    let config = runner.config().clone();

    println!("cartogrid v{}", cartogrid::VERSION);
    println!("=================");
    println!();
    println!("Tile server: {}", config.fetch.base_url);
    println!("Start:       {}", config.start);
    println!(
        "Viewport:    {}x{}",
        config.grid.viewport.width, config.grid.viewport.height
    );
    println!("Script:      {} steps", script.len());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received shutdown signal, stopping...");
        signal.cancel();
    })
    .map_err(|e| CliError::Runtime(format!("Failed to set signal handler: {}", e)))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let want_snapshot = args.snapshot.is_some();
    let report = runtime.block_on(session(
        config,
        script,
        args.frames,
        want_snapshot,
        shutdown,
    ))?;

    println!("Frames:   {}", report.frames);
    println!("Steps:    {} applied", report.deltas_applied);
    println!("Worker:   {}", report.worker);
    println!("Grid:     {}", report.metrics);
    println!(
        "Handles:  {} uploaded, {} released",
        report.uploaded, report.released
    );

    if let (Some(path), Some(image)) = (args.snapshot, report.snapshot) {
        image.save(&path).map_err(|error| CliError::FileWrite {
            path: path.display().to_string(),
            error,
        })?;
        println!("Snapshot: {}", path.display());
    }

    Ok(())
}

async fn session(
    config: ConfigFile,
    script: Vec<MoveDelta>,
    max_frames: u32,
    want_snapshot: bool,
    shutdown: CancellationToken,
) -> Result<SessionReport, CliError> {
    let (grid, channels) = TileGrid::new(config.start, config.grid.clone())?;
    let grid = Arc::new(grid);
    let GridChannels { loads, expired } = channels;

    let client = AsyncReqwestClient::new(&config.fetch).map_err(CliError::Client)?;
    let source = HttpTileSource::new(client, &config.fetch.base_url);
    let worker = FetchWorker::new(Arc::clone(&grid), source, config.fetch.max_concurrent)
        .spawn(loads, shutdown.clone());

    grid.set_location(grid.location()).await?;

    let (delta_tx, delta_rx) = mpsc::channel(script.len().max(1));
    let input = spawn_input_loop(Arc::clone(&grid), delta_rx, shutdown.clone());
    for delta in script {
        if delta_tx.send(delta).await.is_err() {
            break;
        }
    }
    drop(delta_tx);

    let mut renderer = HeadlessRenderer::new(Arc::clone(&grid), expired);
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    let mut frames = 0;

    while frames < max_frames {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let stats = renderer.frame();
        frames += 1;
        debug!(
            frame = frames,
            drawn = stats.drawn,
            uploaded = stats.uploaded,
            released = stats.released,
            in_flight = grid.in_flight_count(),
            "Frame rendered"
        );

        if input.is_finished() && grid.in_flight_count() == 0 {
            info!(frames, "Loading settled");
            break;
        }
    }

    let snapshot = want_snapshot.then(|| renderer.compose());

    shutdown.cancel();
    let deltas_applied = input
        .await
        .map_err(|e| CliError::Runtime(format!("Input loop failed: {}", e)))?;

    grid.close()?;
    renderer.release_all();

    let worker = worker
        .await
        .map_err(|e| CliError::Runtime(format!("Fetch worker failed: {}", e)))?;

    Ok(SessionReport {
        frames,
        deltas_applied,
        worker,
        metrics: grid.metrics().snapshot(),
        uploaded: renderer.total_uploaded(),
        released: renderer.total_released(),
        snapshot,
    })
}

/// Parses `"dx,dy,dz;dx,dy,dz"` into move deltas.
///
/// Empty steps are skipped, so trailing separators and an empty script are
/// accepted.
fn parse_script(script: &str) -> Result<Vec<MoveDelta>, CliError> {
    script
        .split(';')
        .map(str::trim)
        .filter(|step| !step.is_empty())
        .map(parse_step)
        .collect()
}

fn parse_step(step: &str) -> Result<MoveDelta, CliError> {
    let parts: Vec<&str> = step.split(',').map(str::trim).collect();
    let [dx, dy, dz] = parts.as_slice() else {
        return Err(CliError::InvalidArgument(format!(
            "script step '{}' must be dx,dy,dz",
            step
        )));
    };

    let number = |raw: &str| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                CliError::InvalidArgument(format!("'{}' in script step '{}' is not a number", raw, step))
            })
    };

    Ok(MoveDelta::new(number(*dx)?, number(*dy)?, number(*dz)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let deltas = parse_script("10,0,0; 0,-5.5,0;0,0,1;").unwrap();
        assert_eq!(
            deltas,
            vec![
                MoveDelta::pan(10.0, 0.0),
                MoveDelta::pan(0.0, -5.5),
                MoveDelta::zoom(1.0),
            ]
        );
    }

    #[test]
    fn test_parse_empty_script() {
        assert!(parse_script("").unwrap().is_empty());
        assert!(parse_script(" ; ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_script_rejects_wrong_arity() {
        let err = parse_script("1,2").unwrap_err();
        assert!(err.to_string().contains("dx,dy,dz"));
    }

    #[test]
    fn test_parse_script_rejects_non_numbers() {
        assert!(parse_script("1,two,3").is_err());
        assert!(parse_script("1,NaN,0").is_err());
    }
}
