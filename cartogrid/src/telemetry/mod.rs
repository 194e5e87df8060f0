//! Grid telemetry for observability.
//!
//! Lock-free atomic counters updated by the grid and fetch worker, with a
//! point-in-time [`MetricsSnapshot`] for display.
//!
//! ```text
//! TileGrid / FetchWorker ─────► GridMetrics ─────► MetricsSnapshot ─────► CLI
//!                               (atomic counters)  (point-in-time copy)
//! ```

mod metrics;
mod snapshot;

pub use metrics::GridMetrics;
pub use snapshot::MetricsSnapshot;
