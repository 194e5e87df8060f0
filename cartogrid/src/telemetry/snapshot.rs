//! Point-in-time telemetry snapshot.

use std::fmt;
use std::time::Duration;

/// An immutable copy of [`GridMetrics`](super::GridMetrics) counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub loads_requested: u64,
    pub tiles_loaded: u64,
    pub late_tiles: u64,
    pub loads_failed: u64,
    pub loads_cancelled: u64,
    pub tiles_evicted: u64,
    pub placeholders: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requested {} | loaded {} ({} placeholder, {} late) | failed {} | cancelled {} | evicted {} | uptime {:.1}s",
            self.loads_requested,
            self.tiles_loaded,
            self.placeholders,
            self.late_tiles,
            self.loads_failed,
            self.loads_cancelled,
            self.tiles_evicted,
            self.uptime.as_secs_f64()
        )
    }
}
