//! Lock-free atomic metrics collection.

use super::MetricsSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for tile loading activity.
///
/// All operations use `Relaxed` ordering; the counters are independent
/// measurements.
#[derive(Debug)]
pub struct GridMetrics {
    start_time: Instant,
    /// Load requests dispatched to the fetch worker
    loads_requested: AtomicU64,
    /// Tiles stored in the cache for a pending load (placeholders included)
    tiles_loaded: AtomicU64,
    /// Tiles that arrived after their load was cancelled
    late_tiles: AtomicU64,
    /// Fetches that failed with an error other than not-found
    loads_failed: AtomicU64,
    /// Loads dropped by a zoom change, grid close or worker shutdown
    loads_cancelled: AtomicU64,
    /// Cached tiles removed by eviction
    tiles_evicted: AtomicU64,
    /// Placeholder tiles substituted for missing imagery
    placeholders: AtomicU64,
}

impl GridMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            loads_requested: AtomicU64::new(0),
            tiles_loaded: AtomicU64::new(0),
            late_tiles: AtomicU64::new(0),
            loads_failed: AtomicU64::new(0),
            loads_cancelled: AtomicU64::new(0),
            tiles_evicted: AtomicU64::new(0),
            placeholders: AtomicU64::new(0),
        }
    }

    pub fn load_requested(&self) {
        self.loads_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tile_loaded(&self) {
        self.tiles_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn late_tile(&self) {
        self.late_tiles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn load_failed(&self) {
        self.loads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn load_cancelled(&self) {
        self.loads_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `count` loads cancelled at once (zoom change).
    pub fn loads_cancelled(&self, count: u64) {
        self.loads_cancelled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn tiles_evicted(&self, count: u64) {
        self.tiles_evicted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn placeholder_used(&self) {
        self.placeholders.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            loads_requested: self.loads_requested.load(Ordering::Relaxed),
            tiles_loaded: self.tiles_loaded.load(Ordering::Relaxed),
            late_tiles: self.late_tiles.load(Ordering::Relaxed),
            loads_failed: self.loads_failed.load(Ordering::Relaxed),
            loads_cancelled: self.loads_cancelled.load(Ordering::Relaxed),
            tiles_evicted: self.tiles_evicted.load(Ordering::Relaxed),
            placeholders: self.placeholders.load(Ordering::Relaxed),
        }
    }
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self::new()
    }
}
