//! Least-recently-visible eviction.
//!
//! A logical clock advances once per visibility scan and stamps every key
//! that was on screen. Cached tiles from other zoom levels that have not been
//! seen for `retention_ticks` scans are evicted; an optional cap then evicts
//! the least recently seen off-screen tiles.

use std::collections::{HashMap, HashSet};

use crate::coord::TileKey;

/// Tracks when each key was last on screen.
#[derive(Debug, Default)]
pub struct VisibilityClock {
    tick: u64,
    last_seen: HashMap<TileKey, u64>,
}

impl VisibilityClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock and stamps `visible` with the new tick.
    pub fn advance(&mut self, visible: &[TileKey]) -> u64 {
        self.tick += 1;
        for key in visible {
            self.last_seen.insert(*key, self.tick);
        }
        self.tick
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Tick at which `key` was last visible, 0 if never.
    pub fn last_seen(&self, key: &TileKey) -> u64 {
        self.last_seen.get(key).copied().unwrap_or(0)
    }

    /// Scans since `key` was last visible.
    pub fn age(&self, key: &TileKey) -> u64 {
        self.tick.saturating_sub(self.last_seen(key))
    }

    pub fn forget(&mut self, key: &TileKey) {
        self.last_seen.remove(key);
    }

    /// Keeps only the stamps for which `keep(key, last_seen)` is true.
    pub fn retain(&mut self, mut keep: impl FnMut(&TileKey, u64) -> bool) {
        self.last_seen.retain(|key, stamp| keep(key, *stamp));
    }

    /// Number of keys with a stamp.
    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

/// Which cached tiles to drop after a visibility scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    pub retention_ticks: u64,
    pub max_cached_tiles: Option<usize>,
}

impl EvictionPolicy {
    /// Selects the cached keys to evict.
    ///
    /// # Arguments
    ///
    /// * `clock` - Visibility stamps
    /// * `cached` - Keys of every cached tile
    /// * `visible` - Keys on screen after the current scan
    /// * `zoom` - Current integer zoom level
    pub fn select(
        &self,
        clock: &VisibilityClock,
        cached: &[TileKey],
        visible: &HashSet<TileKey>,
        zoom: u32,
    ) -> Vec<TileKey> {
        let mut victims: Vec<TileKey> = cached
            .iter()
            .filter(|key| key.z != zoom && clock.age(key) > self.retention_ticks)
            .copied()
            .collect();

        let Some(max) = self.max_cached_tiles else {
            return victims;
        };
        let remaining = cached.len() - victims.len();
        if remaining <= max {
            return victims;
        }

        let expired: HashSet<TileKey> = victims.iter().copied().collect();
        let mut candidates: Vec<TileKey> = cached
            .iter()
            .filter(|key| !visible.contains(key) && !expired.contains(key))
            .copied()
            .collect();
        candidates.sort_by_key(|key| (clock.last_seen(key), *key));
        victims.extend(candidates.into_iter().take(remaining - max));
        victims
    }
}
