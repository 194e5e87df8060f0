//! Concurrent tile store.
//!
//! One `DashMap` holds every key the grid knows about. A slot is either
//! `Loading` (a fetch is in flight) or `Ready` (the tile is cached), so the
//! in-flight set and the cache can never overlap.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::coord::TileKey;
use crate::tile::{CachedTile, RenderHandle, TileImage};

/// State of a single key in the store.
#[derive(Debug, Clone)]
pub enum TileSlot {
    /// A load was dispatched during `generation`.
    Loading { generation: u64 },
    /// The tile is cached.
    Ready(CachedTile),
}

/// What a call to [`TileStore::complete`] replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Fulfilled an in-flight load.
    Loaded,
    /// Overwrote an already cached tile.
    Replaced,
    /// No slot existed (the load was cancelled or never requested).
    Late,
}

/// Cache and in-flight set keyed by [`TileKey`].
#[derive(Debug, Default)]
pub struct TileStore {
    slots: DashMap<TileKey, TileSlot>,
}

impl TileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as loading if the store has no slot for it.
    ///
    /// Returns true if the slot was created, i.e. the caller now owns the
    /// load. Check and insert happen under one shard lock.
    pub fn try_insert_loading(&self, key: TileKey, generation: u64) -> bool {
        match self.slots.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(TileSlot::Loading { generation });
                true
            }
        }
    }

    /// Stores a fetched tile, replacing any slot for `key`.
    ///
    /// A render handle attached to a tile being overwritten is carried over.
    pub fn complete(&self, key: TileKey, image: TileImage) -> Completion {
        let mut tile = CachedTile::new(key, image);
        match self.slots.entry(key) {
            Entry::Occupied(mut entry) => {
                let completion = match entry.get() {
                    TileSlot::Loading { .. } => Completion::Loaded,
                    TileSlot::Ready(existing) => {
                        tile.render_handle = existing.render_handle;
                        Completion::Replaced
                    }
                };
                entry.insert(TileSlot::Ready(tile));
                completion
            }
            Entry::Vacant(entry) => {
                entry.insert(TileSlot::Ready(tile));
                Completion::Late
            }
        }
    }

    /// Removes the slot for `key` only if it is still loading for
    /// `generation`.
    pub fn abandon(&self, key: &TileKey, generation: u64) -> bool {
        self.slots
            .remove_if(key, |_, slot| {
                matches!(slot, TileSlot::Loading { generation: g } if *g == generation)
            })
            .is_some()
    }

    /// Drops every loading slot. Returns how many were removed.
    pub fn cancel_loading(&self) -> usize {
        let mut removed = 0;
        self.slots.retain(|_, slot| match slot {
            TileSlot::Loading { .. } => {
                removed += 1;
                false
            }
            TileSlot::Ready(_) => true,
        });
        removed
    }

    /// Removes and returns a cached tile. Loading slots are left alone.
    pub fn remove_ready(&self, key: &TileKey) -> Option<CachedTile> {
        match self
            .slots
            .remove_if(key, |_, slot| matches!(slot, TileSlot::Ready(_)))
        {
            Some((_, TileSlot::Ready(tile))) => Some(tile),
            _ => None,
        }
    }

    /// Returns a copy of the cached tile for `key`.
    pub fn get(&self, key: &TileKey) -> Option<CachedTile> {
        match self.slots.get(key)?.value() {
            TileSlot::Ready(tile) => Some(tile.clone()),
            TileSlot::Loading { .. } => None,
        }
    }

    pub fn is_loading(&self, key: &TileKey) -> bool {
        matches!(
            self.slots.get(key).as_deref(),
            Some(TileSlot::Loading { .. })
        )
    }

    /// Returns true if `key` is loading or cached.
    pub fn contains(&self, key: &TileKey) -> bool {
        self.slots.contains_key(key)
    }

    pub fn is_ready(&self, key: &TileKey) -> bool {
        matches!(self.slots.get(key).as_deref(), Some(TileSlot::Ready(_)))
    }

    pub fn loading_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| matches!(entry.value(), TileSlot::Loading { .. }))
            .count()
    }

    pub fn ready_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| matches!(entry.value(), TileSlot::Ready(_)))
            .count()
    }

    /// Keys of every cached tile.
    pub fn ready_keys(&self) -> Vec<TileKey> {
        self.slots
            .iter()
            .filter(|entry| matches!(entry.value(), TileSlot::Ready(_)))
            .map(|entry| *entry.key())
            .collect()
    }

    /// Copies of every cached tile, unordered.
    pub fn snapshot(&self) -> Vec<CachedTile> {
        self.slots
            .iter()
            .filter_map(|entry| match entry.value() {
                TileSlot::Ready(tile) => Some(tile.clone()),
                TileSlot::Loading { .. } => None,
            })
            .collect()
    }

    /// Attaches a render handle to a cached tile. Returns false if the tile
    /// is not cached.
    pub fn attach_handle(&self, key: &TileKey, handle: RenderHandle) -> bool {
        match self.slots.get_mut(key).as_deref_mut() {
            Some(TileSlot::Ready(tile)) => {
                tile.render_handle = Some(handle);
                true
            }
            _ => false,
        }
    }

    /// Detaches and returns the render handle of a cached tile.
    pub fn detach_handle(&self, key: &TileKey) -> Option<RenderHandle> {
        match self.slots.get_mut(key).as_deref_mut() {
            Some(TileSlot::Ready(tile)) => tile.render_handle.take(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileSize;
    use std::sync::Arc;

    fn image() -> TileImage {
        TileImage::placeholder(TileSize::new(1, 1))
    }

    #[test]
    fn test_try_insert_loading_only_once() {
        let store = TileStore::new();
        let key = TileKey::new(1, 1, 5);

        assert!(store.try_insert_loading(key, 0));
        assert!(!store.try_insert_loading(key, 0));
        assert!(!store.try_insert_loading(key, 1));
        assert!(store.is_loading(&key));
        assert!(!store.is_ready(&key));
    }

    #[test]
    fn test_try_insert_loading_skips_cached() {
        let store = TileStore::new();
        let key = TileKey::new(1, 1, 5);
        store.complete(key, image());

        assert!(!store.try_insert_loading(key, 0));
        assert!(store.is_ready(&key));
    }

    #[test]
    fn test_complete_moves_loading_to_ready() {
        let store = TileStore::new();
        let key = TileKey::new(2, 3, 5);
        store.try_insert_loading(key, 0);

        assert_eq!(store.complete(key, image()), Completion::Loaded);
        assert!(!store.is_loading(&key));
        assert!(store.is_ready(&key));
        assert_eq!(store.loading_count(), 0);
        assert_eq!(store.ready_count(), 1);
    }

    #[test]
    fn test_complete_is_idempotent_and_keeps_handle() {
        let store = TileStore::new();
        let key = TileKey::new(2, 3, 5);

        assert_eq!(store.complete(key, image()), Completion::Late);
        assert!(store.attach_handle(&key, RenderHandle(7)));
        assert_eq!(store.complete(key, image()), Completion::Replaced);

        assert_eq!(store.ready_count(), 1);
        assert_eq!(store.get(&key).unwrap().render_handle, Some(RenderHandle(7)));
    }

    #[test]
    fn test_abandon_checks_generation() {
        let store = TileStore::new();
        let key = TileKey::new(0, 0, 4);
        store.try_insert_loading(key, 3);

        assert!(!store.abandon(&key, 2));
        assert!(store.is_loading(&key));
        assert!(store.abandon(&key, 3));
        assert!(!store.is_loading(&key));
    }

    #[test]
    fn test_abandon_leaves_cached_tile() {
        let store = TileStore::new();
        let key = TileKey::new(0, 0, 4);
        store.complete(key, image());

        assert!(!store.abandon(&key, 0));
        assert!(store.is_ready(&key));
    }

    #[test]
    fn test_cancel_loading() {
        let store = TileStore::new();
        store.try_insert_loading(TileKey::new(0, 0, 4), 0);
        store.try_insert_loading(TileKey::new(1, 0, 4), 0);
        store.complete(TileKey::new(2, 0, 4), image());

        assert_eq!(store.cancel_loading(), 2);
        assert_eq!(store.loading_count(), 0);
        assert_eq!(store.ready_count(), 1);
    }

    #[test]
    fn test_remove_ready() {
        let store = TileStore::new();
        let loading = TileKey::new(0, 0, 4);
        let ready = TileKey::new(1, 0, 4);
        store.try_insert_loading(loading, 0);
        store.complete(ready, image());

        assert!(store.remove_ready(&loading).is_none());
        assert!(store.is_loading(&loading));
        assert_eq!(store.remove_ready(&ready).map(|t| t.key), Some(ready));
        assert!(!store.is_ready(&ready));
    }

    #[test]
    fn test_handles_require_cached_tile() {
        let store = TileStore::new();
        let key = TileKey::new(0, 0, 4);
        store.try_insert_loading(key, 0);

        assert!(!store.attach_handle(&key, RenderHandle(1)));
        assert_eq!(store.detach_handle(&key), None);

        store.complete(key, image());
        assert!(store.attach_handle(&key, RenderHandle(1)));
        assert_eq!(store.detach_handle(&key), Some(RenderHandle(1)));
        assert_eq!(store.detach_handle(&key), None);
    }

    #[test]
    fn test_concurrent_loading_and_completion_stay_disjoint() {
        let store = Arc::new(TileStore::new());
        let keys: Vec<TileKey> = (0..64).map(|i| TileKey::new(i % 8, i / 8, 6)).collect();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                let keys = keys.clone();
                std::thread::spawn(move || {
                    for (i, key) in keys.iter().enumerate() {
                        if (i + worker) % 2 == 0 {
                            store.try_insert_loading(*key, 0);
                        } else {
                            store.complete(*key, image());
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.loading_count() + store.ready_count(), keys.len());
    }
}
