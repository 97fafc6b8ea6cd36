//! Tile result cache implementation
//!
//! This module contains the [`TileResultCache`], which keeps built navigation mesh
//! tiles in memory keyed by the geometry that produced them, so identical geometry
//! never triggers a rebuild.
//!
//! Tiles are either borrowed (at least one [`CachedTile`] handle alive) or free. Only
//! free tiles can be evicted, oldest-became-free first, when an insertion needs room.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::TileCacheConfig;
use crate::key::{make_key, BytesKeyView, KeyView, SnapshotKeyView};
use crate::stats::{StatsSink, TileCacheStats};
use navmesh_common::{AgentHalfExtents, Error, OffMeshConnection, Result, TilePosition};
use navmesh_geometry::GeometrySnapshot;

/// Cached tile entry
#[derive(Debug)]
struct CacheEntry {
    /// Number of live handles
    use_count: usize,
    agent_half_extents: AgentHalfExtents,
    tile_position: TilePosition,
    key: Vec<u8>,
    data: Arc<[u8]>,
    /// Position in the eviction order while the entry is free
    free_stamp: Option<u64>,
}

impl CacheEntry {
    /// Payload plus the key, charged twice for the index overhead
    fn charged_size(&self) -> usize {
        self.data.len() + 2 * self.key.len()
    }
}

/// Slots of one agent/tile pair, sorted by key bytes
type TileBucket = Vec<usize>;

#[derive(Debug, Default)]
struct CacheState {
    entries: Vec<Option<CacheEntry>>,
    vacant: Vec<usize>,
    index: BTreeMap<AgentHalfExtents, BTreeMap<TilePosition, TileBucket>>,
    /// Free entries by the order they became free
    free_order: BTreeMap<u64, usize>,
    next_stamp: u64,
    used_size: usize,
    free_size: usize,
    used_tiles: usize,
    hit_count: u64,
    get_count: u64,
}

fn search_bucket<K: KeyView>(
    entries: &[Option<CacheEntry>],
    bucket: &[usize],
    view: &K,
) -> std::result::Result<usize, usize> {
    bucket.binary_search_by(|slot| match &entries[*slot] {
        Some(entry) => view.compare(&entry.key).reverse(),
        None => Ordering::Less,
    })
}

impl CacheState {
    fn find<K: KeyView>(
        &self,
        agent_half_extents: &AgentHalfExtents,
        tile_position: &TilePosition,
        view: &K,
    ) -> Option<usize> {
        let bucket = self.index.get(agent_half_extents)?.get(tile_position)?;
        let position = search_bucket(&self.entries, bucket, view).ok()?;
        Some(bucket[position])
    }

    fn insert(&mut self, entry: CacheEntry) -> usize {
        let bucket = self
            .index
            .entry(entry.agent_half_extents)
            .or_default()
            .entry(entry.tile_position)
            .or_default();
        let position = match search_bucket(&self.entries, bucket, &BytesKeyView(&entry.key)) {
            Ok(position) | Err(position) => position,
        };

        let slot = match self.vacant.pop() {
            Some(slot) => {
                self.entries[slot] = Some(entry);
                slot
            }
            None => {
                self.entries.push(Some(entry));
                self.entries.len() - 1
            }
        };
        bucket.insert(position, slot);
        slot
    }

    fn acquire(&mut self, slot: usize) -> Option<Arc<[u8]>> {
        let entry = self.entries.get_mut(slot)?.as_mut()?;
        if entry.use_count == 0 {
            if let Some(stamp) = entry.free_stamp.take() {
                self.free_order.remove(&stamp);
            }
            self.free_size -= entry.charged_size();
            self.used_tiles += 1;
        }
        entry.use_count += 1;
        Some(entry.data.clone())
    }

    fn release(&mut self, slot: usize) {
        let Some(entry) = self.entries.get_mut(slot).and_then(Option::as_mut) else {
            log::error!("Released tile cache slot {} holds no entry", slot);
            return;
        };
        if entry.use_count == 0 {
            log::error!("Released tile cache slot {} is not borrowed", slot);
            return;
        }
        entry.use_count -= 1;
        if entry.use_count == 0 {
            let stamp = self.next_stamp;
            self.next_stamp += 1;
            entry.free_stamp = Some(stamp);
            self.free_order.insert(stamp, slot);
            self.free_size += entry.charged_size();
            self.used_tiles -= 1;
        }
    }

    /// Evict the entry that became free the longest time ago
    ///
    /// Returns false if there are no free entries.
    fn evict_least_recently_used(&mut self) -> bool {
        let Some((_, slot)) = self.free_order.pop_first() else {
            return false;
        };
        let Some(entry) = self.entries.get_mut(slot).and_then(Option::take) else {
            log::error!("Free tile cache slot {} holds no entry", slot);
            return true;
        };
        self.vacant.push(slot);

        let size = entry.charged_size();
        self.used_size -= size;
        self.free_size -= size;

        let mut agent_emptied = false;
        if let Some(tiles) = self.index.get_mut(&entry.agent_half_extents) {
            if let Some(bucket) = tiles.get_mut(&entry.tile_position) {
                bucket.retain(|s| *s != slot);
                if bucket.is_empty() {
                    tiles.remove(&entry.tile_position);
                }
            }
            agent_emptied = tiles.is_empty();
        }
        if agent_emptied {
            self.index.remove(&entry.agent_half_extents);
        }

        log::debug!(
            "Evicted cached tile {} ({} bytes) for agent {:?}",
            entry.tile_position,
            size,
            entry.agent_half_extents.0
        );
        true
    }

    fn cached_tiles(&self) -> usize {
        self.entries.len() - self.vacant.len()
    }
}

/// In-memory, size-bounded cache of built navigation mesh tiles
///
/// Entries are keyed by agent half extents, tile position and the serialized geometry
/// the tile was built from. All structural changes happen under one mutex; lookups
/// compare the snapshot against stored keys without serializing it.
pub struct TileResultCache {
    config: TileCacheConfig,
    state: Mutex<CacheState>,
}

impl TileResultCache {
    /// Creates a new tile cache
    pub fn new(config: TileCacheConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidSettings)?;
        Ok(Self {
            config,
            state: Mutex::new(CacheState::default()),
        })
    }

    pub fn config(&self) -> &TileCacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Borrow the tile built from `snapshot` and `connections`, if cached
    pub fn get(
        &self,
        agent_half_extents: &AgentHalfExtents,
        tile_position: TilePosition,
        snapshot: &GeometrySnapshot,
        connections: &[OffMeshConnection],
    ) -> Option<CachedTile<'_>> {
        let mut state = self.lock();
        state.get_count += 1;
        let view = SnapshotKeyView::new(snapshot, connections);
        let slot = state.find(agent_half_extents, &tile_position, &view)?;
        let data = state.acquire(slot)?;
        state.hit_count += 1;
        Some(CachedTile {
            cache: self,
            slot,
            data,
        })
    }

    /// Insert a built tile and borrow it
    ///
    /// Returns `None` when the tile does not fit even after evicting every free tile;
    /// nothing is evicted in that case. If the same key is already cached the existing
    /// tile is borrowed and `data` is dropped.
    pub fn set(
        &self,
        agent_half_extents: &AgentHalfExtents,
        tile_position: TilePosition,
        snapshot: &GeometrySnapshot,
        connections: &[OffMeshConnection],
        data: impl Into<Arc<[u8]>>,
    ) -> Option<CachedTile<'_>> {
        let data = data.into();
        let key = make_key(snapshot, connections);
        let size = data.len() + 2 * key.len();
        let max_size = self.config.max_data_size;

        let mut state = self.lock();

        if let Some(slot) = state.find(agent_half_extents, &tile_position, &BytesKeyView(&key)) {
            log::debug!(
                "Tile {} is already cached, borrowing existing data",
                tile_position
            );
            let data = state.acquire(slot)?;
            return Some(CachedTile {
                cache: self,
                slot,
                data,
            });
        }

        let available = state.free_size + max_size.saturating_sub(state.used_size);
        if size > available {
            log::debug!(
                "Tile {} of {} bytes does not fit into cache ({} bytes available)",
                tile_position,
                size,
                available
            );
            return None;
        }

        while state.used_size + size > max_size && state.evict_least_recently_used() {}

        let slot = state.insert(CacheEntry {
            use_count: 1,
            agent_half_extents: *agent_half_extents,
            tile_position,
            key,
            data: data.clone(),
            free_stamp: None,
        });
        state.used_size += size;
        state.used_tiles += 1;

        Some(CachedTile {
            cache: self,
            slot,
            data,
        })
    }

    /// Evict every free tile, returning how many were removed
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let mut evicted = 0;
        while state.evict_least_recently_used() {
            evicted += 1;
        }
        evicted
    }

    pub fn stats(&self) -> TileCacheStats {
        let state = self.lock();
        TileCacheStats {
            max_size: self.config.max_data_size,
            used_size: state.used_size,
            free_size: state.free_size,
            used_tiles: state.used_tiles,
            cached_tiles: state.cached_tiles(),
            hit_count: state.hit_count,
            get_count: state.get_count,
        }
    }

    /// Publish current counters to `sink` for `frame`
    pub fn report_stats<S: StatsSink + ?Sized>(&self, frame: u32, sink: &mut S) {
        self.stats().report(frame, sink);
    }

    fn release(&self, slot: usize) {
        self.lock().release(slot);
    }
}

impl fmt::Debug for TileResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileResultCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Borrow of a cached tile
///
/// The tile stays ineligible for eviction until every handle to it is dropped.
/// Handles cannot be cloned; borrowing again goes through [`TileResultCache::get`].
pub struct CachedTile<'a> {
    cache: &'a TileResultCache,
    slot: usize,
    data: Arc<[u8]>,
}

impl CachedTile<'_> {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl Drop for CachedTile<'_> {
    fn drop(&mut self) {
        self.cache.release(self.slot);
    }
}

impl fmt::Debug for CachedTile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedTile")
            .field("slot", &self.slot)
            .field("size", &self.data.len())
            .finish()
    }
}
