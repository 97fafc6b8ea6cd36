//! Tile lookup chain: memory cache, then persistent store, then the builder

use std::sync::Arc;

use crate::key::make_key;
use crate::tile_cache::{CachedTile, TileResultCache};
use navmesh_common::{AgentHalfExtents, InputHash, OffMeshConnection, TileId, TilePosition, TileVersion};
use navmesh_db::NavMeshDb;
use navmesh_geometry::GeometrySnapshot;

/// External navigation mesh tile build function
pub trait TileBuilder {
    /// Build the tile data for `snapshot` and the given agent size
    fn build(&self, snapshot: &GeometrySnapshot, agent_half_extents: &AgentHalfExtents) -> Vec<u8>;
}

impl<F> TileBuilder for F
where
    F: Fn(&GeometrySnapshot, &AgentHalfExtents) -> Vec<u8>,
{
    fn build(&self, snapshot: &GeometrySnapshot, agent_half_extents: &AgentHalfExtents) -> Vec<u8> {
        self(snapshot, agent_half_extents)
    }
}

/// Hands out store tile ids above the largest persisted one
#[derive(Debug, Clone)]
pub struct TileIdAllocator {
    next: TileId,
}

impl TileIdAllocator {
    pub fn new(db: &NavMeshDb) -> Self {
        Self {
            next: db.get_max_tile_id().next(),
        }
    }

    pub fn allocate(&mut self) -> TileId {
        let id = self.next;
        self.next = id.next();
        id
    }

    /// Skip past ids the store already uses
    pub fn resync(&mut self, db: &NavMeshDb) {
        self.next = self.next.max(db.get_max_tile_id().next());
    }
}

/// Tile data returned by [`TileProvider::get_or_build`]
#[derive(Debug)]
pub enum ProvidedTile<'a> {
    /// Borrowed from the memory cache
    Cached(CachedTile<'a>),
    /// The cache had no room; the data is owned by the caller
    Uncached(Arc<[u8]>),
}

impl ProvidedTile<'_> {
    pub fn data(&self) -> &[u8] {
        match self {
            ProvidedTile::Cached(tile) => tile.data(),
            ProvidedTile::Uncached(data) => data,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, ProvidedTile::Cached(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderStats {
    /// Tiles served from the memory cache
    pub memory_hits: u64,
    /// Tiles loaded from the persistent store
    pub store_hits: u64,
    /// Tiles produced by the builder
    pub builds: u64,
    /// Store writes that failed
    pub store_failures: u64,
}

/// Resolves tiles through the memory cache, the persistent store and the builder
///
/// Tiles found in the store with a different [`TileVersion`] are rebuilt and updated in
/// place. Newly built tiles are persisted with freshly allocated ids. Store failures are
/// logged and never prevent the built tile from being returned.
pub struct TileProvider<'a, B> {
    cache: &'a TileResultCache,
    store: Option<NavMeshDb>,
    builder: B,
    region: String,
    version: TileVersion,
    ids: Option<TileIdAllocator>,
    stats: ProviderStats,
}

impl<'a, B: TileBuilder> TileProvider<'a, B> {
    /// Provider without persistence
    pub fn new(cache: &'a TileResultCache, builder: B) -> Self {
        Self {
            cache,
            store: None,
            builder,
            region: String::new(),
            version: TileVersion::default(),
            ids: None,
            stats: ProviderStats::default(),
        }
    }

    /// Persist tiles of `region` into `store`, tagged with `version`
    pub fn with_store(mut self, store: NavMeshDb, region: impl Into<String>, version: TileVersion) -> Self {
        self.ids = Some(TileIdAllocator::new(&store));
        self.store = Some(store);
        self.region = region.into();
        self.version = version;
        self
    }

    pub fn stats(&self) -> ProviderStats {
        self.stats
    }

    pub fn store(&self) -> Option<&NavMeshDb> {
        self.store.as_ref()
    }

    pub fn into_store(self) -> Option<NavMeshDb> {
        self.store
    }

    /// Get the tile for `snapshot`, building it only if neither cache nor store has it
    pub fn get_or_build(
        &mut self,
        agent_half_extents: &AgentHalfExtents,
        tile_position: TilePosition,
        snapshot: &GeometrySnapshot,
        connections: &[OffMeshConnection],
    ) -> ProvidedTile<'a> {
        let cache = self.cache;
        if let Some(tile) = cache.get(agent_half_extents, tile_position, snapshot, connections) {
            self.stats.memory_hits += 1;
            return ProvidedTile::Cached(tile);
        }

        let data: Arc<[u8]> = if self.store.is_some() {
            self.load_or_build(agent_half_extents, tile_position, snapshot, connections)
                .into()
        } else {
            self.build(snapshot, agent_half_extents).into()
        };

        match cache.set(agent_half_extents, tile_position, snapshot, connections, data.clone()) {
            Some(tile) => ProvidedTile::Cached(tile),
            None => ProvidedTile::Uncached(data),
        }
    }

    fn build(&mut self, snapshot: &GeometrySnapshot, agent_half_extents: &AgentHalfExtents) -> Vec<u8> {
        self.stats.builds += 1;
        self.builder.build(snapshot, agent_half_extents)
    }

    fn load_or_build(
        &mut self,
        agent_half_extents: &AgentHalfExtents,
        tile_position: TilePosition,
        snapshot: &GeometrySnapshot,
        connections: &[OffMeshConnection],
    ) -> Vec<u8> {
        let input_hash = input_hash(agent_half_extents, snapshot, connections);
        let stored = self
            .store
            .as_ref()
            .and_then(|store| store.get_tile_data(&self.region, tile_position, &input_hash));

        match stored {
            Some(tile) if tile.version == self.version => {
                self.stats.store_hits += 1;
                tile.data
            }
            Some(tile) => {
                log::debug!(
                    "Stored tile {} at {} has version {}, rebuilding for version {}",
                    tile.tile_id,
                    tile_position,
                    tile.version.0,
                    self.version.0
                );
                let data = self.build(snapshot, agent_half_extents);
                if let Some(store) = self.store.as_mut() {
                    if let Err(e) = store.update_tile(tile.tile_id, self.version, &data) {
                        log::warn!("Failed to update stored tile {}: {}", tile.tile_id, e);
                        self.stats.store_failures += 1;
                    }
                }
                data
            }
            None => {
                let data = self.build(snapshot, agent_half_extents);
                self.persist(tile_position, &input_hash, &data);
                data
            }
        }
    }

    fn persist(&mut self, tile_position: TilePosition, input_hash: &InputHash, data: &[u8]) {
        let (Some(store), Some(ids)) = (self.store.as_mut(), self.ids.as_mut()) else {
            return;
        };
        let tile_id = ids.allocate();
        if let Err(e) = store.insert_tile(tile_id, &self.region, tile_position, self.version, input_hash, data) {
            log::warn!("Failed to store tile {} at {}: {}", tile_id, tile_position, e);
            self.stats.store_failures += 1;
            if e.is_conflict() {
                ids.resync(store);
            }
        }
    }
}

/// Content hash identifying the build input of a tile in the store
pub fn input_hash(
    agent_half_extents: &AgentHalfExtents,
    snapshot: &GeometrySnapshot,
    connections: &[OffMeshConnection],
) -> InputHash {
    let mut input = make_key(snapshot, connections);
    for extent in agent_half_extents.0.to_array() {
        input.extend_from_slice(&extent.to_le_bytes());
    }
    InputHash::of(&input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TileCacheConfig;
    use glam::{Vec2, Vec3};
    use navmesh_common::{AreaType, RigidTransform, TileBounds, Version};
    use navmesh_geometry::{BoxShape, SnapshotBuilder};
    use std::cell::Cell;

    const REGION: &str = "sys::default";

    fn agent() -> AgentHalfExtents {
        AgentHalfExtents::new(29.0, 29.0, 66.0)
    }

    fn make_snapshot(x: f32) -> GeometrySnapshot {
        let mut builder = SnapshotBuilder::new(TileBounds::new(Vec2::ZERO, Vec2::splat(1000.0)));
        builder.add_object(
            &BoxShape::new(Vec3::splat(1.0)),
            &RigidTransform::from_translation(Vec3::new(x, 0.0, 5.0)),
            AreaType::Ground,
        );
        builder.create(Version::new(1, 1))
    }

    fn make_cache() -> TileResultCache {
        TileResultCache::new(TileCacheConfig::new(1024 * 1024)).unwrap()
    }

    fn counting_builder(calls: &Cell<usize>) -> impl Fn(&GeometrySnapshot, &AgentHalfExtents) -> Vec<u8> + '_ {
        move |snapshot: &GeometrySnapshot, _: &AgentHalfExtents| {
            calls.set(calls.get() + 1);
            vec![snapshot.mesh().triangle_count() as u8; 16]
        }
    }

    #[test]
    fn test_builds_once_then_hits_memory() {
        let cache = make_cache();
        let calls = Cell::new(0);
        let mut provider = TileProvider::new(&cache, counting_builder(&calls));
        let snapshot = make_snapshot(1.0);

        let first = provider.get_or_build(&agent(), TilePosition::new(0, 0), &snapshot, &[]);
        assert!(first.is_cached());
        assert_eq!(first.data(), vec![12u8; 16].as_slice());
        drop(first);

        let second = provider.get_or_build(&agent(), TilePosition::new(0, 0), &snapshot, &[]);
        assert_eq!(second.data(), vec![12u8; 16].as_slice());
        drop(second);

        assert_eq!(calls.get(), 1);
        assert_eq!(
            provider.stats(),
            ProviderStats {
                memory_hits: 1,
                builds: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_new_tiles_are_persisted_with_fresh_ids() -> navmesh_common::Result<()> {
        let mut store = NavMeshDb::in_memory();
        store.insert_tile(
            TileId(10),
            REGION,
            TilePosition::new(9, 9),
            TileVersion(1),
            &InputHash::of(b"other"),
            b"other",
        )?;

        let cache = make_cache();
        let calls = Cell::new(0);
        let mut provider = TileProvider::new(&cache, counting_builder(&calls)).with_store(store, REGION, TileVersion(1));
        let snapshot = make_snapshot(1.0);
        drop(provider.get_or_build(&agent(), TilePosition::new(0, 0), &snapshot, &[]));

        let store = provider.into_store().unwrap();
        let hash = input_hash(&agent(), &snapshot, &[]);
        let tile = store.get_tile_data(REGION, TilePosition::new(0, 0), &hash).unwrap();
        assert_eq!(tile.tile_id, TileId(11));
        assert_eq!(tile.version, TileVersion(1));
        assert_eq!(tile.data, vec![12u8; 16]);
        Ok(())
    }

    #[test]
    fn test_warm_start_from_store_skips_builder() -> navmesh_common::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("navmesh.db");
        let snapshot = make_snapshot(1.0);
        let calls = Cell::new(0);

        {
            let cache = make_cache();
            let mut provider =
                TileProvider::new(&cache, counting_builder(&calls)).with_store(NavMeshDb::open(&path)?, REGION, TileVersion(1));
            drop(provider.get_or_build(&agent(), TilePosition::new(0, 0), &snapshot, &[]));
        }
        assert_eq!(calls.get(), 1);

        // New process: empty memory cache, same store file
        let cache = make_cache();
        let mut provider =
            TileProvider::new(&cache, counting_builder(&calls)).with_store(NavMeshDb::open(&path)?, REGION, TileVersion(1));
        let tile = provider.get_or_build(&agent(), TilePosition::new(0, 0), &snapshot, &[]);

        assert_eq!(tile.data(), vec![12u8; 16].as_slice());
        assert_eq!(calls.get(), 1);
        assert_eq!(provider.stats().store_hits, 1);
        Ok(())
    }

    #[test]
    fn test_stale_store_version_is_rebuilt_and_updated() -> navmesh_common::Result<()> {
        let snapshot = make_snapshot(1.0);
        let hash = input_hash(&agent(), &snapshot, &[]);
        let mut store = NavMeshDb::in_memory();
        store.insert_tile(TileId(5), REGION, TilePosition::new(0, 0), TileVersion(1), &hash, b"stale")?;

        let cache = make_cache();
        let calls = Cell::new(0);
        let mut provider = TileProvider::new(&cache, counting_builder(&calls)).with_store(store, REGION, TileVersion(2));
        let tile = provider.get_or_build(&agent(), TilePosition::new(0, 0), &snapshot, &[]);
        assert_eq!(tile.data(), vec![12u8; 16].as_slice());
        drop(tile);
        assert_eq!(calls.get(), 1);

        let store = provider.into_store().unwrap();
        assert_eq!(store.tile_count(), 1);
        let row = store.get_tile_data(REGION, TilePosition::new(0, 0), &hash).unwrap();
        assert_eq!(row.tile_id, TileId(5));
        assert_eq!(row.version, TileVersion(2));
        assert_eq!(row.data, vec![12u8; 16]);
        Ok(())
    }

    #[test]
    fn test_tile_too_large_for_cache_is_still_returned() {
        let cache = TileResultCache::new(TileCacheConfig::new(8)).unwrap();
        let calls = Cell::new(0);
        let mut provider = TileProvider::new(&cache, counting_builder(&calls));

        let tile = provider.get_or_build(&agent(), TilePosition::new(0, 0), &make_snapshot(1.0), &[]);
        assert!(!tile.is_cached());
        assert_eq!(tile.data(), vec![12u8; 16].as_slice());
        assert_eq!(cache.stats().cached_tiles, 0);
    }

    #[test]
    fn test_input_hash_depends_on_agent() {
        let snapshot = make_snapshot(1.0);
        assert_eq!(input_hash(&agent(), &snapshot, &[]), input_hash(&agent(), &snapshot, &[]));
        assert_ne!(
            input_hash(&agent(), &snapshot, &[]),
            input_hash(&AgentHalfExtents::new(1.0, 1.0, 1.0), &snapshot, &[])
        );
    }

    #[test]
    fn test_id_allocator_resync() {
        let mut store = NavMeshDb::in_memory();
        let mut ids = TileIdAllocator::new(&store);
        assert_eq!(ids.allocate(), TileId(1));

        store
            .insert_tile(TileId(7), REGION, TilePosition::new(0, 0), TileVersion(1), &InputHash::of(b"x"), b"x")
            .unwrap();
        ids.resync(&store);
        assert_eq!(ids.allocate(), TileId(8));
    }
}
