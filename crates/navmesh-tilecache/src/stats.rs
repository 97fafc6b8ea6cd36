//! Tile cache statistics

use std::collections::BTreeMap;

/// Point-in-time counters of a [`TileResultCache`](crate::TileResultCache)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileCacheStats {
    /// Configured maximum charged size in bytes
    pub max_size: usize,
    /// Charged size of all live tiles (borrowed and free)
    pub used_size: usize,
    /// Charged size of tiles nobody borrows, eligible for eviction
    pub free_size: usize,
    /// Number of tiles currently borrowed
    pub used_tiles: usize,
    /// Number of live tiles (borrowed and free)
    pub cached_tiles: usize,
    pub hit_count: u64,
    pub get_count: u64,
}

impl TileCacheStats {
    /// Percentage of lookups answered from the cache
    pub fn hit_rate(&self) -> Option<f64> {
        if self.get_count == 0 {
            return None;
        }
        Some(100.0 * self.hit_count as f64 / self.get_count as f64)
    }

    /// Write the counters as named attributes of `frame`
    pub fn report<S: StatsSink + ?Sized>(&self, frame: u32, sink: &mut S) {
        sink.set_attribute(frame, "NavMesh CacheSize", self.used_size as f64);
        sink.set_attribute(frame, "NavMesh CacheFreeSize", self.free_size as f64);
        sink.set_attribute(frame, "NavMesh UsedTiles", self.used_tiles as f64);
        sink.set_attribute(frame, "NavMesh CachedTiles", self.cached_tiles as f64);
        if let Some(rate) = self.hit_rate() {
            sink.set_attribute(frame, "NavMesh CacheHitRate", rate);
        }
    }
}

/// Destination of periodic statistics, typically a metrics collector
pub trait StatsSink {
    fn set_attribute(&mut self, frame: u32, name: &str, value: f64);
}

/// Keeps the latest value of every attribute
impl StatsSink for BTreeMap<String, f64> {
    fn set_attribute(&mut self, _frame: u32, name: &str, value: f64) {
        self.insert(name.to_string(), value);
    }
}
