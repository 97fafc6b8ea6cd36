//! Content-addressed caching of built navigation mesh tiles
//!
//! Building a navigation mesh tile is expensive, and the same geometry tends to come
//! back again and again. This crate remembers built tiles keyed by the geometry that
//! produced them, so identical geometry never reaches the builder twice.
//!
//! # Features
//!
//! - **Tile Result Cache**: Size-bounded in-memory cache with borrow counting and
//!   eviction of unborrowed tiles, oldest first
//! - **Lazy Key Comparison**: Lookups compare a geometry snapshot against stored keys
//!   without serializing it
//! - **Warm Start**: [`TileProvider`] falls back to the persistent tile store before
//!   asking the builder
//! - **Statistics**: Counters published to any [`StatsSink`]
//!
//! # Example
//!
//! ```rust,ignore
//! use navmesh_tilecache::{TileCacheConfig, TileResultCache};
//!
//! let cache = TileResultCache::new(TileCacheConfig::new(64 * 1024 * 1024))?;
//!
//! let tile = match cache.get(&agent_half_extents, tile_position, &snapshot, &connections) {
//!     Some(tile) => tile,
//!     None => {
//!         let data = build_tile(&snapshot);
//!         match cache.set(&agent_half_extents, tile_position, &snapshot, &connections, data) {
//!             Some(tile) => tile,
//!             None => return, // Did not fit, use the built data directly
//!         }
//!     }
//! };
//! add_tile_to_navmesh(tile.data());
//! // The tile becomes evictable once `tile` is dropped
//! ```
//!
//! # Architecture
//!
//! - [`TileResultCache`]: Main cache indexed by agent size, tile position and key
//! - [`CachedTile`]: Borrow of a cached tile, released on drop
//! - [`KeyView`]: Ordering contract shared by stored keys and lazy snapshot lookups
//! - [`TileProvider`]: Cache, store and builder chained together

pub mod config;
pub mod key;
pub mod provider;
pub mod stats;
pub mod tile_cache;


pub use config::*;
pub use key::*;
pub use provider::*;
pub use stats::*;
pub use tile_cache::*;
