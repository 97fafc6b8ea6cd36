//! Versioned per-tile collision geometry
//!
//! This crate tracks the collision objects and water planes contributing to each
//! navigation mesh tile and turns them into immutable geometry snapshots that a tile
//! builder consumes.
//!
//! # Features
//!
//! - **Revision Tracking**: Every accepted change bumps a per-generation revision
//! - **Debounced Updates**: Oscillating objects only bump the revision when the navmesh
//!   would perceive the movement
//! - **Build Correlation**: Build completions are reported back to suppress redundant rebuilds
//! - **Deterministic Snapshots**: Equal geometry yields equal snapshots regardless of
//!   registration order
//!
//! # Example
//!
//! ```rust
//! use navmesh_geometry::{GeometrySettings, GeometrySnapshotManager, ObjectId};
//! use navmesh_geometry::shapes::BoxShape;
//! use navmesh_common::{AreaType, RigidTransform, TileBounds, Version};
//! use glam::{Vec2, Vec3};
//! use std::sync::Arc;
//!
//! # fn example() -> navmesh_common::Result<()> {
//! let bounds = TileBounds::new(Vec2::new(0.0, 0.0), Vec2::new(64.0, 64.0));
//! let mut manager = GeometrySnapshotManager::new(GeometrySettings::default(), bounds, 0)?;
//!
//! manager.add_object(
//!     ObjectId(1),
//!     Arc::new(BoxShape::new(Vec3::new(10.0, 10.0, 10.0))),
//!     RigidTransform::from_translation(Vec3::new(100.0, 0.0, 100.0)),
//!     AreaType::Ground,
//! );
//!
//! let snapshot = manager.build_snapshot();
//! // ... hand the snapshot to the tile builder, then report the result
//! manager.report_build_outcome(snapshot.version(), Version::new(0, 1));
//! # Ok(())
//! # }
//! ```

pub mod aabb;
pub mod config;
pub mod manager;
pub mod object;
pub mod shapes;
pub mod snapshot;

pub use aabb::Aabb;
pub use config::{DebouncePolicy, GeometrySettings};
pub use manager::{BuildReport, GenerationCounter, GeometrySnapshotManager};
pub use object::{ObjectId, OscillatingObject, RemovedObject, TrackedObject, WaterPlane};
pub use shapes::{BoxShape, CollisionShape, CompoundShape, ShapeType, TrimeshShape};
pub use snapshot::{GeometrySnapshot, SnapshotBuilder, SnapshotMesh, SnapshotWater};
