//! Collision shapes contributing geometry to a tile

pub mod box_shape;
pub mod compound_shape;
pub mod trimesh_shape;

use crate::aabb::Aabb;
use glam::Vec3;
use navmesh_common::RigidTransform;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub use box_shape::BoxShape;
pub use compound_shape::CompoundShape;
pub use trimesh_shape::TrimeshShape;

/// World-space triangle
pub type Triangle = [Vec3; 3];

/// Shape supplied by the collision layer
///
/// Shapes are immutable and shared between the collision world and the geometry
/// managers of every tile they touch.
pub trait CollisionShape: Debug + Send + Sync {
    fn shape_type(&self) -> ShapeType;

    /// Bounds in the shape's local space
    fn local_bounds(&self) -> Aabb;

    /// Append the shape's triangles, placed by `transform`, to `out`
    fn triangulate(&self, transform: &RigidTransform, out: &mut Vec<Triangle>);

    /// World-space bounds of the shape placed by `transform`
    fn world_bounds(&self, transform: &RigidTransform) -> Aabb {
        self.local_bounds().transformed(transform)
    }
}

/// Types of shapes supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Box,
    Trimesh,
    Compound,
}
