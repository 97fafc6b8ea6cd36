//! Objects contributing geometry to a tile

use crate::aabb::Aabb;
use crate::config::DebouncePolicy;
use crate::shapes::CollisionShape;
use navmesh_common::{AreaType, RigidTransform, TileBounds};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of a collision object supplied by the world layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One piece of geometry: a shape placed in the world with an area type
#[derive(Debug, Clone)]
pub struct TrackedObject {
    shape: Arc<dyn CollisionShape>,
    transform: RigidTransform,
    area_type: AreaType,
}

impl TrackedObject {
    pub fn new(shape: Arc<dyn CollisionShape>, transform: RigidTransform, area_type: AreaType) -> Self {
        Self {
            shape,
            transform,
            area_type,
        }
    }

    pub fn shape(&self) -> &Arc<dyn CollisionShape> {
        &self.shape
    }

    pub fn transform(&self) -> &RigidTransform {
        &self.transform
    }

    pub fn area_type(&self) -> AreaType {
        self.area_type
    }

    pub fn world_bounds(&self) -> Aabb {
        self.shape.world_bounds(&self.transform)
    }

    /// Apply a new placement; returns false when neither transform nor area changed
    pub fn update(&mut self, transform: RigidTransform, area_type: AreaType) -> bool {
        if self.transform == transform && self.area_type == area_type {
            return false;
        }
        self.transform = transform;
        self.area_type = area_type;
        true
    }
}

/// A tracked object that ignores movement the navigation mesh would not perceive
///
/// Between two reported navigation mesh builds the object accumulates the union of
/// all bounds it occupied. A move only counts when that union, clipped to the tile,
/// grows by more than the debounce policy allows. An object swinging back and forth
/// inside an area already covered since the last build stops bumping the revision.
#[derive(Debug, Clone)]
pub struct OscillatingObject {
    object: TrackedObject,
    last_change_revision: u64,
    accumulated: Aabb,
}

impl OscillatingObject {
    pub fn new(object: TrackedObject, last_change_revision: u64) -> Self {
        let accumulated = object.world_bounds();
        Self {
            object,
            last_change_revision,
            accumulated,
        }
    }

    pub fn object(&self) -> &TrackedObject {
        &self.object
    }

    pub fn into_object(self) -> TrackedObject {
        self.object
    }

    /// Bounds covered since the last reported change revision
    pub fn accumulated_bounds(&self) -> &Aabb {
        &self.accumulated
    }

    /// Apply a placement change; returns true when the change is significant
    ///
    /// `last_change_revision` is the revision of the geometry used by the most recent
    /// reported navigation mesh build. `tile_bounds` must be in world units.
    pub fn update(
        &mut self,
        transform: RigidTransform,
        area_type: AreaType,
        last_change_revision: u64,
        tile_bounds: &TileBounds,
        policy: &DebouncePolicy,
    ) -> bool {
        let old_transform = self.object.transform;
        if !self.object.update(transform, area_type) {
            return false;
        }
        if old_transform == transform {
            // Area change only
            return true;
        }

        let current = self.object.world_bounds();
        if self.last_change_revision != last_change_revision {
            self.last_change_revision = last_change_revision;
            self.accumulated = current;
            return true;
        }

        let previous = self.accumulated;
        self.accumulated = previous.union(&current);
        let difference = previous
            .clipped_to(tile_bounds)
            .max_difference(&self.accumulated.clipped_to(tile_bounds));
        policy.is_significant(difference)
    }
}

/// Shape and transform of an object removed from a manager
#[derive(Debug, Clone)]
pub struct RemovedObject {
    pub shape: Arc<dyn CollisionShape>,
    pub transform: RigidTransform,
}

/// Water surface covering one world cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterPlane {
    pub cell_size: i32,
    pub transform: RigidTransform,
}

impl WaterPlane {
    pub fn new(cell_size: i32, transform: RigidTransform) -> Self {
        Self {
            cell_size,
            transform,
        }
    }
}
