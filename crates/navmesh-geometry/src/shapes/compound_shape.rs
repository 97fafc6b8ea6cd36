use super::{CollisionShape, ShapeType, Triangle};
use crate::aabb::Aabb;
use glam::Vec3;
use navmesh_common::RigidTransform;
use std::fmt;
use std::sync::Arc;

/// A shape made of child shapes placed by local transforms
#[derive(Clone, Default)]
pub struct CompoundShape {
    children: Vec<(RigidTransform, Arc<dyn CollisionShape>)>,
}

impl CompoundShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, local: RigidTransform, shape: Arc<dyn CollisionShape>) {
        self.children.push((local, shape));
    }

    pub fn with_child(mut self, local: RigidTransform, shape: Arc<dyn CollisionShape>) -> Self {
        self.add_child(local, shape);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }
}

impl fmt::Debug for CompoundShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompoundShape")
            .field("children", &format!("[{} child shape(s)]", self.children.len()))
            .finish()
    }
}

impl CollisionShape for CompoundShape {
    fn shape_type(&self) -> ShapeType {
        ShapeType::Compound
    }

    fn local_bounds(&self) -> Aabb {
        self.children
            .iter()
            .map(|(local, shape)| shape.world_bounds(local))
            .reduce(|a, b| a.union(&b))
            .unwrap_or(Aabb::new(Vec3::ZERO, Vec3::ZERO))
    }

    fn triangulate(&self, transform: &RigidTransform, out: &mut Vec<Triangle>) {
        for (local, shape) in &self.children {
            shape.triangulate(&transform.mul_transform(local), out);
        }
    }
}
