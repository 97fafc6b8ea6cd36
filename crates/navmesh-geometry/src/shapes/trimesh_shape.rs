use super::{CollisionShape, ShapeType, Triangle};
use crate::aabb::Aabb;
use glam::Vec3;
use navmesh_common::RigidTransform;
use serde::{Deserialize, Serialize};

/// An indexed triangle mesh in local space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimeshShape {
    /// Vertices of the triangle mesh
    pub vertices: Vec<Vec3>,
    /// Triangle indices (groups of 3)
    pub indices: Vec<u32>,
    #[serde(skip)]
    bounds: Option<Aabb>,
}

impl TrimeshShape {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::of_points(vertices.iter().copied());
        Self {
            vertices,
            indices,
            bounds,
        }
    }

    /// Get triangles as triplets of local-space vertices
    ///
    /// Incomplete trailing groups and out-of-range indices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.indices.chunks_exact(3).filter_map(|chunk| {
            Some([
                *self.vertices.get(chunk[0] as usize)?,
                *self.vertices.get(chunk[1] as usize)?,
                *self.vertices.get(chunk[2] as usize)?,
            ])
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles().count()
    }
}

impl CollisionShape for TrimeshShape {
    fn shape_type(&self) -> ShapeType {
        ShapeType::Trimesh
    }

    fn local_bounds(&self) -> Aabb {
        self.bounds
            .or_else(|| Aabb::of_points(self.vertices.iter().copied()))
            .unwrap_or(Aabb::new(Vec3::ZERO, Vec3::ZERO))
    }

    fn triangulate(&self, transform: &RigidTransform, out: &mut Vec<Triangle>) {
        out.extend(
            self.triangles()
                .map(|tri| tri.map(|v| transform.transform_point(v))),
        );
    }
}
