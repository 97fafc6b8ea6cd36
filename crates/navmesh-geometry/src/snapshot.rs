//! Immutable geometry snapshots
//!
//! A snapshot is the input of one navigation mesh tile build: every triangle of the
//! tracked objects overlapping the tile plus the tile's water planes, tagged with the
//! version of the geometry it was produced from.

use crate::object::WaterPlane;
use crate::shapes::{CollisionShape, Triangle};
use glam::Vec3;
use navmesh_common::{AreaType, RigidTransform, TileBounds, Version};
use std::collections::HashMap;

/// Indexed triangle soup with a per-triangle area type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotMesh {
    /// Flat vertex coordinates (x, y, z triplets)
    pub vertices: Vec<f32>,
    /// Triangle vertex indices (groups of 3)
    pub indices: Vec<i32>,
    /// Area type per triangle
    pub areas: Vec<AreaType>,
}

impl SnapshotMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

/// Water plane as seen by the tile builder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotWater {
    pub cell_size: i32,
    /// World-space position of the water surface
    pub shift: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySnapshot {
    version: Version,
    bounds: TileBounds,
    mesh: SnapshotMesh,
    water: Vec<SnapshotWater>,
}

impl GeometrySnapshot {
    pub fn version(&self) -> Version {
        self.version
    }

    /// Tile bounds in world units
    pub fn bounds(&self) -> &TileBounds {
        &self.bounds
    }

    pub fn mesh(&self) -> &SnapshotMesh {
        &self.mesh
    }

    pub fn water(&self) -> &[SnapshotWater] {
        &self.water
    }

    /// Check if the snapshot has neither triangles nor water
    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty() && self.water.is_empty()
    }
}

/// Accumulates water and objects into a snapshot
///
/// Vertices are deduplicated by exact bit pattern in insertion order, so the same
/// sequence of additions always yields the same mesh.
#[derive(Debug)]
pub struct SnapshotBuilder {
    bounds: TileBounds,
    mesh: SnapshotMesh,
    water: Vec<SnapshotWater>,
    vertex_lookup: HashMap<[u32; 3], i32>,
    scratch: Vec<Triangle>,
}

impl SnapshotBuilder {
    /// `bounds` must be in the same units as the geometry added later
    pub fn new(bounds: TileBounds) -> Self {
        Self {
            bounds,
            mesh: SnapshotMesh::default(),
            water: Vec::new(),
            vertex_lookup: HashMap::new(),
            scratch: Vec::new(),
        }
    }

    pub fn add_water(&mut self, water: &WaterPlane) {
        self.water.push(SnapshotWater {
            cell_size: water.cell_size,
            shift: water.transform.translation,
        });
    }

    /// Add the triangles of `shape` overlapping the tile bounds
    pub fn add_object(&mut self, shape: &dyn CollisionShape, transform: &RigidTransform, area_type: AreaType) {
        let mut triangles = std::mem::take(&mut self.scratch);
        triangles.clear();
        shape.triangulate(transform, &mut triangles);

        for triangle in &triangles {
            let min = triangle[0].min(triangle[1]).min(triangle[2]);
            let max = triangle[0].max(triangle[1]).max(triangle[2]);
            if !self.bounds.overlaps_xz(&min, &max) {
                continue;
            }
            for vertex in triangle {
                let index = self.vertex_index(*vertex);
                self.mesh.indices.push(index);
            }
            self.mesh.areas.push(area_type);
        }

        self.scratch = triangles;
    }

    fn vertex_index(&mut self, vertex: Vec3) -> i32 {
        let key = [vertex.x.to_bits(), vertex.y.to_bits(), vertex.z.to_bits()];
        let next = self.vertex_lookup.len() as i32;
        let vertices = &mut self.mesh.vertices;
        *self.vertex_lookup.entry(key).or_insert_with(|| {
            vertices.extend_from_slice(&[vertex.x, vertex.y, vertex.z]);
            next
        })
    }

    pub fn create(self, version: Version) -> GeometrySnapshot {
        GeometrySnapshot {
            version,
            bounds: self.bounds,
            mesh: self.mesh,
            water: self.water,
        }
    }
}
