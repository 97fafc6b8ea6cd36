use super::{CollisionShape, ShapeType, Triangle};
use crate::aabb::Aabb;
use glam::Vec3;
use navmesh_common::RigidTransform;
use serde::{Deserialize, Serialize};

/// Corner indices of the 12 outward-facing box triangles
const BOX_TRIANGLES: [[usize; 3]; 12] = [
    // -Z
    [0, 2, 1],
    [1, 2, 3],
    // +Z
    [4, 5, 6],
    [5, 7, 6],
    // -X
    [0, 4, 2],
    [2, 4, 6],
    // +X
    [1, 3, 5],
    [3, 7, 5],
    // -Y
    [0, 1, 4],
    [1, 5, 4],
    // +Y
    [2, 6, 3],
    [3, 6, 7],
];

/// A box centered on its local origin
///
/// Orientation comes from the transform the box is placed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxShape {
    /// Half-extents of the box (distance from center to face)
    pub half_extents: Vec3,
}

impl BoxShape {
    pub fn new(half_extents: Vec3) -> Self {
        Self { half_extents }
    }

    /// The 8 local-space corners, indexed by bit pattern (x, y, z)
    pub fn vertices(&self) -> [Vec3; 8] {
        Aabb::new(-self.half_extents, self.half_extents).corners()
    }

    /// Check if a local-space point is inside this box
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x.abs() <= self.half_extents.x
            && point.y.abs() <= self.half_extents.y
            && point.z.abs() <= self.half_extents.z
    }
}

impl CollisionShape for BoxShape {
    fn shape_type(&self) -> ShapeType {
        ShapeType::Box
    }

    fn local_bounds(&self) -> Aabb {
        Aabb::new(-self.half_extents, self.half_extents)
    }

    fn triangulate(&self, transform: &RigidTransform, out: &mut Vec<Triangle>) {
        let corners = self.vertices().map(|v| transform.transform_point(v));
        out.extend(
            BOX_TRIANGLES
                .iter()
                .map(|[a, b, c]| [corners[*a], corners[*b], corners[*c]]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_box_triangulation() {
        let shape = BoxShape::new(Vec3::new(1.0, 2.0, 3.0));
        let mut triangles = Vec::new();
        shape.triangulate(
            &RigidTransform::from_translation(Vec3::new(10.0, 0.0, 0.0)),
            &mut triangles,
        );

        assert_eq!(triangles.len(), 12);
        let bounds = Aabb::of_points(triangles.iter().flatten().copied()).unwrap();
        assert_eq!(bounds.min, Vec3::new(9.0, -2.0, -3.0));
        assert_eq!(bounds.max, Vec3::new(11.0, 2.0, 3.0));
    }

    #[test]
    fn test_world_bounds_follow_rotation() {
        let shape = BoxShape::new(Vec3::new(4.0, 1.0, 1.0));
        let transform = RigidTransform::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let bounds = shape.world_bounds(&transform);

        assert!((bounds.max.z - 4.0).abs() < 1e-5);
        assert!((bounds.max.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_contains_point() {
        let shape = BoxShape::new(Vec3::splat(1.0));
        assert!(shape.contains_point(&Vec3::new(0.5, -1.0, 0.0)));
        assert!(!shape.contains_point(&Vec3::new(1.5, 0.0, 0.0)));
    }
}
