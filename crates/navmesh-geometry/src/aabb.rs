//! Axis-aligned bounding boxes in world space

use glam::Vec3;
use navmesh_common::{RigidTransform, TileBounds};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all `points`, or `None` for an empty iterator
    pub fn of_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Aabb::new(first, first), |aabb, p| Aabb {
            min: aabb.min.min(p),
            max: aabb.max.max(p),
        }))
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Bounds of this box after applying `transform` to its corners
    pub fn transformed(&self, transform: &RigidTransform) -> Aabb {
        let corners = self.corners();
        let first = transform.transform_point(corners[0]);
        corners[1..]
            .iter()
            .map(|c| transform.transform_point(*c))
            .fold(Aabb::new(first, first), |aabb, p| Aabb {
                min: aabb.min.min(p),
                max: aabb.max.max(p),
            })
    }

    /// This box with its XZ extent clamped into `bounds`
    pub fn clipped_to(&self, bounds: &TileBounds) -> Aabb {
        let (min, max) = bounds.clip_xz(&self.min, &self.max);
        Aabb { min, max }
    }

    /// Largest per-component distance between the corners of two boxes
    pub fn max_difference(&self, other: &Aabb) -> f32 {
        (self.min - other.min)
            .abs()
            .max((self.max - other.max).abs())
            .max_element()
    }
}
