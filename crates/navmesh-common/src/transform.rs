//! Rigid transforms and agent extents

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Rotation followed by translation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl RigidTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }

    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    /// Returns the transform equivalent to applying `local` first and then `self`
    pub fn mul_transform(&self, local: &RigidTransform) -> RigidTransform {
        RigidTransform {
            translation: self.transform_point(local.translation),
            rotation: self.rotation * local.rotation,
        }
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Half extents of an agent's collision box
///
/// Totally ordered component-wise with `f32::total_cmp` so it can key ordered maps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgentHalfExtents(pub Vec3);

impl AgentHalfExtents {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }
}

impl PartialEq for AgentHalfExtents {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AgentHalfExtents {}

impl PartialOrd for AgentHalfExtents {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AgentHalfExtents {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .x
            .total_cmp(&other.0.x)
            .then_with(|| self.0.y.total_cmp(&other.0.y))
            .then_with(|| self.0.z.total_cmp(&other.0.z))
    }
}
