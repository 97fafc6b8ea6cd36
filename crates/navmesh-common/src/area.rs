//! Area classification and off-mesh connections

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Walk cost category of a piece of geometry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AreaType {
    /// Not walkable
    Null = 0,
    Water = 1,
    Door = 2,
    Pathgrid = 3,
    /// Default walkable area
    #[default]
    Ground = 4,
}

impl AreaType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Link between two points of the navigation mesh that is not walkable geometry
/// (doors, teleports, pathgrid edges)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffMeshConnection {
    pub start: Vec3,
    pub end: Vec3,
    pub area_type: AreaType,
}

impl OffMeshConnection {
    pub fn new(start: Vec3, end: Vec3, area_type: AreaType) -> Self {
        Self {
            start,
            end,
            area_type,
        }
    }
}
