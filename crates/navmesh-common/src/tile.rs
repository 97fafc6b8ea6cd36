//! Tile grid coordinates and bounds
//!
//! Tiles are laid out on the XZ plane (Y-up coordinate system). A tile position is an
//! integer grid coordinate where `x` maps to world X and `y` maps to world Z.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer 2D grid coordinate of a navigation mesh tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TilePosition {
    pub x: i32,
    pub y: i32,
}

impl TilePosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Integer 2D coordinate of a world cell (used to key water planes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellPosition {
    pub x: i32,
    pub y: i32,
}

impl CellPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle on the XZ plane bounding one tile
///
/// `min.x`/`max.x` are world X, `min.y`/`max.y` are world Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl TileBounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Bounds of the tile at `position` for a square grid with `tile_size` sided tiles
    pub fn of_tile(position: TilePosition, tile_size: f32) -> Self {
        let min = Vec2::new(position.x as f32, position.y as f32) * tile_size;
        Self {
            min,
            max: min + Vec2::splat(tile_size),
        }
    }

    /// Returns these bounds with both corners multiplied by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn depth(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Check if the XZ projection of a 3D box overlaps these bounds
    pub fn overlaps_xz(&self, min: &Vec3, max: &Vec3) -> bool {
        !(max.x < self.min.x || min.x > self.max.x || max.z < self.min.y || min.z > self.max.y)
    }

    /// Check that both corners are finite and `min` does not exceed `max`
    pub fn validate(&self) -> Result<(), String> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(format!(
                "Tile bounds must be finite, got {:?}..{:?}",
                self.min, self.max
            ));
        }
        if self.min.x > self.max.x || self.min.y > self.max.y {
            return Err(format!(
                "Tile bounds minimum {:?} exceeds maximum {:?}",
                self.min, self.max
            ));
        }
        Ok(())
    }

    /// Clamp the XZ extent of a 3D box into these bounds, keeping Y untouched
    ///
    /// A box entirely outside the bounds collapses onto the nearest edge. Never panics,
    /// even for bounds that fail [`TileBounds::validate`].
    pub fn clip_xz(&self, min: &Vec3, max: &Vec3) -> (Vec3, Vec3) {
        let clamp_x = |v: f32| v.max(self.min.x).min(self.max.x);
        let clamp_z = |v: f32| v.max(self.min.y).min(self.max.y);
        (
            Vec3::new(clamp_x(min.x), min.y, clamp_z(min.z)),
            Vec3::new(clamp_x(max.x), max.y, clamp_z(max.z)),
        )
    }
}

/// Grid position of the tile containing `point` (XZ plane)
pub fn tile_position_of(point: &Vec3, tile_size: f32) -> TilePosition {
    TilePosition::new(
        (point.x / tile_size).floor() as i32,
        (point.z / tile_size).floor() as i32,
    )
}
