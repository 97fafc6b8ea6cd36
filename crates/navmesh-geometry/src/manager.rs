//! Per-tile geometry tracking
//!
//! A [`GeometrySnapshotManager`] owns the collision objects and water planes of one
//! tile, versions every accepted change and produces immutable snapshots for the tile
//! builder. Build completions reported back feed the debounce rule of oscillating
//! objects, so jitter the navigation mesh would not perceive does not trigger rebuilds.

use crate::config::GeometrySettings;
use crate::object::{ObjectId, OscillatingObject, RemovedObject, TrackedObject, WaterPlane};
use crate::shapes::CollisionShape;
use crate::snapshot::{GeometrySnapshot, SnapshotBuilder};
use navmesh_common::{AreaType, CellPosition, RigidTransform, TileBounds, Version};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hands out manager generations
///
/// Every manager created for the same tile after a world or area reload must get a
/// new generation so that stale build reports can be told apart.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    next: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// A navigation mesh build result reported for a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    /// Revision of the snapshot the build used
    pub revision: u64,
    /// Version of the navigation mesh tile produced by the build
    pub nav_mesh_version: Version,
}

pub struct GeometrySnapshotManager {
    settings: GeometrySettings,
    generation: u64,
    revision: u64,
    /// Tile bounds in navigation mesh units
    tile_bounds: TileBounds,
    /// Tile bounds in world units
    world_bounds: TileBounds,
    objects: BTreeMap<ObjectId, OscillatingObject>,
    water: BTreeMap<CellPosition, WaterPlane>,
    last_build_report: Option<BuildReport>,
}

impl GeometrySnapshotManager {
    /// Create a manager for the tile covering `tile_bounds` (navigation mesh units)
    pub fn new(settings: GeometrySettings, tile_bounds: TileBounds, generation: u64) -> navmesh_common::Result<Self> {
        settings
            .validate()
            .map_err(navmesh_common::Error::InvalidSettings)?;
        tile_bounds.validate().map_err(navmesh_common::Error::InvalidSettings)?;

        let world_bounds = tile_bounds.scaled(1.0 / settings.recast_scale_factor);
        world_bounds.validate().map_err(navmesh_common::Error::InvalidSettings)?;

        Ok(Self {
            settings,
            generation,
            revision: 0,
            tile_bounds,
            world_bounds,
            objects: BTreeMap::new(),
            water: BTreeMap::new(),
            last_build_report: None,
        })
    }

    /// Register a new object; returns false without changes if `id` is already present
    pub fn add_object(
        &mut self,
        id: ObjectId,
        shape: Arc<dyn CollisionShape>,
        transform: RigidTransform,
        area_type: AreaType,
    ) -> bool {
        match self.objects.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(OscillatingObject::new(
                    TrackedObject::new(shape, transform, area_type),
                    self.revision + 1,
                ));
                self.revision += 1;
                true
            }
        }
    }

    /// Move or reclassify an object
    ///
    /// Returns false if `id` is unknown or the change is not significant; the revision
    /// is bumped only when true is returned.
    pub fn update_object(&mut self, id: ObjectId, transform: RigidTransform, area_type: AreaType) -> bool {
        let last_change_revision = self.last_change_revision();
        let Some(object) = self.objects.get_mut(&id) else {
            return false;
        };
        if !object.update(
            transform,
            area_type,
            last_change_revision,
            &self.world_bounds,
            &self.settings.debounce,
        ) {
            return false;
        }
        self.revision += 1;
        true
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<RemovedObject> {
        let object = self.objects.remove(&id)?.into_object();
        self.revision += 1;
        Some(RemovedObject {
            shape: object.shape().clone(),
            transform: *object.transform(),
        })
    }

    /// Register water for a cell; returns false without changes if the cell already has water
    pub fn add_water(&mut self, cell_position: CellPosition, cell_size: i32, transform: RigidTransform) -> bool {
        match self.water.entry(cell_position) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(WaterPlane::new(cell_size, transform));
                self.revision += 1;
                true
            }
        }
    }

    pub fn remove_water(&mut self, cell_position: CellPosition) -> Option<WaterPlane> {
        let water = self.water.remove(&cell_position)?;
        self.revision += 1;
        Some(water)
    }

    /// Produce an immutable snapshot of the current geometry
    ///
    /// Water is added in cell order, then objects in id order, so equal geometry always
    /// yields an equal snapshot regardless of registration order.
    pub fn build_snapshot(&self) -> Arc<GeometrySnapshot> {
        let mut builder = SnapshotBuilder::new(self.world_bounds);
        for water in self.water.values() {
            builder.add_water(water);
        }
        for object in self.objects.values() {
            let object = object.object();
            builder.add_object(object.shape().as_ref(), object.transform(), object.area_type());
        }
        Arc::new(builder.create(self.version()))
    }

    /// True if no objects are registered; water is not considered
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Record that a build using the snapshot at `snapshot_version` produced `nav_mesh_version`
    ///
    /// Reports from another generation and reports not newer than the last recorded
    /// one are ignored.
    pub fn report_build_outcome(&mut self, snapshot_version: Version, nav_mesh_version: Version) {
        if !snapshot_version.same_generation(&self.version()) {
            log::debug!(
                "Ignoring build report for generation {} in manager of generation {}",
                snapshot_version.generation,
                self.generation
            );
            return;
        }
        if let Some(last) = &self.last_build_report {
            if nav_mesh_version <= last.nav_mesh_version {
                log::debug!(
                    "Ignoring build report with navmesh version {} not newer than {}",
                    nav_mesh_version,
                    last.nav_mesh_version
                );
                return;
            }
        }
        self.last_build_report = Some(BuildReport {
            revision: snapshot_version.revision,
            nav_mesh_version,
        });
    }

    pub fn last_build_report(&self) -> Option<&BuildReport> {
        self.last_build_report.as_ref()
    }

    pub fn version(&self) -> Version {
        Version::new(self.generation, self.revision)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Tile bounds in navigation mesh units
    pub fn tile_bounds(&self) -> &TileBounds {
        &self.tile_bounds
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn water_count(&self) -> usize {
        self.water.len()
    }

    pub fn settings(&self) -> &GeometrySettings {
        &self.settings
    }

    fn last_change_revision(&self) -> u64 {
        self.last_build_report
            .map(|report| report.revision)
            .unwrap_or(self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::BoxShape;
    use glam::{Vec2, Vec3};

    fn make_manager() -> GeometrySnapshotManager {
        let settings = GeometrySettings::new(1.0);
        let bounds = TileBounds::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0));
        GeometrySnapshotManager::new(settings, bounds, 1).unwrap()
    }

    fn box_shape() -> Arc<dyn CollisionShape> {
        Arc::new(BoxShape::new(Vec3::splat(1.0)))
    }

    fn at(x: f32, z: f32) -> RigidTransform {
        RigidTransform::from_translation(Vec3::new(x, 0.0, z))
    }

    #[test]
    fn test_new_manager_is_empty() {
        let manager = make_manager();
        assert!(manager.is_empty());
        assert_eq!(manager.version(), Version::new(1, 0));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let bounds = TileBounds::new(Vec2::ZERO, Vec2::ONE);
        let result = GeometrySnapshotManager::new(GeometrySettings::new(-1.0), bounds, 0);
        assert!(matches!(result, Err(navmesh_common::Error::InvalidSettings(_))));
    }

    #[test]
    fn test_invalid_tile_bounds_are_rejected() {
        let inverted = TileBounds::new(Vec2::splat(10.0), Vec2::ZERO);
        let result = GeometrySnapshotManager::new(GeometrySettings::new(1.0), inverted, 1);
        assert!(matches!(result, Err(navmesh_common::Error::InvalidSettings(_))));

        let nan = TileBounds::new(Vec2::new(f32::NAN, 0.0), Vec2::splat(10.0));
        let result = GeometrySnapshotManager::new(GeometrySettings::new(1.0), nan, 1);
        assert!(matches!(result, Err(navmesh_common::Error::InvalidSettings(_))));

        let overflowing = TileBounds::new(Vec2::ZERO, Vec2::splat(f32::MAX));
        let result = GeometrySnapshotManager::new(GeometrySettings::new(0.5), overflowing, 1);
        assert!(matches!(result, Err(navmesh_common::Error::InvalidSettings(_))));
    }

    #[test]
    fn test_add_object_bumps_revision() {
        let mut manager = make_manager();
        assert!(manager.add_object(ObjectId(1), box_shape(), at(5.0, 5.0), AreaType::Ground));
        assert_eq!(manager.version(), Version::new(1, 1));
        assert!(!manager.is_empty());
    }

    #[test]
    fn test_add_existing_object_fails_without_changes() {
        let mut manager = make_manager();
        assert!(manager.add_object(ObjectId(1), box_shape(), at(5.0, 5.0), AreaType::Ground));
        assert!(!manager.add_object(ObjectId(1), box_shape(), at(50.0, 5.0), AreaType::Door));
        assert_eq!(manager.version(), Version::new(1, 1));
        assert_eq!(manager.object_count(), 1);
    }

    #[test]
    fn test_update_missing_object_fails() {
        let mut manager = make_manager();
        assert!(!manager.update_object(ObjectId(7), at(1.0, 1.0), AreaType::Ground));
        assert_eq!(manager.version(), Version::new(1, 0));
    }

    #[test]
    fn test_update_object_with_same_transform_is_ignored() {
        let mut manager = make_manager();
        manager.add_object(ObjectId(1), box_shape(), at(5.0, 5.0), AreaType::Ground);
        assert!(!manager.update_object(ObjectId(1), at(5.0, 5.0), AreaType::Ground));
        assert_eq!(manager.version().revision, 1);
    }

    #[test]
    fn test_every_move_counts_until_first_build_report() {
        let mut manager = make_manager();
        manager.add_object(ObjectId(1), box_shape(), at(5.0, 5.0), AreaType::Ground);

        assert!(manager.update_object(ObjectId(1), at(6.0, 5.0), AreaType::Ground));
        assert!(manager.update_object(ObjectId(1), at(5.0, 5.0), AreaType::Ground));
        assert_eq!(manager.version().revision, 3);
    }

    #[test]
    fn test_update_object_with_new_transform_bumps_revision() {
        let mut manager = make_manager();
        manager.add_object(ObjectId(1), box_shape(), at(5.0, 5.0), AreaType::Ground);
        assert!(manager.update_object(ObjectId(1), at(10.0, 5.0), AreaType::Ground));
        assert_eq!(manager.version().revision, 2);
    }

    #[test]
    fn test_oscillating_object_stops_bumping_until_build_reported() {
        let mut manager = make_manager();
        manager.add_object(ObjectId(1), box_shape(), at(5.0, 5.0), AreaType::Ground);
        manager.report_build_outcome(manager.version(), Version::new(0, 1));

        assert!(manager.update_object(ObjectId(1), at(6.0, 5.0), AreaType::Ground));
        assert!(manager.update_object(ObjectId(1), at(7.0, 5.0), AreaType::Ground));
        assert!(!manager.update_object(ObjectId(1), at(6.0, 5.0), AreaType::Ground));
        assert!(!manager.update_object(ObjectId(1), at(5.0, 5.0), AreaType::Ground));
        let revision = manager.version().revision;
        assert_eq!(revision, 3);

        manager.report_build_outcome(manager.version(), Version::new(0, 2));

        assert!(manager.update_object(ObjectId(1), at(6.0, 5.0), AreaType::Ground));
        assert_eq!(manager.version().revision, revision + 1);
    }

    #[test]
    fn test_remove_object() {
        let mut manager = make_manager();
        manager.add_object(ObjectId(1), box_shape(), at(5.0, 5.0), AreaType::Ground);

        let removed = manager.remove_object(ObjectId(1)).unwrap();
        assert_eq!(removed.transform, at(5.0, 5.0));
        assert_eq!(manager.version().revision, 2);
        assert!(manager.is_empty());

        assert!(manager.remove_object(ObjectId(1)).is_none());
        assert_eq!(manager.version().revision, 2);
    }

    #[test]
    fn test_water_add_remove() {
        let mut manager = make_manager();
        let cell = CellPosition::new(0, 0);

        assert!(manager.add_water(cell, 8192, RigidTransform::IDENTITY));
        assert!(!manager.add_water(cell, 8192, RigidTransform::IDENTITY));
        assert_eq!(manager.version().revision, 1);
        // Water alone does not make the tile non-empty
        assert!(manager.is_empty());

        let removed = manager.remove_water(cell).unwrap();
        assert_eq!(removed.cell_size, 8192);
        assert_eq!(manager.version().revision, 2);
        assert!(manager.remove_water(cell).is_none());
        assert_eq!(manager.version().revision, 2);
    }

    #[test]
    fn test_revision_increases_exactly_on_success() {
        let mut manager = make_manager();
        let mut expected = 0;
        let mut check = |manager: &GeometrySnapshotManager, accepted: bool| {
            if accepted {
                expected += 1;
            }
            assert_eq!(manager.version().revision, expected);
        };

        let r = manager.add_object(ObjectId(1), box_shape(), at(1.0, 1.0), AreaType::Ground);
        check(&manager, r);
        let r = manager.add_object(ObjectId(2), box_shape(), at(2.0, 2.0), AreaType::Ground);
        check(&manager, r);
        let r = manager.add_object(ObjectId(1), box_shape(), at(3.0, 3.0), AreaType::Ground);
        check(&manager, r);
        let r = manager.update_object(ObjectId(2), at(20.0, 2.0), AreaType::Ground);
        check(&manager, r);
        let r = manager.update_object(ObjectId(3), at(20.0, 2.0), AreaType::Ground);
        check(&manager, r);
        let r = manager.remove_object(ObjectId(1)).is_some();
        check(&manager, r);
        let r = manager.remove_object(ObjectId(1)).is_some();
        check(&manager, r);
        let r = manager.add_water(CellPosition::new(1, 1), 100, RigidTransform::IDENTITY);
        check(&manager, r);
        let r = manager.remove_water(CellPosition::new(1, 1)).is_some();
        check(&manager, r);
    }

    #[test]
    fn test_snapshot_is_tagged_with_version() {
        let mut manager = make_manager();
        manager.add_object(ObjectId(1), box_shape(), at(5.0, 5.0), AreaType::Ground);
        let snapshot = manager.build_snapshot();

        assert_eq!(snapshot.version(), manager.version());
        assert_eq!(snapshot.mesh().triangle_count(), 12);

        // Snapshots are immutable: later changes do not affect an existing one
        manager.remove_object(ObjectId(1));
        assert_eq!(snapshot.mesh().triangle_count(), 12);
        assert!(manager.build_snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_independent_of_insertion_order() {
        let mut first = make_manager();
        first.add_object(ObjectId(1), box_shape(), at(5.0, 5.0), AreaType::Ground);
        first.add_object(ObjectId(2), box_shape(), at(20.0, 5.0), AreaType::Door);
        first.add_water(CellPosition::new(0, 0), 100, RigidTransform::IDENTITY);
        first.add_water(CellPosition::new(1, 0), 100, at(100.0, 0.0));

        let mut second = make_manager();
        second.add_water(CellPosition::new(1, 0), 100, at(100.0, 0.0));
        second.add_object(ObjectId(2), box_shape(), at(20.0, 5.0), AreaType::Door);
        second.add_water(CellPosition::new(0, 0), 100, RigidTransform::IDENTITY);
        second.add_object(ObjectId(1), box_shape(), at(5.0, 5.0), AreaType::Ground);

        let a = first.build_snapshot();
        let b = second.build_snapshot();
        assert_eq!(a.mesh(), b.mesh());
        assert_eq!(a.water(), b.water());
    }

    #[test]
    fn test_snapshot_bounds_are_in_world_units() {
        let settings = GeometrySettings::new(0.5);
        let bounds = TileBounds::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        let manager = GeometrySnapshotManager::new(settings, bounds, 0).unwrap();

        let snapshot = manager.build_snapshot();
        assert_eq!(snapshot.bounds().max, Vec2::new(20.0, 20.0));
        assert_eq!(manager.tile_bounds().max, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_report_from_other_generation_is_ignored() {
        let mut manager = make_manager();
        manager.report_build_outcome(Version::new(0, 5), Version::new(0, 1));
        assert!(manager.last_build_report().is_none());
    }

    #[test]
    fn test_report_does_not_regress() {
        let mut manager = make_manager();
        manager.add_object(ObjectId(1), box_shape(), at(5.0, 5.0), AreaType::Ground);
        manager.add_object(ObjectId(2), box_shape(), at(7.0, 5.0), AreaType::Ground);

        manager.report_build_outcome(Version::new(1, 2), Version::new(0, 5));
        manager.report_build_outcome(Version::new(1, 1), Version::new(0, 3));
        manager.report_build_outcome(Version::new(1, 1), Version::new(0, 5));

        let report = manager.last_build_report().unwrap();
        assert_eq!(report.revision, 2);
        assert_eq!(report.nav_mesh_version, Version::new(0, 5));

        manager.report_build_outcome(Version::new(1, 1), Version::new(0, 6));
        assert_eq!(manager.last_build_report().unwrap().revision, 1);
    }

    #[test]
    fn test_generation_counter() {
        let counter = GenerationCounter::new();
        assert_eq!(counter.next(), 0);
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
    }
}
