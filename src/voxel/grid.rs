//! Dense, bounded voxel grid.
//!
//! World position `(0, 0, 0)` maps to the geometric centre of the grid. For an
//! axis with `n` cells of edge `s`, a coordinate `x` lands in cell
//! `floor((x + n * s / 2) / s)`. Positions outside `[0, n)` on any axis are
//! silently ignored by every operation.
//!
//! Storage is a flat `Vec<Option<Voxel>>`. That is only sensible because the grid
//! is small (tens of thousands of cells); an unbounded domain would need a
//! sparse map keyed by integer index instead.

use std::collections::HashMap;

use glam::{IVec3, UVec3, Vec3};
use serde::{Deserialize, Serialize};

use super::events::GridEvent;
use super::voxel::Voxel;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::{Aabb, Vector3};
use crate::terrain::TerrainType;

/// Upper bound on dense cell count
pub const MAX_DENSE_CELLS: usize = 1 << 26;

/// Grid shape, fixed for the lifetime of a manager
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cells per axis `(x, y, z)`
    pub dimensions: [u32; 3],
    /// Edge length of one cell in meters
    pub voxel_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            dimensions: [50, 20, 50], // 5m x 2m x 5m at 10cm
            voxel_size: 0.1,
        }
    }
}

/// Outcome of a single label update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoxelUpdate {
    /// Position fell outside the grid; nothing changed
    OutOfRange,
    /// Cell was empty and now holds the label
    Created,
    /// Cell held a different label, which was replaced
    Replaced,
    /// Cell already held this label
    Unchanged,
}

impl VoxelUpdate {
    /// True if the grid was mutated
    pub fn is_change(self) -> bool {
        matches!(self, VoxelUpdate::Created | VoxelUpdate::Replaced)
    }
}

/// Number of occupied cells per label
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainCounts {
    pub traversable: usize,
    pub caution: usize,
    pub non_traversable: usize,
}

impl TerrainCounts {
    pub fn get(&self, terrain: TerrainType) -> usize {
        match terrain {
            TerrainType::Traversable => self.traversable,
            TerrainType::Caution => self.caution,
            TerrainType::NonTraversable => self.non_traversable,
        }
    }

    pub fn total(&self) -> usize {
        self.traversable + self.caution + self.non_traversable
    }

    fn add(&mut self, terrain: TerrainType) {
        match terrain {
            TerrainType::Traversable => self.traversable += 1,
            TerrainType::Caution => self.caution += 1,
            TerrainType::NonTraversable => self.non_traversable += 1,
        }
    }
}

/// Owner of every voxel in a fixed-size 3D grid
#[derive(Debug)]
pub struct VoxelGridManager {
    dimensions: UVec3,
    voxel_size: f32,
    /// Half the grid's world extent; shifts the centre to the origin
    half_extent: Vec3,
    cells: Vec<Option<Voxel>>,
    occupied: usize,
    next_id: u64,
    /// Pending change events, `None` while event logging is off
    events: Option<Vec<GridEvent>>,
}

impl VoxelGridManager {
    /// Create an empty grid.
    ///
    /// Fails if any axis is zero, the cell count is too large for dense
    /// storage, or `voxel_size` is not a positive finite number.
    pub fn new(dimensions: UVec3, voxel_size: f32) -> Result<Self> {
        if dimensions.min_element() == 0 {
            return Err(Error::Config(format!(
                "grid dimensions must be non-zero, got {:?}",
                dimensions
            )));
        }
        if dimensions.max_element() > i32::MAX as u32 {
            return Err(Error::Config(format!(
                "grid dimensions exceed index range: {:?}",
                dimensions
            )));
        }
        if !voxel_size.is_finite() || voxel_size <= 0.0 {
            return Err(Error::Config(format!(
                "voxel_size must be positive, got {}",
                voxel_size
            )));
        }

        let capacity = (dimensions.x as usize)
            .checked_mul(dimensions.y as usize)
            .and_then(|n| n.checked_mul(dimensions.z as usize))
            .filter(|&n| n <= MAX_DENSE_CELLS)
            .ok_or_else(|| {
                Error::Config(format!(
                    "grid {:?} exceeds {} dense cells",
                    dimensions, MAX_DENSE_CELLS
                ))
            })?;

        log::info!(
            "Created voxel grid {}x{}x{} at {}m ({} cells)",
            dimensions.x,
            dimensions.y,
            dimensions.z,
            voxel_size,
            capacity
        );

        Ok(Self {
            dimensions,
            voxel_size,
            half_extent: dimensions.as_vec3() * voxel_size * 0.5,
            cells: vec![None; capacity],
            occupied: 0,
            next_id: 1,
            events: None,
        })
    }

    /// Create an empty grid from a config
    pub fn from_config(config: &GridConfig) -> Result<Self> {
        Self::new(UVec3::from_array(config.dimensions), config.voxel_size)
    }

    // --- Geometry ---

    pub fn dimensions(&self) -> UVec3 {
        self.dimensions
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Total number of cells
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Number of occupied cells
    pub fn voxel_count(&self) -> usize {
        self.occupied
    }

    /// World-space region covered by the grid
    pub fn world_bounds(&self) -> Aabb {
        Aabb::new(-self.half_extent, self.half_extent)
    }

    /// Map a world position to a grid index. No bounds check.
    ///
    /// Non-finite coordinates map to `i32::MIN`, which is never a valid index.
    pub fn world_to_index(&self, position: Vector3) -> IVec3 {
        let axis = |coord: f32, half: f32| -> i32 {
            let cell = ((coord + half) / self.voxel_size).floor();
            if cell.is_finite() { cell as i32 } else { i32::MIN }
        };
        IVec3::new(
            axis(position.x, self.half_extent.x),
            axis(position.y, self.half_extent.y),
            axis(position.z, self.half_extent.z),
        )
    }

    /// World-space centre of a cell
    pub fn index_to_world(&self, index: IVec3) -> Vec3 {
        (index.as_vec3() + Vec3::splat(0.5)) * self.voxel_size - self.half_extent
    }

    /// True iff every component is within `[0, n)` for its axis
    pub fn is_valid_index(&self, index: IVec3) -> bool {
        index.x >= 0
            && index.y >= 0
            && index.z >= 0
            && (index.x as u32) < self.dimensions.x
            && (index.y as u32) < self.dimensions.y
            && (index.z as u32) < self.dimensions.z
    }

    /// Flat storage offset, or `None` when out of range
    fn slot(&self, index: IVec3) -> Option<usize> {
        if !self.is_valid_index(index) {
            return None;
        }
        let nx = self.dimensions.x as usize;
        let ny = self.dimensions.y as usize;
        Some(index.x as usize + nx * (index.y as usize + ny * index.z as usize))
    }

    // --- Mutation ---

    /// Place `terrain` at the cell containing `position`.
    ///
    /// Out-of-range positions and identical labels are no-ops. A different label
    /// replaces the existing voxel.
    pub fn update_voxel(&mut self, position: Vector3, terrain: TerrainType) -> VoxelUpdate {
        let index = self.world_to_index(position);
        self.update_voxel_at(index, terrain)
    }

    /// Place `terrain` at a grid index
    pub fn update_voxel_at(&mut self, index: IVec3, terrain: TerrainType) -> VoxelUpdate {
        let Some(slot) = self.slot(index) else {
            return VoxelUpdate::OutOfRange;
        };

        let current = self.cells[slot];
        match current {
            Some(existing) if existing.terrain == terrain => VoxelUpdate::Unchanged,
            Some(existing) => {
                let voxel = self.allocate(terrain);
                self.cells[slot] = Some(voxel);
                let position = self.index_to_world(index);
                self.emit(GridEvent::Replaced {
                    index,
                    position,
                    previous: existing.terrain,
                    terrain,
                });
                VoxelUpdate::Replaced
            }
            None => {
                let voxel = self.allocate(terrain);
                self.cells[slot] = Some(voxel);
                self.occupied += 1;
                let position = self.index_to_world(index);
                self.emit(GridEvent::Created { index, position, terrain });
                VoxelUpdate::Created
            }
        }
    }

    /// Clear the cell containing `position`, returning the removed voxel
    pub fn remove_voxel(&mut self, position: Vector3) -> Option<Voxel> {
        let index = self.world_to_index(position);
        self.remove_voxel_at(index)
    }

    /// Clear the cell at a grid index, returning the removed voxel
    pub fn remove_voxel_at(&mut self, index: IVec3) -> Option<Voxel> {
        let slot = self.slot(index)?;
        let removed = self.cells[slot].take()?;
        self.occupied -= 1;
        let position = self.index_to_world(index);
        self.emit(GridEvent::Removed {
            index,
            position,
            previous: removed.terrain,
        });
        Some(removed)
    }

    /// Clear every cell. Dimensions and voxel size are unchanged.
    pub fn reset(&mut self) {
        let cleared = self.occupied;
        self.cells.fill(None);
        self.occupied = 0;
        self.emit(GridEvent::Reset);
        log::info!("Voxel grid reset, {} voxels cleared", cleared);
    }

    /// Apply a point-keyed classification, one update per grid cell.
    ///
    /// Points are quantised to their cell index first. When several points in
    /// one cell carry different labels, the most severe label wins. Returns the
    /// number of cells that changed.
    pub fn apply_labels(&mut self, labels: &HashMap<Vector3, TerrainType>) -> usize {
        let mut per_cell: HashMap<IVec3, TerrainType> = HashMap::with_capacity(labels.len());
        for (&point, &terrain) in labels {
            let index = self.world_to_index(point);
            if !self.is_valid_index(index) {
                continue;
            }
            per_cell
                .entry(index)
                .and_modify(|current| *current = current.most_severe(terrain))
                .or_insert(terrain);
        }

        let mut cells: Vec<(IVec3, TerrainType)> = per_cell.into_iter().collect();
        cells.sort_unstable_by_key(|(index, _)| (index.z, index.y, index.x));

        cells
            .into_iter()
            .filter(|&(index, terrain)| self.update_voxel_at(index, terrain).is_change())
            .count()
    }

    fn allocate(&mut self, terrain: TerrainType) -> Voxel {
        let voxel = Voxel::new(self.next_id, terrain);
        self.next_id += 1;
        voxel
    }

    // --- Queries ---

    /// Label at the cell containing `position`, if occupied and in range
    pub fn get_terrain_type(&self, position: Vector3) -> Option<TerrainType> {
        self.get_voxel(position).map(|v| v.terrain)
    }

    /// Voxel at the cell containing `position`
    pub fn get_voxel(&self, position: Vector3) -> Option<&Voxel> {
        self.get_voxel_at(self.world_to_index(position))
    }

    /// Voxel at a grid index
    pub fn get_voxel_at(&self, index: IVec3) -> Option<&Voxel> {
        let slot = self.slot(index)?;
        self.cells[slot].as_ref()
    }

    /// Every occupied cell as `(index, world centre, label)`, in storage order
    pub fn occupied(&self) -> impl Iterator<Item = (IVec3, Vec3, TerrainType)> + '_ {
        let nx = self.dimensions.x as usize;
        let ny = self.dimensions.y as usize;
        self.cells.iter().enumerate().filter_map(move |(slot, cell)| {
            let voxel = cell.as_ref()?;
            let index = IVec3::new(
                (slot % nx) as i32,
                ((slot / nx) % ny) as i32,
                (slot / (nx * ny)) as i32,
            );
            Some((index, self.index_to_world(index), voxel.terrain))
        })
    }

    /// Occupied cell counts per label
    pub fn counts_by_type(&self) -> TerrainCounts {
        let mut counts = TerrainCounts::default();
        for voxel in self.cells.iter().flatten() {
            counts.add(voxel.terrain);
        }
        counts
    }

    // --- Events ---

    /// Start or stop recording change events. Stopping discards pending events.
    pub fn set_event_logging(&mut self, enabled: bool) {
        match (enabled, self.events.is_some()) {
            (true, false) => self.events = Some(Vec::new()),
            (false, true) => self.events = None,
            _ => {}
        }
    }

    /// Take all events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<GridEvent> {
        self.events.as_mut().map(std::mem::take).unwrap_or_default()
    }

    fn emit(&mut self, event: GridEvent) {
        if let Some(events) = self.events.as_mut() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 8x8x8 grid of 0.25m cells, spanning [-1, 1) on every axis
    fn grid() -> VoxelGridManager {
        VoxelGridManager::new(UVec3::splat(8), 0.25).unwrap()
    }

    #[test]
    fn test_new_validates() {
        assert!(VoxelGridManager::new(UVec3::new(0, 4, 4), 0.1).is_err());
        assert!(VoxelGridManager::new(UVec3::splat(4), 0.0).is_err());
        assert!(VoxelGridManager::new(UVec3::splat(4), -1.0).is_err());
        assert!(VoxelGridManager::new(UVec3::splat(4), f32::NAN).is_err());
        assert!(VoxelGridManager::new(UVec3::splat(1 << 20), 0.1).is_err());

        let grid = grid();
        assert_eq!(grid.capacity(), 512);
        assert_eq!(grid.voxel_count(), 0);
    }

    #[test]
    fn test_from_config() {
        let grid = VoxelGridManager::from_config(&GridConfig::default()).unwrap();
        assert_eq!(grid.dimensions(), UVec3::new(50, 20, 50));
        assert_eq!(grid.capacity(), 50_000);
    }

    #[test]
    fn test_world_to_index_centered() {
        let grid = grid();
        assert_eq!(grid.world_to_index(Vector3::ZERO), IVec3::new(4, 4, 4));
        assert_eq!(grid.world_to_index(Vector3::new(-1.0, -1.0, -1.0)), IVec3::ZERO);
        assert_eq!(grid.world_to_index(Vector3::new(0.99, -0.01, 0.3)), IVec3::new(7, 3, 5));
        assert_eq!(grid.world_to_index(Vector3::new(1.0, -1.1, 0.0)), IVec3::new(8, -1, 4));
    }

    #[test]
    fn test_world_to_index_non_finite() {
        let grid = grid();
        let index = grid.world_to_index(Vector3::new(f32::NAN, 0.0, f32::INFINITY));
        assert_eq!(index.x, i32::MIN);
        assert_eq!(index.z, i32::MIN);
        assert!(!grid.is_valid_index(index));
    }

    #[test]
    fn test_index_to_world_round_trip() {
        let grid = grid();
        for index in [IVec3::ZERO, IVec3::new(7, 0, 3), IVec3::splat(4)] {
            let center = grid.index_to_world(index);
            assert_eq!(grid.world_to_index(center.into()), index);
        }
        assert_eq!(grid.index_to_world(IVec3::ZERO), Vec3::splat(-0.875));
    }

    #[test]
    fn test_is_valid_index() {
        let grid = grid();
        assert!(grid.is_valid_index(IVec3::ZERO));
        assert!(grid.is_valid_index(IVec3::splat(7)));
        assert!(!grid.is_valid_index(IVec3::new(8, 0, 0)));
        assert!(!grid.is_valid_index(IVec3::new(0, -1, 0)));
        assert!(!grid.is_valid_index(IVec3::new(0, 0, i32::MAX)));
    }

    #[test]
    fn test_update_and_query() {
        let mut grid = grid();
        let p = Vector3::new(0.1, 0.1, 0.1);

        assert_eq!(grid.get_terrain_type(p), None);
        assert_eq!(grid.update_voxel(p, TerrainType::Traversable), VoxelUpdate::Created);
        assert_eq!(grid.get_terrain_type(p), Some(TerrainType::Traversable));
        // Anywhere inside the same cell resolves to the same voxel
        assert_eq!(grid.get_terrain_type(Vector3::new(0.2, 0.01, 0.24)), Some(TerrainType::Traversable));
        assert_eq!(grid.voxel_count(), 1);
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut grid = grid();
        let p = Vector3::new(0.5, 0.5, 0.5);

        grid.update_voxel(p, TerrainType::Caution);
        let first = *grid.get_voxel(p).unwrap();

        assert_eq!(grid.update_voxel(p, TerrainType::Caution), VoxelUpdate::Unchanged);
        assert_eq!(*grid.get_voxel(p).unwrap(), first);
        assert_eq!(grid.voxel_count(), 1);
    }

    #[test]
    fn test_update_replaces_different_label() {
        let mut grid = grid();
        let p = Vector3::new(-0.5, 0.0, 0.5);

        grid.update_voxel(p, TerrainType::Traversable);
        let before = *grid.get_voxel(p).unwrap();

        assert_eq!(grid.update_voxel(p, TerrainType::NonTraversable), VoxelUpdate::Replaced);
        let after = *grid.get_voxel(p).unwrap();

        assert_eq!(after.terrain, TerrainType::NonTraversable);
        assert_ne!(after.id, before.id);
        assert_eq!(grid.voxel_count(), 1);
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut grid = grid();
        grid.update_voxel(Vector3::new(0.9, -0.9, -0.9), TerrainType::Caution);

        // x = 1.0 maps to index (8, 0, 0), one past the upper bound
        let outside = Vector3::new(1.0, -1.0, -1.0);
        assert_eq!(grid.world_to_index(outside), IVec3::new(8, 0, 0));
        assert_eq!(grid.update_voxel(outside, TerrainType::NonTraversable), VoxelUpdate::OutOfRange);
        assert_eq!(grid.get_terrain_type(outside), None);
        assert_eq!(grid.remove_voxel(outside), None);

        for far in [
            Vector3::new(-5.0, 0.0, 0.0),
            Vector3::new(0.0, 100.0, 0.0),
            Vector3::new(0.0, 0.0, -1.01),
            Vector3::new(f32::MAX, f32::MIN, 0.0),
            Vector3::new(f32::NAN, 0.0, 0.0),
        ] {
            assert_eq!(grid.update_voxel(far, TerrainType::Traversable), VoxelUpdate::OutOfRange);
            assert_eq!(grid.get_terrain_type(far), None);
        }

        // The one in-range voxel is untouched
        assert_eq!(grid.voxel_count(), 1);
        assert_eq!(grid.get_terrain_type(Vector3::new(0.9, -0.9, -0.9)), Some(TerrainType::Caution));
    }

    #[test]
    fn test_remove_voxel() {
        let mut grid = grid();
        let p = Vector3::new(0.3, 0.3, 0.3);
        let neighbour = Vector3::new(0.6, 0.3, 0.3);
        grid.update_voxel(p, TerrainType::Caution);
        grid.update_voxel(neighbour, TerrainType::Traversable);

        let removed = grid.remove_voxel(p).unwrap();
        assert_eq!(removed.terrain, TerrainType::Caution);
        assert_eq!(grid.get_terrain_type(p), None);
        assert_eq!(grid.get_terrain_type(neighbour), Some(TerrainType::Traversable));
        assert_eq!(grid.voxel_count(), 1);

        // Already empty
        assert_eq!(grid.remove_voxel(p), None);
        assert_eq!(grid.voxel_count(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut grid = grid();
        let positions: Vec<Vector3> = (0..8)
            .map(|i| Vector3::new(-0.9 + i as f32 * 0.25, 0.0, 0.0))
            .collect();
        for (i, &p) in positions.iter().enumerate() {
            grid.update_voxel(p, TerrainType::ALL[i % 3]);
        }
        assert_eq!(grid.voxel_count(), 8);

        grid.reset();

        assert_eq!(grid.voxel_count(), 0);
        assert_eq!(grid.occupied().count(), 0);
        assert!(positions.iter().all(|&p| grid.get_terrain_type(p).is_none()));
        assert_eq!(grid.dimensions(), UVec3::splat(8));
        assert_eq!(grid.voxel_size(), 0.25);
    }

    #[test]
    fn test_occupied_iterator() {
        let mut grid = grid();
        grid.update_voxel_at(IVec3::new(1, 2, 3), TerrainType::Caution);
        grid.update_voxel_at(IVec3::new(7, 7, 7), TerrainType::NonTraversable);

        let occupied: Vec<_> = grid.occupied().collect();
        assert_eq!(occupied.len(), 2);
        assert_eq!(occupied[0].0, IVec3::new(1, 2, 3));
        assert_eq!(occupied[0].1, grid.index_to_world(IVec3::new(1, 2, 3)));
        assert_eq!(occupied[0].2, TerrainType::Caution);
        assert_eq!(occupied[1].0, IVec3::new(7, 7, 7));
    }

    #[test]
    fn test_counts_by_type() {
        let mut grid = grid();
        grid.update_voxel_at(IVec3::new(0, 0, 0), TerrainType::Traversable);
        grid.update_voxel_at(IVec3::new(1, 0, 0), TerrainType::Traversable);
        grid.update_voxel_at(IVec3::new(2, 0, 0), TerrainType::NonTraversable);

        let counts = grid.counts_by_type();
        assert_eq!(counts.get(TerrainType::Traversable), 2);
        assert_eq!(counts.get(TerrainType::Caution), 0);
        assert_eq!(counts.get(TerrainType::NonTraversable), 1);
        assert_eq!(counts.total(), grid.voxel_count());
    }

    #[test]
    fn test_apply_labels_keeps_most_severe_per_cell() {
        let mut grid = grid();
        let mut labels = HashMap::new();
        // Two points in the same 0.25m cell with different labels
        labels.insert(Vector3::new(0.01, 0.01, 0.01), TerrainType::Traversable);
        labels.insert(Vector3::new(0.2, 0.2, 0.2), TerrainType::Caution);
        // A separate cell
        labels.insert(Vector3::new(-0.5, 0.0, 0.0), TerrainType::Traversable);
        // Out of range, ignored
        labels.insert(Vector3::new(3.0, 0.0, 0.0), TerrainType::NonTraversable);

        let changed = grid.apply_labels(&labels);

        assert_eq!(changed, 2);
        assert_eq!(grid.voxel_count(), 2);
        assert_eq!(grid.get_terrain_type(Vector3::new(0.1, 0.1, 0.1)), Some(TerrainType::Caution));
        assert_eq!(grid.get_terrain_type(Vector3::new(-0.5, 0.0, 0.0)), Some(TerrainType::Traversable));

        // Re-applying the same labels changes nothing
        assert_eq!(grid.apply_labels(&labels), 0);
    }

    #[test]
    fn test_event_logging() {
        let mut grid = grid();
        let p = Vector3::new(0.1, 0.1, 0.1);

        // Off by default
        grid.update_voxel(p, TerrainType::Traversable);
        assert!(grid.drain_events().is_empty());

        grid.set_event_logging(true);
        grid.update_voxel(p, TerrainType::Traversable); // unchanged, no event
        grid.update_voxel(p, TerrainType::Caution);
        grid.remove_voxel(p);
        grid.update_voxel(Vector3::new(5.0, 0.0, 0.0), TerrainType::Caution); // out of range
        grid.reset();

        let events = grid.drain_events();
        let index = grid.world_to_index(p);
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            GridEvent::Replaced {
                index,
                position: grid.index_to_world(index),
                previous: TerrainType::Traversable,
                terrain: TerrainType::Caution,
            }
        );
        assert!(matches!(events[1], GridEvent::Removed { previous: TerrainType::Caution, .. }));
        assert_eq!(events[2], GridEvent::Reset);
        assert!(grid.drain_events().is_empty());
    }

    #[test]
    fn test_world_bounds() {
        let grid = grid();
        let bounds = grid.world_bounds();
        assert_eq!(bounds.min, Vec3::splat(-1.0));
        assert_eq!(bounds.max, Vec3::splat(1.0));
        assert!(bounds.contains_point(grid.index_to_world(IVec3::splat(7))));
    }
}
