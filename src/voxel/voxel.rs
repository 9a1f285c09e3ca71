//! Voxel data type

use crate::terrain::TerrainType;

/// An occupied grid cell.
///
/// A voxel holds exactly one label. Empty cells are represented by absence
/// (`Option::None` in the grid), never by a voxel in an "empty" state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Voxel {
    /// Identity assigned at creation; a replaced voxel gets a new id
    pub id: u64,
    /// Terrain label
    pub terrain: TerrainType,
}

impl Voxel {
    pub fn new(id: u64, terrain: TerrainType) -> Self {
        Self { id, terrain }
    }
}
