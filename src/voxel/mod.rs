//! Voxel grid storing one terrain label per occupied cell

pub mod voxel;
pub mod events;
pub mod grid;
pub mod snapshot;

pub use voxel::Voxel;
pub use events::GridEvent;
pub use grid::{GridConfig, TerrainCounts, VoxelGridManager, VoxelUpdate};
pub use snapshot::{GridSnapshot, VoxelRecord};
