//! Serializable grid snapshots for downstream consumers such as path planners.

use std::path::Path;

use glam::{IVec3, UVec3};
use serde::{Deserialize, Serialize};

use super::grid::VoxelGridManager;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::terrain::TerrainType;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// One occupied cell
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoxelRecord {
    /// Grid index `(i, j, k)`
    pub index: [i32; 3],
    /// World-space cell centre
    pub position: [f32; 3],
    pub terrain: TerrainType,
}

/// Every occupied cell of a grid plus the grid's shape
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub version: u32,
    pub dimensions: [u32; 3],
    pub voxel_size: f32,
    pub voxels: Vec<VoxelRecord>,
}

impl GridSnapshot {
    /// Save as pretty JSON, creating parent directories as needed
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON, rejecting unknown format versions
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let snapshot: GridSnapshot = serde_json::from_str(&json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snapshot)
    }
}

impl VoxelGridManager {
    /// Capture every occupied cell
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            version: SNAPSHOT_VERSION,
            dimensions: self.dimensions().to_array(),
            voxel_size: self.voxel_size(),
            voxels: self
                .occupied()
                .map(|(index, position, terrain)| VoxelRecord {
                    index: index.to_array(),
                    position: position.to_array(),
                    terrain,
                })
                .collect(),
        }
    }

    /// Replace the grid contents with a snapshot.
    ///
    /// The snapshot must have been taken from a grid with the same dimensions
    /// and voxel size, and every index must be in range. On error the grid is
    /// left untouched.
    pub fn restore(&mut self, snapshot: &GridSnapshot) -> Result<()> {
        if UVec3::from_array(snapshot.dimensions) != self.dimensions()
            || snapshot.voxel_size != self.voxel_size()
        {
            return Err(Error::Snapshot(format!(
                "snapshot grid {:?} @ {}m does not match {:?} @ {}m",
                snapshot.dimensions,
                snapshot.voxel_size,
                self.dimensions().to_array(),
                self.voxel_size()
            )));
        }

        if let Some(bad) = snapshot
            .voxels
            .iter()
            .find(|record| !self.is_valid_index(IVec3::from_array(record.index)))
        {
            return Err(Error::Snapshot(format!(
                "voxel index {:?} outside grid",
                bad.index
            )));
        }

        self.reset();
        for record in &snapshot.voxels {
            self.update_voxel_at(IVec3::from_array(record.index), record.terrain);
        }

        log::info!("Restored {} voxels from snapshot", snapshot.voxels.len());
        Ok(())
    }
}
