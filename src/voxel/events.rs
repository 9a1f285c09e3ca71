//! Grid change notifications for rendering collaborators

use glam::{IVec3, Vec3};

use crate::terrain::TerrainType;

/// A single change to the voxel grid.
///
/// `position` is the world-space centre of the affected cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GridEvent {
    /// A label was placed in an empty cell
    Created {
        index: IVec3,
        position: Vec3,
        terrain: TerrainType,
    },
    /// An occupied cell changed label
    Replaced {
        index: IVec3,
        position: Vec3,
        previous: TerrainType,
        terrain: TerrainType,
    },
    /// A single cell was cleared
    Removed {
        index: IVec3,
        position: Vec3,
        previous: TerrainType,
    },
    /// Every cell was cleared
    Reset,
}

impl GridEvent {
    /// Label now present at the affected cell, if any
    pub fn terrain(&self) -> Option<TerrainType> {
        match self {
            GridEvent::Created { terrain, .. } | GridEvent::Replaced { terrain, .. } => Some(*terrain),
            GridEvent::Removed { .. } | GridEvent::Reset => None,
        }
    }
}
