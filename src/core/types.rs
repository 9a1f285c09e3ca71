//! Core type aliases and re-exports

use std::sync::{Arc, Mutex};

pub use glam::{IVec2, IVec3, UVec3, Vec2, Vec3};

use crate::voxel::grid::VoxelGridManager;

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Grid handle shared between the periodic scan path and ad-hoc callers.
///
/// Every mutation goes through the mutex, so there is exactly one writer at a time.
pub type SharedGrid = Arc<Mutex<VoxelGridManager>>;
