//! Terravox - incremental terrain classification onto a bounded voxel grid

pub mod core;
pub mod math;
pub mod terrain;
pub mod voxel;
pub mod scan;
