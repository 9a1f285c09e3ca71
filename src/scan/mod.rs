//! Scan orchestration: pulls point clouds, classifies them and applies the
//! labels to a shared voxel grid.

pub mod config;
pub mod source;
pub mod plane;
pub mod driver;
pub mod synthetic;

pub use config::ScanConfig;
pub use source::{PointSource, StaticSource};
pub use plane::PlaneObservation;
pub use driver::{ScanDriver, ScanHandle, ScanReport};
pub use synthetic::SyntheticTerrain;

use crate::math::Vector3;

/// Evenly thin `points` to at most `max_points` for display, keeping order.
pub fn downsample_for_render(points: &[Vector3], max_points: usize) -> Vec<Vector3> {
    if max_points == 0 {
        return Vec::new();
    }
    if points.len() <= max_points {
        return points.to_vec();
    }
    let stride = points.len().div_ceil(max_points);
    points.iter().step_by(stride).copied().collect()
}
