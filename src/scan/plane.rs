//! Detected planes applied directly to the grid.
//!
//! A plane labels a rectangular footprint of cells around its centre: one
//! update per `voxel_size` step along x and z, `floor(extent / voxel_size)`
//! steps per axis, all at the plane's height.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::math::{Aabb, Vector3};
use crate::terrain::{TerrainAnalyzer, TerrainType};
use crate::voxel::VoxelGridManager;

/// A plane reported by the sensor
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneObservation {
    /// World-space centre
    pub center: Vector3,
    /// Size along world x and z, in meters
    pub extent: [f32; 2],
    /// Surface normal as reported (not re-oriented)
    pub normal: Vector3,
}

impl PlaneObservation {
    /// A floor-like plane facing up
    pub fn horizontal(center: Vector3, extent_x: f32, extent_z: f32) -> Self {
        Self {
            center,
            extent: [extent_x, extent_z],
            normal: Vector3::UP,
        }
    }

    /// World-space rectangle covered by the plane (zero height)
    pub fn footprint(&self) -> Aabb {
        let size = glam::Vec3::new(self.extent[0], 0.0, self.extent[1]);
        Aabb::from_center_size(self.center.to_vec3(), size)
    }

    /// Label for the whole plane: too steep is `NonTraversable`, otherwise `Traversable`.
    ///
    /// Sensor normals are oriented, so a downward-facing plane counts as steep.
    pub fn label(&self, analyzer: &TerrainAnalyzer, reference_normal: Vector3) -> TerrainType {
        let angle = TerrainAnalyzer::angle_between_vectors(self.normal, reference_normal);
        if angle > analyzer.params().max_traversable_slope_degrees {
            TerrainType::NonTraversable
        } else {
            TerrainType::Traversable
        }
    }
}

/// Number of whole `step`-sized cells along an extent
fn step_count(extent: f32, step: f32) -> u32 {
    let steps = (extent / step).floor();
    if steps.is_finite() && steps > 0.0 { steps as u32 } else { 0 }
}

/// Steps `r` in `0..steps` for which `start + r * step` lies in `[lo, hi)`
fn clipped_steps(start: f32, step: f32, steps: u32, lo: f32, hi: f32) -> Range<u32> {
    let first = ((lo - start) / step).ceil().max(0.0);
    let last = ((hi - start) / step).ceil().min(steps as f32);
    if first < last { first as u32..last as u32 } else { 0..0 }
}

/// Label the plane's footprint. Returns the number of cells that changed.
pub fn apply_plane(
    grid: &mut VoxelGridManager,
    analyzer: &TerrainAnalyzer,
    plane: &PlaneObservation,
    reference_normal: Vector3,
) -> usize {
    if !plane.center.is_finite() {
        return 0;
    }
    let Some(region) = plane.footprint().intersection(&grid.world_bounds()) else {
        return 0;
    };

    let size = grid.voxel_size();
    let steps_x = step_count(plane.extent[0], size);
    let steps_z = step_count(plane.extent[1], size);
    if steps_x == 0 || steps_z == 0 {
        return 0;
    }

    let terrain = plane.label(analyzer, reference_normal);

    // Centre the walked lattice on the plane centre
    let start_x = plane.center.x - (steps_x - 1) as f32 * size * 0.5;
    let start_z = plane.center.z - (steps_z - 1) as f32 * size * 0.5;
    let rows = clipped_steps(start_x, size, steps_x, region.min.x, region.max.x);
    let cols = clipped_steps(start_z, size, steps_z, region.min.z, region.max.z);

    let mut changed = 0;
    for row in rows {
        for col in cols.clone() {
            let position = Vector3::new(
                start_x + row as f32 * size,
                plane.center.y,
                start_z + col as f32 * size,
            );
            if grid.update_voxel(position, terrain).is_change() {
                changed += 1;
            }
        }
    }

    log::trace!(
        "Plane at {:?} ({}x{} steps) labelled {} cells {}",
        plane.center,
        steps_x,
        steps_z,
        changed,
        terrain
    );
    changed
}
