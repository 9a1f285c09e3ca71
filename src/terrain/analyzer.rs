//! Point cloud terrain classifier.
//!
//! Points are clustered on a horizontal grid. Each cluster with a usable
//! surface normal gets one label from two tests:
//!
//! 1. Slope: angle between the cluster normal and the reference "up" vector.
//!    Anything steeper than `max_traversable_slope_degrees` is `NonTraversable`.
//! 2. Height variation: vertical span of the cluster's points, bucketed into
//!    `Traversable` / `Caution` / `NonTraversable`.
//!
//! Clusters that are too small or degenerate contribute nothing.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::cluster::{cluster_points, Cluster};
use super::types::{ObstacleSize, TerrainType};
use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::Vector3;

/// Steepest slope, in degrees, still considered traversable
pub const MAX_TRAVERSABLE_SLOPE_DEGREES: f32 = 20.0;

/// Height variation (m) below which a cluster is flat enough to cross
pub const MAX_SMALL_OBSTACLE_HEIGHT: f32 = 0.05;

/// Height variation (m) at or above which a cluster is a blocking obstacle
pub const MIN_LARGE_OBSTACLE_HEIGHT: f32 = 0.20;

/// Horizontal clustering pitch (m)
pub const CLUSTER_CELL_SIZE: f32 = 0.10;

/// Thresholds used by [`TerrainAnalyzer`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerParams {
    pub max_traversable_slope_degrees: f32,
    pub max_small_obstacle_height: f32,
    pub min_large_obstacle_height: f32,
    pub cluster_cell_size: f32,
}

impl Default for AnalyzerParams {
    fn default() -> Self {
        Self {
            max_traversable_slope_degrees: MAX_TRAVERSABLE_SLOPE_DEGREES,
            max_small_obstacle_height: MAX_SMALL_OBSTACLE_HEIGHT,
            min_large_obstacle_height: MIN_LARGE_OBSTACLE_HEIGHT,
            cluster_cell_size: CLUSTER_CELL_SIZE,
        }
    }
}

impl AnalyzerParams {
    /// Check that thresholds are finite and consistently ordered
    pub fn validate(&self) -> Result<()> {
        let slope = self.max_traversable_slope_degrees;
        if !slope.is_finite() || slope <= 0.0 || slope > 180.0 {
            return Err(Error::Config(format!(
                "max_traversable_slope_degrees must be in (0, 180], got {}",
                slope
            )));
        }

        let small = self.max_small_obstacle_height;
        let large = self.min_large_obstacle_height;
        if !small.is_finite() || !large.is_finite() || small < 0.0 || large < small {
            return Err(Error::Config(format!(
                "obstacle heights must satisfy 0 <= small <= large, got small={} large={}",
                small, large
            )));
        }

        let cell = self.cluster_cell_size;
        if !cell.is_finite() || cell <= 0.0 {
            return Err(Error::Config(format!(
                "cluster_cell_size must be positive, got {}",
                cell
            )));
        }

        Ok(())
    }
}

/// Stateless terrain classifier.
///
/// Parameters are fixed at construction; `classify` is a pure function of its
/// inputs, so repeated calls with the same points give the same mapping.
#[derive(Clone, Debug, Default)]
pub struct TerrainAnalyzer {
    params: AnalyzerParams,
}

impl TerrainAnalyzer {
    /// Create an analyzer with validated parameters
    pub fn new(params: AnalyzerParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &AnalyzerParams {
        &self.params
    }

    /// Label every point that belongs to a classifiable cluster.
    ///
    /// Points in clusters with fewer than three points or a degenerate normal
    /// are absent from the result. An empty result means "insufficient data".
    pub fn classify(
        &self,
        points: &[Vector3],
        reference_normal: Vector3,
    ) -> HashMap<Vector3, TerrainType> {
        if points.is_empty() {
            return HashMap::new();
        }
        if !reference_normal.is_finite() || reference_normal.length() == 0.0 {
            log::warn!("Unusable reference normal {:?}, skipping classification", reference_normal);
            return HashMap::new();
        }

        let clusters = cluster_points(points, self.params.cluster_cell_size);

        // Cluster keys are disjoint, so labelling them in parallel cannot race
        // on a point; `collect` keeps the sorted cluster order.
        let labelled: Vec<(&Cluster, TerrainType)> = clusters
            .par_iter()
            .filter_map(|cluster| {
                self.classify_cluster(cluster, reference_normal)
                    .map(|terrain| (cluster, terrain))
            })
            .collect();

        let mut result = HashMap::with_capacity(points.len());
        for (cluster, terrain) in &labelled {
            for &point in &cluster.points {
                result.insert(point, *terrain);
            }
        }

        log::debug!(
            "Classified {} points: {} clusters, {} skipped, {} labels",
            points.len(),
            clusters.len(),
            clusters.len() - labelled.len(),
            result.len()
        );

        result
    }

    /// Label a single cluster, or `None` if it has no usable surface normal
    pub fn classify_cluster(&self, cluster: &Cluster, reference_normal: Vector3) -> Option<TerrainType> {
        let Some(mut normal) = cluster.surface_normal() else {
            log::trace!(
                "Skipping cluster {:?}: {} points, no usable normal",
                cluster.key,
                cluster.len()
            );
            return None;
        };

        // Winding of three unordered points is arbitrary; face the reference side.
        if normal.dot(reference_normal) < 0.0 {
            normal = -normal;
        }

        let slope = Self::angle_between_vectors(normal, reference_normal);
        if slope > self.params.max_traversable_slope_degrees {
            return Some(TerrainType::NonTraversable);
        }

        Some(self.classify_height(cluster.height_variation()))
    }

    /// Label from height variation alone. Both thresholds are strict `<`.
    pub fn classify_height(&self, height_variation: f32) -> TerrainType {
        if height_variation < self.params.max_small_obstacle_height {
            TerrainType::Traversable
        } else if height_variation < self.params.min_large_obstacle_height {
            TerrainType::Caution
        } else {
            TerrainType::NonTraversable
        }
    }

    /// Angle between two vectors in degrees, in `[0, 180]`.
    ///
    /// Returns 0 if either vector has zero length.
    pub fn angle_between_vectors(a: Vector3, b: Vector3) -> f32 {
        let denom = a.length() * b.length();
        if denom == 0.0 {
            return 0.0;
        }
        let cos = (a.dot(b) / denom).clamp(-1.0, 1.0);
        cos.acos().to_degrees()
    }

    /// `Large` at or above `min_large_obstacle_height`, otherwise `Small`
    pub fn identify_obstacle_size(&self, height_variation: f32) -> ObstacleSize {
        if height_variation >= self.params.min_large_obstacle_height {
            ObstacleSize::Large
        } else {
            ObstacleSize::Small
        }
    }
}
