//! Horizontal grid clustering of point clouds.
//!
//! Points are grouped by the (x, z) cell they fall in. A cluster lives for a
//! single classification pass; nothing is carried between calls.

use std::collections::HashMap;

use glam::IVec2;

use crate::math::Vector3;

/// A transient group of points sharing one horizontal cell
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    /// `(floor(x / cell_size), floor(z / cell_size))`
    pub key: IVec2,
    /// Points in encounter order
    pub points: Vec<Vector3>,
}

impl Cluster {
    /// Surface normal of the plane through the first three points.
    ///
    /// Returns `None` with fewer than three points or when those points are
    /// collinear (the cross product has zero length).
    pub fn surface_normal(&self) -> Option<Vector3> {
        let [a, b, c] = self.points.get(..3)? else {
            return None;
        };
        let normal = (*b - *a).cross(*c - *a);
        if normal.length() == 0.0 {
            return None;
        }
        Some(normal.normalized())
    }

    /// Vertical span `max(y) - min(y)` of the cluster's points
    pub fn height_variation(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        let (min_y, max_y) = self.points.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(lo, hi), p| (lo.min(p.y), hi.max(p.y)),
        );
        max_y - min_y
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Horizontal cell key for a point, or `None` when a coordinate is too far
/// from the origin for its cell index to fit in an `i32`
#[inline]
pub fn cluster_key(point: Vector3, cell_size: f32) -> Option<IVec2> {
    let axis = |coord: f32| -> Option<i32> {
        let cell = (coord / cell_size).floor();
        // i32::MIN is exact in f32; i32::MAX is not, so bound by 2^31
        (cell >= i32::MIN as f32 && cell < 2_147_483_648.0).then_some(cell as i32)
    };
    Some(IVec2::new(axis(point.x)?, axis(point.z)?))
}

/// Partition points into horizontal cells of `cell_size`.
///
/// Non-finite points and points whose cell index is out of `i32` range are
/// dropped. Clusters come back sorted by key so the
/// output is independent of hash iteration order.
pub fn cluster_points(points: &[Vector3], cell_size: f32) -> Vec<Cluster> {
    let mut cells: HashMap<IVec2, Vec<Vector3>> = HashMap::new();
    let mut dropped = 0usize;

    for &point in points {
        let key = if point.is_finite() { cluster_key(point, cell_size) } else { None };
        match key {
            Some(key) => cells.entry(key).or_default().push(point),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        log::trace!("Dropped {} unusable points before clustering", dropped);
    }

    let mut clusters: Vec<Cluster> = cells
        .into_iter()
        .map(|(key, points)| Cluster { key, points })
        .collect();
    clusters.sort_unstable_by_key(|c| (c.key.x, c.key.y));
    clusters
}
