//! Point cloud providers

use std::sync::{Mutex, PoisonError};

use super::plane::PlaneObservation;
use crate::math::Vector3;

/// Supplies world-frame samples on demand, once per scan cycle.
pub trait PointSource: Send + Sync {
    /// Current point cloud snapshot
    fn points(&self) -> Vec<Vector3>;

    /// Planes detected by the sensor, if it reports any
    fn planes(&self) -> Vec<PlaneObservation> {
        Vec::new()
    }
}

/// A source backed by in-memory data that callers can swap between cycles.
#[derive(Debug, Default)]
pub struct StaticSource {
    points: Mutex<Vec<Vector3>>,
    planes: Mutex<Vec<PlaneObservation>>,
}

impl StaticSource {
    pub fn new(points: Vec<Vector3>) -> Self {
        Self {
            points: Mutex::new(points),
            planes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_planes(mut self, planes: Vec<PlaneObservation>) -> Self {
        self.planes = Mutex::new(planes);
        self
    }

    /// Replace the points returned by subsequent cycles
    pub fn set_points(&self, points: Vec<Vector3>) {
        *self.points.lock().unwrap_or_else(PoisonError::into_inner) = points;
    }

    /// Replace the planes returned by subsequent cycles
    pub fn set_planes(&self, planes: Vec<PlaneObservation>) {
        *self.planes.lock().unwrap_or_else(PoisonError::into_inner) = planes;
    }
}

impl PointSource for StaticSource {
    fn points(&self) -> Vec<Vector3> {
        self.points.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn planes(&self) -> Vec<PlaneObservation> {
        self.planes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
