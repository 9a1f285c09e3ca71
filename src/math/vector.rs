//! Exact-key 3D vector
//!
//! `Vector3` is a plain `f32` triple used wherever a point has to act as a map key.
//! Equality and hashing compare components exactly, with no epsilon: two points
//! computed along slightly different float paths are different keys. Prefer the
//! integer grid index when grouping points spatially; see
//! [`VoxelGridManager::apply_labels`](crate::voxel::grid::VoxelGridManager::apply_labels).
//!
//! Arithmetic delegates to `glam::Vec3`.

use std::hash::{Hash, Hasher};
use std::ops::{Add, Div, Mul, Neg, Sub};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 3D vector with exact component equality
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);
    pub const UP: Vector3 = Vector3::new(0.0, 1.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Convert to a glam vector for arithmetic
    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Euclidean length
    pub fn length(self) -> f32 {
        self.to_vec3().length()
    }

    /// Unit vector in the same direction.
    ///
    /// A zero-length vector is returned unchanged rather than producing NaNs.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            return self;
        }
        self / len
    }

    pub fn dot(self, other: Self) -> f32 {
        self.to_vec3().dot(other.to_vec3())
    }

    pub fn cross(self, other: Self) -> Self {
        self.to_vec3().cross(other.to_vec3()).into()
    }

    /// Distance between two points
    pub fn distance(self, to: Self) -> f32 {
        self.to_vec3().distance(to.to_vec3())
    }

    /// True when no component is NaN or infinite
    pub fn is_finite(self) -> bool {
        self.to_vec3().is_finite()
    }
}

// Exact comparison. NaN components break reflexivity, so callers drop non-finite
// points before using them as keys.
impl Eq for Vector3 {}

impl Hash for Vector3 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Adding 0.0 folds -0.0 into +0.0 so values that compare equal hash equal.
        (self.x + 0.0).to_bits().hash(state);
        (self.y + 0.0).to_bits().hash(state);
        (self.z + 0.0).to_bits().hash(state);
    }
}

impl From<Vec3> for Vector3 {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vector3> for Vec3 {
    fn from(v: Vector3) -> Self {
        v.to_vec3()
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vector3> for [f32; 3] {
    fn from(v: Vector3) -> Self {
        [v.x, v.y, v.z]
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        (self.to_vec3() + rhs.to_vec3()).into()
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        (self.to_vec3() - rhs.to_vec3()).into()
    }
}

impl Mul<f32> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: f32) -> Vector3 {
        (self.to_vec3() * rhs).into()
    }
}

impl Div<f32> for Vector3 {
    type Output = Vector3;

    fn div(self, rhs: f32) -> Vector3 {
        (self.to_vec3() / rhs).into()
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Vector3 {
        (-self.to_vec3()).into()
    }
}
