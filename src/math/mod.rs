//! Mathematical utilities and data structures

pub mod aabb;
pub mod vector;

pub use aabb::Aabb;
pub use vector::Vector3;
