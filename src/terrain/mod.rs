//! Terrain classification of raw point clouds

pub mod types;
pub use types::{ObstacleSize, TerrainType};

pub mod cluster;
pub use cluster::{cluster_points, Cluster};

pub mod analyzer;
pub use analyzer::{AnalyzerParams, TerrainAnalyzer};

pub mod palette;
pub use palette::TerrainPalette;
