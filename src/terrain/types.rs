//! Terrain labels

use serde::{Deserialize, Serialize};

/// Traversability label assigned to a cluster of points or a voxel.
///
/// Pure data: any display attribute lives in [`TerrainPalette`](super::TerrainPalette).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainType {
    Traversable,
    Caution,
    NonTraversable,
}

impl TerrainType {
    /// Every label, in order of increasing severity
    pub const ALL: [TerrainType; 3] = [
        TerrainType::Traversable,
        TerrainType::Caution,
        TerrainType::NonTraversable,
    ];

    /// Rank used when several labels compete for the same cell; higher wins.
    pub fn severity(self) -> u8 {
        match self {
            TerrainType::Traversable => 0,
            TerrainType::Caution => 1,
            TerrainType::NonTraversable => 2,
        }
    }

    /// The more severe of two labels
    pub fn most_severe(self, other: TerrainType) -> TerrainType {
        if other.severity() > self.severity() { other } else { self }
    }

    pub fn name(self) -> &'static str {
        match self {
            TerrainType::Traversable => "traversable",
            TerrainType::Caution => "caution",
            TerrainType::NonTraversable => "non_traversable",
        }
    }
}

impl std::fmt::Display for TerrainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse obstacle size derived from a height variation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleSize {
    Small,
    Large,
}
