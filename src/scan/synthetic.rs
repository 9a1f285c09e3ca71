//! Deterministic synthetic point clouds for demos, benches and tests.
//!
//! The patch is split along x into four bands of equal width:
//! a raised obstacle, low debris, a gently rough floor and a 30 degree ramp.
//! Points are emitted per clustering tile, three corners first, so every tile
//! has a well-conditioned surface normal.

use noise::{NoiseFn, Perlin};

use super::source::PointSource;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::Vector3;
use crate::terrain::TerrainType;

/// Height of the centre point in an obstacle tile (m)
const OBSTACLE_HEIGHT: f32 = 0.30;
/// Height of the centre point in a debris tile (m)
const DEBRIS_HEIGHT: f32 = 0.10;
/// Peak floor roughness (m)
const ROUGHNESS: f32 = 0.005;
/// Noise frequency (cycles per meter)
const ROUGHNESS_FREQUENCY: f64 = 2.0;
const RAMP_DEGREES: f32 = 30.0;

/// Largest cloud `SyntheticTerrain::new` accepts (points)
pub const MAX_SYNTHETIC_POINTS: usize = 1 << 24;

/// Sample offsets within a tile, as fractions of the tile size
const TILE_PATTERN: [(f32, f32); 5] = [(0.2, 0.2), (0.8, 0.2), (0.2, 0.8), (0.8, 0.8), (0.5, 0.5)];

/// Which band a tile belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticRegion {
    Obstacle,
    Debris,
    Floor,
    Ramp,
}

impl SyntheticRegion {
    /// Label the default classifier should assign to this band
    pub fn expected_terrain(self) -> TerrainType {
        match self {
            SyntheticRegion::Obstacle | SyntheticRegion::Ramp => TerrainType::NonTraversable,
            SyntheticRegion::Debris => TerrainType::Caution,
            SyntheticRegion::Floor => TerrainType::Traversable,
        }
    }
}

/// Square patch of synthetic terrain centred on the origin
pub struct SyntheticTerrain {
    /// Tiles from the centre to each edge
    tiles_per_side: i32,
    tile_size: f32,
    noise: Perlin,
}

impl SyntheticTerrain {
    /// Patch spanning `[-half_extent, half_extent)` on x and z, tiled at `tile_size`
    /// (normally the classifier's cluster cell size).
    ///
    /// Fails if either size is not positive and finite, or if the patch would
    /// hold more than [`MAX_SYNTHETIC_POINTS`].
    pub fn new(half_extent: f32, tile_size: f32, seed: u32) -> Result<Self> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(Error::Config(format!(
                "synthetic tile_size must be positive, got {}",
                tile_size
            )));
        }
        if !half_extent.is_finite() || half_extent <= 0.0 {
            return Err(Error::Config(format!(
                "synthetic half_extent must be positive, got {}",
                half_extent
            )));
        }

        let tiles = (half_extent / tile_size).round().max(2.0);
        let max_tiles = ((MAX_SYNTHETIC_POINTS / TILE_PATTERN.len()) as f32).sqrt() / 2.0;
        if tiles > max_tiles {
            return Err(Error::Config(format!(
                "synthetic patch of half extent {}m at {}m tiles exceeds {} points",
                half_extent, tile_size, MAX_SYNTHETIC_POINTS
            )));
        }

        Ok(Self {
            tiles_per_side: tiles as i32,
            tile_size,
            noise: Perlin::new(seed),
        })
    }

    /// Band of the tile containing world x
    pub fn region_at(&self, x: f32) -> SyntheticRegion {
        self.region_for_tile((x / self.tile_size).floor() as i32)
    }

    fn region_for_tile(&self, tile_x: i32) -> SyntheticRegion {
        let quarter = self.tiles_per_side / 2;
        if tile_x < -quarter {
            SyntheticRegion::Obstacle
        } else if tile_x < 0 {
            SyntheticRegion::Debris
        } else if tile_x < quarter {
            SyntheticRegion::Floor
        } else {
            SyntheticRegion::Ramp
        }
    }

    fn roughness(&self, x: f32, z: f32) -> f32 {
        let sample = self.noise.get([x as f64 * ROUGHNESS_FREQUENCY, z as f64 * ROUGHNESS_FREQUENCY]);
        (sample as f32) * ROUGHNESS
    }

    /// Number of points `generate` returns
    pub fn point_count(&self) -> usize {
        let side = self.tiles_per_side as usize * 2;
        side.checked_mul(side)
            .and_then(|n| n.checked_mul(TILE_PATTERN.len()))
            .unwrap_or(usize::MAX)
    }

    /// Generate the full cloud
    pub fn generate(&self) -> Vec<Vector3> {
        let n = self.tiles_per_side;
        let ramp_start = (n / 2) as f32 * self.tile_size;
        let ramp_slope = RAMP_DEGREES.to_radians().tan();

        let mut points = Vec::with_capacity(self.point_count());
        for tile_z in -n..n {
            for tile_x in -n..n {
                let region = self.region_for_tile(tile_x);
                let origin_x = tile_x as f32 * self.tile_size;
                let origin_z = tile_z as f32 * self.tile_size;

                for (i, &(fx, fz)) in TILE_PATTERN.iter().enumerate() {
                    let x = origin_x + fx * self.tile_size;
                    let z = origin_z + fz * self.tile_size;
                    let base = self.roughness(x, z);
                    let centre = i == TILE_PATTERN.len() - 1;

                    let y = match region {
                        SyntheticRegion::Obstacle if centre => base + OBSTACLE_HEIGHT,
                        SyntheticRegion::Debris if centre => base + DEBRIS_HEIGHT,
                        SyntheticRegion::Ramp => base + (x - ramp_start) * ramp_slope,
                        _ => base,
                    };
                    points.push(Vector3::new(x, y, z));
                }
            }
        }
        points
    }
}

impl PointSource for SyntheticTerrain {
    fn points(&self) -> Vec<Vector3> {
        self.generate()
    }
}
