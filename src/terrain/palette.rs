//! Display colours for terrain labels.
//!
//! Labels carry no visual data; renderers look colours up here.

use super::types::TerrainType;

/// Pack RGB888 into RGB565
pub fn rgb_to_565(r: u8, g: u8, b: u8) -> u16 {
    let r5 = (r as u16 >> 3) & 0x1F;
    let g6 = (g as u16 >> 2) & 0x3F;
    let b5 = (b as u16 >> 3) & 0x1F;
    (r5 << 11) | (g6 << 5) | b5
}

/// RGBA colour for one label
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabelColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl LabelColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Colour packed as RGB565 (alpha dropped)
    pub fn to_565(self) -> u16 {
        rgb_to_565(self.r, self.g, self.b)
    }
}

/// Lookup table from label to colour
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TerrainPalette {
    pub traversable: LabelColor,
    pub caution: LabelColor,
    pub non_traversable: LabelColor,
}

impl Default for TerrainPalette {
    fn default() -> Self {
        // Half-transparent so the scene stays visible under the overlay
        Self {
            traversable: LabelColor::new(0, 200, 0, 128),
            caution: LabelColor::new(255, 200, 0, 128),
            non_traversable: LabelColor::new(220, 0, 0, 128),
        }
    }
}

impl TerrainPalette {
    pub fn color(&self, terrain: TerrainType) -> LabelColor {
        match terrain {
            TerrainType::Traversable => self.traversable,
            TerrainType::Caution => self.caution,
            TerrainType::NonTraversable => self.non_traversable,
        }
    }
}
