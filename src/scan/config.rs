//! Scan configuration, persisted as JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::Vector3;
use crate::terrain::AnalyzerParams;
use crate::voxel::GridConfig;

/// Everything an integrator may tune. Values are read once at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Voxel grid shape
    pub grid: GridConfig,
    /// Classification thresholds
    pub analyzer: AnalyzerParams,
    /// "Up" direction slopes are measured against
    pub reference_normal: Vector3,
    /// Period of the automatic scan loop
    pub scan_interval_ms: u64,
    /// Cap on raw points handed to a point renderer
    pub max_render_points: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            analyzer: AnalyzerParams::default(),
            reference_normal: Vector3::UP,
            scan_interval_ms: 1000,
            max_render_points: 500,
        }
    }
}

impl ScanConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    /// Check every field without building anything
    pub fn validate(&self) -> Result<()> {
        self.analyzer.validate()?;

        if self.grid.dimensions.contains(&0) {
            return Err(Error::Config(format!(
                "grid dimensions must be non-zero, got {:?}",
                self.grid.dimensions
            )));
        }
        if !self.grid.voxel_size.is_finite() || self.grid.voxel_size <= 0.0 {
            return Err(Error::Config(format!(
                "voxel_size must be positive, got {}",
                self.grid.voxel_size
            )));
        }
        if !self.reference_normal.is_finite() || self.reference_normal.length() == 0.0 {
            return Err(Error::Config(format!(
                "reference_normal must be a non-zero finite vector, got {:?}",
                self.reference_normal
            )));
        }
        if self.scan_interval_ms == 0 {
            return Err(Error::Config("scan_interval_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Save as pretty JSON, creating parent directories as needed
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate. Missing fields take their defaults.
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: ScanConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}
