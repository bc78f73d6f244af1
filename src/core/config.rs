//! Terrain map configuration

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::terrain::lod::{DetailRanges, LodSettings};

/// Default distance thresholds for detail indices 0..4
pub const DEFAULT_DETAIL_RANGES: [f32; 4] = [100.0, 1500.0, 3000.0, 10000.0];

/// Configuration for a dynamic terrain map
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World-space center of the terrain
    pub position: [f32; 3],
    /// Edge length of a square chunk, in height-field cells
    pub chunk_size: u32,
    /// Ascending distance thresholds; index `i` covers distances below `detail_ranges[i]`
    pub detail_ranges: Vec<f32>,
    /// Altitude below which a viewpoint directly over a chunk forces full detail
    pub hover_range: f32,
    /// Keep chunks beyond the last threshold at the coarsest detail instead of hiding them
    pub show_farthest: bool,
    /// Number of background build workers
    pub worker_count: usize,
    /// Build meshes on background workers; when false they are built on the calling thread
    pub use_workers: bool,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            chunk_size: 500,
            detail_ranges: DEFAULT_DETAIL_RANGES.to_vec(),
            hover_range: 500.0,
            show_farthest: false,
            worker_count: 2,
            use_workers: true,
        }
    }
}

impl TerrainConfig {
    /// World-space center of the terrain
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Check every field, returning the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.use_workers && self.worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.hover_range < 0.0 {
            return Err(ConfigError::NegativeHoverRange(self.hover_range));
        }
        DetailRanges::new(self.detail_ranges.clone())?;
        Ok(())
    }

    /// Validated LOD selection settings
    pub fn lod_settings(&self) -> Result<LodSettings, ConfigError> {
        self.validate()?;
        Ok(LodSettings {
            ranges: DetailRanges::new(self.detail_ranges.clone())?,
            hover_range: self.hover_range,
            show_farthest: self.show_farthest,
        })
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;

    #[test]
    fn test_default_config_is_valid() {
        let config = TerrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.detail_ranges, vec![100.0, 1500.0, 3000.0, 10000.0]);
        assert_eq!(config.worker_count, 2);
        assert!(!config.show_farthest);
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let config = TerrainConfig { chunk_size: 0, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroChunkSize));

        let config = TerrainConfig { worker_count: 0, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroWorkers));

        // Zero workers is fine on the inline path
        let config = TerrainConfig { worker_count: 0, use_workers: false, ..Default::default() };
        assert!(config.validate().is_ok());

        let config = TerrainConfig { detail_ranges: vec![100.0, 50.0], ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonAscendingDetailRanges { index: 1, .. })
        ));

        let config = TerrainConfig { hover_range: -1.0, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::NegativeHoverRange(-1.0)));
    }

    #[test]
    fn test_lod_settings_carry_flags() {
        let config = TerrainConfig {
            hover_range: 42.0,
            show_farthest: true,
            ..Default::default()
        };
        let lod = config.lod_settings().unwrap();
        assert_eq!(lod.hover_range, 42.0);
        assert!(lod.show_farthest);
        assert_eq!(lod.ranges.len(), 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps").join("terrain.json");

        let config = TerrainConfig {
            chunk_size: 256,
            detail_ranges: vec![50.0, 400.0],
            worker_count: 4,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = TerrainConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "chunk_size": 128, "show_farthest": true }"#).unwrap();

        let loaded = TerrainConfig::load(&path).unwrap();
        assert_eq!(loaded.chunk_size, 128);
        assert!(loaded.show_farthest);
        assert_eq!(loaded.detail_ranges, DEFAULT_DETAIL_RANGES.to_vec());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "detail_ranges": [] }"#).unwrap();

        let err = TerrainConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::EmptyDetailRanges)));

        let missing = dir.path().join("missing.json");
        assert!(matches!(TerrainConfig::load(&missing), Err(Error::Io(_))));
    }
}
