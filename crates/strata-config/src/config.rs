//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub terrain: TerrainConfig,
    pub lod: LodConfig,
    pub camera: CameraConfig,
    pub bvh: BvhSection,
    pub debug: DebugConfig,
}

/// Height raster source and world placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// 8-bit grayscale PNG to load. Synthesized from noise when unset.
    pub heightmap: Option<PathBuf>,
    /// Synthesized raster width in samples.
    pub synth_width: u32,
    /// Synthesized raster height in samples.
    pub synth_height: u32,
    /// Noise seed for synthesis.
    pub seed: u32,
    /// World position of raster sample (0, 0) at elevation 0.
    pub world_min: [f32; 3],
    /// World extent along x, elevation, z.
    pub world_size: [f32; 3],
}

/// Quadtree shape and distance banding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Leaf node size in samples (power of two).
    pub leaf_size: u32,
    /// Number of LOD levels.
    pub lod_count: u32,
    /// Width ratio between consecutive distance bands.
    pub lod_distance_ratio: f32,
    /// Fraction of a band after which morphing starts.
    pub morph_start_ratio: f32,
    /// Order selected nodes front to back.
    pub sort_by_distance: bool,
}

/// Camera projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub near: f32,
    pub far: f32,
    pub fov_y_degrees: f32,
    pub aspect: f32,
}

/// LBVH builder tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BvhSection {
    pub reduction_group_size: u32,
    pub sort_group_size: u32,
    /// Validate intermediate data. `None` validates in debug builds only.
    pub validate: Option<bool>,
    /// CPU worker threads. `None` uses all cores but two.
    pub worker_threads: Option<usize>,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a top-down PNG of the last frame's selection here.
    pub selection_image: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            heightmap: None,
            synth_width: 1025,
            synth_height: 1025,
            seed: 42,
            world_min: [0.0, 0.0, 0.0],
            world_size: [2048.0, 300.0, 2048.0],
        }
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            leaf_size: 8,
            lod_count: 6,
            lod_distance_ratio: 2.0,
            morph_start_ratio: 0.66,
            sort_by_distance: false,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            near: 1.0,
            far: 4000.0,
            fov_y_degrees: 60.0,
            aspect: 16.0 / 9.0,
        }
    }
}

impl Default for BvhSection {
    fn default() -> Self {
        Self {
            reduction_group_size: 512,
            sort_group_size: 512,
            validate: None,
            worker_threads: None,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            selection_image: None,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Platform config directory for this tool, e.g. `~/.config/strata`.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join("strata"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE), serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let contents =
            std::fs::read_to_string(config_dir.join(CONFIG_FILE)).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("leaf_size: 8"));
        assert!(ron_str.contains("reduction_group_size: 512"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.terrain.heightmap = Some(PathBuf::from("maps/alps.png"));
        config.bvh.validate = Some(true);
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let config: Config = ron::from_str("(lod: (lod_count: 4))").unwrap();
        assert_eq!(config.lod.lod_count, 4);
        assert_eq!(config.lod.leaf_size, 8);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.camera.far = 12_000.0;
        config.debug.selection_image = Some(PathBuf::from("out.png"));

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.lod.lod_count = 8;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.lod.lod_count), Some(8));
        assert!(modified.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
