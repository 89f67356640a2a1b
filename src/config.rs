use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Where node files and textures are looked up.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssetRoots {
    /// Root for `@local` paths and area files
    pub local_root: PathBuf,
    /// Root for `@resource` paths and resource textures
    pub resource_root: PathBuf,
}

impl Default for AssetRoots {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from("data"),
            resource_root: PathBuf::from("assets"),
        }
    }
}

/// Physics constants, in cells and seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration, cells per second squared
    pub gravity: f32,
    /// Floor for falling speed; negative
    pub terminal_velocity: f32,
    /// Simulation step length, seconds
    pub fixed_step: f32,
    /// Probe distance for ground checks
    pub ground_precision: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 30.0,
            terminal_velocity: -40.0,
            fixed_step: 1.0 / 60.0,
            ground_precision: 0.05,
        }
    }
}

/// Top-level engine settings, read from a JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pixels per cell
    pub tile_size: u32,
    /// Lookup roots for node files and textures
    pub assets: AssetRoots,
    /// Constants for [`crate::PhysicsEngine`]
    pub physics: PhysicsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_size: 32,
            assets: AssetRoots::default(),
            physics: PhysicsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Read the config at `path`; absent fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing engine config {}", path.display()))?;
        log::debug!("engine config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{ "tile_size": 16, "physics": { "gravity": 10.0 } }"#).unwrap();
        assert_eq!(cfg.tile_size, 16);
        assert_eq!(cfg.physics.gravity, 10.0);
        assert_eq!(cfg.physics.terminal_velocity, -40.0);
        assert_eq!(cfg.assets, AssetRoots::default());
    }

    #[test]
    fn load_reports_path_on_bad_json() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "{{ not json")?;
        let err = EngineConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing engine config"));
        Ok(())
    }
}
