//! Mixer configuration: the track catalog and asset cache location.
//!
//! Resolution order for `MixerConfig::resolve`:
//! 1. Explicit path from the caller
//! 2. `AMBIENT_MIXER_CONFIG` environment variable
//! 3. Built-in catalog (birds, rain, leaves, street)

use crate::asset_loader::AssetLoader;
use crate::error::{Error, Result};
use crate::state::{Track, DEFAULT_VOLUME};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming a TOML config file
pub const CONFIG_ENV_VAR: &str = "AMBIENT_MIXER_CONFIG";

/// Keys of the built-in ambient catalog
pub const DEFAULT_TRACK_KEYS: [&str; 4] = ["birds", "rain", "leaves", "street"];

#[derive(Debug, Clone, Deserialize)]
pub struct MixerConfig {
    /// Where remote assets are cached; no caching when absent
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Default for MixerConfig {
    fn default() -> Self {
        let tracks = DEFAULT_TRACK_KEYS
            .iter()
            .map(|key| Track::new(*key, format!("sound/{}.mp3", key), DEFAULT_VOLUME))
            .collect();
        Self {
            cache_dir: None,
            tracks,
        }
    }
}

impl MixerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MixerConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), tracks = config.tracks.len(), "mixer config loaded");
        Ok(config)
    }

    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&path));
        }
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for track in &self.tracks {
            if track.key.is_empty() {
                return Err(Error::Config("track key must not be empty".to_string()));
            }
            if !seen.insert(track.key.as_str()) {
                return Err(Error::Config(format!("duplicate track key: {}", track.key)));
            }
            if !(0.0..=1.0).contains(&track.volume) {
                return Err(Error::Config(format!(
                    "volume for {} must be within 0.0..=1.0, got {}",
                    track.key, track.volume
                )));
            }
        }
        Ok(())
    }

    pub fn track(&self, key: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.key == key)
    }

    /// Asset loader honouring `cache_dir`
    pub fn asset_loader(&self) -> AssetLoader {
        match &self.cache_dir {
            Some(dir) => AssetLoader::with_cache_dir(dir),
            None => AssetLoader::new(),
        }
    }
}
