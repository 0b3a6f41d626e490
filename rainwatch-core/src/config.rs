use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{classifier::ClassifierConfig, feed::FeedMeta, window::ServiceWindow};

pub const DEFAULT_COORDINATES: &str = "139.691764,35.689661";
pub const DEFAULT_SPOT_NAME: &str = "Shinjuku";
pub const DEFAULT_FEED_URI: &str = "http://weather.yahoo.co.jp/weather/jp/13/4410/13104.html";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// app_id = "..."
/// coordinates = "139.691764,35.689661"
/// spot_name = "Shinjuku"
///
/// [window]
/// open_hour = 10
///
/// [classifier]
/// rain_threshold = 0.5
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Yahoo! developer application id.
    pub app_id: Option<String>,
    /// "longitude,latitude" of the watched spot.
    pub coordinates: String,
    pub spot_name: String,
    pub feed_uri: String,
    /// Where results and the feed are kept. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    pub window: ServiceWindow,
    pub classifier: ClassifierConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: None,
            coordinates: DEFAULT_COORDINATES.to_string(),
            spot_name: DEFAULT_SPOT_NAME.to_string(),
            feed_uri: DEFAULT_FEED_URI.to_string(),
            data_dir: None,
            window: ServiceWindow::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.coordinates.split(',').count() != 2 {
            return Err(anyhow!(
                "Invalid coordinates '{}': expected \"longitude,latitude\"",
                self.coordinates
            ));
        }
        self.window.validate()?;
        self.classifier.validate()
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "rainwatch", "rainwatch")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding the persisted result and feed.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().to_path_buf()),
        }
    }

    pub fn feed_meta(&self) -> FeedMeta {
        FeedMeta {
            title: format!("Short-term rain forecast (updated {})", self.window.describe()),
            spot_name: self.spot_name.clone(),
            uri: self.feed_uri.clone(),
        }
    }
}
