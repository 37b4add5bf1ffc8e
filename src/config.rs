use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const APP_DIR: &str = "universal-video-downloader";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where downloads are written; created on startup if missing
    pub output_dir: PathBuf,

    /// Container passed to `--merge-output-format`
    pub merge_output_format: String,

    pub ytdlp_path: String,

    pub ffmpeg_path: String,

    /// Try to install yt-dlp / ffmpeg when they are missing
    pub auto_install_dependencies: bool,

    pub fetch_thumbnails: bool,

    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("Videos"),
            merge_output_format: "mp4".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            auto_install_dependencies: true,
            fetch_thumbnails: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        for path in Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(&path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_config_path();
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// Whether an ffmpeg location has to be passed to yt-dlp explicitly
    pub fn custom_ffmpeg(&self) -> Option<&str> {
        (self.ffmpeg_path != "ffmpeg").then_some(self.ffmpeg_path.as_str())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(APP_DIR).join("config.toml"));
        }
        paths
    }

    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
