use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Default location: `~/.gesture-arm/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(".gesture-arm").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Load `path` (or the default location). A missing file at the default
    /// location yields defaults; a missing explicit path is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            Self::load(path)?
        } else {
            let path = Self::default_path()?;
            if path.exists() {
                Self::load(&path)?
            } else {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                Self {
                    config_path: path,
                    ..Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("GESTURE_ARM_PORT")
            && !port.is_empty()
        {
            self.link.port = port;
        }

        if let Ok(baud_str) = std::env::var("GESTURE_ARM_BAUD")
            && let Ok(baud) = baud_str.parse::<u32>()
        {
            self.link.baud = baud;
        }
    }
}
