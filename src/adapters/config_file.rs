//! JSON file configuration adapter.
//!
//! Implements [`ConfigPort`] on top of any filesystem `std::fs` can reach
//! (a host directory, or a SPIFFS/FAT partition mounted through the
//! ESP-IDF VFS).
//!
//! - A missing file loads as [`DetectorConfig::default()`].
//! - Loaded and saved configs are validated; invalid values are rejected.
//! - Saves write a sibling temp file and rename it over the target, so a
//!   power cut never leaves a half-written config behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::ConfigPort;
use crate::config::DetectorConfig;
use crate::error::ConfigError;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<DetectorConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No config at {}, using defaults", self.path.display());
                return Ok(DetectorConfig::default());
            }
            Err(e) => {
                warn!("Config read failed ({}): {}", self.path.display(), e);
                return Err(ConfigError::IoError);
            }
        };

        let config: DetectorConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("Config at {} is corrupted: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        config.validate()?;
        info!("Config loaded from {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &DetectorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config).map_err(|_| ConfigError::Corrupted)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json).map_err(|_| ConfigError::IoError)?;
        fs::rename(&tmp, &self.path).map_err(|_| ConfigError::IoError)?;
        info!("Config saved to {}", self.path.display());
        Ok(())
    }
}
