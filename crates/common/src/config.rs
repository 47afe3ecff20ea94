//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use gazelens_gaze_model::calibration::ScreenCalibration;
use gazelens_gaze_model::settings::DetectionSettings;

use crate::error::{GazelensError, GazelensResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default fixation-detection settings.
    pub detection: DetectionSettings,

    /// Physical screen size, needed for I-VT and degree metrics.
    pub calibration: Option<ScreenCalibration>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "gazelens=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load_from(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                Self::default()
            }
        }
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> GazelensResult<Self> {
        if !path.exists() {
            return Err(GazelensError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.detection.validate()?;
        if let Some(cal) = &config.calibration {
            if !cal.is_available() {
                return Err(GazelensError::config(
                    "calibration needs positive pixel and millimeter dimensions",
                ));
            }
        }
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> GazelensResult<()> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> GazelensResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Calibration only if it can actually convert pixels to millimeters.
    pub fn usable_calibration(&self) -> Option<&ScreenCalibration> {
        self.calibration.as_ref().filter(|c| c.is_available())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("gazelens").join("config.json")
}
