//! Error types shared across GazeLens crates.

use std::path::PathBuf;

use gazelens_gaze_model::settings::SettingsError;

/// Top-level error type for GazeLens operations.
#[derive(Debug, thiserror::Error)]
pub enum GazelensError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using GazelensError.
pub type GazelensResult<T> = Result<T, GazelensError>;

impl GazelensError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            GazelensError::config("calibration missing").to_string(),
            "Configuration error: calibration missing"
        );
        let missing = GazelensError::FileNotFound {
            path: PathBuf::from("/nope/samples.bin"),
        };
        assert_eq!(missing.to_string(), "File not found: /nope/samples.bin");
    }

    #[test]
    fn test_settings_error_converts() {
        let err: GazelensError = SettingsError::InvalidThreshold {
            field: "ivt_merge_angle_deg",
            value: -1.0,
        }
        .into();
        assert!(matches!(err, GazelensError::Settings(_)));
    }
}
