//! Fixation detection settings.
//!
//! One immutable value per detection run. Every option is always present;
//! defaults follow common eye-tracking practice (30 deg/s I-VT threshold,
//! 75 ms / 0.5 deg fixation join, 60 ms minimum fixation).

use serde::{Deserialize, Serialize};

/// Which eye's gaze signal drives detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EyeSelection {
    Left,
    Right,
    #[default]
    Average,
}

/// Optional sliding-window smoothing applied before detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoiseReduction {
    #[default]
    None,
    Mean,
    Median,
}

/// Fixation identification algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionAlgorithm {
    /// Dispersion-threshold identification.
    Idt,
    /// Velocity-threshold identification.
    #[default]
    Ivt,
}

/// How adjacent I-VT fixations are joined after detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    None,
    ByTime,
    #[default]
    ByTimeAndAngle,
}

/// Complete settings for one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub eye: EyeSelection,
    pub noise_reduction: NoiseReduction,
    /// Noise-reduction window (samples).
    pub window_size: usize,
    /// Longest invalid run bridged by gap filling (samples).
    pub gap_window_size: usize,
    pub algorithm: DetectionAlgorithm,

    pub idt_dispersion_threshold_px: f64,
    pub idt_min_duration_ms: u32,
    pub idt_window_ms: u32,
    /// 0 disables the post-detection merge.
    pub idt_merge_time_ms: u32,

    pub ivt_speed_fix_deg_per_sec: f64,
    pub ivt_min_duration_ms: u32,
    pub ivt_merge_time_ms: u32,
    pub ivt_merge_angle_deg: f64,
    pub ivt_join_type: JoinType,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            eye: EyeSelection::Average,
            noise_reduction: NoiseReduction::None,
            window_size: 3,
            gap_window_size: 5,
            algorithm: DetectionAlgorithm::Ivt,
            idt_dispersion_threshold_px: 25.0,
            idt_min_duration_ms: 100,
            idt_window_ms: 100,
            idt_merge_time_ms: 0,
            ivt_speed_fix_deg_per_sec: 30.0,
            ivt_min_duration_ms: 60,
            ivt_merge_time_ms: 75,
            ivt_merge_angle_deg: 0.5,
            ivt_join_type: JoinType::ByTimeAndAngle,
        }
    }
}

/// Settings rejected before a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidThreshold { field: &'static str, value: f64 },
}

impl DetectionSettings {
    /// Check float thresholds; integer fields cannot go negative by type.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let checks = [
            ("idt_dispersion_threshold_px", self.idt_dispersion_threshold_px),
            ("ivt_speed_fix_deg_per_sec", self.ivt_speed_fix_deg_per_sec),
            ("ivt_merge_angle_deg", self.ivt_merge_angle_deg),
        ];

        for (field, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::InvalidThreshold { field, value });
            }
        }
        Ok(())
    }

    /// Stable 64-bit FNV-1a hash of the canonical JSON form.
    ///
    /// Used as the settings component of detection cache keys.
    pub fn fingerprint(&self) -> u64 {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        fnv1a_64(canonical.as_bytes())
    }
}

fn fnv1a_64(input: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DetectionSettings::default().validate().is_ok());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let settings = DetectionSettings {
            ivt_speed_fix_deg_per_sec: -1.0,
            ..DetectionSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::InvalidThreshold {
                field: "ivt_speed_fix_deg_per_sec",
                value: -1.0
            })
        );

        let settings = DetectionSettings {
            idt_dispersion_threshold_px: f64::NAN,
            ..DetectionSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_fingerprint_tracks_changes() {
        let a = DetectionSettings::default();
        let b = DetectionSettings::default();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = DetectionSettings {
            idt_merge_time_ms: 50,
            ..DetectionSettings::default()
        };
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let raw = r#"{ "algorithm": "idt", "eye": "left", "idt_dispersion_threshold_px": 40.0 }"#;
        let parsed: DetectionSettings = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.algorithm, DetectionAlgorithm::Idt);
        assert_eq!(parsed.eye, EyeSelection::Left);
        assert_eq!(parsed.idt_dispersion_threshold_px, 40.0);
        assert_eq!(parsed.ivt_join_type, JoinType::ByTimeAndAngle);
    }
}
