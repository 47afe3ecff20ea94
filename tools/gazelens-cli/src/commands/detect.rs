//! Detect fixations in a sample recording and write a JSON report.

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gazelens_common::config::AppConfig;
use gazelens_fixation_core::merge::mean_eye_distance_mm;
use gazelens_fixation_core::pipeline::{FixationPipeline, PipelineStats};
use gazelens_gaze_model::calibration::{PixelSpace, ScreenCalibration};
use gazelens_gaze_model::fixation::Fixation;
use gazelens_gaze_model::sample::samples_from_records;
use gazelens_gaze_model::settings::{DetectionAlgorithm, DetectionSettings, EyeSelection};

pub struct DetectArgs {
    pub path: PathBuf,
    pub settings: Option<PathBuf>,
    pub eye: Option<String>,
    pub algorithm: Option<String>,
    pub screen_width_px: u32,
    pub screen_height_px: u32,
    pub screen_mm: Option<(f64, f64)>,
    pub output: Option<PathBuf>,
}

/// Output of `gazelens detect`, consumed by `gazelens aoi`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FixationReport {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub settings: DetectionSettings,
    pub screen: PixelSpace,
    pub calibration: Option<ScreenCalibration>,
    pub stats: PipelineStats,
    pub fixations: Vec<ReportFixation>,
}

/// A screen-space fixation with its mean viewing distance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReportFixation {
    #[serde(flatten)]
    pub fixation: Fixation,
    pub eye_distance_mm: Option<f64>,
}

pub fn run(config: &AppConfig, args: DetectArgs) -> anyhow::Result<()> {
    let mut settings = match &args.settings {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings {}", path.display()))?;
            serde_json::from_str::<DetectionSettings>(&content)
                .with_context(|| format!("Failed to parse settings {}", path.display()))?
        }
        None => config.detection.clone(),
    };
    if let Some(eye) = &args.eye {
        settings.eye = parse_eye(eye)?;
    }
    if let Some(algorithm) = &args.algorithm {
        settings.algorithm = parse_algorithm(algorithm)?;
    }
    settings.validate()?;

    let calibration = match args.screen_mm {
        Some((width_mm, height_mm)) => Some(ScreenCalibration::new(
            args.screen_width_px as f64,
            args.screen_height_px as f64,
            width_mm,
            height_mm,
        )),
        None => config.usable_calibration().copied(),
    };
    let screen = PixelSpace::new(args.screen_width_px as f64, args.screen_height_px as f64);

    if settings.algorithm == DetectionAlgorithm::Ivt
        && !calibration.map(|c| c.is_available()).unwrap_or(false)
    {
        tracing::warn!("I-VT needs the physical screen size; no fixations will be detected");
    }

    let records = super::load_records(&args.path)?;
    let samples = samples_from_records(&records, settings.eye);

    let pipeline = FixationPipeline::new(settings.clone());
    let (fixations, stats) = pipeline.run_with_stats(&samples, calibration.as_ref(), screen);

    tracing::info!(
        samples = stats.samples_in,
        valid = stats.valid_after,
        fixations = stats.fixations,
        "Detection finished"
    );

    let report = FixationReport {
        generated_at: Utc::now(),
        source: args.path.display().to_string(),
        settings,
        screen,
        calibration,
        stats,
        fixations: fixations
            .iter()
            .map(|f| ReportFixation {
                fixation: *f,
                eye_distance_mm: mean_eye_distance_mm(&samples, f),
            })
            .collect(),
    };

    super::write_json(&report, args.output.as_ref())
}

fn parse_eye(value: &str) -> anyhow::Result<EyeSelection> {
    match value.to_ascii_lowercase().as_str() {
        "left" => Ok(EyeSelection::Left),
        "right" => Ok(EyeSelection::Right),
        "average" | "both" => Ok(EyeSelection::Average),
        other => anyhow::bail!("Unknown eye selection '{other}' (expected left|right|average)"),
    }
}

fn parse_algorithm(value: &str) -> anyhow::Result<DetectionAlgorithm> {
    match value.to_ascii_lowercase().as_str() {
        "idt" | "i-dt" => Ok(DetectionAlgorithm::Idt),
        "ivt" | "i-vt" => Ok(DetectionAlgorithm::Ivt),
        other => anyhow::bail!("Unknown algorithm '{other}' (expected idt|ivt)"),
    }
}
