//! Compute AOI metrics over a fixation report.

use std::path::{Path, PathBuf};

use anyhow::Context;

use gazelens_fixation_core::aoi_metrics::{
    compute_aoi_metrics, MappedFixation, ResultFixations, StimulusRect,
};
use gazelens_gaze_model::aoi::AoiElement;
use gazelens_gaze_model::calibration::PixelSpace;

use super::detect::FixationReport;

pub struct AoiArgs {
    pub report: PathBuf,
    pub aois: PathBuf,
    pub stimulus_width: u32,
    pub stimulus_height: u32,
    pub stimulus_x: f64,
    pub stimulus_y: f64,
    pub display_width: Option<f64>,
    pub display_height: Option<f64>,
    pub output: Option<PathBuf>,
}

pub fn run(args: AoiArgs) -> anyhow::Result<()> {
    let report: FixationReport = read_json(&args.report)?;
    let aois: Vec<AoiElement> = read_json(&args.aois)?;

    let stimulus = PixelSpace::new(args.stimulus_width as f64, args.stimulus_height as f64);
    let rect = StimulusRect::new(
        args.stimulus_x,
        args.stimulus_y,
        args.display_width.unwrap_or(stimulus.width),
        args.display_height.unwrap_or(stimulus.height),
    );

    let fixations: Vec<MappedFixation> = report
        .fixations
        .iter()
        .filter_map(|r| {
            MappedFixation::from_screen(&r.fixation, &rect, stimulus, r.eye_distance_mm)
        })
        .collect();

    tracing::info!(
        total = report.fixations.len(),
        on_stimulus = fixations.len(),
        aois = aois.len(),
        "Computing AOI metrics"
    );

    let results = [ResultFixations {
        result_id: 0,
        fixations,
    }];
    let metrics = compute_aoi_metrics(&results, &aois, stimulus, report.calibration.as_ref());

    super::write_json(&metrics, args.output.as_ref())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
