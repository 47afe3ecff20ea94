//! End-to-end fixation detection for one sample stream.

use serde::{Deserialize, Serialize};

use gazelens_gaze_model::calibration::{PixelSpace, ScreenCalibration};
use gazelens_gaze_model::fixation::Fixation;
use gazelens_gaze_model::sample::RawGazeSample;
use gazelens_gaze_model::settings::{DetectionAlgorithm, DetectionSettings};

use crate::idt::{detect_idt, IdtParams};
use crate::ivt::{detect_ivt, join_ivt, IvtParams};
use crate::merge::merge_by_time;
use crate::preprocess::Preprocessor;

/// Counters from one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub samples_in: usize,
    pub valid_before: usize,
    pub valid_after: usize,
    pub raw_fixations: usize,
    pub fixations: usize,
}

/// Preprocess, detect, then merge.
///
/// Stateless apart from its settings, so one instance can serve any number
/// of `(result, stimulus, eye)` streams.
#[derive(Debug, Clone)]
pub struct FixationPipeline {
    settings: DetectionSettings,
}

impl FixationPipeline {
    pub fn new(settings: DetectionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    pub fn run(
        &self,
        samples: &[RawGazeSample],
        calibration: Option<&ScreenCalibration>,
        space: PixelSpace,
    ) -> Vec<Fixation> {
        self.run_with_stats(samples, calibration, space).0
    }

    pub fn run_with_stats(
        &self,
        samples: &[RawGazeSample],
        calibration: Option<&ScreenCalibration>,
        space: PixelSpace,
    ) -> (Vec<Fixation>, PipelineStats) {
        let mut stats = PipelineStats {
            samples_in: samples.len(),
            valid_before: samples.iter().filter(|s| s.is_usable()).count(),
            ..Default::default()
        };

        let (processed, pre) =
            Preprocessor::from_settings(&self.settings).process_with_stats(samples);
        stats.valid_after = processed.iter().filter(|s| s.is_usable()).count();

        let fixations = match self.settings.algorithm {
            DetectionAlgorithm::Idt => {
                let params = IdtParams::from_settings(&self.settings);
                let raw = detect_idt(&processed, &params, space);
                stats.raw_fixations = raw.len();
                merge_by_time(&raw, params.merge_sec)
            }
            DetectionAlgorithm::Ivt => {
                let params = IvtParams::from_settings(&self.settings);
                let raw = detect_ivt(&processed, &params, calibration, space);
                stats.raw_fixations = raw.len();
                join_ivt(&raw, &params, &processed, calibration, space)
            }
        };
        stats.fixations = fixations.len();

        tracing::debug!(
            algorithm = ?self.settings.algorithm,
            samples = stats.samples_in,
            filled = pre.filled,
            smoothed = pre.smoothed,
            raw = stats.raw_fixations,
            fixations = stats.fixations,
            "Fixation detection complete"
        );

        (fixations, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazelens_gaze_model::settings::NoiseReduction;

    fn stream() -> Vec<RawGazeSample> {
        (0..60)
            .map(|i| {
                let t = i as f64 / 60.0;
                if i == 10 || i == 11 {
                    return RawGazeSample::lost(t);
                }
                let x = if i < 30 { 0.25 } else { 0.75 };
                RawGazeSample::new(t, x, 0.5, 0.6)
            })
            .collect()
    }

    #[test]
    fn test_idt_pipeline_fills_and_detects() {
        let settings = DetectionSettings {
            algorithm: DetectionAlgorithm::Idt,
            ..Default::default()
        };
        let pipeline = FixationPipeline::new(settings);
        let (fixations, stats) =
            pipeline.run_with_stats(&stream(), None, PixelSpace::new(1920.0, 1080.0));

        assert_eq!(stats.samples_in, 60);
        assert_eq!(stats.valid_before, 58);
        assert_eq!(stats.valid_after, 60);
        assert_eq!(fixations.len(), 2);
        assert!((fixations[0].x_px - 480.0).abs() < 0.5);
        assert!((fixations[1].x_px - 1440.0).abs() < 0.5);
    }

    #[test]
    fn test_ivt_pipeline_requires_calibration() {
        let settings = DetectionSettings {
            algorithm: DetectionAlgorithm::Ivt,
            noise_reduction: NoiseReduction::Median,
            ..Default::default()
        };
        let pipeline = FixationPipeline::new(settings);
        let space = PixelSpace::new(1920.0, 1080.0);

        assert!(pipeline.run(&stream(), None, space).is_empty());

        let cal = ScreenCalibration::new(1920.0, 1080.0, 520.0, 290.0);
        let fixations = pipeline.run(&stream(), Some(&cal), space);
        assert_eq!(fixations.len(), 2);
    }

    #[test]
    fn test_empty_stream() {
        let pipeline = FixationPipeline::new(DetectionSettings::default());
        let (fixations, stats) = pipeline.run_with_stats(&[], None, PixelSpace::new(10.0, 10.0));
        assert!(fixations.is_empty());
        assert_eq!(stats, PipelineStats::default());
    }
}
