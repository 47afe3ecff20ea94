//! AOI dwell, visit, and saccade analytics.
//!
//! Consumes merged fixations that have already been mapped into
//! stimulus-local pixels (see [`map_to_stimulus`]) and aggregates, per AOI,
//! over every visible result:
//! - area ratio of the AOI to the stimulus
//! - fixation count and dwell time of fixations centered inside
//! - visits (entries) and revisits, with visit durations
//! - the earliest entry across results
//! - saccades that start and end inside the AOI, in pixels and degrees

use serde::{Deserialize, Serialize};

use gazelens_gaze_model::aoi::{AoiElement, AoiGeometry};
use gazelens_gaze_model::calibration::{visual_angle_deg, PixelSpace, ScreenCalibration};
use gazelens_gaze_model::fixation::Fixation;
use gazelens_gaze_model::sample::RawGazeSample;

use crate::merge::mean_eye_distance_mm;

/// Where a stimulus was displayed on screen, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StimulusRect {
    pub x_px: f64,
    pub y_px: f64,
    pub width_px: f64,
    pub height_px: f64,
}

impl StimulusRect {
    pub fn new(x_px: f64, y_px: f64, width_px: f64, height_px: f64) -> Self {
        Self {
            x_px,
            y_px,
            width_px,
            height_px,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_px
            && x <= self.x_px + self.width_px
            && y >= self.y_px
            && y <= self.y_px + self.height_px
    }

    /// Screen point to stimulus-local pixels, `None` outside the rectangle.
    ///
    /// `stimulus` is the stimulus' own pixel space; a stimulus shown scaled
    /// is rescaled to it.
    pub fn to_local(&self, x_px: f32, y_px: f32, stimulus: PixelSpace) -> Option<(f32, f32)> {
        if self.width_px <= 0.0 || self.height_px <= 0.0 {
            return None;
        }
        let (x, y) = (x_px as f64, y_px as f64);
        if !self.contains(x, y) {
            return None;
        }
        Some((
            ((x - self.x_px) * stimulus.width / self.width_px) as f32,
            ((y - self.y_px) * stimulus.height / self.height_px) as f32,
        ))
    }
}

/// A fixation in stimulus-local pixels, paired with its screen position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MappedFixation {
    /// Timing plus stimulus-local centroid.
    pub fixation: Fixation,
    pub screen_x_px: f32,
    pub screen_y_px: f32,
    /// Mean eye-to-screen distance during the fixation.
    pub eye_distance_mm: Option<f64>,
}

impl MappedFixation {
    /// Map a screen-space fixation onto a displayed stimulus.
    ///
    /// Returns `None` when the centroid falls outside `rect`.
    pub fn from_screen(
        screen: &Fixation,
        rect: &StimulusRect,
        stimulus: PixelSpace,
        eye_distance_mm: Option<f64>,
    ) -> Option<Self> {
        let (x_px, y_px) = rect.to_local(screen.x_px, screen.y_px, stimulus)?;
        Some(Self {
            fixation: Fixation {
                x_px,
                y_px,
                ..*screen
            },
            screen_x_px: screen.x_px,
            screen_y_px: screen.y_px,
            eye_distance_mm,
        })
    }
}

/// Fixation sequence of one visible result on one stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFixations {
    pub result_id: u64,
    pub fixations: Vec<MappedFixation>,
}

/// Earliest fixation inside an AOI across all results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FirstEntry {
    pub result_id: u64,
    /// Start of the entering fixation (seconds since stream start).
    pub time_sec: f64,
    pub duration_sec: f64,
    /// Fixations in that result before the entering one.
    pub fixations_before: usize,
}

/// Aggregated statistics for one AOI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AoiMetrics {
    pub aoi_id: String,
    pub aoi_name: String,
    pub area_ratio: f64,
    pub fixation_count: usize,
    pub total_dwell_sec: f64,
    pub avg_dwell_sec: f64,
    pub visit_count: usize,
    pub revisit_count: usize,
    pub total_visit_sec: f64,
    pub avg_visit_sec: f64,
    pub first_entry: Option<FirstEntry>,
    pub saccade_count: usize,
    pub mean_amplitude_px: Option<f64>,
    /// `None` without calibration or viewing distance.
    pub mean_amplitude_deg: Option<f64>,
    pub scanpath_length_px: f64,
}

impl AoiMetrics {
    fn empty(aoi: &AoiElement) -> Self {
        Self {
            aoi_id: aoi.id.clone(),
            aoi_name: aoi.name.clone(),
            area_ratio: 0.0,
            fixation_count: 0,
            total_dwell_sec: 0.0,
            avg_dwell_sec: 0.0,
            visit_count: 0,
            revisit_count: 0,
            total_visit_sec: 0.0,
            avg_visit_sec: 0.0,
            first_entry: None,
            saccade_count: 0,
            mean_amplitude_px: None,
            mean_amplitude_deg: None,
            scanpath_length_px: 0.0,
        }
    }
}

/// Translate screen-space fixations into stimulus-local pixels.
///
/// Fixations centered outside `rect` are discarded. `samples` supply the
/// viewing distance for degree-based metrics.
pub fn map_to_stimulus(
    fixations: &[Fixation],
    rect: &StimulusRect,
    stimulus: PixelSpace,
    samples: &[RawGazeSample],
) -> Vec<MappedFixation> {
    fixations
        .iter()
        .filter_map(|f| {
            MappedFixation::from_screen(f, rect, stimulus, mean_eye_distance_mm(samples, f))
        })
        .collect()
}

/// AOI analytics over a fixed stimulus.
#[derive(Debug, Clone, Copy)]
pub struct AoiAnalyzer {
    stimulus: PixelSpace,
    calibration: Option<ScreenCalibration>,
}

impl AoiAnalyzer {
    pub fn new(stimulus: PixelSpace, calibration: Option<ScreenCalibration>) -> Self {
        Self {
            stimulus,
            calibration: calibration.filter(|c| c.is_available()),
        }
    }

    /// One metrics entry per AOI, in input order.
    pub fn analyze(&self, results: &[ResultFixations], aois: &[AoiElement]) -> Vec<AoiMetrics> {
        aois.iter().map(|aoi| self.analyze_aoi(results, aoi)).collect()
    }

    fn analyze_aoi(&self, results: &[ResultFixations], aoi: &AoiElement) -> AoiMetrics {
        let mut metrics = AoiMetrics::empty(aoi);
        let Some(geometry) = aoi.geometry(self.stimulus) else {
            tracing::debug!(aoi = %aoi.id, "AOI has no usable geometry");
            return metrics;
        };

        let stimulus_area = self.stimulus.area();
        if stimulus_area > 0.0 {
            metrics.area_ratio = geometry.area() / stimulus_area;
        }

        let mut amplitude_px_sum = 0.0;
        let mut amplitude_deg_sum = 0.0;
        let mut amplitude_deg_count = 0usize;

        for result in results {
            let mut prev_inside: Option<&MappedFixation> = None;
            let mut visit: Option<(f64, f64)> = None;

            for (index, mapped) in result.fixations.iter().enumerate() {
                let fix = &mapped.fixation;
                if !contains(&geometry, fix) {
                    if let Some((start, end)) = visit.take() {
                        metrics.total_visit_sec += end - start;
                    }
                    prev_inside = None;
                    continue;
                }

                metrics.fixation_count += 1;
                metrics.total_dwell_sec += fix.dur_sec as f64;

                let earlier = metrics
                    .first_entry
                    .map(|first| (fix.start_sec as f64) < first.time_sec)
                    .unwrap_or(true);
                if earlier {
                    metrics.first_entry = Some(FirstEntry {
                        result_id: result.result_id,
                        time_sec: fix.start_sec as f64,
                        duration_sec: fix.dur_sec as f64,
                        fixations_before: index,
                    });
                }

                match visit.as_mut() {
                    Some((_, end)) => *end = fix.end_sec() as f64,
                    None => {
                        metrics.visit_count += 1;
                        visit = Some((fix.start_sec as f64, fix.end_sec() as f64));
                    }
                }

                if let Some(prev) = prev_inside {
                    let amplitude = prev.fixation.distance_px(fix);
                    metrics.saccade_count += 1;
                    amplitude_px_sum += amplitude;
                    metrics.scanpath_length_px += amplitude;

                    if let Some(deg) = self.amplitude_deg(prev, mapped) {
                        amplitude_deg_sum += deg;
                        amplitude_deg_count += 1;
                    }
                }
                prev_inside = Some(mapped);
            }

            if let Some((start, end)) = visit {
                metrics.total_visit_sec += end - start;
            }
        }

        metrics.revisit_count = metrics.visit_count.saturating_sub(1);
        if metrics.fixation_count > 0 {
            metrics.avg_dwell_sec = metrics.total_dwell_sec / metrics.fixation_count as f64;
        }
        if metrics.visit_count > 0 {
            metrics.avg_visit_sec = metrics.total_visit_sec / metrics.visit_count as f64;
        }
        if metrics.saccade_count > 0 {
            metrics.mean_amplitude_px = Some(amplitude_px_sum / metrics.saccade_count as f64);
        }
        if amplitude_deg_count > 0 {
            metrics.mean_amplitude_deg = Some(amplitude_deg_sum / amplitude_deg_count as f64);
        }

        metrics
    }

    /// Saccade amplitude in degrees from the screen-space centroids.
    fn amplitude_deg(&self, from: &MappedFixation, to: &MappedFixation) -> Option<f64> {
        let calibration = self.calibration.as_ref()?;
        let distance_mm = from.eye_distance_mm.or(to.eye_distance_mm)?;
        let displacement_mm = calibration.pixel_distance_mm(
            (to.screen_x_px - from.screen_x_px) as f64,
            (to.screen_y_px - from.screen_y_px) as f64,
        );
        visual_angle_deg(displacement_mm, distance_mm)
    }
}

fn contains(geometry: &AoiGeometry, fixation: &Fixation) -> bool {
    geometry.contains(fixation.x_px as f64, fixation.y_px as f64)
}

/// Compute metrics for every AOI over all visible results.
pub fn compute_aoi_metrics(
    results: &[ResultFixations],
    aois: &[AoiElement],
    stimulus: PixelSpace,
    calibration: Option<&ScreenCalibration>,
) -> Vec<AoiMetrics> {
    AoiAnalyzer::new(stimulus, calibration.copied()).analyze(results, aois)
}
