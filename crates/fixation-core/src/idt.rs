//! Dispersion-threshold (I-DT) fixation identification.
//!
//! # Algorithm
//!
//! 1. Keep only valid samples and map them into the output pixel space.
//! 2. From sample `i`, grow `j` until the window spans `min_window_sec`.
//! 3. If the window's dispersion `(max_x - min_x) + (max_y - min_y)` is
//!    within threshold, keep extending one sample at a time while it stays
//!    within threshold.
//! 4. Emit the window centroid if it lasts at least `min_duration_sec`, then
//!    continue after the window. Otherwise slide `i` forward by one.

use gazelens_gaze_model::calibration::PixelSpace;
use gazelens_gaze_model::fixation::Fixation;
use gazelens_gaze_model::sample::RawGazeSample;
use gazelens_gaze_model::settings::DetectionSettings;

/// Thresholds for I-DT, already clamped to their minimums.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdtParams {
    pub dispersion_px: f64,
    pub min_duration_sec: f64,
    pub min_window_sec: f64,
    /// Post-detection merge gap; 0 disables merging.
    pub merge_sec: f64,
}

impl IdtParams {
    pub fn new(
        dispersion_px: f64,
        min_duration_sec: f64,
        min_window_sec: f64,
        merge_sec: f64,
    ) -> Self {
        Self {
            dispersion_px: dispersion_px.max(0.01),
            min_duration_sec: min_duration_sec.max(0.001),
            min_window_sec: min_window_sec.max(0.001),
            merge_sec: merge_sec.max(0.0),
        }
    }

    pub fn from_settings(settings: &DetectionSettings) -> Self {
        Self::new(
            settings.idt_dispersion_threshold_px,
            settings.idt_min_duration_ms as f64 / 1000.0,
            settings.idt_window_ms as f64 / 1000.0,
            settings.idt_merge_time_ms as f64 / 1000.0,
        )
    }
}

/// A sample window that produced a fixation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdtWindow {
    /// Index of the first sample (into the detector input).
    pub first: usize,
    /// Index of the last sample, inclusive.
    pub last: usize,
    /// Dispersion of the window at emission time.
    pub dispersion_px: f64,
    pub fixation: Fixation,
}

/// Detect fixations, without the post-detection merge.
pub fn detect_idt(
    samples: &[RawGazeSample],
    params: &IdtParams,
    space: PixelSpace,
) -> Vec<Fixation> {
    idt_windows(samples, params, space)
        .into_iter()
        .map(|w| w.fixation)
        .collect()
}

/// Detect fixations and report the sample window behind each one.
pub fn idt_windows(
    samples: &[RawGazeSample],
    params: &IdtParams,
    space: PixelSpace,
) -> Vec<IdtWindow> {
    let points: Vec<PixelSample> = samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_usable())
        .map(|(index, s)| {
            let (x, y) = space.to_pixels(s.x_norm, s.y_norm);
            PixelSample {
                index,
                t: s.time_sec,
                x,
                y,
            }
        })
        .collect();

    let n = points.len();
    let mut windows = Vec::new();
    let mut i = 0;

    while i < n {
        let mut j = i;
        while j < n && points[j].t - points[i].t < params.min_window_sec {
            j += 1;
        }
        if j >= n {
            break;
        }

        let mut bounds = Bounds::over(&points[i..=j]);
        if bounds.dispersion() > params.dispersion_px {
            i += 1;
            continue;
        }

        while j + 1 < n {
            let grown = bounds.including(&points[j + 1]);
            if grown.dispersion() > params.dispersion_px {
                break;
            }
            bounds = grown;
            j += 1;
        }

        let duration = points[j].t - points[i].t;
        if duration >= params.min_duration_sec {
            let window = &points[i..=j];
            let count = window.len() as f64;
            let cx = window.iter().map(|p| p.x).sum::<f64>() / count;
            let cy = window.iter().map(|p| p.y).sum::<f64>() / count;

            windows.push(IdtWindow {
                first: points[i].index,
                last: points[j].index,
                dispersion_px: bounds.dispersion(),
                fixation: Fixation::new(points[i].t as f32, duration as f32, cx as f32, cy as f32),
            });
        }

        i = j + 1;
    }

    windows
}

/// Bounding-box dispersion of the valid samples in pixel space.
pub fn dispersion_px(samples: &[RawGazeSample], space: PixelSpace) -> f64 {
    let points: Vec<PixelSample> = samples
        .iter()
        .filter(|s| s.is_usable())
        .map(|s| {
            let (x, y) = space.to_pixels(s.x_norm, s.y_norm);
            PixelSample { index: 0, t: s.time_sec, x, y }
        })
        .collect();

    if points.is_empty() {
        return 0.0;
    }
    Bounds::over(&points).dispersion()
}

#[derive(Debug, Clone, Copy)]
struct PixelSample {
    index: usize,
    t: f64,
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Bounds {
    fn over(points: &[PixelSample]) -> Self {
        let init = Bounds {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        points.iter().fold(init, |b, p| b.including(p))
    }

    fn including(&self, p: &PixelSample) -> Self {
        Bounds {
            min_x: self.min_x.min(p.x),
            max_x: self.max_x.max(p.x),
            min_y: self.min_y.min(p.y),
            max_y: self.max_y.max(p.y),
        }
    }

    fn dispersion(&self) -> f64 {
        (self.max_x - self.min_x) + (self.max_y - self.min_y)
    }
}
