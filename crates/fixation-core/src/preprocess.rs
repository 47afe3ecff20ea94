//! Gaze sample preprocessing: gap filling and noise reduction.
//!
//! Both passes preserve stream length and timestamps. Gap filling may turn
//! invalid samples valid; noise reduction only rewrites the coordinates of
//! samples that are already valid.

use gazelens_gaze_model::sample::{in_unit_range, RawGazeSample};
use gazelens_gaze_model::settings::{DetectionSettings, NoiseReduction};

/// Longest time span (seconds) a filled gap may cover, whatever its sample count.
pub const MAX_GAP_FILL_SEC: f64 = 0.25;

/// Preprocessing stage configured from detection settings.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    noise_reduction: NoiseReduction,
    window_size: usize,
    gap_window_size: usize,
}

/// What a preprocessing run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessStats {
    pub filled: usize,
    pub smoothed: usize,
}

impl Preprocessor {
    pub fn new(
        noise_reduction: NoiseReduction,
        window_size: usize,
        gap_window_size: usize,
    ) -> Self {
        Self {
            noise_reduction,
            window_size,
            gap_window_size,
        }
    }

    pub fn from_settings(settings: &DetectionSettings) -> Self {
        Self::new(
            settings.noise_reduction,
            settings.window_size,
            settings.gap_window_size,
        )
    }

    /// Run both passes and return a new sample list of equal length.
    pub fn process(&self, samples: &[RawGazeSample]) -> Vec<RawGazeSample> {
        self.process_with_stats(samples).0
    }

    pub fn process_with_stats(
        &self,
        samples: &[RawGazeSample],
    ) -> (Vec<RawGazeSample>, PreprocessStats) {
        let mut out: Vec<RawGazeSample> = samples.iter().map(|s| s.sanitized()).collect();
        let filled = fill_gaps(&mut out, self.gap_window_size);
        let smoothed = reduce_noise(&mut out, self.noise_reduction, self.window_size);
        (out, PreprocessStats { filled, smoothed })
    }
}

/// Bridge short invalid runs by linear interpolation.
///
/// A run is filled only when it is bracketed by valid samples, holds at most
/// `gap_window_size` samples, spans no more than [`MAX_GAP_FILL_SEC`], and
/// neither the run nor its neighbors look like a blink. Returns the number
/// of samples made valid.
pub fn fill_gaps(samples: &mut [RawGazeSample], gap_window_size: usize) -> usize {
    if gap_window_size == 0 || samples.len() < 3 {
        return 0;
    }

    let mut filled = 0;
    let mut i = 0;

    while i < samples.len() {
        if samples[i].is_usable() {
            i += 1;
            continue;
        }

        let start = i;
        let mut end = i;
        while end < samples.len() && !samples[end].is_usable() {
            end += 1;
        }
        i = end;

        if start == 0 || end == samples.len() || end - start > gap_window_size {
            continue;
        }

        let prev = samples[start - 1];
        let next = samples[end];
        let blink = !prev.eyelid_open_valid
            || !next.eyelid_open_valid
            || samples[start..end].iter().any(|s| !s.eyelid_open_valid);
        if blink {
            continue;
        }

        let span = next.time_sec - prev.time_sec;
        if !(span <= MAX_GAP_FILL_SEC) {
            continue;
        }

        let run_len = (end - start) as f64;
        for (k, sample) in samples[start..end].iter_mut().enumerate() {
            let frac = if span > 0.0 {
                (sample.time_sec - prev.time_sec) / span
            } else {
                (k + 1) as f64 / (run_len + 1.0)
            };
            let x = prev.x_norm as f64 + (next.x_norm as f64 - prev.x_norm as f64) * frac;
            let y = prev.y_norm as f64 + (next.y_norm as f64 - prev.y_norm as f64) * frac;
            let (x, y) = (x as f32, y as f32);

            if !in_unit_range(x, y) {
                continue;
            }

            sample.x_norm = x;
            sample.y_norm = y;
            if prev.distance_m > 0.0 && next.distance_m > 0.0 {
                let d = prev.distance_m as f64
                    + (next.distance_m as f64 - prev.distance_m as f64) * frac;
                sample.distance_m = d as f32;
            }
            sample.valid = true;
            sample.eyelid_open_valid = true;
            filled += 1;
        }
    }

    filled
}

/// Replace each valid sample by the mean or median of the valid samples in
/// its `±window_size / 2` neighborhood. Returns the number of samples
/// rewritten.
///
/// Neighborhoods are read from a snapshot, so earlier rewrites never feed
/// later ones. A non-finite or out-of-range result leaves the sample as is.
pub fn reduce_noise(
    samples: &mut [RawGazeSample],
    mode: NoiseReduction,
    window_size: usize,
) -> usize {
    let half = window_size / 2;
    if mode == NoiseReduction::None || half == 0 || samples.is_empty() {
        return 0;
    }

    let snapshot = samples.to_vec();
    let last = snapshot.len() - 1;
    let mut xs = Vec::with_capacity(2 * half + 1);
    let mut ys = Vec::with_capacity(2 * half + 1);
    let mut changed = 0;

    for (i, sample) in samples.iter_mut().enumerate() {
        if !snapshot[i].is_usable() {
            continue;
        }

        xs.clear();
        ys.clear();
        for neighbor in &snapshot[i.saturating_sub(half)..=(i + half).min(last)] {
            if neighbor.is_usable() {
                xs.push(neighbor.x_norm);
                ys.push(neighbor.y_norm);
            }
        }

        let (x, y) = match mode {
            NoiseReduction::Mean => (mean(&xs), mean(&ys)),
            NoiseReduction::Median => (median(&mut xs), median(&mut ys)),
            NoiseReduction::None => continue,
        };

        if !in_unit_range(x, y) {
            continue;
        }
        if x != sample.x_norm || y != sample.y_norm {
            changed += 1;
        }
        sample.x_norm = x;
        sample.y_norm = y;
    }

    changed
}

fn mean(values: &[f32]) -> f32 {
    let sum: f64 = values.iter().map(|v| *v as f64).sum();
    (sum / values.len() as f64) as f32
}

fn median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        ((values[mid - 1] as f64 + values[mid] as f64) * 0.5) as f32
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(t: f64, x: f32, y: f32) -> RawGazeSample {
        RawGazeSample::new(t, x, y, 0.6)
    }

    #[test]
    fn test_fills_short_gap_by_interpolation() {
        let mut samples = vec![
            valid(0.00, 0.2, 0.2),
            RawGazeSample::lost(0.02),
            RawGazeSample::lost(0.04),
            valid(0.06, 0.4, 0.4),
        ];

        assert_eq!(fill_gaps(&mut samples, 3), 2);
        assert!(samples.iter().all(|s| s.valid));
        assert!((samples[1].x_norm - 0.266_667).abs() < 1e-4);
        assert!((samples[2].y_norm - 0.333_333).abs() < 1e-4);
    }

    #[test]
    fn test_gap_longer_than_window_is_kept() {
        let mut samples = vec![
            valid(0.00, 0.2, 0.2),
            RawGazeSample::lost(0.02),
            RawGazeSample::lost(0.04),
            RawGazeSample::lost(0.06),
            valid(0.08, 0.4, 0.4),
        ];
        assert_eq!(fill_gaps(&mut samples, 2), 0);
        assert!(!samples[2].valid);
    }

    #[test]
    fn test_gap_exceeding_time_ceiling_is_kept() {
        let mut samples = vec![
            valid(0.0, 0.2, 0.2),
            RawGazeSample::lost(0.15),
            valid(0.30, 0.4, 0.4),
        ];
        assert_eq!(fill_gaps(&mut samples, 5), 0);
    }

    #[test]
    fn test_blink_is_never_bridged() {
        let mut samples = vec![
            valid(0.00, 0.2, 0.2),
            RawGazeSample::lost(0.02),
            RawGazeSample::blink(0.04),
            valid(0.06, 0.4, 0.4),
        ];
        assert_eq!(fill_gaps(&mut samples, 5), 0);

        let mut closed_neighbor = vec![
            valid(0.00, 0.2, 0.2),
            RawGazeSample::lost(0.02),
            RawGazeSample {
                eyelid_open_valid: false,
                ..valid(0.04, 0.4, 0.4)
            },
        ];
        assert_eq!(fill_gaps(&mut closed_neighbor, 5), 0);
    }

    #[test]
    fn test_leading_and_trailing_gaps_are_kept() {
        let mut samples = vec![
            RawGazeSample::lost(0.00),
            valid(0.02, 0.2, 0.2),
            valid(0.04, 0.2, 0.2),
            RawGazeSample::lost(0.06),
        ];
        assert_eq!(fill_gaps(&mut samples, 5), 0);
    }

    #[test]
    fn test_mean_filter_smooths_spike() {
        let mut samples = vec![
            valid(0.00, 0.5, 0.5),
            valid(0.02, 0.5, 0.5),
            valid(0.04, 0.8, 0.5),
            valid(0.06, 0.5, 0.5),
            valid(0.08, 0.5, 0.5),
        ];
        let changed = reduce_noise(&mut samples, NoiseReduction::Mean, 3);
        assert_eq!(changed, 3);
        assert!((samples[2].x_norm - 0.6).abs() < 1e-6);
        assert!((samples[0].x_norm - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_median_filter_removes_spike_and_is_stable() {
        let mut samples = vec![
            valid(0.00, 0.3, 0.3),
            valid(0.02, 0.3, 0.3),
            valid(0.04, 0.9, 0.3),
            valid(0.06, 0.3, 0.3),
            valid(0.08, 0.7, 0.7),
            valid(0.10, 0.7, 0.7),
        ];
        reduce_noise(&mut samples, NoiseReduction::Median, 3);
        assert!((samples[2].x_norm - 0.3).abs() < 1e-6);

        let once = samples.clone();
        assert_eq!(reduce_noise(&mut samples, NoiseReduction::Median, 3), 0);
        assert_eq!(samples, once);
    }

    #[test]
    fn test_invalid_samples_untouched_by_filter() {
        let mut samples = vec![
            valid(0.00, 0.4, 0.4),
            RawGazeSample::lost(0.02),
            valid(0.04, 0.6, 0.6),
        ];
        reduce_noise(&mut samples, NoiseReduction::Mean, 3);
        assert!(!samples[1].valid);
        assert_eq!(samples[1].x_norm, 0.0);
        assert!((samples[0].x_norm - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_process_sanitizes_out_of_range_valid_samples() {
        let bad = RawGazeSample {
            x_norm: 1.5,
            valid: true,
            ..valid(0.02, 0.5, 0.5)
        };
        let samples = vec![valid(0.0, 0.5, 0.5), bad];
        let out = Preprocessor::new(NoiseReduction::None, 3, 0).process(&samples);
        assert_eq!(out.len(), 2);
        assert!(!out[1].valid);
    }

    #[test]
    fn test_empty_input() {
        let pre = Preprocessor::from_settings(&DetectionSettings::default());
        assert!(pre.process(&[]).is_empty());
    }
}
