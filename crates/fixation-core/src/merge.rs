//! Post-detection merging of temporally adjacent fixations.
//!
//! Both detectors can split one perceptual fixation in two around a short
//! dropout or a tiny drift. Merging sorts by start time and folds each
//! fixation into its predecessor when the gap between them is small enough
//! (and, for the angular join, when their centroids are close in degrees of
//! visual angle).

use gazelens_gaze_model::calibration::{visual_angle_deg, PixelSpace, ScreenCalibration};
use gazelens_gaze_model::fixation::Fixation;
use gazelens_gaze_model::sample::RawGazeSample;

/// Slack (seconds) when matching samples to an f32 fixation window.
const WINDOW_SLACK_SEC: f64 = 1e-4;

/// Merge consecutive fixations whose gap is at most `merge_sec`.
///
/// Returns the input unchanged when `merge_sec` is not positive.
pub fn merge_by_time(fixations: &[Fixation], merge_sec: f64) -> Vec<Fixation> {
    if merge_sec <= 0.0 {
        return fixations.to_vec();
    }
    merge_with(fixations, merge_sec, |_, _| true)
}

/// Merge by time gap, additionally requiring the centroids to lie within
/// `max_angle_deg` of visual angle.
///
/// Centroids are in `space`, which must span the calibrated screen. The
/// viewing distance is the mean sampled eye distance during the earlier
/// fixation, falling back to the later one; pairs with no usable distance
/// are never merged.
pub fn join_by_time_and_angle(
    fixations: &[Fixation],
    merge_sec: f64,
    max_angle_deg: f64,
    samples: &[RawGazeSample],
    calibration: &ScreenCalibration,
    space: PixelSpace,
) -> Vec<Fixation> {
    if merge_sec <= 0.0 {
        return fixations.to_vec();
    }
    if !calibration.is_available() || space.width <= 0.0 || space.height <= 0.0 {
        tracing::debug!("Calibration unavailable, skipping angular fixation join");
        return fixations.to_vec();
    }

    let mm_per_px_x = calibration.width_mm / space.width;
    let mm_per_px_y = calibration.height_mm / space.height;

    merge_with(fixations, merge_sec, |prev, next| {
        let Some(distance_mm) = mean_eye_distance_mm(samples, prev)
            .or_else(|| mean_eye_distance_mm(samples, next))
        else {
            return false;
        };

        let dx_mm = (next.x_px - prev.x_px) as f64 * mm_per_px_x;
        let dy_mm = (next.y_px - prev.y_px) as f64 * mm_per_px_y;
        visual_angle_deg(dx_mm.hypot(dy_mm), distance_mm)
            .map(|angle| angle <= max_angle_deg)
            .unwrap_or(false)
    })
}

/// Mean eye-to-screen distance (mm) of samples inside a fixation's window.
pub fn mean_eye_distance_mm(samples: &[RawGazeSample], fixation: &Fixation) -> Option<f64> {
    let start = fixation.start_sec as f64 - WINDOW_SLACK_SEC;
    let end = fixation.end_sec() as f64 + WINDOW_SLACK_SEC;

    let first = samples.partition_point(|s| s.time_sec < start);
    let (sum, count) = samples[first..]
        .iter()
        .take_while(|s| s.time_sec <= end)
        .filter(|s| s.distance_m.is_finite() && s.distance_m > 0.0)
        .fold((0.0, 0usize), |(sum, count), s| (sum + s.distance_m as f64, count + 1));

    (count > 0).then(|| sum / count as f64 * 1000.0)
}

fn merge_with<F>(fixations: &[Fixation], merge_sec: f64, mut accept: F) -> Vec<Fixation>
where
    F: FnMut(&Fixation, &Fixation) -> bool,
{
    let mut sorted = fixations.to_vec();
    sorted.sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));

    let mut merged: Vec<Fixation> = Vec::with_capacity(sorted.len());
    for next in sorted {
        match merged.last_mut() {
            Some(prev) if prev.gap_to(&next) as f64 <= merge_sec && accept(prev, &next) => {
                *prev = combine(prev, &next);
            }
            _ => merged.push(next),
        }
    }

    if merged.len() < fixations.len() {
        tracing::debug!(
            before = fixations.len(),
            after = merged.len(),
            "Merged adjacent fixations"
        );
    }
    merged
}

/// Duration-weighted union of two fixations.
fn combine(a: &Fixation, b: &Fixation) -> Fixation {
    let start = a.start_sec.min(b.start_sec);
    let end = a.end_sec().max(b.end_sec());

    let (wa, wb) = (a.dur_sec as f64, b.dur_sec as f64);
    let total = wa + wb;
    let (x, y) = if total > 0.0 {
        (
            (a.x_px as f64 * wa + b.x_px as f64 * wb) / total,
            (a.y_px as f64 * wa + b.y_px as f64 * wb) / total,
        )
    } else {
        (
            (a.x_px as f64 + b.x_px as f64) * 0.5,
            (a.y_px as f64 + b.y_px as f64) * 0.5,
        )
    };

    Fixation::new(start, end - start, x as f32, y as f32)
}
