//! Velocity-threshold (I-VT) fixation identification.
//!
//! Angular gaze velocity is computed between consecutive valid samples from
//! the physical on-screen displacement and the eye-to-screen distance.
//! Consecutive sub-threshold transitions form a fixation run, which starts
//! at the sample preceding its first slow transition.
//!
//! Without a usable [`ScreenCalibration`] nothing is detected.

use gazelens_gaze_model::calibration::{visual_angle_deg, PixelSpace, ScreenCalibration};
use gazelens_gaze_model::fixation::Fixation;
use gazelens_gaze_model::sample::RawGazeSample;
use gazelens_gaze_model::settings::{DetectionSettings, JoinType};

use crate::merge::{join_by_time_and_angle, merge_by_time};

/// Transitions spanning more than this many seconds break continuity.
pub const MAX_TRANSITION_DT_SEC: f64 = 0.25;

/// Angular speeds above this (deg/s) are treated as tracking artifacts.
pub const MAX_PLAUSIBLE_VELOCITY_DEG_PER_SEC: f64 = 800.0;

/// Thresholds for I-VT and its join step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IvtParams {
    pub speed_threshold_deg_per_sec: f64,
    pub min_duration_sec: f64,
    pub merge_sec: f64,
    pub merge_angle_deg: f64,
    pub join: JoinType,
}

impl IvtParams {
    pub fn from_settings(settings: &DetectionSettings) -> Self {
        Self {
            speed_threshold_deg_per_sec: settings.ivt_speed_fix_deg_per_sec,
            min_duration_sec: settings.ivt_min_duration_ms as f64 / 1000.0,
            merge_sec: settings.ivt_merge_time_ms as f64 / 1000.0,
            merge_angle_deg: settings.ivt_merge_angle_deg,
            join: settings.ivt_join_type,
        }
    }
}

impl Default for IvtParams {
    fn default() -> Self {
        Self::from_settings(&DetectionSettings::default())
    }
}

/// Angular velocity (deg/s) into each valid sample from the previous one.
///
/// The result is parallel to the valid samples of `samples`; the first entry
/// and every discarded transition are `f64::INFINITY`.
pub fn angular_velocities(
    samples: &[RawGazeSample],
    calibration: &ScreenCalibration,
) -> Vec<f64> {
    let usable: Vec<&RawGazeSample> = samples.iter().filter(|s| s.is_usable()).collect();
    let mut velocities = Vec::with_capacity(usable.len());

    for (k, current) in usable.iter().enumerate() {
        if k == 0 {
            velocities.push(f64::INFINITY);
            continue;
        }
        let prev = usable[k - 1];
        velocities.push(transition_velocity(prev, current, calibration).unwrap_or(f64::INFINITY));
    }

    velocities
}

fn transition_velocity(
    prev: &RawGazeSample,
    current: &RawGazeSample,
    calibration: &ScreenCalibration,
) -> Option<f64> {
    let dt = current.time_sec - prev.time_sec;
    if !(dt > 0.0 && dt <= MAX_TRANSITION_DT_SEC) {
        return None;
    }

    let distance_m = if current.distance_m > 0.0 {
        current.distance_m
    } else {
        prev.distance_m
    };
    let distance_mm = distance_m as f64 * 1000.0;

    let displacement_mm = calibration.normalized_distance_mm(
        (current.x_norm - prev.x_norm) as f64,
        (current.y_norm - prev.y_norm) as f64,
    );
    let speed = visual_angle_deg(displacement_mm, distance_mm)? / dt;

    (speed.is_finite() && speed <= MAX_PLAUSIBLE_VELOCITY_DEG_PER_SEC).then_some(speed)
}

/// Detect fixations, without the join step.
pub fn detect_ivt(
    samples: &[RawGazeSample],
    params: &IvtParams,
    calibration: Option<&ScreenCalibration>,
    space: PixelSpace,
) -> Vec<Fixation> {
    let Some(calibration) = calibration.filter(|c| c.is_available()) else {
        tracing::debug!("Screen calibration unavailable, I-VT yields no fixations");
        return vec![];
    };

    let usable: Vec<&RawGazeSample> = samples.iter().filter(|s| s.is_usable()).collect();
    let velocities = angular_velocities(samples, calibration);

    let mut fixations = Vec::new();
    let mut run: Option<(usize, usize)> = None;

    for (k, velocity) in velocities.iter().enumerate().skip(1) {
        if *velocity <= params.speed_threshold_deg_per_sec {
            run = Some(match run {
                Some((start, _)) => (start, k),
                None => (k - 1, k),
            });
        } else if let Some((start, end)) = run.take() {
            fixations.extend(close_run(&usable[start..=end], params, space));
        }
    }
    if let Some((start, end)) = run {
        fixations.extend(close_run(&usable[start..=end], params, space));
    }

    fixations
}

fn close_run(run: &[&RawGazeSample], params: &IvtParams, space: PixelSpace) -> Option<Fixation> {
    let first = run.first()?;
    let last = run.last()?;
    let duration = last.time_sec - first.time_sec;
    if duration < params.min_duration_sec {
        return None;
    }

    let count = run.len() as f64;
    let (sum_x, sum_y) = run.iter().fold((0.0, 0.0), |(sx, sy), s| {
        let (x, y) = space.to_pixels(s.x_norm, s.y_norm);
        (sx + x, sy + y)
    });

    Some(Fixation::new(
        first.time_sec as f32,
        duration as f32,
        (sum_x / count) as f32,
        (sum_y / count) as f32,
    ))
}

/// Apply the configured join to raw I-VT fixations.
pub fn join_ivt(
    fixations: &[Fixation],
    params: &IvtParams,
    samples: &[RawGazeSample],
    calibration: Option<&ScreenCalibration>,
    space: PixelSpace,
) -> Vec<Fixation> {
    match (params.join, calibration) {
        (JoinType::None, _) => fixations.to_vec(),
        (JoinType::ByTime, _) => merge_by_time(fixations, params.merge_sec),
        (JoinType::ByTimeAndAngle, Some(calibration)) => join_by_time_and_angle(
            fixations,
            params.merge_sec,
            params.merge_angle_deg,
            samples,
            calibration,
            space,
        ),
        (JoinType::ByTimeAndAngle, None) => fixations.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cal() -> ScreenCalibration {
        ScreenCalibration::new(1920.0, 1080.0, 480.0, 270.0)
    }

    fn params() -> IvtParams {
        IvtParams {
            speed_threshold_deg_per_sec: 30.0,
            min_duration_sec: 0.06,
            merge_sec: 0.075,
            merge_angle_deg: 0.5,
            join: JoinType::ByTimeAndAngle,
        }
    }

    /// 100 Hz stream: fixation, saccade, fixation.
    fn two_fixation_stream() -> Vec<RawGazeSample> {
        (0..40)
            .map(|i| {
                let t = i as f64 * 0.01;
                let x = match i {
                    0..=14 => 0.3,
                    15..=19 => 0.3 + 0.08 * (i - 14) as f32,
                    _ => 0.7,
                };
                RawGazeSample::new(t, x, 0.5, 0.6)
            })
            .collect()
    }

    #[test]
    fn test_velocity_of_static_gaze_is_zero() {
        let samples: Vec<_> = (0..5)
            .map(|i| RawGazeSample::new(i as f64 * 0.01, 0.5, 0.5, 0.6))
            .collect();
        let v = angular_velocities(&samples, &cal());
        assert_eq!(v.len(), 5);
        assert!(v[0].is_infinite());
        assert!(v[1..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_velocity_magnitude() {
        // 0.01 of screen width = 4.8 mm at 600 mm over 10 ms
        let samples = vec![
            RawGazeSample::new(0.0, 0.50, 0.5, 0.6),
            RawGazeSample::new(0.01, 0.51, 0.5, 0.6),
        ];
        let v = angular_velocities(&samples, &cal());
        let expected = (4.8f64).atan2(600.0).to_degrees() / 0.01;
        assert!((v[1] - expected).abs() < 0.5);
    }

    #[test]
    fn test_discarded_transitions() {
        let samples = vec![
            RawGazeSample::new(0.0, 0.5, 0.5, 0.6),
            // dt above the continuity ceiling
            RawGazeSample::new(0.5, 0.5, 0.5, 0.6),
            // no distance on either side
            RawGazeSample::new(0.51, 0.5, 0.5, 0.0),
            RawGazeSample::new(0.52, 0.5, 0.5, 0.0),
            // implausible jump across the screen
            RawGazeSample::new(0.53, 0.5, 0.5, 0.6),
            RawGazeSample::new(0.54, 0.0, 0.0, 0.6),
        ];
        let v = angular_velocities(&samples, &cal());
        assert!(v[1].is_infinite());
        // falls back to the previous sample's distance
        assert!(v[2].is_finite());
        assert!(v[3].is_infinite());
        assert!(v[4].is_finite());
        assert!(v[5].is_infinite());
    }

    #[test]
    fn test_detects_fixations_around_saccade() {
        let space = cal().screen_space();
        let fixations = detect_ivt(&two_fixation_stream(), &params(), Some(&cal()), space);

        assert_eq!(fixations.len(), 2);
        assert!((fixations[0].start_sec - 0.0).abs() < 1e-6);
        assert!((fixations[0].dur_sec - 0.14).abs() < 1e-4);
        assert!((fixations[0].x_px - 576.0).abs() < 0.5);
        // The run opens at the last saccade sample, which already sits on target
        assert!((fixations[1].start_sec - 0.19).abs() < 1e-4);
        assert!((fixations[1].dur_sec - 0.20).abs() < 1e-4);
        assert!((fixations[1].x_px - 1344.0).abs() < 0.5);
        assert!(fixations[0].end_sec() <= fixations[1].start_sec);
    }

    #[test]
    fn test_missing_calibration_yields_nothing() {
        let stream = two_fixation_stream();
        let space = PixelSpace::new(1920.0, 1080.0);
        assert!(detect_ivt(&stream, &params(), None, space).is_empty());

        let zero = ScreenCalibration::new(0.0, 0.0, 0.0, 0.0);
        assert!(detect_ivt(&stream, &params(), Some(&zero), space).is_empty());
    }

    #[test]
    fn test_short_run_is_dropped() {
        let p = IvtParams {
            min_duration_sec: 0.5,
            ..params()
        };
        let space = cal().screen_space();
        assert!(detect_ivt(&two_fixation_stream(), &p, Some(&cal()), space).is_empty());
    }

    #[test]
    fn test_join_variants() {
        // Two fixations 0.05 s apart, 4 px (1 mm, ~0.1 deg) apart
        let samples: Vec<_> = (0..60)
            .map(|i| RawGazeSample::new(i as f64 * 0.01, 0.5, 0.5, 0.6))
            .collect();
        let fixations = vec![
            Fixation::new(0.0, 0.2, 960.0, 540.0),
            Fixation::new(0.25, 0.2, 964.0, 540.0),
        ];
        let space = cal().screen_space();

        let none = IvtParams {
            join: JoinType::None,
            ..params()
        };
        assert_eq!(join_ivt(&fixations, &none, &samples, Some(&cal()), space).len(), 2);

        let by_time = IvtParams {
            join: JoinType::ByTime,
            ..params()
        };
        assert_eq!(join_ivt(&fixations, &by_time, &samples, Some(&cal()), space).len(), 1);

        assert_eq!(join_ivt(&fixations, &params(), &samples, Some(&cal()), space).len(), 1);

        let tight = IvtParams {
            merge_angle_deg: 0.05,
            ..params()
        };
        assert_eq!(join_ivt(&fixations, &tight, &samples, Some(&cal()), space).len(), 2);
    }
}
