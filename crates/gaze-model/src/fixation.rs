//! Detected fixation events.

use serde::{Deserialize, Serialize};

/// A period of stable gaze with its pixel centroid.
///
/// The pixel space is chosen by the caller (screen or stimulus-local).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fixation {
    /// Start time in seconds since stream start.
    pub start_sec: f32,
    /// Duration in seconds, never negative.
    pub dur_sec: f32,
    pub x_px: f32,
    pub y_px: f32,
}

impl Fixation {
    pub fn new(start_sec: f32, dur_sec: f32, x_px: f32, y_px: f32) -> Self {
        Self {
            start_sec,
            dur_sec: dur_sec.max(0.0),
            x_px,
            y_px,
        }
    }

    pub fn end_sec(&self) -> f32 {
        self.start_sec + self.dur_sec
    }

    /// Euclidean distance between centroids.
    pub fn distance_px(&self, other: &Fixation) -> f64 {
        let dx = (other.x_px - self.x_px) as f64;
        let dy = (other.y_px - self.y_px) as f64;
        dx.hypot(dy)
    }

    /// Seconds between this fixation's end and `next`'s start.
    pub fn gap_to(&self, next: &Fixation) -> f32 {
        next.start_sec - self.end_sec()
    }
}
