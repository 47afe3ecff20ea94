//! Screen calibration and physical-unit conversion.
//!
//! Gaze arrives normalized to `[0.0, 1.0]`. Pixel output needs a target
//! [`PixelSpace`]; anything in degrees of visual angle additionally needs the
//! physical screen size from [`ScreenCalibration`] and an eye-to-screen
//! distance.

use serde::{Deserialize, Serialize};

/// Pixel and physical dimensions of the display the gaze was recorded on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ScreenCalibration {
    pub width_px: f64,
    pub height_px: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl ScreenCalibration {
    pub fn new(width_px: f64, height_px: f64, width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_px,
            height_px,
            width_mm,
            height_mm,
        }
    }

    /// All four dimensions finite and positive.
    pub fn is_available(&self) -> bool {
        [self.width_px, self.height_px, self.width_mm, self.height_mm]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }

    pub fn mm_per_px_x(&self) -> f64 {
        self.width_mm / self.width_px
    }

    pub fn mm_per_px_y(&self) -> f64 {
        self.height_mm / self.height_px
    }

    /// The full-screen pixel space of this calibration.
    pub fn screen_space(&self) -> PixelSpace {
        PixelSpace::new(self.width_px, self.height_px)
    }

    /// Physical distance (mm) between two normalized screen points.
    pub fn normalized_distance_mm(&self, dx_norm: f64, dy_norm: f64) -> f64 {
        (dx_norm * self.width_mm).hypot(dy_norm * self.height_mm)
    }

    /// Physical distance (mm) between two screen-pixel points.
    pub fn pixel_distance_mm(&self, dx_px: f64, dy_px: f64) -> f64 {
        (dx_px * self.mm_per_px_x()).hypot(dy_px * self.mm_per_px_y())
    }
}

/// Target pixel space for detector output (screen or stimulus-local).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSpace {
    pub width: f64,
    pub height: f64,
}

impl PixelSpace {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Map a normalized point into this space.
    pub fn to_pixels(&self, x_norm: f32, y_norm: f32) -> (f64, f64) {
        (x_norm as f64 * self.width, y_norm as f64 * self.height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Visual angle (degrees) subtended by a displacement at a viewing distance.
///
/// Returns `None` when the distance is non-positive or non-finite.
pub fn visual_angle_deg(displacement_mm: f64, distance_mm: f64) -> Option<f64> {
    if !distance_mm.is_finite() || distance_mm <= 0.0 || !displacement_mm.is_finite() {
        return None;
    }
    Some(displacement_mm.atan2(distance_mm).to_degrees())
}
