//! GazeLens Gaze Model
//!
//! Defines the core data contracts for gaze analysis:
//! - **Samples:** Raw per-sample gaze records and the binary record format
//! - **Settings:** Strongly typed fixation-detection settings
//! - **Calibration:** Screen dimensions and pixel/mm/degree conversion
//! - **Fixations:** Detected stable-gaze events
//! - **AOIs:** Areas of Interest and their pixel-space geometry
//!
//! Gaze coordinates are normalized to `[0.0, 1.0]` relative to the screen
//! until a detector maps them into a caller-chosen pixel space.

pub mod aoi;
pub mod calibration;
pub mod fixation;
pub mod sample;
pub mod settings;

pub use aoi::*;
pub use calibration::*;
pub use fixation::*;
pub use sample::*;
pub use settings::*;
