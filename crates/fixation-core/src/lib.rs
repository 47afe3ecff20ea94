//! GazeLens Fixation Core
//!
//! Turns raw gaze sample streams into fixations and AOI statistics:
//! - **Preprocessing:** Gap filling and mean/median noise reduction
//! - **I-DT:** Dispersion-threshold fixation identification
//! - **I-VT:** Velocity-threshold identification in degrees per second
//! - **Merging:** Time and time-plus-angle joins of adjacent fixations
//! - **AOI Analytics:** Dwell, visits, first entry, and saccade amplitudes
//!
//! This crate is pure computation: no I/O and no global state.
//! Callers that want memoization own a [`FixationCache`].

pub mod aoi_metrics;
pub mod cache;
pub mod idt;
pub mod ivt;
pub mod merge;
pub mod pipeline;
pub mod preprocess;

pub use aoi_metrics::{
    compute_aoi_metrics, AoiAnalyzer, AoiMetrics, MappedFixation, ResultFixations, StimulusRect,
};
pub use cache::{DetectionKey, FixationCache};
pub use pipeline::{FixationPipeline, PipelineStats};
pub use preprocess::Preprocessor;
