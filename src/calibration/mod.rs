//! Calibration analytics: resolved-set extraction, Brier scoring and
//! confidence binning. Pure, synchronous, no shared state.

pub mod engine;
pub mod extractor;

pub use engine::compute_report;
