//! Statistical Process Control (SPC) helpers.
//!
//! - [`ControlLimits`]: center line with ±3σ limits, Rule 1 checks
//! - [`nelson_rule2_sequences`]: runs of 9+ points on one side of the mean
//! - [`nelson_rule2_violation_points`]: indices covered by those runs
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - Nelson, L.S. (1984). "The Shewhart Control Chart: Tests for Special Causes",
//!   *Journal of Quality Technology* 16(4), pp. 237-239.

mod chart;
mod rules;

pub use chart::ControlLimits;
pub use rules::{
    nelson_rule2_sequences, nelson_rule2_sequences_with_config, nelson_rule2_violation_points,
    nelson_rule2_violation_points_with_config, RunSequence, RunSide,
};
