//! Process capability and control-limit arithmetic.
//!
//! [`calculate_stats`] summarizes one measurement column for a control
//! chart: mean, σ, ±3σ limits, and, given [`SpecLimits`], the capability
//! indices and the out-of-spec share. Optional [`Grade`] tiers bucket the
//! values for display.
//!
//! # Indices
//!
//! - **Cp**: potential capability (spread vs tolerance)
//! - **Cpk**: actual capability (centering considered)
//! - **Cpu**, **Cpl**: one-sided indices
//! - **Cpm**: Taguchi capability (deviation from target)
//!
//! # References
//!
//! - Montgomery (2019), *Introduction to Statistical Quality Control*, 8th ed.

mod grades;
mod indices;

pub use grades::{classify_grades, grade_index, Grade, GradeCount};
pub use indices::{calculate_stats, calculate_stats_with_config, SpecLimits, StatsResult};
