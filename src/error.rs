//! Configuration and construction errors.
//!
//! Statistical degeneracy (too few groups, singular design matrix, zero
//! variance) is reported as `None` by the analyses themselves. The errors
//! here cover invalid inputs supplied by the programmer: malformed
//! specification limits, grade tiers, or configuration values.

use thiserror::Error;

/// Errors raised when validating caller-supplied configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Specification limits are missing, non-finite, or inverted.
    #[error("invalid specification limits: {0}")]
    InvalidSpecLimits(&'static str),

    /// A grade tier has a NaN upper bound or a blank label.
    #[error("invalid grade `{label}`: {reason}")]
    InvalidGrade {
        /// Label of the offending grade.
        label: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A tunable in [`AnalysisConfig`](crate::config::AnalysisConfig) is out of range.
    #[error("invalid configuration `{field}`: {reason}")]
    InvalidConfig {
        /// Dotted path of the field, e.g. `matrix.pivot_tolerance`.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Result alias for fallible constructors in this crate.
pub type Result<T> = std::result::Result<T, Error>;
