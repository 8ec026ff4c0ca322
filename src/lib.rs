//! # u-quality
//!
//! Statistical analysis engine for manufacturing-quality data: control-chart
//! statistics, process capability, ANOVA, simple and multiple regression,
//! Gage R&R, normal probability plots and drill-down variation analysis.
//!
//! Input is row-oriented tabular data ([`data::Row`]) plus column names;
//! output is plain, serializable result structures. Statistical degeneracy
//! (too few groups, singular design, zero variance) is reported as `None`,
//! never as an error. [`Error`] is reserved for invalid configuration.
//!
//! ## Modules
//!
//! - [`capability`]: control limits, Cp/Cpk/Cpm, out-of-spec share, grade tiers
//! - [`spc`]: control limits and Nelson Rule 2 run detection
//! - [`anova`]: one-way ANOVA and η²
//! - [`regression`]: simple (linear/quadratic) and multiple OLS with VIF
//! - [`gage`]: Gage R&R by crossed two-factor ANOVA
//! - [`probability`]: normal probability plot with confidence band
//! - [`variation`]: per-category contributions and drill-down η² chains
//! - [`data`], [`matrix`]: shared building blocks
//! - [`config`]: every tunable, with defaults
//!
//! ## Example
//!
//! ```
//! use u_quality::capability::{calculate_stats, SpecLimits};
//! use u_quality::spc::nelson_rule2_violation_points;
//!
//! let fill_weights = [500.2, 499.8, 500.1, 500.4, 499.9, 500.0, 500.3, 499.7];
//! let spec = SpecLimits::new(Some(501.0), Some(499.0))?;
//! let stats = calculate_stats(&fill_weights, Some(&spec), None);
//! assert!(stats.cpk.unwrap() > 1.0);
//! assert!(nelson_rule2_violation_points(&fill_weights, stats.mean).is_empty());
//! # Ok::<(), u_quality::Error>(())
//! ```
//!
//! ## Design Philosophy
//!
//! - **Pure functions**: every call computes a fresh result; nothing is cached
//! - **Explicit configuration**: `*_with_config` variants take an
//!   [`config::AnalysisConfig`] instead of global state
//! - **Research-backed**: algorithms reference the statistical literature

pub mod anova;
pub mod capability;
pub mod config;
pub mod data;
pub mod error;
pub mod gage;
pub mod matrix;
pub mod probability;
pub mod regression;
pub mod spc;
pub mod variation;

pub use error::{Error, Result};
