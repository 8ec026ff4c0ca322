//! Regression analysis.
//!
//! - [`calculate_regression`]: one predictor, linear vs quadratic
//! - [`calculate_multiple_regression`]: several predictors over rows, with
//!   categorical dummies, optional interactions, VIF and top predictors
//! - [`multiple_linear_regression`]: the slice-based OLS core
//!
//! All fits solve the normal equations β = (X'X)⁻¹X'y through
//! [`crate::matrix::Matrix`].
//!
//! # References
//!
//! - Draper & Smith (1998). "Applied Regression Analysis", 3rd edition.
//! - Montgomery, Peck & Vining (2012). "Introduction to Linear Regression
//!   Analysis", 5th edition.

mod design;
mod multiple;
mod simple;

pub use design::{DesignMatrix, DesignSpec, Predictor, RegressionOptions, Term, TermKind};
pub use multiple::{
    calculate_multiple_regression, calculate_multiple_regression_with_config,
    multiple_linear_regression, multiple_linear_regression_with_config, Coefficient,
    MultiRegressionResult, OlsFit, TopPredictor, INTERCEPT_LABEL,
};
pub use simple::{
    calculate_regression, calculate_regression_with_config, strength_rating, LinearFit,
    OptimumType, QuadraticFit, RecommendedFit, RegressionPoint, RegressionResult,
};
