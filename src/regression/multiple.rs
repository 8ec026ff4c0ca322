//! Ordinary least squares with several predictors.
//!
//! Two layers:
//!
//! - [`multiple_linear_regression`]: slice-based OLS core returning
//!   [`OlsFit`] (coefficients, standard errors, t/p values, R², F, VIF)
//! - [`calculate_multiple_regression`]: rows-based model with categorical
//!   dummies and optional interactions, returning [`MultiRegressionResult`]
//!   with labelled coefficients, collinearity warnings and an insight line
//!
//! # Examples
//!
//! ```
//! use u_quality::regression::multiple_linear_regression;
//!
//! let x1 = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
//! let x2 = [2.0, 1.0, 3.0, 2.0, 4.0, 3.0, 5.0, 4.0];
//! let y  = [5.1, 5.0, 9.2, 8.9, 13.1, 12.0, 17.2, 15.9];
//! let result = multiple_linear_regression(&[&x1, &x2], &y).unwrap();
//! assert!(result.r_squared > 0.95);
//! assert_eq!(result.coefficients.len(), 3); // intercept + 2 predictors
//! ```

use std::cmp::Ordering;

use super::design::{dedup_columns, DesignMatrix, DesignSpec, RegressionOptions, Term};
use crate::config::AnalysisConfig;
use crate::data::Row;
use crate::error::Result;
use crate::matrix::Matrix;
use u_numflow::special;
use u_numflow::stats;

/// Result of a multiple linear regression: y = Xβ + ε.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OlsFit {
    /// Coefficient vector [β₀, β₁, ..., βₚ] (intercept first).
    pub coefficients: Vec<f64>,
    /// Standard errors of coefficients.
    pub std_errors: Vec<f64>,
    /// t-statistics for each coefficient.
    pub t_statistics: Vec<f64>,
    /// Two-sided p-values for each coefficient.
    pub p_values: Vec<f64>,
    /// Coefficient of determination (R²).
    pub r_squared: f64,
    /// Adjusted R² = 1 - (1-R²)(n-1)/(n-p-1).
    pub adjusted_r_squared: f64,
    /// F-statistic for overall significance.
    pub f_statistic: f64,
    /// p-value for F-statistic.
    pub f_p_value: f64,
    /// √(SSE/n).
    pub rmse: f64,
    /// Residual standard error, √(SSE/(n-p-1)).
    pub residual_se: f64,
    /// Residuals.
    pub residuals: Vec<f64>,
    /// Fitted values.
    pub fitted: Vec<f64>,
    /// VIF for each predictor (excludes intercept); `None` when the
    /// auxiliary regression cannot be fitted.
    pub vif: Vec<Option<f64>>,
    /// Sample size.
    pub n: usize,
    /// Number of predictors (excluding intercept).
    pub p: usize,
    /// n - p - 1.
    pub df_residual: usize,
}

// ---------------------------------------------------------------------------
// OLS core
// ---------------------------------------------------------------------------

/// Computes multiple linear regression via OLS with the default configuration.
///
/// # Arguments
///
/// * `predictors`: slice of predictor variable slices. Each inner slice is
///   one predictor's observations. All must have the same length.
/// * `y`: response variable observations.
///
/// # Returns
///
/// `None` if n < p+2, predictor lengths differ, inputs contain non-finite
/// values, or X'X is singular.
///
/// # References
///
/// Draper & Smith (1998). "Applied Regression Analysis", 3rd edition.
/// Montgomery, Peck & Vining (2012). "Introduction to Linear Regression Analysis", 5th edition.
pub fn multiple_linear_regression(predictors: &[&[f64]], y: &[f64]) -> Option<OlsFit> {
    ols_on_slices(predictors, y, &AnalysisConfig::default())
}

/// [`multiple_linear_regression`] with an explicit configuration.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
/// `config` fails [`AnalysisConfig::validate`].
pub fn multiple_linear_regression_with_config(
    predictors: &[&[f64]],
    y: &[f64],
    config: &AnalysisConfig,
) -> Result<Option<OlsFit>> {
    config.validate()?;
    Ok(ols_on_slices(predictors, y, config))
}

pub(crate) fn ols_on_slices(
    predictors: &[&[f64]],
    y: &[f64],
    config: &AnalysisConfig,
) -> Option<OlsFit> {
    let p = predictors.len();
    let n = y.len();
    if p == 0 || n < p + 2 {
        return None;
    }
    for pred in predictors {
        if pred.len() != n || pred.iter().any(|v| !v.is_finite()) {
            return None;
        }
    }
    if y.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let ncols = p + 1;
    let mut x_data = Vec::with_capacity(n * ncols);
    for i in 0..n {
        x_data.push(1.0);
        for pred in predictors {
            x_data.push(pred[i]);
        }
    }
    let x_mat = Matrix::new(n, ncols, x_data)?;
    fit_design(&x_mat, y, config)
}

/// OLS on a design matrix whose column 0 is the intercept.
fn fit_design(x_mat: &Matrix, y: &[f64], config: &AnalysisConfig) -> Option<OlsFit> {
    let mut fit = fit_core(x_mat, y, config.matrix.pivot_tolerance)?;
    fit.vif = compute_vif(x_mat, config.matrix.pivot_tolerance);
    Some(fit)
}

/// Normal-equation solve without VIF.
///
/// # Algorithm
///
/// β = (X'X)⁻¹ X'y, SE(βⱼ) = √(MSE · [(X'X)⁻¹]ⱼⱼ).
fn fit_core(x_mat: &Matrix, y: &[f64], tolerance: f64) -> Option<OlsFit> {
    let n = x_mat.rows();
    let ncols = x_mat.cols();
    if ncols < 2 || y.len() != n || n < ncols + 1 {
        return None;
    }
    let p = ncols - 1;

    let xt = x_mat.transpose();
    let xtx = xt.multiply(x_mat)?;
    let xty = xt.mul_vec(y)?;
    let Some(xtx_inv) = xtx.inverse_with_tolerance(tolerance) else {
        log::debug!("ols: X'X is singular ({ncols} columns, {n} rows)");
        return None;
    };
    let coefficients = xtx_inv.mul_vec(&xty)?;

    let fitted = x_mat.mul_vec(&coefficients)?;
    let residuals: Vec<f64> = y
        .iter()
        .zip(fitted.iter())
        .map(|(&yi, &fi)| yi - fi)
        .collect();

    let y_mean = stats::mean(y)?;
    let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
    let ss_tot: f64 = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum();

    let nf = n as f64;
    let pf = p as f64;
    let df_res = nf - pf - 1.0;

    let r_squared = if ss_tot > 1e-300 {
        1.0 - ss_res / ss_tot
    } else {
        1.0
    };
    let adjusted_r_squared = 1.0 - (1.0 - r_squared) * (nf - 1.0) / df_res;

    let mse = ss_res / df_res;
    let residual_se = mse.sqrt();
    let rmse = (ss_res / nf).sqrt();

    let mut std_errors = Vec::with_capacity(ncols);
    let mut t_statistics = Vec::with_capacity(ncols);
    let mut p_values = Vec::with_capacity(ncols);
    for (j, &coeff_j) in coefficients.iter().enumerate() {
        let se = (xtx_inv.get(j, j) * mse).max(0.0).sqrt();
        std_errors.push(se);
        let t = if se > 1e-300 {
            coeff_j / se
        } else if coeff_j == 0.0 {
            0.0
        } else {
            f64::INFINITY
        };
        t_statistics.push(t);
        p_values.push(2.0 * (1.0 - special::t_distribution_cdf(t.abs(), df_res)));
    }

    // F = (SS_reg / p) / (SS_res / (n-p-1))
    let ss_reg = ss_tot - ss_res;
    let f_statistic = if mse > 1e-300 {
        (ss_reg / pf) / mse
    } else if ss_reg > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };
    let f_p_value = if f_statistic.is_infinite() {
        0.0
    } else {
        1.0 - special::f_distribution_cdf(f_statistic, pf, df_res)
    };

    Some(OlsFit {
        coefficients,
        std_errors,
        t_statistics,
        p_values,
        r_squared,
        adjusted_r_squared,
        f_statistic,
        f_p_value,
        rmse,
        residual_se,
        residuals,
        fitted,
        vif: vec![Some(1.0); p],
        n,
        p,
        df_residual: n - p - 1,
    })
}

/// VIF for each non-intercept column by regressing it on all the others.
fn compute_vif(x_mat: &Matrix, tolerance: f64) -> Vec<Option<f64>> {
    let n = x_mat.rows();
    let p = x_mat.cols().saturating_sub(1);
    if p < 2 {
        return vec![Some(1.0); p];
    }

    (1..=p)
        .map(|j| {
            let target = x_mat.column(j);
            let mut data = Vec::with_capacity(n * p);
            for i in 0..n {
                let row = x_mat.row(i);
                data.extend(row.iter().enumerate().filter(|&(c, _)| c != j).map(|(_, v)| *v));
            }
            let others = Matrix::new(n, p, data)?;
            let r2 = fit_core(&others, &target, tolerance)?.r_squared;
            if r2 < 1.0 - 1e-15 {
                Some(1.0 / (1.0 - r2))
            } else {
                Some(f64::INFINITY)
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Rows-based model
// ---------------------------------------------------------------------------

/// One row of the coefficient table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coefficient {
    /// Term label; the intercept is `"(Intercept)"`.
    pub term: String,
    /// Estimate.
    pub coefficient: f64,
    /// Standard error.
    pub std_error: f64,
    /// Estimate / standard error.
    pub t_value: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Variance inflation factor; `None` for the intercept or when the
    /// auxiliary regression fails.
    pub vif: Option<f64>,
}

/// A term ranked by the size of its standardized effect.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopPredictor {
    /// Term label.
    pub term: String,
    /// coefficient · sd(term) / sd(y).
    pub standardized_coefficient: f64,
}

/// Label used for the intercept row.
pub const INTERCEPT_LABEL: &str = "(Intercept)";

/// Multiple regression over tabular rows.
///
/// `coefficients.len() == terms.len() + 1`; the intercept comes first.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiRegressionResult {
    /// Rows used in the fit.
    pub n: usize,
    /// Non-intercept columns after expansion.
    pub p: usize,
    /// Intercept estimate.
    pub intercept: f64,
    /// Coefficient table, intercept first.
    pub coefficients: Vec<Coefficient>,
    /// Non-intercept terms.
    pub terms: Vec<Term>,
    /// R².
    pub r_squared: f64,
    /// Adjusted R².
    pub adjusted_r_squared: f64,
    /// Overall F statistic.
    pub f_statistic: f64,
    /// p-value of the F test.
    pub p_value: f64,
    /// √(SSE/n).
    pub rmse: f64,
    /// n − p − 1.
    pub df_residual: usize,
    /// Fitted values of the rows used.
    pub fitted: Vec<f64>,
    /// Residuals of the rows used.
    pub residuals: Vec<f64>,
    /// Terms by descending |standardized coefficient|.
    pub top_predictors: Vec<TopPredictor>,
    /// One message per term whose VIF exceeds the warning threshold.
    pub vif_warnings: Vec<String>,
    /// Any VIF above the collinearity threshold.
    pub has_collinearity: bool,
    /// One-sentence interpretation.
    pub insight: String,
    /// Encoding used for the fit; drives [`MultiRegressionResult::predict`].
    pub design: DesignSpec,
}

impl MultiRegressionResult {
    /// Predicted outcome for a new row, encoded like the training rows.
    ///
    /// Returns `None` if the row lacks a predictor or carries a level unseen
    /// during fitting.
    pub fn predict(&self, row: &Row) -> Option<f64> {
        let cols = self.design.encode(row)?;
        let slopes = self.coefficients.iter().skip(1).map(|c| c.coefficient);
        Some(self.intercept + cols.iter().zip(slopes).map(|(x, b)| x * b).sum::<f64>())
    }
}

/// Regresses `outcome` on `predictors` with the default configuration.
///
/// # Examples
///
/// ```
/// use u_quality::data::Row;
/// use u_quality::regression::{calculate_multiple_regression, RegressionOptions};
///
/// let rows: Vec<Row> = (0..12)
///     .map(|i| {
///         let x1 = i as f64;
///         let x2 = ((i * 7) % 5) as f64;
///         Row::new().with("x1", x1).with("x2", x2).with("y", 5.0 + 2.0 * x1 + 3.0 * x2)
///     })
///     .collect();
/// let r = calculate_multiple_regression(&rows, "y", &["x1", "x2"], &RegressionOptions::default())
///     .unwrap();
/// assert!((r.intercept - 5.0).abs() < 1e-8);
/// assert!((r.coefficients[1].coefficient - 2.0).abs() < 1e-8);
/// assert!((r.coefficients[2].coefficient - 3.0).abs() < 1e-8);
/// assert_eq!(r.coefficients.len(), r.terms.len() + 1);
/// ```
pub fn calculate_multiple_regression(
    rows: &[Row],
    outcome: &str,
    predictors: &[&str],
    options: &RegressionOptions,
) -> Option<MultiRegressionResult> {
    regress_rows(rows, outcome, predictors, options, &AnalysisConfig::default())
}

/// Rows-based multiple regression with an explicit configuration.
///
/// # Returns
///
/// `Ok(None)` if no predictors are given, fewer than p + 2 complete rows
/// remain, the outcome is constant, or X'X is singular.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
/// `config` fails [`AnalysisConfig::validate`].
pub fn calculate_multiple_regression_with_config(
    rows: &[Row],
    outcome: &str,
    predictors: &[&str],
    options: &RegressionOptions,
    config: &AnalysisConfig,
) -> Result<Option<MultiRegressionResult>> {
    config.validate()?;
    Ok(regress_rows(rows, outcome, predictors, options, config))
}

fn regress_rows(
    rows: &[Row],
    outcome: &str,
    predictors: &[&str],
    options: &RegressionOptions,
    config: &AnalysisConfig,
) -> Option<MultiRegressionResult> {
    let predictors = dedup_columns(predictors);
    let design = DesignMatrix::build(rows, outcome, &predictors, options)?;
    let n = design.y.len();
    let p = design.spec.width();
    if p == 0 || n < p + 2 {
        log::debug!("regression {outcome}: {n} complete rows for {p} terms");
        return None;
    }
    let sd_y = stats::std_dev(&design.y)?;
    if sd_y <= 0.0 {
        log::debug!("regression {outcome}: constant outcome");
        return None;
    }

    let fit = fit_design(&design.x, &design.y, config)?;
    let terms = design.spec.terms().to_vec();

    let mut coefficients = Vec::with_capacity(p + 1);
    coefficients.push(Coefficient {
        term: INTERCEPT_LABEL.to_string(),
        coefficient: fit.coefficients[0],
        std_error: fit.std_errors[0],
        t_value: fit.t_statistics[0],
        p_value: fit.p_values[0],
        vif: None,
    });
    for (j, term) in terms.iter().enumerate() {
        coefficients.push(Coefficient {
            term: term.label.clone(),
            coefficient: fit.coefficients[j + 1],
            std_error: fit.std_errors[j + 1],
            t_value: fit.t_statistics[j + 1],
            p_value: fit.p_values[j + 1],
            vif: fit.vif.get(j).copied().flatten(),
        });
    }

    let mut top_predictors: Vec<TopPredictor> = terms
        .iter()
        .enumerate()
        .map(|(j, term)| {
            let sd_x = stats::std_dev(&design.term_column(j)).unwrap_or(0.0);
            TopPredictor {
                term: term.label.clone(),
                standardized_coefficient: fit.coefficients[j + 1] * sd_x / sd_y,
            }
        })
        .collect();
    top_predictors.sort_by(|a, b| {
        b.standardized_coefficient
            .abs()
            .partial_cmp(&a.standardized_coefficient.abs())
            .unwrap_or(Ordering::Equal)
    });

    let rc = &config.regression;
    let mut vif_warnings = Vec::new();
    let mut has_collinearity = false;
    for c in coefficients.iter().skip(1) {
        let Some(vif) = c.vif else { continue };
        if vif > rc.vif_collinearity {
            has_collinearity = true;
            vif_warnings.push(format!("{}: VIF = {vif:.1} (severe collinearity)", c.term));
        } else if vif > rc.vif_warning {
            vif_warnings.push(format!("{}: VIF = {vif:.1} (moderate collinearity)", c.term));
        }
    }
    if has_collinearity {
        log::warn!(
            "regression {outcome}: collinear predictors ({})",
            vif_warnings.join("; ")
        );
    }

    let is_significant = fit.f_p_value < config.significance_level;
    let insight = insight(
        outcome,
        fit.r_squared,
        fit.adjusted_r_squared,
        fit.f_p_value,
        is_significant,
        top_predictors.first().map(|t| t.term.as_str()),
        has_collinearity,
    );

    Some(MultiRegressionResult {
        n,
        p,
        intercept: fit.coefficients[0],
        coefficients,
        terms,
        r_squared: fit.r_squared,
        adjusted_r_squared: fit.adjusted_r_squared,
        f_statistic: fit.f_statistic,
        p_value: fit.f_p_value,
        rmse: fit.rmse,
        df_residual: fit.df_residual,
        fitted: fit.fitted,
        residuals: fit.residuals,
        top_predictors,
        vif_warnings,
        has_collinearity,
        insight,
        design: design.spec,
    })
}

fn insight(
    outcome: &str,
    r_squared: f64,
    adjusted_r_squared: f64,
    p_value: f64,
    is_significant: bool,
    top: Option<&str>,
    has_collinearity: bool,
) -> String {
    let mut text = if is_significant {
        let mut s = format!(
            "The model explains {:.1}% of the variation in {outcome} \
             (adjusted R² = {adjusted_r_squared:.3}, p = {p_value:.3}).",
            r_squared * 100.0
        );
        if let Some(t) = top {
            s.push_str(&format!(" Strongest predictor: {t}."));
        }
        s
    } else {
        format!(
            "The model is not significant (p = {p_value:.3}); the predictors explain \
             {:.1}% of the variation in {outcome}.",
            r_squared * 100.0
        )
    };
    if has_collinearity {
        text.push_str(
            " Predictors are strongly collinear; individual coefficients are unreliable.",
        );
    }
    text
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn residuals_orthogonal_to_design(
            x1 in proptest::collection::vec(-100.0_f64..100.0, 8..30),
            seed in 0u64..1000,
        ) {
            let n = x1.len();
            let x2: Vec<f64> = (0..n).map(|i| ((i as u64 * 31 + seed) % 17) as f64).collect();
            let y: Vec<f64> = (0..n)
                .map(|i| 3.0 + 0.5 * x1[i] - x2[i] + ((i as u64 * 7 + seed) % 5) as f64)
                .collect();
            if let Some(r) = multiple_linear_regression(&[&x1, &x2], &y) {
                let scale: f64 = y.iter().map(|v| v.abs()).sum::<f64>().max(1.0);
                let s0: f64 = r.residuals.iter().sum();
                prop_assert!(s0.abs() < 1e-6 * scale);
                prop_assert!(r.r_squared <= 1.0 + 1e-9);
                prop_assert_eq!(r.coefficients.len(), 3);
            }
        }
    }
}
