//! Simple x → y regression with a linear and a quadratic candidate.
//!
//! Fits y = intercept + slope·x in closed form and y = a·x² + b·x + c by
//! OLS, then recommends the simpler model unless the curve earns its extra
//! parameter.
//!
//! # Examples
//!
//! ```
//! use u_quality::data::Row;
//! use u_quality::regression::{calculate_regression, RecommendedFit};
//!
//! let rows: Vec<Row> = [(1.0, 2.1), (2.0, 3.9), (3.0, 6.1), (4.0, 7.9), (5.0, 10.1)]
//!     .iter()
//!     .map(|&(x, y)| Row::new().with("speed", x).with("output", y))
//!     .collect();
//! let r = calculate_regression(&rows, "speed", "output").unwrap();
//! assert!((r.linear.slope - 2.0).abs() < 0.1);
//! assert!(r.linear.r_squared > 0.99);
//! assert_eq!(r.recommended_fit, RecommendedFit::Linear);
//! assert_eq!(r.strength_rating, 5);
//! ```

use super::multiple::ols_on_slices;
use crate::config::AnalysisConfig;
use crate::data::Row;
use crate::error::Result;
use u_numflow::special;
use u_numflow::stats;

/// Straight-line fit: y = intercept + slope · x.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearFit {
    /// Slope coefficient (β₁).
    pub slope: f64,
    /// Intercept (β₀).
    pub intercept: f64,
    /// Coefficient of determination (R²).
    pub r_squared: f64,
    /// p-value of the F test (1, n − 2).
    pub p_value: f64,
    /// `p_value < α`.
    pub is_significant: bool,
}

/// Whether the vertex of the parabola is a peak or a trough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OptimumType {
    /// a < 0.
    Maximum,
    /// a > 0.
    Minimum,
}

/// Parabolic fit: y = a·x² + b·x + c.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuadraticFit {
    /// Quadratic coefficient.
    pub a: f64,
    /// Linear coefficient.
    pub b: f64,
    /// Constant.
    pub c: f64,
    /// Coefficient of determination (R²).
    pub r_squared: f64,
    /// p-value of the F test (2, n − 3).
    pub p_value: f64,
    /// `p_value < α`.
    pub is_significant: bool,
    /// Vertex −b / 2a, only when it lies within the observed x range.
    pub optimum_x: Option<f64>,
    /// Fitted y at `optimum_x`.
    pub optimum_y: Option<f64>,
    /// Peak or trough.
    pub optimum_type: OptimumType,
}

/// Model recommended for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RecommendedFit {
    /// The straight line.
    Linear,
    /// The parabola.
    Quadratic,
    /// Neither fit is significant.
    None,
}

/// One observed (x, y) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegressionPoint {
    /// Predictor value.
    pub x: f64,
    /// Outcome value.
    pub y: f64,
}

/// Simple regression of one column on another.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegressionResult {
    /// Complete (x, y) pairs used.
    pub n: usize,
    /// Straight-line fit.
    pub linear: LinearFit,
    /// Parabolic fit; `None` with fewer than 4 points or a singular system.
    pub quadratic: Option<QuadraticFit>,
    /// Recommended model.
    pub recommended_fit: RecommendedFit,
    /// 1 (very weak) to 5 (very strong), from the R² of the recommended fit.
    pub strength_rating: u8,
    /// Observed pairs in row order.
    pub points: Vec<RegressionPoint>,
    /// One-sentence interpretation.
    pub insight: String,
}

/// Maps R² to a 1–5 strength rating.
///
/// # Examples
///
/// ```
/// use u_quality::regression::strength_rating;
/// assert_eq!(strength_rating(0.05), 1);
/// assert_eq!(strength_rating(0.45), 3);
/// assert_eq!(strength_rating(0.95), 5);
/// ```
pub fn strength_rating(r_squared: f64) -> u8 {
    match r_squared {
        r if r < 0.1 => 1,
        r if r < 0.3 => 2,
        r if r < 0.5 => 3,
        r if r < 0.7 => 4,
        _ => 5,
    }
}

fn strength_word(rating: u8) -> &'static str {
    match rating {
        1 => "very weak",
        2 => "weak",
        3 => "moderate",
        4 => "strong",
        _ => "very strong",
    }
}

/// Regresses `y_column` on `x_column` with the default configuration.
pub fn calculate_regression(
    rows: &[Row],
    x_column: &str,
    y_column: &str,
) -> Option<RegressionResult> {
    regress_pairs(rows, x_column, y_column, &AnalysisConfig::default())
}

/// Simple regression with an explicit configuration.
///
/// # Returns
///
/// `Ok(None)` if fewer than 3 complete pairs remain, or x or y is constant.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
/// `config` fails [`AnalysisConfig::validate`].
pub fn calculate_regression_with_config(
    rows: &[Row],
    x_column: &str,
    y_column: &str,
    config: &AnalysisConfig,
) -> Result<Option<RegressionResult>> {
    config.validate()?;
    Ok(regress_pairs(rows, x_column, y_column, config))
}

fn regress_pairs(
    rows: &[Row],
    x_column: &str,
    y_column: &str,
    config: &AnalysisConfig,
) -> Option<RegressionResult> {
    let points: Vec<RegressionPoint> = rows
        .iter()
        .filter_map(|r| {
            Some(RegressionPoint {
                x: r.number(x_column)?,
                y: r.number(y_column)?,
            })
        })
        .collect();
    let x: Vec<f64> = points.iter().map(|p| p.x).collect();
    let y: Vec<f64> = points.iter().map(|p| p.y).collect();

    let Some(linear) = linear_fit(&x, &y, config.significance_level) else {
        log::debug!(
            "regression {y_column} ~ {x_column}: {} pairs, or no spread",
            points.len()
        );
        return None;
    };
    let quadratic = quadratic_fit(&x, &y, config);

    let recommended_fit = match &quadratic {
        Some(q)
            if q.is_significant
                && q.r_squared - linear.r_squared >= config.regression.quadratic_min_improvement =>
        {
            RecommendedFit::Quadratic
        }
        _ if linear.is_significant => RecommendedFit::Linear,
        _ => RecommendedFit::None,
    };

    let best_r2 = match (&recommended_fit, &quadratic) {
        (RecommendedFit::Quadratic, Some(q)) => q.r_squared,
        _ => linear.r_squared,
    };
    let rating = strength_rating(best_r2);
    let insight = insight(
        x_column,
        y_column,
        &linear,
        quadratic.as_ref(),
        recommended_fit,
        rating,
    );

    Some(RegressionResult {
        n: points.len(),
        linear,
        quadratic,
        recommended_fit,
        strength_rating: rating,
        points,
        insight,
    })
}

/// Closed-form OLS line.
///
/// # Algorithm
///
/// β₁ = Sxy / Sxx, β₀ = ȳ − β₁·x̄, F = SSR / (SSE/(n−2)).
///
/// # References
///
/// Draper & Smith (1998). "Applied Regression Analysis", 3rd edition.
fn linear_fit(x: &[f64], y: &[f64], alpha: f64) -> Option<LinearFit> {
    let n = x.len();
    if n < 3 || n != y.len() {
        return None;
    }
    let x_mean = stats::mean(x)?;
    let y_mean = stats::mean(y)?;
    let ss_x: f64 = x.iter().map(|&xi| (xi - x_mean).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum();
    if ss_x < 1e-300 || ss_tot < 1e-300 {
        return None;
    }
    let s_xy: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (xi - x_mean) * (yi - y_mean))
        .sum();

    let slope = s_xy / ss_x;
    let intercept = y_mean - slope * x_mean;
    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (yi - intercept - slope * xi).powi(2))
        .sum();
    let r_squared = (1.0 - ss_res / ss_tot).clamp(0.0, 1.0);

    let df_res = (n - 2) as f64;
    let ss_reg = ss_tot - ss_res;
    let f_statistic = if ss_res > 1e-300 {
        ss_reg / (ss_res / df_res)
    } else {
        f64::INFINITY
    };
    let p_value = if f_statistic.is_infinite() {
        0.0
    } else {
        1.0 - special::f_distribution_cdf(f_statistic, 1.0, df_res)
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
        p_value,
        is_significant: p_value < alpha,
    })
}

fn quadratic_fit(x: &[f64], y: &[f64], config: &AnalysisConfig) -> Option<QuadraticFit> {
    let x2: Vec<f64> = x.iter().map(|v| v * v).collect();
    let fit = ols_on_slices(&[x, &x2], y, config)?;
    let (c, b, a) = (fit.coefficients[0], fit.coefficients[1], fit.coefficients[2]);

    let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let optimum_x = (a != 0.0)
        .then(|| -b / (2.0 * a))
        .filter(|v| v.is_finite() && (x_min..=x_max).contains(v));
    let optimum_y = optimum_x.map(|v| a * v * v + b * v + c);

    Some(QuadraticFit {
        a,
        b,
        c,
        r_squared: fit.r_squared,
        p_value: fit.f_p_value,
        is_significant: fit.f_p_value < config.significance_level,
        optimum_x,
        optimum_y,
        optimum_type: if a < 0.0 {
            OptimumType::Maximum
        } else {
            OptimumType::Minimum
        },
    })
}

fn insight(
    x_column: &str,
    y_column: &str,
    linear: &LinearFit,
    quadratic: Option<&QuadraticFit>,
    recommended: RecommendedFit,
    rating: u8,
) -> String {
    let strength = strength_word(rating);
    match (recommended, quadratic) {
        (RecommendedFit::Quadratic, Some(q)) => match (q.optimum_x, q.optimum_type) {
            (Some(ox), kind) => format!(
                "{y_column} follows a curved relationship with {x_column} ({strength}, \
                 R² = {:.3}), with a {} near {x_column} = {ox:.2}.",
                q.r_squared,
                if kind == OptimumType::Maximum {
                    "maximum"
                } else {
                    "minimum"
                }
            ),
            (None, _) => format!(
                "{y_column} follows a curved relationship with {x_column} ({strength}, \
                 R² = {:.3}).",
                q.r_squared
            ),
        },
        (RecommendedFit::Linear, _) => format!(
            "{y_column} {} by {:.3} per unit of {x_column} ({strength}, R² = {:.3}).",
            if linear.slope >= 0.0 { "rises" } else { "falls" },
            linear.slope.abs(),
            linear.r_squared
        ),
        _ => format!(
            "No significant relationship between {x_column} and {y_column} (p = {:.3}).",
            linear.p_value
        ),
    }
}
