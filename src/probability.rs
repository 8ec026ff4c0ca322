//! Normal probability plot data.
//!
//! Sorts the sample, assigns each order statistic its Blom plotting
//! position, and maps that position to a standard normal quantile. A
//! confidence band around each observed value uses the asymptotic standard
//! error of a sample quantile.
//!
//! # Algorithm
//!
//! For the i-th smallest of n values (1-based):
//!
//! ```text
//! p  = (i − 0.375) / (n + 0.25)
//! z  = Φ⁻¹(p)            rational start, then Newton on Φ
//! se = min(σ·√(p(1−p)/n) / φ(z), cap·σ)
//! CI = x₍ᵢ₎ ± z_ci·se
//! ```
//!
//! # References
//!
//! - Blom, G. (1958). *Statistical Estimates and Transformed Beta-Variables*.
//!   Wiley.
//! - D'Agostino & Stephens (1986). *Goodness-of-Fit Techniques*, Chapter 2.

use crate::config::{AnalysisConfig, ProbabilityConfig};
use crate::error::Result;
use u_numflow::special;
use u_numflow::stats;

const MAX_NEWTON_STEPS: usize = 6;

/// One point of a normal probability plot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbabilityPoint {
    /// Observed value (order statistic).
    pub value: f64,
    /// Blom plotting position as a percentage in (0, 100).
    pub expected_percentile: f64,
    /// Standard normal quantile of the plotting position.
    pub z: f64,
    /// Value on the reference line, mean + z·σ.
    pub fitted: f64,
    /// Lower confidence bound.
    pub lower_ci: f64,
    /// Upper confidence bound.
    pub upper_ci: f64,
}

/// Probability plot points with the default configuration.
///
/// Non-finite values are dropped. Output is sorted ascending by value and
/// has one point per remaining value.
///
/// # Examples
///
/// ```
/// use u_quality::probability::calculate_probability_plot_data;
///
/// let pts = calculate_probability_plot_data(&[3.0, 1.0, 2.0]);
/// assert_eq!(pts.len(), 3);
/// assert_eq!(pts[0].value, 1.0);
/// assert!((pts[1].expected_percentile - 50.0).abs() < 1e-9);
/// assert!(pts[1].z.abs() < 1e-9);
/// assert!(pts.iter().all(|p| p.lower_ci <= p.value && p.value <= p.upper_ci));
/// ```
pub fn calculate_probability_plot_data(values: &[f64]) -> Vec<ProbabilityPoint> {
    plot_points(values, &ProbabilityConfig::default())
}

/// Probability plot points with an explicit configuration.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
/// `config` fails [`AnalysisConfig::validate`].
pub fn calculate_probability_plot_data_with_config(
    values: &[f64],
    config: &AnalysisConfig,
) -> Result<Vec<ProbabilityPoint>> {
    config.validate()?;
    Ok(plot_points(values, &config.probability))
}

fn plot_points(values: &[f64], band: &ProbabilityConfig) -> Vec<ProbabilityPoint> {
    let mut data: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    data.sort_by(f64::total_cmp);

    let Some(mean) = stats::mean(&data) else {
        return Vec::new();
    };
    let sigma = stats::std_dev(&data).unwrap_or(0.0);
    let n = data.len() as f64;
    let cap = band.se_cap_sigmas * sigma;
    let ci_z = band.ci_z;

    data.iter()
        .enumerate()
        .map(|(i, &value)| {
            let p = (i as f64 + 1.0 - 0.375) / (n + 0.25);
            let z = normal_quantile(p);
            let density = special::standard_normal_pdf(z);
            let se = if density > 0.0 {
                (sigma * (p * (1.0 - p) / n).sqrt() / density).min(cap)
            } else {
                cap
            };
            ProbabilityPoint {
                value,
                expected_percentile: 100.0 * p,
                z,
                fitted: mean + z * sigma,
                lower_ci: value - ci_z * se,
                upper_ci: value + ci_z * se,
            }
        })
        .collect()
}

/// Φ(z) from the regularized lower incomplete gamma: P(½, z²/2) = erf(|z|/√2).
fn normal_cdf(z: f64) -> f64 {
    let half = 0.5 * special::regularized_lower_gamma(0.5, 0.5 * z * z);
    if z < 0.0 {
        0.5 - half
    } else {
        0.5 + half
    }
}

/// Φ⁻¹(p), polished to near machine precision.
///
/// The rational approximation is only good to about 4.5 × 10⁻⁴, so it
/// seeds Newton's method on Φ(z) − p, which converges quadratically.
fn normal_quantile(p: f64) -> f64 {
    let mut z = special::inverse_normal_cdf(p);
    if !z.is_finite() {
        return z;
    }
    for _ in 0..MAX_NEWTON_STEPS {
        let density = special::standard_normal_pdf(z);
        if density <= 0.0 {
            break;
        }
        let step = (normal_cdf(z) - p) / density;
        z -= step;
        if step.abs() < 1e-14 {
            break;
        }
    }
    z
}
