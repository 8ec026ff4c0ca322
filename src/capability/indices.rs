//! Control limits and process capability indices (Cp, Cpk, Cpm).
//!
//! [`calculate_stats`] turns a column of measurements into the numbers a
//! control chart needs: center line, ±3σ limits, capability against the
//! customer's specification limits, the share of values out of spec, and
//! optional grade-tier counts.
//!
//! # References
//!
//! - Montgomery (2019), *Introduction to Statistical Quality Control*, 8th ed.,
//!   Chapter 8.
//! - Kane (1986), "Process Capability Indices", *Journal of Quality Technology*
//!   18(1), pp. 41--52.
//! - Chan, Cheng & Spiring (1988), "A New Measure of Process Capability: Cpm",
//!   *Journal of Quality Technology* 20(3), pp. 162--175.

use super::grades::{classify_grades, Grade, GradeCount};
use crate::config::{AnalysisConfig, SigmaConvention};
use crate::error::{Error, Result};
use u_numflow::stats;

/// Customer specification limits.
///
/// At least one of USL/LSL is present; when both are, USL > LSL.
///
/// # Examples
///
/// ```
/// use u_quality::capability::SpecLimits;
///
/// let spec = SpecLimits::new(Some(11.0), Some(9.0)).unwrap().with_target(10.0);
/// assert_eq!(spec.usl(), Some(11.0));
///
/// assert!(SpecLimits::new(None, None).is_err());
/// assert!(SpecLimits::new(Some(5.0), Some(10.0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpecLimits {
    usl: Option<f64>,
    lsl: Option<f64>,
    target: Option<f64>,
}

impl SpecLimits {
    /// Creates validated specification limits.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSpecLimits`] if both limits are absent, either is
    /// non-finite, or `usl <= lsl`.
    pub fn new(usl: Option<f64>, lsl: Option<f64>) -> Result<Self> {
        if usl.is_none() && lsl.is_none() {
            return Err(Error::InvalidSpecLimits(
                "at least one specification limit (USL or LSL) is required",
            ));
        }
        if usl.is_some_and(|u| !u.is_finite()) {
            return Err(Error::InvalidSpecLimits("USL must be finite"));
        }
        if lsl.is_some_and(|l| !l.is_finite()) {
            return Err(Error::InvalidSpecLimits("LSL must be finite"));
        }
        if let (Some(u), Some(l)) = (usl, lsl) {
            if u <= l {
                return Err(Error::InvalidSpecLimits("USL must be greater than LSL"));
            }
        }
        Ok(Self {
            usl,
            lsl,
            target: None,
        })
    }

    /// Sets the target used for Cpm. Without one, two-sided limits use their
    /// midpoint.
    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    /// Upper specification limit.
    pub fn usl(&self) -> Option<f64> {
        self.usl
    }

    /// Lower specification limit.
    pub fn lsl(&self) -> Option<f64> {
        self.lsl
    }

    /// Explicit or midpoint target.
    pub fn target(&self) -> Option<f64> {
        self.target.or(match (self.usl, self.lsl) {
            (Some(u), Some(l)) => Some((u + l) / 2.0),
            _ => None,
        })
    }

    /// `true` if `value` lies outside the limits.
    pub fn is_out_of_spec(&self, value: f64) -> bool {
        self.usl.is_some_and(|u| value > u) || self.lsl.is_some_and(|l| value < l)
    }
}

/// Descriptive statistics, control limits and capability of one column.
///
/// Capability fields are `None` without specification limits, when the
/// required limit is missing (Cp needs both), or when σ is zero.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsResult {
    /// Number of finite values used.
    pub n: usize,
    /// Mean.
    pub mean: f64,
    /// Standard deviation under the configured convention.
    pub std_dev: f64,
    /// mean + 3σ.
    pub ucl: f64,
    /// mean − 3σ.
    pub lcl: f64,
    /// (USL − LSL) / 6σ.
    pub cp: Option<f64>,
    /// min(Cpu, Cpl), or the one-sided index.
    pub cpk: Option<f64>,
    /// (USL − mean) / 3σ.
    pub cpu: Option<f64>,
    /// (mean − LSL) / 3σ.
    pub cpl: Option<f64>,
    /// Cp / √(1 + ((mean − target)/σ)²).
    pub cpm: Option<f64>,
    /// Percentage of values beyond a specification limit.
    pub out_of_spec_percentage: Option<f64>,
    /// Count per grade tier, in ascending `max` order.
    pub grade_counts: Option<Vec<GradeCount>>,
}

/// Computes [`StatsResult`] with the default configuration.
///
/// # Examples
///
/// ```
/// use u_quality::capability::{calculate_stats, SpecLimits};
///
/// let spec = SpecLimits::new(Some(13.0), Some(7.0)).unwrap();
/// let s = calculate_stats(&[9.0, 10.0, 11.0], Some(&spec), None);
/// assert!((s.cp.unwrap() - 1.0).abs() < 1e-12);
/// assert!((s.cpk.unwrap() - 1.0).abs() < 1e-12);
/// assert!((s.ucl - 13.0).abs() < 1e-12);
/// ```
pub fn calculate_stats(
    values: &[f64],
    spec: Option<&SpecLimits>,
    grades: Option<&[Grade]>,
) -> StatsResult {
    stats_for(values, spec, grades, SigmaConvention::default())
}

/// Computes [`StatsResult`] with an explicit configuration.
///
/// Non-finite values are ignored. An empty input yields an all-zero result
/// (grade tiers, when given, are reported with zero counts).
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if `config` fails
/// [`AnalysisConfig::validate`].
pub fn calculate_stats_with_config(
    values: &[f64],
    spec: Option<&SpecLimits>,
    grades: Option<&[Grade]>,
    config: &AnalysisConfig,
) -> Result<StatsResult> {
    config.validate()?;
    Ok(stats_for(values, spec, grades, config.capability.sigma))
}

fn stats_for(
    values: &[f64],
    spec: Option<&SpecLimits>,
    grades: Option<&[Grade]>,
    convention: SigmaConvention,
) -> StatsResult {
    let data: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let grade_counts = grades.map(|g| classify_grades(&data, g));

    let Some(mean) = stats::mean(&data) else {
        return StatsResult {
            out_of_spec_percentage: spec.map(|_| 0.0),
            grade_counts,
            ..StatsResult::default()
        };
    };

    let sigma = match convention {
        SigmaConvention::Sample => stats::std_dev(&data).unwrap_or(0.0),
        SigmaConvention::Population => stats::population_std_dev(&data).unwrap_or(0.0),
    };

    let mut result = StatsResult {
        n: data.len(),
        mean,
        std_dev: sigma,
        ucl: mean + 3.0 * sigma,
        lcl: mean - 3.0 * sigma,
        grade_counts,
        ..StatsResult::default()
    };

    if let Some(spec) = spec {
        let out = data.iter().filter(|&&v| spec.is_out_of_spec(v)).count();
        result.out_of_spec_percentage = Some(100.0 * out as f64 / data.len() as f64);

        if sigma > 0.0 {
            fill_indices(&mut result, spec, mean, sigma);
        } else {
            log::debug!("capability: zero spread, indices undefined");
        }
    }
    result
}

fn fill_indices(result: &mut StatsResult, spec: &SpecLimits, mean: f64, sigma: f64) {
    let cpu = spec.usl.map(|u| (u - mean) / (3.0 * sigma));
    let cpl = spec.lsl.map(|l| (mean - l) / (3.0 * sigma));
    let cp = match (spec.usl, spec.lsl) {
        (Some(u), Some(l)) => Some((u - l) / (6.0 * sigma)),
        _ => None,
    };
    let cpk = match (cpu, cpl) {
        (Some(u), Some(l)) => Some(u.min(l)),
        (Some(u), None) => Some(u),
        (None, Some(l)) => Some(l),
        (None, None) => None,
    };
    let cpm = cp.and_then(|cp_val| {
        let target = spec.target()?;
        let deviation_ratio = (mean - target) / sigma;
        Some(cp_val / (1.0 + deviation_ratio * deviation_ratio).sqrt())
    });

    result.cp = cp;
    result.cpk = cpk;
    result.cpu = cpu;
    result.cpl = cpl;
    result.cpm = cpm;
}
