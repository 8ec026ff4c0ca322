//! Analysis configuration.
//!
//! Every tunable used by the engines lives in [`AnalysisConfig`], which is
//! passed explicitly to the `*_with_config` entry points. Those validate it
//! before computing and return [`Error::InvalidConfig`] for a bad value. The
//! plain entry points use [`AnalysisConfig::default`].
//!
//! # Examples
//!
//! ```
//! use u_quality::config::{AnalysisConfig, SigmaConvention};
//!
//! let mut config = AnalysisConfig::default();
//! config.capability.sigma = SigmaConvention::Population;
//! config.gage.acceptable_below = Some(20.0);
//! assert!(config.validate().is_ok());
//!
//! config.significance_level = 1.5;
//! assert!(config.validate().is_err());
//! ```

use crate::error::{Error, Result};

/// Top-level configuration shared by all analyses.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct AnalysisConfig {
    /// Matrix algebra settings.
    pub matrix: MatrixConfig,
    /// Significance level α for every hypothesis test (default 0.05).
    pub significance_level: f64,
    /// Regression settings.
    pub regression: RegressionConfig,
    /// ANOVA settings.
    pub anova: AnovaConfig,
    /// Gage R&R verdict bands.
    pub gage: GageConfig,
    /// Capability settings.
    pub capability: CapabilityConfig,
    /// Run-rule settings.
    pub spc: SpcConfig,
    /// Probability-plot settings.
    pub probability: ProbabilityConfig,
}

/// Matrix algebra settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct MatrixConfig {
    /// A pivot whose absolute value falls below this is treated as zero
    /// and the matrix is declared singular.
    pub pivot_tolerance: f64,
}

/// Regression settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RegressionConfig {
    /// Coefficients with VIF above this produce a warning.
    pub vif_warning: f64,
    /// Any VIF above this flags the model as collinear.
    pub vif_collinearity: f64,
    /// Minimum R² gain of the quadratic over the linear fit before the
    /// quadratic is recommended.
    pub quadratic_min_improvement: f64,
}

/// ANOVA settings.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct AnovaConfig {
    /// Whether lower outcome values are better. `None` infers it from the
    /// outcome column name.
    pub lower_is_better: Option<bool>,
}

/// Gage R&R verdict bands, in %GRR.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct GageConfig {
    /// %GRR strictly below this is `excellent`.
    pub excellent_below: f64,
    /// When set, %GRR from `excellent_below` up to (not including) this is
    /// `acceptable`.
    pub acceptable_below: Option<f64>,
    /// %GRR up to and including this is `marginal`; above is `unacceptable`.
    pub marginal_up_to: f64,
}

/// Which standard deviation drives control limits and capability indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SigmaConvention {
    /// Sample standard deviation, n − 1 denominator.
    #[default]
    Sample,
    /// Population standard deviation, n denominator.
    Population,
}

/// Capability settings.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct CapabilityConfig {
    /// Standard deviation convention.
    pub sigma: SigmaConvention,
}

/// Run-rule settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SpcConfig {
    /// Minimum run length for Nelson Rule 2.
    pub nelson_run_length: usize,
}

/// Probability-plot settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ProbabilityConfig {
    /// Critical value for the confidence band (1.96 for 95%).
    pub ci_z: f64,
    /// Standard error is capped at this many standard deviations.
    pub se_cap_sigmas: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            matrix: MatrixConfig::default(),
            significance_level: 0.05,
            regression: RegressionConfig::default(),
            anova: AnovaConfig::default(),
            gage: GageConfig::default(),
            capability: CapabilityConfig::default(),
            spc: SpcConfig::default(),
            probability: ProbabilityConfig::default(),
        }
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            pivot_tolerance: crate::matrix::DEFAULT_PIVOT_TOLERANCE,
        }
    }
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            vif_warning: 5.0,
            vif_collinearity: 10.0,
            quadratic_min_improvement: 0.02,
        }
    }
}

impl Default for GageConfig {
    fn default() -> Self {
        Self {
            excellent_below: 10.0,
            acceptable_below: None,
            marginal_up_to: 30.0,
        }
    }
}

impl Default for SpcConfig {
    fn default() -> Self {
        Self {
            nelson_run_length: 9,
        }
    }
}

impl Default for ProbabilityConfig {
    fn default() -> Self {
        Self {
            ci_z: 1.96,
            se_cap_sigmas: 10.0,
        }
    }
}

fn invalid(field: &'static str, reason: &'static str) -> Error {
    Error::InvalidConfig { field, reason }
}

impl AnalysisConfig {
    /// Checks every tunable for a usable value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let tol = self.matrix.pivot_tolerance;
        if !tol.is_finite() || tol <= 0.0 {
            return Err(invalid("matrix.pivot_tolerance", "must be finite and positive"));
        }
        let alpha = self.significance_level;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(invalid("significance_level", "must lie in (0, 1)"));
        }

        let reg = &self.regression;
        if !reg.vif_warning.is_finite() || reg.vif_warning < 1.0 {
            return Err(invalid("regression.vif_warning", "must be finite and at least 1"));
        }
        if !reg.vif_collinearity.is_finite() || reg.vif_collinearity < reg.vif_warning {
            return Err(invalid(
                "regression.vif_collinearity",
                "must be finite and not below vif_warning",
            ));
        }
        if !reg.quadratic_min_improvement.is_finite() || reg.quadratic_min_improvement < 0.0 {
            return Err(invalid(
                "regression.quadratic_min_improvement",
                "must be finite and non-negative",
            ));
        }

        let gage = &self.gage;
        if !gage.excellent_below.is_finite() || gage.excellent_below <= 0.0 {
            return Err(invalid("gage.excellent_below", "must be finite and positive"));
        }
        if let Some(acc) = gage.acceptable_below {
            if !acc.is_finite() || acc < gage.excellent_below || acc > gage.marginal_up_to {
                return Err(invalid(
                    "gage.acceptable_below",
                    "must lie between excellent_below and marginal_up_to",
                ));
            }
        }
        if !gage.marginal_up_to.is_finite() || gage.marginal_up_to < gage.excellent_below {
            return Err(invalid(
                "gage.marginal_up_to",
                "must be finite and not below excellent_below",
            ));
        }

        if self.spc.nelson_run_length < 2 {
            return Err(invalid("spc.nelson_run_length", "must be at least 2"));
        }

        let prob = &self.probability;
        if !prob.ci_z.is_finite() || prob.ci_z <= 0.0 {
            return Err(invalid("probability.ci_z", "must be finite and positive"));
        }
        if !prob.se_cap_sigmas.is_finite() || prob.se_cap_sigmas <= 0.0 {
            return Err(invalid(
                "probability.se_cap_sigmas",
                "must be finite and positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.matrix.pivot_tolerance - 1e-12).abs() < 1e-24);
        assert!((config.significance_level - 0.05).abs() < 1e-15);
        assert_eq!(config.spc.nelson_run_length, 9);
        assert_eq!(config.capability.sigma, SigmaConvention::Sample);
    }

    #[test]
    fn rejects_bad_tolerance() {
        let mut config = AnalysisConfig::default();
        config.matrix.pivot_tolerance = 0.0;
        assert_eq!(
            config.validate(),
            Err(invalid("matrix.pivot_tolerance", "must be finite and positive"))
        );
    }

    #[test]
    fn rejects_alpha_outside_unit_interval() {
        for alpha in [0.0, 1.0, -0.1, f64::NAN] {
            let mut config = AnalysisConfig::default();
            config.significance_level = alpha;
            assert!(config.validate().is_err(), "alpha = {alpha}");
        }
    }

    #[test]
    fn rejects_inverted_gage_bands() {
        let mut config = AnalysisConfig::default();
        config.gage.acceptable_below = Some(40.0);
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.gage.marginal_up_to = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_short_run_length() {
        let mut config = AnalysisConfig::default();
        config.spc.nelson_run_length = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_vif_collinearity_below_warning() {
        let mut config = AnalysisConfig::default();
        config.regression.vif_collinearity = 2.0;
        assert!(config.validate().is_err());
    }
}
