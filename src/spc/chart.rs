//! Control limits for a Shewhart individuals chart.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.

use crate::capability::StatsResult;

/// Control limits for a chart.
///
/// Represents the upper control limit (UCL), center line (CL), and lower
/// control limit (LCL) computed from the process data.
///
/// # Invariants
///
/// - `lcl <= cl <= ucl`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlLimits {
    /// Upper control limit (UCL = CL + 3 sigma).
    pub ucl: f64,
    /// Center line (process mean).
    pub cl: f64,
    /// Lower control limit (LCL = CL - 3 sigma).
    pub lcl: f64,
}

impl ControlLimits {
    /// Limits at `center ± 3·sigma`.
    ///
    /// Returns `None` if either input is non-finite or `sigma` is negative.
    pub fn three_sigma(center: f64, sigma: f64) -> Option<Self> {
        if !center.is_finite() || !sigma.is_finite() || sigma < 0.0 {
            return None;
        }
        Some(Self {
            ucl: center + 3.0 * sigma,
            cl: center,
            lcl: center - 3.0 * sigma,
        })
    }

    /// The limits already carried by a [`StatsResult`].
    pub fn from_stats(stats: &StatsResult) -> Self {
        Self {
            ucl: stats.ucl,
            cl: stats.mean,
            lcl: stats.lcl,
        }
    }

    /// `true` if `value` lies within `[lcl, ucl]`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lcl && value <= self.ucl
    }

    /// Indices of values outside the limits (Nelson Rule 1).
    ///
    /// # Examples
    ///
    /// ```
    /// use u_quality::spc::ControlLimits;
    ///
    /// let limits = ControlLimits::three_sigma(10.0, 1.0).unwrap();
    /// assert_eq!(limits.beyond_limits(&[10.0, 13.5, 6.9, 12.9]), vec![1, 2]);
    /// ```
    pub fn beyond_limits(&self, values: &[f64]) -> Vec<usize> {
        values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v.is_finite() && !self.contains(v))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::calculate_stats;

    #[test]
    fn test_three_sigma() {
        let limits = ControlLimits::three_sigma(25.0, 5.0 / 3.0).unwrap();
        assert!((limits.ucl - 30.0).abs() < 1e-12);
        assert!((limits.cl - 25.0).abs() < f64::EPSILON);
        assert!((limits.lcl - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_three_sigma_rejects_bad_input() {
        assert!(ControlLimits::three_sigma(f64::NAN, 1.0).is_none());
        assert!(ControlLimits::three_sigma(0.0, -1.0).is_none());
    }

    #[test]
    fn test_from_stats_matches_stats() {
        let stats = calculate_stats(&[9.0, 10.0, 11.0], None, None);
        let limits = ControlLimits::from_stats(&stats);
        assert!((limits.ucl - 13.0).abs() < 1e-12);
        assert!((limits.cl - 10.0).abs() < 1e-12);
        assert!((limits.lcl - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_is_inside() {
        let limits = ControlLimits {
            ucl: 30.0,
            cl: 25.0,
            lcl: 20.0,
        };
        assert!(limits.contains(30.0));
        assert!(limits.contains(20.0));
        assert!(!limits.contains(30.0001));
        assert!(limits.beyond_limits(&[f64::NAN, 25.0]).is_empty());
    }
}
