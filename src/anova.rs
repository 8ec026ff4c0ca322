//! One-way analysis of variance.
//!
//! Compares the mean of an outcome column across the levels of a factor
//! column. Also exposes the η² primitive that the drill-down decomposition
//! in [`crate::variation`] builds on.
//!
//! # Examples
//!
//! ```
//! use u_quality::anova::calculate_anova;
//! use u_quality::data::Row;
//!
//! let mut rows = Vec::new();
//! let lines = [
//!     ("A", [20.1, 19.8, 20.3]),
//!     ("B", [30.2, 29.9, 30.0]),
//!     ("C", [40.1, 39.7, 40.2]),
//! ];
//! for (line, values) in lines {
//!     for v in values {
//!         rows.push(Row::new().with("line", line).with("cycle_time", v));
//!     }
//! }
//! let r = calculate_anova(&rows, "line", "cycle_time").unwrap();
//! assert!(r.is_significant);
//! assert_eq!(r.df_between, 2);
//! assert_eq!(r.df_within, 6);
//! ```

use crate::config::AnalysisConfig;
use crate::data::{group_by, Group, Row};
use crate::error::Result;
use u_numflow::special;
use u_numflow::stats;

/// Summary of one factor level.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnovaGroup {
    /// Level label.
    pub name: String,
    /// Number of observations.
    pub n: usize,
    /// Group mean.
    pub mean: f64,
    /// Sample standard deviation (n − 1); 0 for a single observation.
    pub std_dev: f64,
    /// Smallest observation.
    pub min: f64,
    /// Largest observation.
    pub max: f64,
}

/// Result of a one-way ANOVA.
///
/// # Invariants
///
/// - `ssb + ssw == sst` (sst is defined as that sum)
/// - `eta_squared == ssb / sst`
/// - `df_between == k − 1`, `df_within == n − k`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnovaResult {
    /// Per-level summaries in first-encounter order.
    pub groups: Vec<AnovaGroup>,
    /// Mean of all observations.
    pub grand_mean: f64,
    /// Between-group sum of squares.
    pub ssb: f64,
    /// Within-group sum of squares.
    pub ssw: f64,
    /// Total sum of squares.
    pub sst: f64,
    /// k − 1.
    pub df_between: usize,
    /// n − k.
    pub df_within: usize,
    /// SSB / df_between.
    pub msb: f64,
    /// SSW / df_within.
    pub msw: f64,
    /// MSB / MSW.
    pub f_statistic: f64,
    /// Upper-tail F probability.
    pub p_value: f64,
    /// `p_value < α`.
    pub is_significant: bool,
    /// Fraction of total variation explained by the factor.
    pub eta_squared: f64,
    /// One-sentence interpretation.
    pub insight: String,
}

/// Sums of squares shared by ANOVA and the variation decomposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SumsOfSquares {
    /// Observations across all groups.
    pub n: usize,
    /// Non-empty groups.
    pub k: usize,
    /// Mean of all observations.
    pub grand_mean: f64,
    /// Between-group sum of squares.
    pub ssb: f64,
    /// Within-group sum of squares.
    pub ssw: f64,
    /// `ssb + ssw`.
    pub sst: f64,
}

impl SumsOfSquares {
    /// Computes SSB and SSW for the non-empty groups.
    ///
    /// Returns `None` with fewer than 2 non-empty groups or fewer than 3
    /// observations.
    pub fn from_groups(groups: &[Group]) -> Option<Self> {
        let filled: Vec<&Group> = groups.iter().filter(|g| !g.values.is_empty()).collect();
        let k = filled.len();
        let n: usize = filled.iter().map(|g| g.values.len()).sum();
        if k < 2 || n < 3 {
            return None;
        }

        let all: Vec<f64> = filled.iter().flat_map(|g| g.values.iter().copied()).collect();
        let grand_mean = stats::mean(&all)?;

        let mut ssb = 0.0;
        let mut ssw = 0.0;
        for g in &filled {
            let ni = g.values.len() as f64;
            let mean = stats::mean(&g.values)?;
            ssb += ni * (mean - grand_mean).powi(2);
            ssw += (ni - 1.0) * stats::variance(&g.values).unwrap_or(0.0);
        }

        Some(Self {
            n,
            k,
            grand_mean,
            ssb,
            ssw,
            sst: ssb + ssw,
        })
    }

    /// SSB / SST, or `None` when there is no variation at all.
    pub fn eta_squared(&self) -> Option<f64> {
        (self.sst > 0.0).then(|| self.ssb / self.sst)
    }
}

/// Outcome names for which a lower value is the better result.
const LOWER_IS_BETTER_KEYWORDS: [&str; 7] =
    ["time", "defect", "error", "reject", "delay", "cost", "waste"];

/// Guesses from the column name whether lower outcome values are better.
///
/// # Examples
///
/// ```
/// use u_quality::anova::lower_is_better;
/// assert!(lower_is_better("Cycle Time (s)"));
/// assert!(lower_is_better("DefectRate"));
/// assert!(!lower_is_better("yield"));
/// ```
pub fn lower_is_better(outcome: &str) -> bool {
    let lower = outcome.to_lowercase();
    LOWER_IS_BETTER_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// η² of `factor` on `outcome`.
///
/// Returns `None` under the same conditions as [`SumsOfSquares::from_groups`]
/// or when the outcome has no variation.
pub fn eta_squared(rows: &[Row], factor: &str, outcome: &str) -> Option<f64> {
    SumsOfSquares::from_groups(&group_by(rows, factor, outcome))?.eta_squared()
}

/// One-way ANOVA of `outcome` across the levels of `factor`, with the
/// default configuration.
pub fn calculate_anova(rows: &[Row], factor: &str, outcome: &str) -> Option<AnovaResult> {
    anova_rows(rows, factor, outcome, &AnalysisConfig::default())
}

/// One-way ANOVA with an explicit configuration.
///
/// Rows without a factor level or a finite outcome are skipped.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
/// `config` fails [`AnalysisConfig::validate`].
pub fn calculate_anova_with_config(
    rows: &[Row],
    factor: &str,
    outcome: &str,
    config: &AnalysisConfig,
) -> Result<Option<AnovaResult>> {
    config.validate()?;
    Ok(anova_rows(rows, factor, outcome, config))
}

fn anova_rows(
    rows: &[Row],
    factor: &str,
    outcome: &str,
    config: &AnalysisConfig,
) -> Option<AnovaResult> {
    let groups = group_by(rows, factor, outcome);
    log::trace!(
        "anova {outcome} ~ {factor}: {} groups from {} rows",
        groups.len(),
        rows.len()
    );
    anova_from_groups(&groups, factor, outcome, config)
}

/// One-way ANOVA over pre-grouped values.
///
/// # Algorithm
///
/// SSB = Σ nᵢ(x̄ᵢ − x̄)², SSW = Σ (nᵢ − 1)·sᵢ², F = (SSB/(k−1)) / (SSW/(n−k)),
/// p = P(F_{k−1, n−k} ≥ F).
///
/// # Returns
///
/// `None` if fewer than 2 non-empty groups, fewer than 3 observations,
/// either degrees of freedom is zero, or SSW is zero.
///
/// # References
///
/// Fisher (1925). "Statistical Methods for Research Workers".
fn anova_from_groups(
    groups: &[Group],
    factor: &str,
    outcome: &str,
    config: &AnalysisConfig,
) -> Option<AnovaResult> {
    let Some(ss) = SumsOfSquares::from_groups(groups) else {
        log::debug!("anova {outcome} ~ {factor}: fewer than 2 groups or 3 observations");
        return None;
    };

    let df_between = ss.k - 1;
    let df_within = ss.n - ss.k;
    if df_between == 0 || df_within == 0 || ss.ssw <= 0.0 {
        log::debug!(
            "anova {outcome} ~ {factor}: degenerate (df_within = {df_within}, ssw = {})",
            ss.ssw
        );
        return None;
    }

    let msb = ss.ssb / df_between as f64;
    let msw = ss.ssw / df_within as f64;
    let f_statistic = msb / msw;
    let p_value = if f_statistic.is_infinite() {
        0.0
    } else {
        1.0 - special::f_distribution_cdf(f_statistic, df_between as f64, df_within as f64)
    };
    let is_significant = p_value < config.significance_level;
    let eta_squared = ss.ssb / ss.sst;

    let summaries: Vec<AnovaGroup> = groups
        .iter()
        .filter(|g| !g.values.is_empty())
        .map(summarize)
        .collect();

    let lower = config
        .anova
        .lower_is_better
        .unwrap_or_else(|| lower_is_better(outcome));
    let insight = insight(&summaries, factor, outcome, lower, p_value, is_significant, eta_squared);

    Some(AnovaResult {
        groups: summaries,
        grand_mean: ss.grand_mean,
        ssb: ss.ssb,
        ssw: ss.ssw,
        sst: ss.sst,
        df_between,
        df_within,
        msb,
        msw,
        f_statistic,
        p_value,
        is_significant,
        eta_squared,
        insight,
    })
}

/// One-way ANOVA over plain samples, without rows.
///
/// Groups are named `"1"`, `"2"`, … in input order.
///
/// # Examples
///
/// ```
/// use u_quality::anova::one_way_anova;
///
/// let a = [20.0, 21.0, 19.0, 20.5];
/// let b = [30.0, 29.0, 31.0, 30.5];
/// let c = [40.0, 41.0, 39.0, 40.5];
/// let r = one_way_anova(&[&a, &b, &c]).unwrap();
/// assert!(r.is_significant);
/// assert_eq!(r.df_between, 2);
/// assert_eq!(r.df_within, 9);
/// ```
pub fn one_way_anova(samples: &[&[f64]]) -> Option<AnovaResult> {
    let groups: Vec<Group> = samples
        .iter()
        .enumerate()
        .map(|(i, s)| Group {
            name: (i + 1).to_string(),
            values: s.iter().copied().filter(|v| v.is_finite()).collect(),
        })
        .collect();
    anova_from_groups(&groups, "group", "value", &AnalysisConfig::default())
}

fn summarize(g: &Group) -> AnovaGroup {
    let n = g.values.len();
    let mean = stats::mean(&g.values).unwrap_or(0.0);
    let std_dev = stats::std_dev(&g.values).unwrap_or(0.0);
    let min = g.values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = g.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    AnovaGroup {
        name: g.name.clone(),
        n,
        mean,
        std_dev,
        min,
        max,
    }
}

fn insight(
    groups: &[AnovaGroup],
    factor: &str,
    outcome: &str,
    lower_is_better: bool,
    p_value: f64,
    is_significant: bool,
    eta_squared: f64,
) -> String {
    if !is_significant {
        return format!(
            "No significant difference in {outcome} across {factor} (p = {p_value:.3})."
        );
    }

    // first group wins ties
    let mut best = &groups[0];
    let mut worst = &groups[0];
    for g in &groups[1..] {
        let (better, worse) = if lower_is_better {
            (g.mean < best.mean, g.mean > worst.mean)
        } else {
            (g.mean > best.mean, g.mean < worst.mean)
        };
        if better {
            best = g;
        }
        if worse {
            worst = g;
        }
    }

    format!(
        "{} has the best {outcome} (mean {:.2}) and {} the worst (mean {:.2}); \
         {factor} explains {:.1}% of the variation (p = {p_value:.3}).",
        best.name,
        best.mean,
        worst.name,
        worst.mean,
        eta_squared * 100.0
    )
}
