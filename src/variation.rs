//! Variation decomposition for drill-down views.
//!
//! Two questions a drill-down UI asks of an outcome column:
//!
//! - Which levels of a factor carry the between-group variation?
//!   ([`category_contributions`])
//! - Isolating one level after another, how much of the original variation
//!   does the chain of filters explain? ([`drill_down_variation`])
//!
//! Both build on the sums of squares from [`crate::anova`].
//!
//! # Examples
//!
//! ```
//! use u_quality::data::{Filter, Row};
//! use u_quality::variation::drill_down_variation;
//!
//! let mut rows = Vec::new();
//! for (plant, line, y) in [
//!     ("P1", "A", 10.0), ("P1", "A", 11.0), ("P1", "B", 14.0), ("P1", "B", 15.0),
//!     ("P2", "A", 20.0), ("P2", "A", 21.0), ("P2", "B", 20.5), ("P2", "B", 21.5),
//! ] {
//!     rows.push(Row::new().with("plant", plant).with("line", line).with("y", y));
//! }
//! let steps = [Filter::new("plant", "P1"), Filter::new("line", "B")];
//! let chain = drill_down_variation(&rows, "y", &steps).unwrap();
//! assert_eq!(chain.len(), 2);
//! assert_eq!(chain[1].rows_remaining, 2);
//! assert!(chain[1].cumulative_eta_squared <= chain[0].cumulative_eta_squared);
//! ```

use crate::anova::SumsOfSquares;
use crate::data::{group_by, Filter, Row};
use u_numflow::stats;

/// Share of the variation attributable to one factor level.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CategoryContribution {
    /// Level label.
    pub level: String,
    /// Observations at this level.
    pub n: usize,
    /// Mean outcome at this level.
    pub mean: f64,
    /// nᵢ(x̄ᵢ − x̄)².
    pub ss: f64,
    /// `ss` as a percentage of SST.
    pub pct_of_total: f64,
    /// `ss` as a percentage of SSB (0 when SSB is 0).
    pub pct_of_between: f64,
}

/// Per-level contribution to the between-group sum of squares.
///
/// Levels appear in first-encounter order.
///
/// # Returns
///
/// `None` with fewer than 2 levels, fewer than 3 observations, or no
/// variation in the outcome.
pub fn category_contributions(
    rows: &[Row],
    factor: &str,
    outcome: &str,
) -> Option<Vec<CategoryContribution>> {
    let groups = group_by(rows, factor, outcome);
    let ss = SumsOfSquares::from_groups(&groups)?;
    if ss.sst <= 0.0 {
        log::debug!("contributions {outcome} ~ {factor}: no variation");
        return None;
    }

    let contributions = groups
        .iter()
        .filter_map(|g| {
            let mean = stats::mean(&g.values)?;
            let n = g.values.len();
            let level_ss = n as f64 * (mean - ss.grand_mean).powi(2);
            Some(CategoryContribution {
                level: g.name.clone(),
                n,
                mean,
                ss: level_ss,
                pct_of_total: 100.0 * level_ss / ss.sst,
                pct_of_between: if ss.ssb > 0.0 {
                    100.0 * level_ss / ss.ssb
                } else {
                    0.0
                },
            })
        })
        .collect();
    Some(contributions)
}

/// One completed step of a drill-down chain.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrillDownStep {
    /// Factor split on.
    pub factor: String,
    /// Level isolated.
    pub value: String,
    /// Rows available before this step's filter.
    pub rows_before: usize,
    /// Rows kept by this step's filter.
    pub rows_remaining: usize,
    /// η² of `factor` on the rows before filtering.
    pub eta_squared: f64,
    /// Product of η² over this and all earlier steps.
    pub cumulative_eta_squared: f64,
}

/// Cumulative η² through a chain of level isolations.
///
/// For each filter in order, η² of the filter's column is computed on the
/// rows that survived the previous filters, then the filter is applied.
/// The chain stops at the first step whose η² is undefined.
///
/// # Returns
///
/// `None` if `steps` is empty or the first step cannot be computed.
pub fn drill_down_variation(
    rows: &[Row],
    outcome: &str,
    steps: &[Filter],
) -> Option<Vec<DrillDownStep>> {
    let mut remaining: Vec<Row> = rows.to_vec();
    let mut cumulative = 1.0;
    let mut chain = Vec::with_capacity(steps.len());

    for step in steps {
        let Some(eta) = SumsOfSquares::from_groups(&group_by(&remaining, &step.column, outcome))
            .and_then(|ss| ss.eta_squared())
        else {
            log::debug!(
                "drill-down on {outcome}: stopped at {} = {} after {} steps",
                step.column,
                step.value,
                chain.len()
            );
            break;
        };

        let rows_before = remaining.len();
        remaining.retain(|r| step.matches(r));
        cumulative *= eta;

        chain.push(DrillDownStep {
            factor: step.column.clone(),
            value: step.value.clone(),
            rows_before,
            rows_remaining: remaining.len(),
            eta_squared: eta,
            cumulative_eta_squared: cumulative,
        });
    }

    (!chain.is_empty()).then_some(chain)
}
