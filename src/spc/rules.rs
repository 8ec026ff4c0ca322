//! Nelson Rule 2: a sustained run on one side of the center line.
//!
//! A run is a maximal block of consecutive values strictly above (or
//! strictly below) the reference mean. A value equal to the mean, or a NaN,
//! ends any run in progress. Runs reaching the configured length (9 by
//! default) are reported once over their full extent, never as overlapping
//! windows.
//!
//! # References
//!
//! - Nelson, L.S. (1984). "The Shewhart Control Chart: Tests for Special Causes",
//!   *Journal of Quality Technology* 16(4), pp. 237-239.
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.

use std::collections::BTreeSet;

use crate::config::{AnalysisConfig, SpcConfig};
use crate::error::Result;

/// Side of the center line a run sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RunSide {
    /// Strictly greater than the mean.
    Above,
    /// Strictly less than the mean.
    Below,
}

/// One qualifying run, with inclusive index bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSequence {
    /// Index of the first point of the run.
    pub start_index: usize,
    /// Index of the last point of the run.
    pub end_index: usize,
    /// Side of the mean.
    pub side: RunSide,
}

impl RunSequence {
    /// Number of points in the run.
    pub fn len(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    /// Always `false`; a run holds at least one point.
    pub fn is_empty(&self) -> bool {
        false
    }
}

fn side_of(value: f64, mean: f64) -> Option<RunSide> {
    if value > mean {
        Some(RunSide::Above)
    } else if value < mean {
        Some(RunSide::Below)
    } else {
        None
    }
}

/// Runs of at least 9 points on one side of `mean`.
///
/// # Examples
///
/// ```
/// use u_quality::spc::{nelson_rule2_sequences, RunSide};
///
/// let mut values = vec![1.0; 10];
/// values.push(-1.0);
/// let runs = nelson_rule2_sequences(&values, 0.0);
/// assert_eq!(runs.len(), 1);
/// assert_eq!((runs[0].start_index, runs[0].end_index), (0, 9));
/// assert_eq!(runs[0].side, RunSide::Above);
/// ```
pub fn nelson_rule2_sequences(values: &[f64], mean: f64) -> Vec<RunSequence> {
    runs_of(values, mean, SpcConfig::default().nelson_run_length)
}

/// Runs of at least `config.spc.nelson_run_length` points on one side of `mean`.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
/// `config` fails [`AnalysisConfig::validate`].
pub fn nelson_rule2_sequences_with_config(
    values: &[f64],
    mean: f64,
    config: &AnalysisConfig,
) -> Result<Vec<RunSequence>> {
    config.validate()?;
    Ok(runs_of(values, mean, config.spc.nelson_run_length))
}

fn runs_of(values: &[f64], mean: f64, min_len: usize) -> Vec<RunSequence> {
    let mut runs = Vec::new();
    // (start, side) of the run in progress
    let mut current: Option<(usize, RunSide)> = None;

    let close = |start: usize, end: usize, side: RunSide, runs: &mut Vec<RunSequence>| {
        if end + 1 - start >= min_len {
            runs.push(RunSequence {
                start_index: start,
                end_index: end,
                side,
            });
        }
    };

    for (i, &v) in values.iter().enumerate() {
        let side = side_of(v, mean);
        match (current, side) {
            (Some((_, cur)), Some(s)) if cur == s => {}
            (Some((start, cur)), _) => {
                close(start, i - 1, cur, &mut runs);
                current = side.map(|s| (i, s));
            }
            (None, _) => current = side.map(|s| (i, s)),
        }
    }
    if let Some((start, side)) = current {
        close(start, values.len() - 1, side, &mut runs);
    }

    log::trace!(
        "nelson rule 2: {} qualifying runs in {} points",
        runs.len(),
        values.len()
    );
    runs
}

/// Every index covered by a qualifying Rule 2 run.
///
/// # Examples
///
/// ```
/// use u_quality::spc::nelson_rule2_violation_points;
///
/// assert_eq!(nelson_rule2_violation_points(&[2.0; 9], 0.0).len(), 9);
/// assert!(nelson_rule2_violation_points(&[2.0; 8], 0.0).is_empty());
/// ```
pub fn nelson_rule2_violation_points(values: &[f64], mean: f64) -> BTreeSet<usize> {
    covered(&nelson_rule2_sequences(values, mean))
}

/// [`nelson_rule2_violation_points`] with an explicit run length.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
/// `config` fails [`AnalysisConfig::validate`].
pub fn nelson_rule2_violation_points_with_config(
    values: &[f64],
    mean: f64,
    config: &AnalysisConfig,
) -> Result<BTreeSet<usize>> {
    Ok(covered(&nelson_rule2_sequences_with_config(values, mean, config)?))
}

fn covered(runs: &[RunSequence]) -> BTreeSet<usize> {
    runs.iter()
        .flat_map(|r| r.start_index..=r.end_index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nine_above_flags_all() {
        let points = nelson_rule2_violation_points(&[1.0; 9], 0.0);
        assert_eq!(points, (0..9).collect());
    }

    #[test]
    fn test_eight_is_not_enough() {
        assert!(nelson_rule2_sequences(&[1.0; 8], 0.0).is_empty());
    }

    #[test]
    fn test_point_on_mean_breaks_run() {
        let mut values = vec![1.0; 6];
        values.push(0.0);
        values.extend(vec![1.0; 6]);
        assert!(nelson_rule2_violation_points(&values, 0.0).is_empty());
    }

    #[test]
    fn test_long_run_reported_once() {
        let runs = nelson_rule2_sequences(&[-3.0; 15], 0.0);
        assert_eq!(
            runs,
            vec![RunSequence {
                start_index: 0,
                end_index: 14,
                side: RunSide::Below
            }]
        );
        assert_eq!(runs[0].len(), 15);
    }

    #[test]
    fn test_side_switch_starts_new_run() {
        let mut values = vec![1.0; 9];
        values.extend(vec![-1.0; 10]);
        let runs = nelson_rule2_sequences(&values, 0.0);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].side, RunSide::Above);
        assert_eq!((runs[1].start_index, runs[1].end_index), (9, 18));
        assert_eq!(runs[1].side, RunSide::Below);
    }

    #[test]
    fn test_run_in_the_middle() {
        let mut values = vec![-1.0, 0.0];
        values.extend(vec![5.0; 9]);
        values.push(0.0);
        let runs = nelson_rule2_sequences(&values, 0.0);
        assert_eq!((runs[0].start_index, runs[0].end_index), (2, 10));
    }

    #[test]
    fn test_nan_breaks_run() {
        let mut values = vec![1.0; 5];
        values.push(f64::NAN);
        values.extend(vec![1.0; 5]);
        assert!(nelson_rule2_sequences(&values, 0.0).is_empty());
    }

    #[test]
    fn test_configured_run_length() {
        let mut config = AnalysisConfig::default();
        config.spc.nelson_run_length = 6;
        let runs = nelson_rule2_sequences_with_config(&[2.0; 6], 1.0, &config).unwrap();
        assert_eq!(runs.len(), 1);
        let points = nelson_rule2_violation_points_with_config(&[2.0; 6], 1.0, &config).unwrap();
        assert_eq!(points.len(), 6);
    }

    #[test]
    fn test_run_length_below_two_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.spc.nelson_run_length = 1;
        assert!(nelson_rule2_sequences_with_config(&[2.0; 6], 1.0, &config).is_err());
        assert!(nelson_rule2_violation_points_with_config(&[2.0; 6], 1.0, &config).is_err());
    }

    #[test]
    fn test_empty() {
        assert!(nelson_rule2_sequences(&[], 0.0).is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn runs_are_long_disjoint_and_one_sided(
            values in proptest::collection::vec(-3i8..=3, 0..80)
        ) {
            let values: Vec<f64> = values.into_iter().map(f64::from).collect();
            let runs = nelson_rule2_sequences(&values, 0.0);
            let mut prev_end: Option<usize> = None;
            for r in &runs {
                prop_assert!(r.len() >= 9);
                if let Some(e) = prev_end {
                    prop_assert!(r.start_index > e);
                }
                prev_end = Some(r.end_index);
                for &v in &values[r.start_index..=r.end_index] {
                    match r.side {
                        RunSide::Above => prop_assert!(v > 0.0),
                        RunSide::Below => prop_assert!(v < 0.0),
                    }
                }
                // maximal: neighbours are not on the same side
                if r.start_index > 0 {
                    prop_assert_ne!(side_of(values[r.start_index - 1], 0.0), Some(r.side));
                }
                if r.end_index + 1 < values.len() {
                    prop_assert_ne!(side_of(values[r.end_index + 1], 0.0), Some(r.side));
                }
            }
        }
    }
}
