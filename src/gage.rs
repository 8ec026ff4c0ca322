//! Gage R&R (measurement system analysis).
//!
//! Crossed two-factor random-effects ANOVA on measurement ~ part × operator.
//! The mean squares are converted to variance components through their
//! expected-mean-square equations:
//!
//! ```text
//! σ²_repeatability = MS_E
//! σ²_interaction   = max(0, (MS_PO − MS_E) / r)
//! σ²_operator      = max(0, (MS_O − MS_PO) / (p·r))
//! σ²_part          = max(0, (MS_P − MS_PO) / (o·r))
//! ```
//!
//! with p parts, o operators and r replicates per cell.
//!
//! # References
//!
//! - AIAG (2010), *Measurement Systems Analysis*, 4th ed., ANOVA method.
//! - Montgomery & Runger (1993), "Gauge Capability and Designed Experiments.
//!   Part I: Basic Methods", *Quality Engineering* 6(1).

use std::collections::HashMap;

use crate::config::{AnalysisConfig, GageConfig};
use crate::data::Row;
use crate::error::Result;
use u_numflow::stats;

/// Verdict on a measurement system from its %GRR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GageVerdict {
    /// Measurement error is negligible.
    Excellent,
    /// Acceptable (only produced when an acceptable band is configured).
    Acceptable,
    /// May be acceptable depending on the application.
    Marginal,
    /// Measurement system needs improvement.
    Unacceptable,
}

impl GageVerdict {
    /// Classifies a %GRR value against the configured bands.
    pub fn classify(pct_grr: f64, bands: &GageConfig) -> Self {
        if pct_grr < bands.excellent_below {
            return GageVerdict::Excellent;
        }
        if let Some(acceptable) = bands.acceptable_below {
            if pct_grr < acceptable {
                return GageVerdict::Acceptable;
            }
        }
        if pct_grr <= bands.marginal_up_to {
            GageVerdict::Marginal
        } else {
            GageVerdict::Unacceptable
        }
    }
}

/// Mean of the replicates of one part × operator cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionPoint {
    /// Part label.
    pub part: String,
    /// Operator label.
    pub operator: String,
    /// Mean of the cell's replicates.
    pub mean: f64,
}

/// One line of the two-factor ANOVA table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GageAnovaRow {
    /// Source of variation.
    pub source: String,
    /// Sum of squares.
    pub ss: f64,
    /// Degrees of freedom.
    pub df: usize,
    /// Mean square (0 for the total line).
    pub ms: f64,
}

/// Result of a Gage R&R study.
///
/// # Invariants
///
/// - `var_reproducibility == var_operator + var_interaction`
/// - `var_grr == var_repeatability + var_reproducibility`
/// - `var_total == var_part + var_grr`
/// - `pct_grr == 100 · sqrt(var_grr / var_total)`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GageRRResult {
    /// Number of parts.
    pub part_count: usize,
    /// Number of operators.
    pub operator_count: usize,
    /// Replicates used per cell.
    pub replicates: usize,
    /// part_count · operator_count · replicates.
    pub total_measurements: usize,
    /// Equipment variation.
    pub var_repeatability: f64,
    /// Operator main effect.
    pub var_operator: f64,
    /// Part × operator interaction.
    pub var_interaction: f64,
    /// Appraiser variation.
    pub var_reproducibility: f64,
    /// Part-to-part variation.
    pub var_part: f64,
    /// Total measurement-system variation.
    pub var_grr: f64,
    /// Total variation.
    pub var_total: f64,
    /// %GRR as a share of total study variation.
    pub pct_grr: f64,
    /// %Contribution (variance share) of repeatability.
    pub pct_contribution_repeatability: f64,
    /// %Contribution of reproducibility.
    pub pct_contribution_reproducibility: f64,
    /// %Contribution of part-to-part variation.
    pub pct_contribution_part: f64,
    /// Number of distinct categories, ⌊1.41·σ_part/σ_GRR⌋; `None` when
    /// the measurement system has no error at all.
    pub ndc: Option<u32>,
    /// Verdict from `pct_grr`.
    pub verdict: GageVerdict,
    /// One entry per part × operator cell.
    pub interaction_data: Vec<InteractionPoint>,
    /// Part, operator, interaction, repeatability and total lines.
    pub anova: Vec<GageAnovaRow>,
}

/// Gage R&R with the default verdict bands.
///
/// # Examples
///
/// ```
/// use u_quality::data::Row;
/// use u_quality::gage::{calculate_gage_rr, GageVerdict};
///
/// let mut rows = Vec::new();
/// for (part, size) in [("P1", 10.0), ("P2", 20.0), ("P3", 30.0)] {
///     for (op, bias) in [("Ann", 0.0), ("Bob", 0.05)] {
///         for noise in [-0.05, 0.05] {
///             let mm = size + bias + noise;
///             rows.push(Row::new().with("part", part).with("op", op).with("mm", mm));
///         }
///     }
/// }
/// let r = calculate_gage_rr(&rows, "part", "op", "mm").unwrap();
/// assert_eq!(r.replicates, 2);
/// assert_eq!(r.verdict, GageVerdict::Excellent);
/// ```
pub fn calculate_gage_rr(
    rows: &[Row],
    part_column: &str,
    operator_column: &str,
    measurement_column: &str,
) -> Option<GageRRResult> {
    gage_study(
        rows,
        part_column,
        operator_column,
        measurement_column,
        &GageConfig::default(),
    )
}

/// Gage R&R with an explicit configuration.
///
/// Rows missing a part, operator or finite measurement are skipped. The
/// replicate count is the smallest cell size; larger cells contribute their
/// first `r` measurements in row order so the design stays balanced.
///
/// # Returns
///
/// `None` if there are fewer than 2 parts, 2 operators, or 2 replicates in
/// every cell (a missing cell counts as zero replicates), or if the study
/// shows no variation at all.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
/// `config` fails [`AnalysisConfig::validate`].
pub fn calculate_gage_rr_with_config(
    rows: &[Row],
    part_column: &str,
    operator_column: &str,
    measurement_column: &str,
    config: &AnalysisConfig,
) -> Result<Option<GageRRResult>> {
    config.validate()?;
    Ok(gage_study(
        rows,
        part_column,
        operator_column,
        measurement_column,
        &config.gage,
    ))
}

fn gage_study(
    rows: &[Row],
    part_column: &str,
    operator_column: &str,
    measurement_column: &str,
    bands: &GageConfig,
) -> Option<GageRRResult> {
    let mut parts: Vec<String> = Vec::new();
    let mut operators: Vec<String> = Vec::new();
    let mut part_index: HashMap<String, usize> = HashMap::new();
    let mut operator_index: HashMap<String, usize> = HashMap::new();
    let mut cells: HashMap<(usize, usize), Vec<f64>> = HashMap::new();

    for row in rows {
        let (Some(part), Some(op), Some(x)) = (
            row.level(part_column),
            row.level(operator_column),
            row.number(measurement_column),
        ) else {
            continue;
        };
        let pi = *part_index.entry(part.clone()).or_insert_with(|| {
            parts.push(part);
            parts.len() - 1
        });
        let oi = *operator_index.entry(op.clone()).or_insert_with(|| {
            operators.push(op);
            operators.len() - 1
        });
        cells.entry((pi, oi)).or_default().push(x);
    }

    let p = parts.len();
    let o = operators.len();
    if p < 2 || o < 2 {
        log::debug!("gage r&r: need 2 parts and 2 operators, found {p} and {o}");
        return None;
    }

    let mut r = usize::MAX;
    for pi in 0..p {
        for oi in 0..o {
            r = r.min(cells.get(&(pi, oi)).map_or(0, Vec::len));
        }
    }
    if r < 2 {
        log::debug!("gage r&r: need 2 replicates in every cell, smallest cell has {r}");
        return None;
    }

    // balanced p × o × r layout
    let mut cell_values: Vec<Vec<&[f64]>> = Vec::with_capacity(p);
    for pi in 0..p {
        let mut row = Vec::with_capacity(o);
        for oi in 0..o {
            let values = cells.get(&(pi, oi))?;
            row.push(&values[..r]);
        }
        cell_values.push(row);
    }

    let cell_means: Vec<Vec<f64>> = cell_values
        .iter()
        .map(|row| row.iter().map(|c| stats::mean(c).unwrap_or(0.0)).collect())
        .collect();
    let part_means: Vec<f64> = cell_means
        .iter()
        .map(|row| row.iter().sum::<f64>() / o as f64)
        .collect();
    let operator_means: Vec<f64> = (0..o)
        .map(|oi| cell_means.iter().map(|row| row[oi]).sum::<f64>() / p as f64)
        .collect();
    let grand_mean = part_means.iter().sum::<f64>() / p as f64;

    let (pf, of, rf) = (p as f64, o as f64, r as f64);

    let spread = |means: &[f64]| means.iter().map(|m| (m - grand_mean).powi(2)).sum::<f64>();
    let ss_part = of * rf * spread(&part_means);
    let ss_operator = pf * rf * spread(&operator_means);
    let ss_cells = rf
        * cell_means
            .iter()
            .flatten()
            .map(|m| (m - grand_mean).powi(2))
            .sum::<f64>();
    let ss_interaction = (ss_cells - ss_part - ss_operator).max(0.0);
    let mut ss_error = 0.0;
    for (row, means) in cell_values.iter().zip(&cell_means) {
        for (cell, &m) in row.iter().zip(means) {
            ss_error += cell.iter().map(|x| (x - m).powi(2)).sum::<f64>();
        }
    }

    let df_part = p - 1;
    let df_operator = o - 1;
    let df_interaction = df_part * df_operator;
    let df_error = p * o * (r - 1);

    let ms_part = ss_part / df_part as f64;
    let ms_operator = ss_operator / df_operator as f64;
    let ms_interaction = ss_interaction / df_interaction as f64;
    let ms_error = ss_error / df_error as f64;

    let var_repeatability = ms_error;
    let var_interaction = ((ms_interaction - ms_error) / rf).max(0.0);
    let var_operator = ((ms_operator - ms_interaction) / (pf * rf)).max(0.0);
    let var_part = ((ms_part - ms_interaction) / (of * rf)).max(0.0);

    let var_reproducibility = var_operator + var_interaction;
    let var_grr = var_repeatability + var_reproducibility;
    let var_total = var_part + var_grr;
    if var_total <= 0.0 {
        log::debug!("gage r&r: no variation in the study");
        return None;
    }

    let pct_grr = 100.0 * (var_grr / var_total).sqrt();
    let verdict = GageVerdict::classify(pct_grr, bands);
    let ndc = (var_grr > 0.0).then(|| (1.41 * (var_part / var_grr).sqrt()).floor() as u32);

    let mut interaction_data = Vec::with_capacity(p * o);
    for (pi, part) in parts.iter().enumerate() {
        for (oi, op) in operators.iter().enumerate() {
            interaction_data.push(InteractionPoint {
                part: part.clone(),
                operator: op.clone(),
                mean: cell_means[pi][oi],
            });
        }
    }

    let anova = vec![
        anova_row("Part", ss_part, df_part, ms_part),
        anova_row("Operator", ss_operator, df_operator, ms_operator),
        anova_row("Part × Operator", ss_interaction, df_interaction, ms_interaction),
        anova_row("Repeatability", ss_error, df_error, ms_error),
        anova_row(
            "Total",
            ss_part + ss_operator + ss_interaction + ss_error,
            p * o * r - 1,
            0.0,
        ),
    ];

    Some(GageRRResult {
        part_count: p,
        operator_count: o,
        replicates: r,
        total_measurements: p * o * r,
        var_repeatability,
        var_operator,
        var_interaction,
        var_reproducibility,
        var_part,
        var_grr,
        var_total,
        pct_grr,
        pct_contribution_repeatability: 100.0 * var_repeatability / var_total,
        pct_contribution_reproducibility: 100.0 * var_reproducibility / var_total,
        pct_contribution_part: 100.0 * var_part / var_total,
        ndc,
        verdict,
        interaction_data,
        anova,
    })
}

fn anova_row(source: &str, ss: f64, df: usize, ms: f64) -> GageAnovaRow {
    GageAnovaRow {
        source: source.to_string(),
        ss,
        df,
        ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study(layout: &[(&str, &str, &[f64])]) -> Vec<Row> {
        layout
            .iter()
            .flat_map(|(part, op, values)| {
                values.iter().map(move |&v| {
                    Row::new()
                        .with("part", *part)
                        .with("operator", *op)
                        .with("value", v)
                })
            })
            .collect()
    }

    fn run(rows: &[Row]) -> Option<GageRRResult> {
        calculate_gage_rr(rows, "part", "operator", "value")
    }

    #[test]
    fn hand_computed_components() {
        let rows = study(&[
            ("1", "A", &[1.0, 3.0]),
            ("1", "B", &[1.0, 3.0]),
            ("2", "A", &[5.0, 7.0]),
            ("2", "B", &[5.0, 7.0]),
        ]);
        let r = run(&rows).expect("should compute");
        assert!((r.var_repeatability - 2.0).abs() < 1e-12);
        assert!(r.var_operator.abs() < 1e-12);
        assert!(r.var_interaction.abs() < 1e-12);
        assert!((r.var_part - 8.0).abs() < 1e-12);
        assert!((r.pct_grr - 100.0 * 0.2_f64.sqrt()).abs() < 1e-9);
        assert_eq!(r.verdict, GageVerdict::Unacceptable);
        assert_eq!(r.total_measurements, 8);
        assert_eq!(r.ndc, Some(2));
    }

    #[test]
    fn configured_bands_drive_the_verdict() {
        let rows = study(&[
            ("1", "A", &[1.0, 3.0]),
            ("1", "B", &[1.0, 3.0]),
            ("2", "A", &[5.0, 7.0]),
            ("2", "B", &[5.0, 7.0]),
        ]);
        let mut config = AnalysisConfig::default();
        config.gage.marginal_up_to = 50.0;
        let r = calculate_gage_rr_with_config(&rows, "part", "operator", "value", &config)
            .unwrap()
            .expect("should compute");
        assert_eq!(r.verdict, GageVerdict::Marginal);

        config.gage.marginal_up_to = 5.0;
        let invalid = calculate_gage_rr_with_config(&rows, "part", "operator", "value", &config);
        assert!(invalid.is_err());
    }

    #[test]
    fn precise_gauge_is_excellent() {
        let rows = study(&[
            ("P1", "A", &[10.01, 9.99, 10.00]),
            ("P1", "B", &[10.02, 10.00, 9.99]),
            ("P2", "A", &[15.00, 15.01, 14.99]),
            ("P2", "B", &[15.02, 14.99, 15.00]),
            ("P3", "A", &[20.00, 19.99, 20.01]),
            ("P3", "B", &[20.01, 20.00, 19.98]),
        ]);
        let r = run(&rows).expect("should compute");
        assert!(r.pct_grr < 10.0, "%GRR = {}", r.pct_grr);
        assert_eq!(r.verdict, GageVerdict::Excellent);
        assert_eq!(r.interaction_data.len(), 6);
        assert_eq!(r.interaction_data[0].part, "P1");
        assert_eq!(r.interaction_data[0].operator, "A");
        assert!((r.interaction_data[0].mean - 10.0).abs() < 1e-9);
    }

    #[test]
    fn noisy_gauge_is_unacceptable() {
        let rows = study(&[
            ("P1", "A", &[10.0, 12.5, 8.0]),
            ("P1", "B", &[13.0, 9.5, 11.0]),
            ("P2", "A", &[11.0, 8.5, 12.0]),
            ("P2", "B", &[9.0, 12.0, 10.5]),
        ]);
        let r = run(&rows).expect("should compute");
        assert!(r.pct_grr > 30.0, "%GRR = {}", r.pct_grr);
        assert_eq!(r.verdict, GageVerdict::Unacceptable);
    }

    #[test]
    fn operator_bias_shows_as_reproducibility() {
        let rows = study(&[
            ("P1", "A", &[10.0, 10.1]),
            ("P1", "B", &[11.0, 11.1]),
            ("P2", "A", &[20.0, 20.1]),
            ("P2", "B", &[21.0, 21.1]),
            ("P3", "A", &[30.0, 30.1]),
            ("P3", "B", &[31.0, 31.1]),
        ]);
        let r = run(&rows).expect("should compute");
        assert!(r.var_operator > r.var_repeatability);
        assert!(r.var_interaction.abs() < 1e-9);
    }

    #[test]
    fn unbalanced_cells_are_truncated() {
        let rows = study(&[
            ("1", "A", &[1.0, 3.0, 100.0]),
            ("1", "B", &[1.0, 3.0]),
            ("2", "A", &[5.0, 7.0]),
            ("2", "B", &[5.0, 7.0]),
        ]);
        let r = run(&rows).expect("should compute");
        assert_eq!(r.replicates, 2);
        assert!((r.var_repeatability - 2.0).abs() < 1e-12);
    }

    #[test]
    fn insufficient_designs_return_none() {
        // one operator
        let rows = study(&[("1", "A", &[1.0, 2.0]), ("2", "A", &[3.0, 4.0])]);
        assert!(run(&rows).is_none());
        // one part
        let rows = study(&[("1", "A", &[1.0, 2.0]), ("1", "B", &[3.0, 4.0])]);
        assert!(run(&rows).is_none());
        // single replicate
        let rows = study(&[
            ("1", "A", &[1.0]),
            ("1", "B", &[2.0]),
            ("2", "A", &[3.0]),
            ("2", "B", &[4.0]),
        ]);
        assert!(run(&rows).is_none());
        // missing cell
        let rows = study(&[
            ("1", "A", &[1.0, 2.0]),
            ("1", "B", &[2.0, 3.0]),
            ("2", "A", &[3.0, 4.0]),
        ]);
        assert!(run(&rows).is_none());
        // constant measurements
        let rows = study(&[
            ("1", "A", &[5.0, 5.0]),
            ("1", "B", &[5.0, 5.0]),
            ("2", "A", &[5.0, 5.0]),
            ("2", "B", &[5.0, 5.0]),
        ]);
        assert!(run(&rows).is_none());
    }

    #[test]
    fn verdict_bands() {
        let bands = GageConfig::default();
        assert_eq!(GageVerdict::classify(9.99, &bands), GageVerdict::Excellent);
        assert_eq!(GageVerdict::classify(10.0, &bands), GageVerdict::Marginal);
        assert_eq!(GageVerdict::classify(30.0, &bands), GageVerdict::Marginal);
        assert_eq!(GageVerdict::classify(30.01, &bands), GageVerdict::Unacceptable);

        let bands = GageConfig {
            acceptable_below: Some(20.0),
            ..GageConfig::default()
        };
        assert_eq!(GageVerdict::classify(15.0, &bands), GageVerdict::Acceptable);
        assert_eq!(GageVerdict::classify(25.0, &bands), GageVerdict::Marginal);
    }

    #[test]
    fn anova_table_totals() {
        let rows = study(&[
            ("1", "A", &[1.0, 3.0]),
            ("1", "B", &[2.0, 3.5]),
            ("2", "A", &[5.0, 7.0]),
            ("2", "B", &[6.0, 6.5]),
        ]);
        let r = run(&rows).expect("should compute");
        let all = [1.0, 3.0, 2.0, 3.5, 5.0, 7.0, 6.0, 6.5];
        let mean = all.iter().sum::<f64>() / 8.0;
        let sst: f64 = all.iter().map(|x| (x - mean).powi(2)).sum();
        let total = r.anova.last().expect("total line");
        assert!((total.ss - sst).abs() < 1e-9);
        assert_eq!(total.df, 7);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn component_identities_hold(
            parts in 2_usize..=5,
            operators in 2_usize..=3,
            replicates in 2_usize..=3,
            noise in proptest::collection::vec(-1.0_f64..1.0, 45),
        ) {
            let mut rows = Vec::new();
            let mut k = 0;
            for pi in 0..parts {
                for oi in 0..operators {
                    for _ in 0..replicates {
                        let v = 10.0 * pi as f64 + 0.3 * oi as f64 + noise[k % noise.len()];
                        k += 1;
                        rows.push(
                            Row::new()
                                .with("part", format!("P{pi}"))
                                .with("operator", format!("O{oi}"))
                                .with("value", v),
                        );
                    }
                }
            }
            let r = calculate_gage_rr(&rows, "part", "operator", "value").expect("valid design");
            prop_assert_eq!(r.var_reproducibility, r.var_operator + r.var_interaction);
            prop_assert_eq!(r.var_grr, r.var_repeatability + r.var_reproducibility);
            prop_assert_eq!(r.var_total, r.var_part + r.var_grr);
            prop_assert_eq!(r.pct_grr, 100.0 * (r.var_grr / r.var_total).sqrt());
            prop_assert!(r.var_operator >= 0.0 && r.var_interaction >= 0.0 && r.var_part >= 0.0);
            prop_assert_eq!(r.interaction_data.len(), parts * operators);
        }
    }
}
