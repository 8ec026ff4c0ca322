//! Design-matrix construction from tabular rows.
//!
//! Predictors are encoded as:
//!
//! - **continuous**: one column of raw values
//! - **categorical**: one 0/1 dummy per level except the reference level,
//!   which is the first level encountered in row order
//! - **interaction** (optional): for every unordered pair of predictors, the
//!   product of every column of the first with every column of the second
//!
//! Rows with a missing or non-finite value in the outcome or any predictor
//! are dropped before levels are collected.

use std::collections::HashSet;

use crate::data::{levels, Row};
use crate::matrix::Matrix;

/// How the rows-based regression treats its predictors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RegressionOptions {
    /// Columns forced to be categorical. Columns not listed are treated as
    /// categorical only when every present value is non-numeric text.
    pub categorical_columns: Vec<String>,
    /// Add pairwise interaction terms.
    pub include_interactions: bool,
}

/// Kind of a model term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TermKind {
    /// Raw numeric predictor.
    Continuous,
    /// Dummy indicator of one categorical level.
    Categorical,
    /// Product of two other terms.
    Interaction,
}

/// One non-intercept column of the design matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Term {
    /// Display label: `X`, `Machine[B]`, or `X × Machine[B]`.
    pub label: String,
    /// Term kind.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: TermKind,
}

/// Encoding of one predictor column.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Predictor {
    /// Numeric column.
    Continuous {
        /// Column name.
        column: String,
    },
    /// Dummy-coded column.
    Categorical {
        /// Column name.
        column: String,
        /// Level absorbed into the intercept.
        reference: String,
        /// Levels with their own dummy, in encounter order.
        dummies: Vec<String>,
    },
}

impl Predictor {
    fn labels(&self) -> Vec<String> {
        match self {
            Predictor::Continuous { column } => vec![column.clone()],
            Predictor::Categorical {
                column, dummies, ..
            } => dummies.iter().map(|l| format!("{column}[{l}]")).collect(),
        }
    }

    fn kind(&self) -> TermKind {
        match self {
            Predictor::Continuous { .. } => TermKind::Continuous,
            Predictor::Categorical { .. } => TermKind::Categorical,
        }
    }

    /// Encoded columns for one row, or `None` if the row cannot be encoded.
    fn encode(&self, row: &Row) -> Option<Vec<f64>> {
        match self {
            Predictor::Continuous { column } => Some(vec![row.number(column)?]),
            Predictor::Categorical {
                column,
                reference,
                dummies,
            } => {
                let level = row.level(column)?;
                if &level != reference && !dummies.contains(&level) {
                    return None;
                }
                Some(
                    dummies
                        .iter()
                        .map(|d| if *d == level { 1.0 } else { 0.0 })
                        .collect(),
                )
            }
        }
    }
}

/// Reusable encoding of rows into design-matrix columns.
///
/// The same encoding fitted on the training rows is used to predict for
/// new rows.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesignSpec {
    predictors: Vec<Predictor>,
    include_interactions: bool,
    terms: Vec<Term>,
}

impl DesignSpec {
    /// The predictors in input order.
    pub fn predictors(&self) -> &[Predictor] {
        &self.predictors
    }

    /// Non-intercept terms, in column order.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Number of non-intercept columns.
    pub fn width(&self) -> usize {
        self.terms.len()
    }

    /// Encodes one row into its non-intercept columns.
    ///
    /// Returns `None` when a predictor is missing, non-finite, or a
    /// categorical level was not seen while building the design.
    pub fn encode(&self, row: &Row) -> Option<Vec<f64>> {
        let mains: Vec<Vec<f64>> = self
            .predictors
            .iter()
            .map(|p| p.encode(row))
            .collect::<Option<_>>()?;

        let mut out: Vec<f64> = mains.iter().flatten().copied().collect();
        if self.include_interactions {
            for i in 0..mains.len() {
                for j in (i + 1)..mains.len() {
                    for a in &mains[i] {
                        for b in &mains[j] {
                            out.push(a * b);
                        }
                    }
                }
            }
        }
        Some(out)
    }

    fn new(predictors: Vec<Predictor>, include_interactions: bool) -> Self {
        let labels: Vec<Vec<String>> = predictors.iter().map(Predictor::labels).collect();
        let mut terms: Vec<Term> = predictors
            .iter()
            .zip(&labels)
            .flat_map(|(p, ls)| {
                ls.iter().map(|l| Term {
                    label: l.clone(),
                    kind: p.kind(),
                })
            })
            .collect();

        if include_interactions {
            for i in 0..labels.len() {
                for j in (i + 1)..labels.len() {
                    for a in &labels[i] {
                        for b in &labels[j] {
                            terms.push(Term {
                                label: format!("{a} × {b}"),
                                kind: TermKind::Interaction,
                            });
                        }
                    }
                }
            }
        }

        Self {
            predictors,
            include_interactions,
            terms,
        }
    }
}

/// Design matrix with a leading intercept column, and the matching outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    /// Encoding used to build `x`.
    pub spec: DesignSpec,
    /// `n × (1 + p)` matrix; column 0 is all ones.
    pub x: Matrix,
    /// Outcome values of the kept rows.
    pub y: Vec<f64>,
    /// Rows dropped for missing or non-finite values.
    pub dropped: usize,
}

impl DesignMatrix {
    /// Builds the design matrix for `outcome ~ predictors`.
    ///
    /// Returns `None` when no predictors are given or no row survives.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_quality::data::Row;
    /// use u_quality::regression::{DesignMatrix, RegressionOptions, TermKind};
    ///
    /// let rows = vec![
    ///     Row::new().with("temp", 20.0).with("machine", "A").with("y", 1.0),
    ///     Row::new().with("temp", 25.0).with("machine", "B").with("y", 2.0),
    ///     Row::new().with("temp", 30.0).with("machine", "C").with("y", 3.0),
    ///     Row::new().with("temp", "n/a").with("machine", "C").with("y", 4.0),
    /// ];
    /// let options = RegressionOptions::default();
    /// let dm = DesignMatrix::build(&rows, "y", &["temp", "machine"], &options).unwrap();
    /// let labels: Vec<&str> = dm.spec.terms().iter().map(|t| t.label.as_str()).collect();
    /// assert_eq!(labels, ["temp", "machine[B]", "machine[C]"]);
    /// assert_eq!(dm.spec.terms()[1].kind, TermKind::Categorical);
    /// assert_eq!(dm.x.rows(), 3);
    /// assert_eq!(dm.dropped, 1);
    /// ```
    pub fn build(
        rows: &[Row],
        outcome: &str,
        predictors: &[&str],
        options: &RegressionOptions,
    ) -> Option<Self> {
        if predictors.is_empty() {
            return None;
        }

        let categorical: Vec<bool> = predictors
            .iter()
            .map(|&c| {
                options.categorical_columns.iter().any(|k| k == c) || is_text_column(rows, c)
            })
            .collect();

        let kept: Vec<&Row> = rows
            .iter()
            .filter(|r| {
                r.number(outcome).is_some()
                    && predictors.iter().zip(&categorical).all(|(&c, &cat)| {
                        if cat {
                            r.level(c).is_some()
                        } else {
                            r.number(c).is_some()
                        }
                    })
            })
            .collect();
        if kept.is_empty() {
            log::debug!("design {outcome}: no complete rows");
            return None;
        }

        let encoders: Vec<Predictor> = predictors
            .iter()
            .zip(&categorical)
            .map(|(&c, &cat)| {
                if cat {
                    let mut lv = levels(kept.iter().copied(), c).into_iter();
                    let reference = lv.next().unwrap_or_default();
                    Predictor::Categorical {
                        column: c.to_string(),
                        reference,
                        dummies: lv.collect(),
                    }
                } else {
                    Predictor::Continuous {
                        column: c.to_string(),
                    }
                }
            })
            .collect();

        let spec = DesignSpec::new(encoders, options.include_interactions);
        let width = spec.width() + 1;
        let mut data = Vec::with_capacity(kept.len() * width);
        let mut y = Vec::with_capacity(kept.len());
        for row in &kept {
            let cols = spec.encode(row)?;
            data.push(1.0);
            data.extend(cols);
            y.push(row.number(outcome)?);
        }
        let x = Matrix::new(kept.len(), width, data)?;

        log::trace!(
            "design {outcome}: {} rows kept, {} dropped, {} terms",
            kept.len(),
            rows.len() - kept.len(),
            spec.width()
        );

        Some(Self {
            spec,
            x,
            y,
            dropped: rows.len() - kept.len(),
        })
    }

    /// Non-intercept column `j` (0-based over terms).
    pub fn term_column(&self, j: usize) -> Vec<f64> {
        self.x.column(j + 1)
    }
}

/// `true` when every present value of `column` is non-numeric text.
fn is_text_column(rows: &[Row], column: &str) -> bool {
    let mut any = false;
    for row in rows {
        let cell = row.get(column);
        if cell.is_non_numeric_text() {
            any = true;
        } else if cell.as_number().is_some() {
            return false;
        }
    }
    any
}

/// Distinct column names in `predictors`, keeping first occurrence.
pub(crate) fn dedup_columns<'a>(predictors: &[&'a str]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    predictors.iter().copied().filter(|c| seen.insert(*c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Row> {
        vec![
            Row::new().with("x", 1.0).with("m", "B").with("y", 1.0),
            Row::new().with("x", 2.0).with("m", "A").with("y", 2.0),
            Row::new().with("x", 3.0).with("m", "C").with("y", 3.0),
            Row::new().with("x", 4.0).with("m", "A").with("y", 4.0),
        ]
    }

    #[test]
    fn reference_is_first_encountered_level() {
        let dm = DesignMatrix::build(&rows(), "y", &["m"], &RegressionOptions::default()).unwrap();
        match &dm.spec.predictors()[0] {
            Predictor::Categorical {
                reference, dummies, ..
            } => {
                assert_eq!(reference, "B");
                assert_eq!(dummies, &vec!["A".to_string(), "C".to_string()]);
            }
            other => panic!("expected categorical, got {other:?}"),
        }
        // row 2 is level A
        assert_eq!(dm.x.row(1), &[1.0, 1.0, 0.0]);
        assert_eq!(dm.x.row(0), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn levels_come_from_complete_rows_only() {
        let mut data = vec![Row::new().with("x", "n/a").with("m", "Z").with("y", 0.5)];
        data.extend(rows());
        let dm = DesignMatrix::build(&data, "y", &["x", "m"], &RegressionOptions::default())
            .unwrap();
        assert_eq!(dm.dropped, 1);
        match &dm.spec.predictors()[1] {
            Predictor::Categorical {
                reference, dummies, ..
            } => {
                assert_eq!(reference, "B");
                assert!(!dummies.iter().any(|d| d == "Z"));
            }
            other => panic!("expected categorical, got {other:?}"),
        }
    }

    #[test]
    fn forced_categorical_numeric_column() {
        let opts = RegressionOptions {
            categorical_columns: vec!["x".into()],
            include_interactions: false,
        };
        let dm = DesignMatrix::build(&rows(), "y", &["x"], &opts).unwrap();
        assert_eq!(dm.spec.width(), 3);
        assert_eq!(dm.spec.terms()[0].label, "x[2]");
    }

    #[test]
    fn interactions_cover_every_pair_of_columns() {
        let opts = RegressionOptions {
            categorical_columns: vec![],
            include_interactions: true,
        };
        let dm = DesignMatrix::build(&rows(), "y", &["x", "m"], &opts).unwrap();
        let labels: Vec<&str> = dm.spec.terms().iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["x", "m[A]", "m[C]", "x × m[A]", "x × m[C]"]);
        assert_eq!(dm.spec.terms()[3].kind, TermKind::Interaction);
        // row 4: x = 4, level A
        assert_eq!(dm.x.row(3), &[1.0, 4.0, 1.0, 0.0, 4.0, 0.0]);
    }

    #[test]
    fn categorical_by_categorical_interaction() {
        let rows = vec![
            Row::new().with("a", "p").with("b", "u").with("y", 1.0),
            Row::new().with("a", "q").with("b", "v").with("y", 2.0),
        ];
        let opts = RegressionOptions {
            categorical_columns: vec![],
            include_interactions: true,
        };
        let dm = DesignMatrix::build(&rows, "y", &["a", "b"], &opts).unwrap();
        let labels: Vec<&str> = dm.spec.terms().iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["a[q]", "b[v]", "a[q] × b[v]"]);
        assert_eq!(dm.x.row(1), &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let mut rs = rows();
        rs.push(Row::new().with("x", f64::NAN).with("m", "A").with("y", 1.0));
        rs.push(Row::new().with("x", 5.0).with("m", "A"));
        rs.push(Row::new().with("x", 5.0).with("y", 2.0));
        let dm = DesignMatrix::build(&rs, "y", &["x", "m"], &RegressionOptions::default()).unwrap();
        assert_eq!(dm.y.len(), 4);
        assert_eq!(dm.dropped, 3);
    }

    #[test]
    fn unseen_level_cannot_be_encoded() {
        let dm = DesignMatrix::build(&rows(), "y", &["m"], &RegressionOptions::default()).unwrap();
        assert!(dm.spec.encode(&Row::new().with("m", "Z")).is_none());
        assert_eq!(dm.spec.encode(&Row::new().with("m", "C")), Some(vec![0.0, 1.0]));
    }

    #[test]
    fn no_predictors_or_rows() {
        let options = RegressionOptions::default();
        assert!(DesignMatrix::build(&rows(), "y", &[], &options).is_none());
        assert!(DesignMatrix::build(&rows(), "nope", &["x"], &options).is_none());
    }

    #[test]
    fn dedup_keeps_first() {
        assert_eq!(dedup_columns(&["a", "b", "a"]), vec!["a", "b"]);
    }
}
