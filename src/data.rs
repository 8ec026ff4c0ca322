//! Tabular input: cells, rows, filters, and grouping.
//!
//! Rows arrive from an ingestion layer as flat column → cell mappings whose
//! numeric-looking strings may not have been coerced. Every engine reads
//! cells through [`CellValue::as_number`] or [`CellValue::as_level`], so
//! coercion and "missing" handling are decided in one place:
//!
//! - numbers must be finite; NaN and ±∞ count as missing
//! - text is trimmed and parsed as `f64` when a number is required
//! - categorical levels are trimmed text, or a number's display form
//!
//! # Examples
//!
//! ```
//! use u_quality::data::{CellValue, Row};
//!
//! let row = Row::new()
//!     .with("line", "A")
//!     .with("weight", " 12.5 ")
//!     .with("defects", CellValue::Missing);
//!
//! assert_eq!(row.number("weight"), Some(12.5));
//! assert_eq!(row.level("line").as_deref(), Some("A"));
//! assert_eq!(row.number("defects"), None);
//! assert_eq!(row.number("absent"), None);
//! ```

use std::collections::HashMap;

/// One cell of a row.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum CellValue {
    /// A numeric value (may be non-finite, which reads as missing).
    Number(f64),
    /// A text value.
    Text(String),
    /// No value.
    #[default]
    Missing,
}

impl CellValue {
    /// Coerces the cell to a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if v.is_finite() => Some(*v),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Converts the cell to a categorical level label.
    ///
    /// Empty text and non-finite numbers have no level.
    pub fn as_level(&self) -> Option<String> {
        match self {
            CellValue::Number(v) if v.is_finite() => Some(v.to_string()),
            CellValue::Text(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            _ => None,
        }
    }

    /// `true` for text that does not parse as a number.
    pub fn is_non_numeric_text(&self) -> bool {
        matches!(self, CellValue::Text(s) if !s.trim().is_empty() && self.as_number().is_none())
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Number(f64::from(v))
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Missing, Into::into)
    }
}

static MISSING: CellValue = CellValue::Missing;

/// A single input record: column name → cell.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Row {
    cells: HashMap<String, CellValue>,
}

impl Row {
    /// An empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.cells.insert(column.into(), value.into());
        self
    }

    /// Cell for `column`; absent columns read as [`CellValue::Missing`].
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&MISSING)
    }

    /// `true` if the row carries the column at all.
    pub fn has_column(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// Numeric value of `column`, if present and finite.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).as_number()
    }

    /// Categorical level of `column`.
    pub fn level(&self, column: &str) -> Option<String> {
        self.get(column).as_level()
    }

    /// Iterates over the row's columns.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// `true` if any row carries `column`.
pub fn has_column(rows: &[Row], column: &str) -> bool {
    rows.iter().any(|r| r.has_column(column))
}

/// Equality filter on a categorical level.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Filter {
    /// Column to test.
    pub column: String,
    /// Level a row must have to be kept.
    pub value: String,
}

impl Filter {
    /// Creates a filter `column == value`.
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// `true` if `row` passes the filter.
    pub fn matches(&self, row: &Row) -> bool {
        row.level(&self.column).as_deref() == Some(self.value.as_str())
    }
}

/// Keeps the rows that pass every filter, preserving order.
pub fn apply_filters(rows: &[Row], filters: &[Filter]) -> Vec<Row> {
    rows.iter()
        .filter(|r| filters.iter().all(|f| f.matches(r)))
        .cloned()
        .collect()
}

/// Numeric values of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Level label.
    pub name: String,
    /// Finite values in row order.
    pub values: Vec<f64>,
}

/// Groups the numeric `value_column` by the level of `factor_column`.
///
/// Groups appear in the order their level is first encountered. Rows with
/// no level or no finite value are skipped.
///
/// # Examples
///
/// ```
/// use u_quality::data::{group_by, Row};
///
/// let rows = vec![
///     Row::new().with("m", "B").with("y", 1.0),
///     Row::new().with("m", "A").with("y", 2.0),
///     Row::new().with("m", "B").with("y", 3.0),
/// ];
/// let groups = group_by(&rows, "m", "y");
/// assert_eq!(groups[0].name, "B");
/// assert_eq!(groups[0].values, vec![1.0, 3.0]);
/// assert_eq!(groups[1].name, "A");
/// ```
pub fn group_by(rows: &[Row], factor_column: &str, value_column: &str) -> Vec<Group> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for row in rows {
        let (Some(level), Some(value)) = (row.level(factor_column), row.number(value_column))
        else {
            continue;
        };
        let slot = *index.entry(level.clone()).or_insert_with(|| {
            groups.push(Group {
                name: level,
                values: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].values.push(value);
    }
    groups
}

/// Finite values of `column` in row order; rows without one are skipped.
pub fn numeric_column(rows: &[Row], column: &str) -> Vec<f64> {
    rows.iter().filter_map(|r| r.number(column)).collect()
}

/// Distinct levels of `column` in first-encounter order.
pub fn levels<'a>(rows: impl IntoIterator<Item = &'a Row>, column: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .filter_map(|r| r.level(column))
        .filter(|l| seen.insert(l.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_coercion() {
        assert_eq!(CellValue::from(3.5).as_number(), Some(3.5));
        assert_eq!(CellValue::from("  -2e1 ").as_number(), Some(-20.0));
        assert_eq!(CellValue::from("abc").as_number(), None);
        assert_eq!(CellValue::from("NaN").as_number(), None);
        assert_eq!(CellValue::from("inf").as_number(), None);
        assert_eq!(CellValue::Number(f64::NAN).as_number(), None);
        assert_eq!(CellValue::Number(f64::INFINITY).as_number(), None);
        assert_eq!(CellValue::Missing.as_number(), None);
    }

    #[test]
    fn level_coercion() {
        assert_eq!(CellValue::from(" A ").as_level().as_deref(), Some("A"));
        assert_eq!(CellValue::from(2.0).as_level().as_deref(), Some("2"));
        assert_eq!(CellValue::from(2.5).as_level().as_deref(), Some("2.5"));
        assert_eq!(CellValue::from("   ").as_level(), None);
        assert_eq!(CellValue::Missing.as_level(), None);
    }

    #[test]
    fn option_into_cell() {
        assert_eq!(CellValue::from(None::<f64>), CellValue::Missing);
        assert_eq!(CellValue::from(Some(1.0)), CellValue::Number(1.0));
    }

    #[test]
    fn non_numeric_text_detection() {
        assert!(CellValue::from("Line A").is_non_numeric_text());
        assert!(!CellValue::from("12").is_non_numeric_text());
        assert!(!CellValue::from(1.0).is_non_numeric_text());
    }

    #[test]
    fn filters_compose() {
        let rows = vec![
            Row::new().with("shift", "day").with("line", "A"),
            Row::new().with("shift", "night").with("line", "A"),
            Row::new().with("shift", "day").with("line", "B"),
        ];
        let kept = apply_filters(
            &rows,
            &[Filter::new("shift", "day"), Filter::new("line", "B")],
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].level("line").as_deref(), Some("B"));
        assert_eq!(apply_filters(&rows, &[]).len(), 3);
    }

    #[test]
    fn group_by_skips_incomplete_rows() {
        let rows = vec![
            Row::new().with("g", "x").with("v", 1.0),
            Row::new().with("g", "x").with("v", "oops"),
            Row::new().with("v", 5.0),
            Row::new().with("g", "y").with("v", "2"),
        ];
        let groups = group_by(&rows, "g", "v");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].values, vec![1.0]);
        assert_eq!(groups[1].values, vec![2.0]);
    }

    #[test]
    fn levels_keep_insertion_order() {
        let rows: Vec<Row> = ["c", "a", "c", "b"]
            .iter()
            .map(|l| Row::new().with("k", *l))
            .collect();
        assert_eq!(levels(&rows, "k"), vec!["c", "a", "b"]);
    }

    #[test]
    fn row_from_iterator() {
        let row: Row = vec![("a", 1.0), ("b", 2.0)].into_iter().collect();
        assert_eq!(row.number("b"), Some(2.0));
        assert!(row.has_column("a"));
        assert!(has_column(&[row], "a"));
    }
}
