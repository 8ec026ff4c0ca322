//! Grade-tier classification.
//!
//! A grade is an upper bound with a label. Each value lands in the first
//! grade (in ascending `max` order) whose `max >= value`; values above every
//! bound land in the last grade rather than in a separate overflow bucket.

use crate::error::{Error, Result};

/// One grade tier.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grade {
    /// Inclusive upper bound.
    pub max: f64,
    /// Display label.
    pub label: String,
    /// Optional display color, passed through untouched.
    pub color: Option<String>,
}

impl Grade {
    /// Creates a grade tier.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidGrade`] if `max` is NaN or the label is blank.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_quality::capability::Grade;
    ///
    /// let g = Grade::new(10.0, "A").unwrap().with_color("#2e7d32");
    /// assert_eq!(g.color.as_deref(), Some("#2e7d32"));
    /// assert!(Grade::new(f64::NAN, "B").is_err());
    /// ```
    pub fn new(max: f64, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        if max.is_nan() {
            return Err(Error::InvalidGrade {
                label,
                reason: "max must be a number",
            });
        }
        if label.trim().is_empty() {
            return Err(Error::InvalidGrade {
                label,
                reason: "label must not be empty",
            });
        }
        Ok(Self {
            max,
            label,
            color: None,
        })
    }

    /// Attaches a display color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Number of values assigned to one grade.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GradeCount {
    /// Grade label.
    pub label: String,
    /// Grade upper bound.
    pub max: f64,
    /// Grade color, if any.
    pub color: Option<String>,
    /// Values classified into this grade.
    pub count: usize,
}

/// Index of the grade `value` falls into, given grades sorted by `max`.
///
/// Returns `None` only when there are no grades.
pub fn grade_index(sorted: &[Grade], value: f64) -> Option<usize> {
    if sorted.is_empty() {
        return None;
    }
    let idx = sorted.partition_point(|g| g.max < value);
    Some(idx.min(sorted.len() - 1))
}

/// Counts `values` per grade. Output is in ascending `max` order.
pub fn classify_grades(values: &[f64], grades: &[Grade]) -> Vec<GradeCount> {
    let mut sorted = grades.to_vec();
    sorted.sort_by(|a, b| a.max.total_cmp(&b.max));

    let mut counts: Vec<GradeCount> = sorted
        .iter()
        .map(|g| GradeCount {
            label: g.label.clone(),
            max: g.max,
            color: g.color.clone(),
            count: 0,
        })
        .collect();

    for &v in values {
        if let Some(i) = grade_index(&sorted, v) {
            counts[i].count += 1;
        }
    }
    counts
}
