//! Dense matrix algebra.
//!
//! A small row-major [`Matrix`] with exactly the operations the regression
//! engine needs: transpose, product, Gauss-Jordan inverse with partial
//! pivoting, and linear solve.
//!
//! Shape mismatches and singular systems are reported as `None`.
//!
//! # Examples
//!
//! ```
//! use u_quality::matrix::Matrix;
//!
//! let a = Matrix::from_rows(vec![vec![2.0, 1.0], vec![1.0, 3.0]]).unwrap();
//! let x = a.solve(&[5.0, 5.0]).unwrap();
//! assert!((x[0] - 2.0).abs() < 1e-9);
//! assert!((x[1] - 1.0).abs() < 1e-9);
//! ```

/// Pivots below this magnitude mark a matrix as singular.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-12;

/// Rectangular matrix of `f64`, stored row-major.
///
/// # Invariants
///
/// - `data.len() == rows * cols`
/// - A matrix with zero rows or zero columns is empty and normalised to 0 × 0.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// The 0 × 0 matrix.
    pub fn empty() -> Self {
        Self {
            rows: 0,
            cols: 0,
            data: Vec::new(),
        }
    }

    /// Creates a matrix from row-major data.
    ///
    /// Returns `None` if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        if data.len() != rows * cols {
            return None;
        }
        if rows == 0 || cols == 0 {
            return Some(Self::empty());
        }
        Some(Self { rows, cols, data })
    }

    /// Creates a matrix from nested rows.
    ///
    /// Returns `None` if the rows are ragged.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let n = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let data: Vec<f64> = rows.into_iter().flatten().collect();
        Self::new(n, cols, data)
    }

    /// The n × n identity.
    pub fn identity(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        if n == 0 {
            return Self::empty();
        }
        Self {
            rows: n,
            cols: n,
            data,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `true` for the 0 × 0 matrix.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// `true` if rows == cols.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Element at (i, j). Panics if out of bounds.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    /// Row `i` as a slice. Panics if out of bounds.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Column `j` copied into a vector.
    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.get(i, j)).collect()
    }

    /// Nested-row copy of the matrix.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|i| self.row(i).to_vec()).collect()
    }

    /// Main diagonal of a square matrix.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.rows.min(self.cols)).map(|i| self.get(i, i)).collect()
    }

    /// Transpose. The empty matrix transposes to itself.
    pub fn transpose(&self) -> Matrix {
        if self.is_empty() {
            return Matrix::empty();
        }
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..self.cols {
            for i in 0..self.rows {
                data.push(self.get(i, j));
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Matrix product `self · other`.
    ///
    /// Returns `None` if either operand is empty or the inner dimensions
    /// differ.
    pub fn multiply(&self, other: &Matrix) -> Option<Matrix> {
        if self.is_empty() || other.is_empty() || self.cols != other.rows {
            return None;
        }
        let mut data = vec![0.0; self.rows * other.cols];
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                for j in 0..other.cols {
                    data[i * other.cols + j] += a * other.get(k, j);
                }
            }
        }
        Some(Matrix {
            rows: self.rows,
            cols: other.cols,
            data,
        })
    }

    /// Matrix-vector product `self · v`.
    ///
    /// Returns `None` if the matrix is empty or `v.len() != cols`.
    pub fn mul_vec(&self, v: &[f64]) -> Option<Vec<f64>> {
        if self.is_empty() || v.len() != self.cols {
            return None;
        }
        Some(
            (0..self.rows)
                .map(|i| self.row(i).iter().zip(v).map(|(a, b)| a * b).sum())
                .collect(),
        )
    }

    /// Inverse via Gauss-Jordan elimination with partial pivoting, using
    /// [`DEFAULT_PIVOT_TOLERANCE`].
    ///
    /// Returns `None` for non-square, empty, or singular input.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_quality::matrix::Matrix;
    ///
    /// let singular = Matrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
    /// assert!(singular.inverse().is_none());
    /// ```
    pub fn inverse(&self) -> Option<Matrix> {
        self.inverse_with_tolerance(DEFAULT_PIVOT_TOLERANCE)
    }

    /// Inverse with an explicit singularity threshold.
    ///
    /// # Algorithm
    ///
    /// Builds `[A | I]`. For each column, the row with the largest absolute
    /// value in the remaining sub-column becomes the pivot; if that value is
    /// below `tolerance` the matrix is singular. The pivot row is
    /// normalised and the pivot column eliminated from every other row. The
    /// right half of the reduced matrix is A⁻¹.
    pub fn inverse_with_tolerance(&self, tolerance: f64) -> Option<Matrix> {
        if self.is_empty() || !self.is_square() {
            return None;
        }
        let n = self.rows;
        let width = 2 * n;

        let mut aug = vec![0.0; n * width];
        for i in 0..n {
            aug[i * width..i * width + n].copy_from_slice(self.row(i));
            aug[i * width + n + i] = 1.0;
        }

        for col in 0..n {
            let mut pivot_row = col;
            let mut pivot_abs = aug[col * width + col].abs();
            for r in (col + 1)..n {
                let v = aug[r * width + col].abs();
                if v > pivot_abs {
                    pivot_abs = v;
                    pivot_row = r;
                }
            }
            // NaN fails this comparison too
            if !(pivot_abs >= tolerance) {
                log::trace!("pivot {pivot_abs:e} below {tolerance:e} at column {col}");
                return None;
            }

            if pivot_row != col {
                for j in 0..width {
                    aug.swap(col * width + j, pivot_row * width + j);
                }
            }

            let pivot = aug[col * width + col];
            for j in 0..width {
                aug[col * width + j] /= pivot;
            }

            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = aug[r * width + col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..width {
                    aug[r * width + j] -= factor * aug[col * width + j];
                }
            }
        }

        let mut data = Vec::with_capacity(n * n);
        for i in 0..n {
            data.extend_from_slice(&aug[i * width + n..(i + 1) * width]);
        }
        Some(Matrix {
            rows: n,
            cols: n,
            data,
        })
    }

    /// Solves `A x = b` using [`DEFAULT_PIVOT_TOLERANCE`].
    ///
    /// Returns `None` if `A` is not square, `b.len()` differs from the
    /// dimension, or `A` is singular.
    pub fn solve(&self, b: &[f64]) -> Option<Vec<f64>> {
        self.solve_with_tolerance(b, DEFAULT_PIVOT_TOLERANCE)
    }

    /// Solves `A x = b` with an explicit singularity threshold.
    pub fn solve_with_tolerance(&self, b: &[f64], tolerance: f64) -> Option<Vec<f64>> {
        if !self.is_square() || b.len() != self.rows {
            return None;
        }
        self.inverse_with_tolerance(tolerance)?.mul_vec(b)
    }
}
