//! Dense real matrix with sparse-triplet construction and a regularized solve.
//!
//! The fitting pipeline only ever needs a handful of operations on real
//! matrices — multiply, transpose, invert, and a regularized least-squares
//! solve — so this module wraps [`nalgebra`]'s `DMatrix`/`DVector` behind a
//! small API sized to exactly what [`crate::basis`], [`crate::constraints`]
//! and [`crate::simplex`] need, the same way the source this crate
//! reimplements reaches for `nalgebra::linalg::Cholesky` at its own
//! normal-equations solve sites.

use nalgebra::{DMatrix, DVector};

use crate::error::{CobsError, Result};

/// Threshold below which a sparse-triplet entry is treated as structural zero.
pub const EPS_BUILD: f64 = 1e-10;

/// Ridge added to the normal equations in [`Matrix::solve`].
const RIDGE: f64 = 1e-10;

/// A dense real matrix, backed by `nalgebra::DMatrix<f64>`.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    inner: DMatrix<f64>,
}

/// Parallel-array (COO) description of a sparse matrix, materialized dense on build.
#[derive(Clone, Debug, Default)]
pub struct SparseTriplets {
    values: Vec<f64>,
    row_indices: Vec<usize>,
    col_indices: Vec<usize>,
}

impl SparseTriplets {
    /// Starts an empty triplet builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one `(row, col, value)` entry. Entries with `|value| <= EPS_BUILD`
    /// are dropped at `build` time, not here, so callers may push freely.
    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        self.values.push(value);
        self.row_indices.push(row);
        self.col_indices.push(col);
    }

    /// Number of entries currently buffered (before the `EPS_BUILD` filter).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no entries have been pushed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Materializes a dense `rows x cols` [`Matrix`], keeping only entries with
    /// `|value| > EPS_BUILD`.
    pub fn build(&self, rows: usize, cols: usize) -> Matrix {
        let mut m = Matrix::zeros(rows, cols);
        for ((&r, &c), &v) in self
            .row_indices
            .iter()
            .zip(self.col_indices.iter())
            .zip(self.values.iter())
        {
            if v.abs() > EPS_BUILD {
                m.set(r, c, v);
            }
        }
        m
    }
}

impl Matrix {
    /// Builds a matrix from a dense row-major 2-D array, rejecting ragged or
    /// empty input.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(CobsError::invalid_input(
                "Matrix::from_rows",
                "input has zero rows",
            ));
        }
        let cols = rows[0].len();
        if cols == 0 {
            return Err(CobsError::invalid_input(
                "Matrix::from_rows",
                "input has zero columns",
            ));
        }
        if rows.iter().any(|r| r.len() != cols) {
            return Err(CobsError::invalid_input(
                "Matrix::from_rows",
                "rows have differing lengths",
            ));
        }
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            data.extend_from_slice(row);
        }
        Ok(Self {
            inner: DMatrix::from_row_slice(rows.len(), cols, &data),
        })
    }

    /// Builds a matrix from the sparse-triplet construction interface.
    pub fn from_sparse(triplets: &SparseTriplets, rows: usize, cols: usize) -> Self {
        triplets.build(rows, cols)
    }

    /// Allocates a `rows x cols` matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            inner: DMatrix::zeros(rows, cols),
        }
    }

    /// Allocates the `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self {
            inner: DMatrix::identity(n, n),
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.inner.nrows()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.inner.ncols()
    }

    /// Reads the element at `(row, col)`, panicking on an out-of-bounds index.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows() && col < self.cols(), "Matrix index out of bounds");
        self.inner[(row, col)]
    }

    /// Writes the element at `(row, col)`, panicking on an out-of-bounds index.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows() && col < self.cols(), "Matrix index out of bounds");
        self.inner[(row, col)] = value;
    }

    /// Copies row `i` into a fresh vector.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.inner.row(i).iter().cloned().collect()
    }

    /// Copies column `j` into a fresh vector.
    pub fn col(&self, j: usize) -> Vec<f64> {
        self.inner.column(j).iter().cloned().collect()
    }

    /// Returns a new matrix with every element scaled by `s`.
    pub fn scale(&self, s: f64) -> Self {
        Self {
            inner: self.inner.scale(s),
        }
    }

    /// Matrix-matrix product, delegated to `nalgebra`.
    pub fn matmul(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols() != other.rows() {
            return Err(CobsError::invalid_input(
                "Matrix::matmul",
                format!(
                    "inner dimensions disagree: {}x{} * {}x{}",
                    self.rows(),
                    self.cols(),
                    other.rows(),
                    other.cols()
                ),
            ));
        }
        Ok(Self {
            inner: &self.inner * &other.inner,
        })
    }

    /// Matrix-vector product.
    pub fn mul_vec(&self, v: &[f64]) -> Result<Vec<f64>> {
        if self.cols() != v.len() {
            return Err(CobsError::invalid_input(
                "Matrix::mul_vec",
                format!("matrix has {} cols but vector has {} entries", self.cols(), v.len()),
            ));
        }
        let dv = DVector::from_column_slice(v);
        let result = &self.inner * dv;
        Ok(result.iter().cloned().collect())
    }

    /// Returns the transpose.
    pub fn transpose(&self) -> Matrix {
        Self {
            inner: self.inner.transpose(),
        }
    }

    /// Largest absolute value among all elements.
    pub fn max_abs(&self) -> f64 {
        self.inner.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    /// Inverts a square matrix via `nalgebra`'s LU-based `try_inverse`.
    /// Returns `None` (rather than an error) when the matrix is singular,
    /// mirroring the `Option`-returning contract this component is specified
    /// with.
    pub fn inverse(&self) -> Option<Matrix> {
        if self.rows() != self.cols() {
            return None;
        }
        self.inner.clone().try_inverse().map(|inner| Self { inner })
    }

    /// Regularized normal-equations least-squares solve.
    ///
    /// Computes `M = A'A + lambda*I` with `lambda = 1e-10` on the diagonal
    /// and solves `M x = A'b` via `nalgebra::linalg::Cholesky`, the same
    /// factorization the source this crate reimplements uses for its own
    /// GLS normal equations. Works for rectangular `self` (m rows, n cols)
    /// and returns an n-vector; fails only if the regularized `M` is still
    /// not positive definite.
    ///
    /// The tiny Tikhonov ridge is deliberate: near-rank-deficient design
    /// matrices (coincident knots, near-collinear samples) should still
    /// produce a coefficient vector rather than an error.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>> {
        if self.rows() != b.len() {
            return Err(CobsError::invalid_input(
                "Matrix::solve",
                format!("matrix has {} rows but rhs has {} entries", self.rows(), b.len()),
            ));
        }
        let at = self.inner.transpose();
        let mut m = &at * &self.inner;
        for i in 0..m.ncols() {
            m[(i, i)] += RIDGE;
        }
        let rhs = &at * DVector::from_column_slice(b);

        let cholesky = nalgebra::linalg::Cholesky::new(m)
            .ok_or_else(|| CobsError::singular("Matrix::solve normal equations"))?;
        Ok(cholesky.solve(&rhs).iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_ragged_input() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(Matrix::from_rows(&rows).is_err());
    }

    #[test]
    fn identity_roundtrips_through_inverse() {
        let id = Matrix::identity(3);
        let inv = id.inverse().unwrap();
        assert_eq!(inv, id);
    }

    #[test]
    fn inverse_detects_singular_matrix() {
        let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert!(m.inverse().is_none());
    }

    #[test]
    fn matmul_computes_expected_product() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let b = Matrix::identity(2);
        let product = a.matmul(&b).unwrap();
        assert_eq!(product, a);
    }

    #[test]
    fn solve_recovers_exact_linear_fit() {
        // y = 2x, sampled exactly: A columns are [1, x], exact beta = [0, 2].
        let a = Matrix::from_rows(&[
            vec![1.0, 1.0],
            vec![1.0, 2.0],
            vec![1.0, 3.0],
            vec![1.0, 4.0],
        ])
        .unwrap();
        let y = vec![2.0, 4.0, 6.0, 8.0];
        let x = a.solve(&y).unwrap();
        assert!((x[0]).abs() < 1e-6);
        assert!((x[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn sparse_triplets_drop_subthreshold_entries() {
        let mut triplets = SparseTriplets::new();
        triplets.push(0, 0, 1.0);
        triplets.push(0, 1, 1e-12);
        let m = triplets.build(1, 2);
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(0, 1), 0.0);
    }
}
