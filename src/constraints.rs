//! Generates linear-inequality / equality rows `{A*c <= b}` in coefficient
//! space for each supported shape constraint.

use crate::basis::BSplineBasis;
use crate::error::{CobsError, Result};
use crate::matrix::Matrix;
use crate::options::Constraint;
use rayon::prelude::*;

/// Number of equally spaced samples used to discretize monotone and
/// convexity/concavity constraints over `[min(x), max(x)]`. Sufficient for
/// order <= 4 and smooth knot spacing; exposed as a named constant rather
/// than a magic number since it is a hyperparameter, not a natural law.
pub const CONSTRAINT_GRID_POINTS: usize = 100;

/// Builds the stacked constraint system `(A, b)` for one fit.
pub struct ConstraintBuilder<'a> {
    basis: &'a BSplineBasis,
    x_min: f64,
    x_max: f64,
}

impl<'a> ConstraintBuilder<'a> {
    /// Creates a builder over `basis`, with the shape-constraint grid
    /// spanning `[min(x), max(x)]`.
    pub fn new(basis: &'a BSplineBasis, x: &[f64]) -> Self {
        let x_min = x.iter().cloned().fold(f64::INFINITY, f64::min);
        let x_max = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Self { basis, x_min, x_max }
    }

    /// Assembles the vertical stack of all constraint blocks. An empty
    /// constraint list yields a `0 x N` matrix.
    pub fn build(&self, constraints: &[Constraint]) -> Result<(Matrix, Vec<f64>)> {
        let n = self.basis.num_coefficients();
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut b: Vec<f64> = Vec::new();

        for constraint in constraints {
            let (block_rows, block_b) = self.build_one(constraint)?;
            rows.extend(block_rows);
            b.extend(block_b);
        }

        if rows.is_empty() {
            return Ok((Matrix::zeros(0, n), Vec::new()));
        }
        let a = Matrix::from_rows(&rows)?;
        Ok((a, b))
    }

    fn grid(&self) -> Vec<f64> {
        if CONSTRAINT_GRID_POINTS <= 1 || self.x_max <= self.x_min {
            return vec![self.x_min];
        }
        let steps = CONSTRAINT_GRID_POINTS - 1;
        (0..CONSTRAINT_GRID_POINTS)
            .map(|i| self.x_min + (self.x_max - self.x_min) * (i as f64 / steps as f64))
            .collect()
    }

    fn build_one(&self, constraint: &Constraint) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
        match constraint {
            Constraint::Monotone { increasing } => Ok(self.monotone_rows(*increasing)),
            Constraint::Convex { convex } => Ok(self.curvature_rows(*convex)),
            Constraint::Concave => Ok(self.curvature_rows(false)),
            Constraint::Periodic => Ok(self.periodic_rows()),
            Constraint::Pointwise { x, y, operator } => self.pointwise_rows(*x, *y, operator),
        }
    }

    fn monotone_rows(&self, increasing: bool) -> (Vec<Vec<f64>>, Vec<f64>) {
        let sign = if increasing { -1.0 } else { 1.0 };
        let rows: Vec<Vec<f64>> = self
            .grid()
            .par_iter()
            .map(|&xi| {
                self.basis
                    .evaluate_derivative(xi)
                    .into_iter()
                    .map(|v| sign * v)
                    .collect()
            })
            .collect();
        let b = vec![0.0; rows.len()];
        (rows, b)
    }

    fn curvature_rows(&self, convex: bool) -> (Vec<Vec<f64>>, Vec<f64>) {
        let sign = if convex { -1.0 } else { 1.0 };
        let rows: Vec<Vec<f64>> = self
            .grid()
            .par_iter()
            .map(|&xi| {
                self.basis
                    .evaluate_second_derivative(xi)
                    .into_iter()
                    .map(|v| sign * v)
                    .collect()
            })
            .collect();
        let b = vec![0.0; rows.len()];
        (rows, b)
    }

    fn periodic_rows(&self) -> (Vec<Vec<f64>>, Vec<f64>) {
        let value_min = self.basis.evaluate(self.x_min);
        let value_max = self.basis.evaluate(self.x_max);
        let deriv_min = self.basis.evaluate_derivative(self.x_min);
        let deriv_max = self.basis.evaluate_derivative(self.x_max);

        let value_diff: Vec<f64> = value_min.iter().zip(&value_max).map(|(a, b)| a - b).collect();
        let deriv_diff: Vec<f64> = deriv_min.iter().zip(&deriv_max).map(|(a, b)| a - b).collect();

        let mut rows = Vec::with_capacity(4);
        let mut b = Vec::with_capacity(4);
        for diff in [&value_diff, &deriv_diff] {
            rows.push(diff.clone());
            b.push(0.0);
            rows.push(diff.iter().map(|v| -v).collect());
            b.push(0.0);
        }
        (rows, b)
    }

    fn pointwise_rows(&self, x: f64, y: f64, operator: &str) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
        let row = self.basis.evaluate(x);
        match operator {
            "=" => {
                let neg_row: Vec<f64> = row.iter().map(|v| -v).collect();
                Ok((vec![row, neg_row], vec![y, -y]))
            }
            ">=" => {
                let neg_row: Vec<f64> = row.iter().map(|v| -v).collect();
                Ok((vec![neg_row], vec![-y]))
            }
            "<=" => Ok((vec![row], vec![y])),
            other => Err(CobsError::UnsupportedOperator {
                operator: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Constraint;

    fn clamped_cubic(x: &[f64]) -> BSplineBasis {
        let order = 4;
        let n = x.len();
        let mut knots = vec![x[0]; order + 1];
        let interior = n.saturating_sub(order + 1);
        for i in 1..=interior {
            let t = i as f64 / (interior + 1) as f64;
            knots.push(x[0] + t * (x[n - 1] - x[0]));
        }
        knots.extend(std::iter::repeat(x[n - 1]).take(order + 1));
        BSplineBasis::new(knots, order).unwrap()
    }

    #[test]
    fn empty_constraints_yield_zero_rows() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let basis = clamped_cubic(&x);
        let builder = ConstraintBuilder::new(&basis, &x);
        let (a, b) = builder.build(&[]).unwrap();
        assert_eq!(a.rows(), 0);
        assert_eq!(a.cols(), basis.num_coefficients());
        assert!(b.is_empty());
    }

    #[test]
    fn monotone_emits_one_row_per_grid_point() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let basis = clamped_cubic(&x);
        let builder = ConstraintBuilder::new(&basis, &x);
        let (a, b) = builder
            .build(&[Constraint::Monotone { increasing: true }])
            .unwrap();
        assert_eq!(a.rows(), CONSTRAINT_GRID_POINTS);
        assert_eq!(b.len(), CONSTRAINT_GRID_POINTS);
        assert!(b.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn pointwise_equality_emits_two_opposed_rows() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let basis = clamped_cubic(&x);
        let builder = ConstraintBuilder::new(&basis, &x);
        let (a, b) = builder
            .build(&[Constraint::Pointwise {
                x: 3.0,
                y: 9.0,
                operator: "=".to_string(),
            }])
            .unwrap();
        assert_eq!(a.rows(), 2);
        assert_eq!(b, vec![9.0, -9.0]);
        for j in 0..a.cols() {
            assert!((a.get(0, j) + a.get(1, j)).abs() < 1e-12);
        }
    }

    #[test]
    fn unsupported_operator_is_rejected() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let basis = clamped_cubic(&x);
        let builder = ConstraintBuilder::new(&basis, &x);
        let err = builder
            .build(&[Constraint::Pointwise {
                x: 3.0,
                y: 9.0,
                operator: "!=".to_string(),
            }])
            .unwrap_err();
        assert!(matches!(err, CobsError::UnsupportedOperator { .. }));
    }

    #[test]
    fn periodic_emits_four_rows() {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let basis = clamped_cubic(&x);
        let builder = ConstraintBuilder::new(&basis, &x);
        let (a, b) = builder.build(&[Constraint::Periodic]).unwrap();
        assert_eq!(a.rows(), 4);
        assert_eq!(b, vec![0.0; 4]);
    }
}
