//! Knot-vector-backed B-spline basis: value, first- and second-derivative
//! evaluation via the de Boor recurrence, plus design-matrix assembly.

use crate::error::{CobsError, Result};
use crate::matrix::{Matrix, SparseTriplets};
use rayon::prelude::*;

/// Immutable B-spline basis over a fixed knot vector and order.
///
/// `order` plays the role of the local polynomial degree in the de Boor
/// arrays (sized `order + 1`) and in the knot-vector length formula
/// (`|T| = N + order + 1`, clamped endpoints repeated `order + 1` times).
/// This mirrors the array-sizing convention of the source this crate
/// reimplements rather than the textbook `degree = order - 1` reading of
/// the glossary; see `DESIGN.md` for the reconciliation.
#[derive(Clone, Debug)]
pub struct BSplineBasis {
    knots: Vec<f64>,
    order: usize,
    num_coefficients: usize,
}

impl BSplineBasis {
    /// Builds a basis from a non-decreasing knot vector and an order.
    pub fn new(knots: Vec<f64>, order: usize) -> Result<Self> {
        if order < 1 {
            return Err(CobsError::invalid_input("BSplineBasis::new", "order must be >= 1"));
        }
        if knots.len() < 2 * order {
            return Err(CobsError::invalid_knots(format!(
                "knot vector of length {} is too short for order {}",
                knots.len(),
                order
            )));
        }
        if knots.windows(2).any(|w| w[0] > w[1]) {
            return Err(CobsError::invalid_knots("knots must be non-decreasing"));
        }
        let num_coefficients = knots.len() - order - 1;
        Ok(Self {
            knots,
            order,
            num_coefficients,
        })
    }

    /// Number of basis functions / coefficients, `N = |T| - order - 1`.
    pub fn num_coefficients(&self) -> usize {
        self.num_coefficients
    }

    /// The spline order, `k`.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Read-only view of the knot vector.
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Domain over which the basis is defined, `(T[order], T[N])`.
    pub fn knot_domain(&self) -> (f64, f64) {
        (self.knots[self.order], self.knots[self.num_coefficients])
    }

    /// Binary search for the span `s` such that `T[s] <= x < T[s+1]`.
    ///
    /// Boundary policy: `x >= T[N]` clamps to `N - 1`; `x <= T[order]` clamps
    /// to `order`. Ties at a knot resolve to the left span.
    fn find_span(&self, x: f64) -> usize {
        let n = self.num_coefficients;
        if x >= self.knots[n] {
            return n - 1;
        }
        if x <= self.knots[self.order] {
            return self.order;
        }
        let mut low = self.order;
        let mut high = n;
        let mut mid = (low + high) / 2;
        while x < self.knots[mid] || x >= self.knots[mid + 1] {
            if x < self.knots[mid] {
                high = mid;
            } else {
                low = mid;
            }
            mid = (low + high) / 2;
        }
        mid
    }

    /// Standard de Boor triangular recurrence. Returns the `order + 1`
    /// non-zero basis values `(B_{span-order,k}(x), ..., B_{span,k}(x))`.
    fn compute_basis_functions(&self, span: usize, x: f64) -> Vec<f64> {
        let p = self.order;
        let mut left = vec![0.0; p + 1];
        let mut right = vec![0.0; p + 1];
        let mut n = vec![0.0; p + 1];
        n[0] = 1.0;
        for j in 1..=p {
            left[j] = x - self.knots[span + 1 - j];
            right[j] = self.knots[span + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let denom = right[r + 1] + left[j - r];
                // Coincident knots can make this quotient 0/0; treat it as zero.
                let temp = if denom.abs() < f64::EPSILON { 0.0 } else { n[r] / denom };
                n[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            n[j] = saved;
        }
        n
    }

    /// Derivatives up to order `d` (1 or 2) of the active basis functions at
    /// `x`, following the NURBS-book `DersBasisFuns` cascade of divided
    /// differences over the triangular `ndu` table.
    ///
    /// Returns `ders[k][j]` for `k` in `0..=d`, `j` in `0..=order`, i.e. row
    /// `k` holds the `k`-th derivative (row 0 is the value itself).
    fn compute_derivative_basis_functions(&self, span: usize, x: f64, d: usize) -> Vec<Vec<f64>> {
        let p = self.order;
        let mut ndu = vec![vec![0.0; p + 1]; p + 1];
        let mut left = vec![0.0; p + 1];
        let mut right = vec![0.0; p + 1];
        ndu[0][0] = 1.0;

        for j in 1..=p {
            left[j] = x - self.knots[span + 1 - j];
            right[j] = self.knots[span + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                ndu[j][r] = right[r + 1] + left[j - r];
                let denom = ndu[j][r];
                let temp = if denom.abs() < f64::EPSILON { 0.0 } else { ndu[r][j - 1] / denom };
                ndu[r][j] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            ndu[j][j] = saved;
        }

        let mut ders = vec![vec![0.0; p + 1]; d + 1];
        for j in 0..=p {
            ders[0][j] = ndu[j][p];
        }

        let mut a = vec![vec![0.0; p + 1]; 2];
        for r in 0..=p {
            let mut s1 = 0usize;
            let mut s2 = 1usize;
            a[0][0] = 1.0;
            let r_i = r as isize;

            for k in 1..=d {
                let mut dval = 0.0;
                let rk = r_i - k as isize;
                let pk = p as isize - k as isize;

                if r_i >= k as isize {
                    let denom = ndu[(pk + 1) as usize][rk as usize];
                    a[s2][0] = if denom.abs() < f64::EPSILON { 0.0 } else { a[s1][0] / denom };
                    dval = a[s2][0] * ndu[rk as usize][pk as usize];
                }

                let j1 = if rk >= -1 { 1isize } else { -rk };
                let j2 = if r_i - 1 <= pk { k as isize - 1 } else { p as isize - r_i };

                let mut j = j1;
                while j <= j2 {
                    let denom = ndu[(pk + 1) as usize][(r_i - k as isize + j) as usize];
                    a[s2][j as usize] = if denom.abs() < f64::EPSILON {
                        0.0
                    } else {
                        (a[s1][j as usize] - a[s1][(j - 1) as usize]) / denom
                    };
                    dval += a[s2][j as usize] * ndu[(r_i - k as isize + j) as usize][pk as usize];
                    j += 1;
                }

                if r_i <= pk {
                    let denom = ndu[(pk + 1) as usize][r];
                    a[s2][k] = if denom.abs() < f64::EPSILON { 0.0 } else { -a[s1][k - 1] / denom };
                    dval += a[s2][k] * ndu[r][pk as usize];
                }

                ders[k][r] = dval;
                std::mem::swap(&mut s1, &mut s2);
            }
        }

        let mut factor = p as f64;
        for k in 1..=d {
            for j in 0..=p {
                ders[k][j] *= factor;
            }
            factor *= (p as isize - k as isize) as f64;
        }

        ders
    }

    /// Dense basis row at `x`: `order + 1` non-zero entries, zero elsewhere.
    pub fn evaluate(&self, x: f64) -> Vec<f64> {
        let span = self.find_span(x);
        let values = self.compute_basis_functions(span, x);
        self.scatter(span, &values)
    }

    /// Dense first-derivative row at `x`.
    pub fn evaluate_derivative(&self, x: f64) -> Vec<f64> {
        let span = self.find_span(x);
        let ders = self.compute_derivative_basis_functions(span, x, 1);
        self.scatter(span, &ders[1])
    }

    /// Dense second-derivative row at `x`.
    pub fn evaluate_second_derivative(&self, x: f64) -> Vec<f64> {
        let span = self.find_span(x);
        let ders = self.compute_derivative_basis_functions(span, x, 2);
        self.scatter(span, &ders[2])
    }

    fn scatter(&self, span: usize, local: &[f64]) -> Vec<f64> {
        let p = self.order;
        let mut row = vec![0.0; self.num_coefficients];
        for (offset, value) in local.iter().enumerate() {
            row[span - p + offset] = *value;
        }
        row
    }

    /// Builds the `m x N` design matrix for sample points `xs`.
    pub fn create_design_matrix(&self, xs: &[f64]) -> Matrix {
        let rows: Vec<(usize, usize, f64)> = xs
            .par_iter()
            .enumerate()
            .flat_map(|(i, &x)| {
                let span = self.find_span(x);
                let values = self.compute_basis_functions(span, x);
                let p = self.order;
                values
                    .into_iter()
                    .enumerate()
                    .map(move |(offset, v)| (i, span - p + offset, v))
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut triplets = SparseTriplets::new();
        for (r, c, v) in rows {
            triplets.push(r, c, v);
        }
        triplets.build(xs.len(), self.num_coefficients)
    }

    /// Builds a derivative design matrix at an augmented sample set.
    ///
    /// The source this crate reimplements inserts midpoints between
    /// consecutive `xs` before differentiating, producing `2m - 1` rows.
    /// Callers expecting row `i` to correspond to `xs[i]` must account for
    /// this interleaving; the constraint path samples its own grid instead
    /// and never calls this method, which is preserved as a faithful but
    /// likely-vestigial interface.
    pub fn create_derivative_matrix(&self, xs: &[f64], deriv_order: usize) -> Result<Matrix> {
        if xs.is_empty() {
            return Ok(Matrix::zeros(0, self.num_coefficients));
        }
        if deriv_order != 1 && deriv_order != 2 {
            return Err(CobsError::invalid_input(
                "BSplineBasis::create_derivative_matrix",
                "deriv_order must be 1 or 2",
            ));
        }
        let mut augmented = Vec::with_capacity(2 * xs.len() - 1);
        for (i, &x) in xs.iter().enumerate() {
            augmented.push(x);
            if i + 1 < xs.len() {
                augmented.push((x + xs[i + 1]) / 2.0);
            }
        }

        let rows: Vec<Vec<f64>> = augmented
            .par_iter()
            .map(|&x| {
                if deriv_order == 1 {
                    self.evaluate_derivative(x)
                } else {
                    self.evaluate_second_derivative(x)
                }
            })
            .collect();

        let mut triplets = SparseTriplets::new();
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                triplets.push(i, j, v);
            }
        }
        Ok(triplets.build(augmented.len(), self.num_coefficients))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn partition_of_unity_holds_on_domain() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let basis = clamped_cubic(&x);
        let (lo, hi) = basis.knot_domain();
        let mut t = lo;
        while t <= hi {
            let row = basis.evaluate(t);
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "sum={sum} at t={t}");
            t += 0.13;
        }
    }

    #[test]
    fn local_support_is_bounded() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let basis = clamped_cubic(&x);
        let row = basis.evaluate(3.3);
        let nonzero = row.iter().filter(|v| v.abs() > 1e-12).count();
        assert!(nonzero <= basis.order() + 1);
    }

    #[test]
    fn derivative_matches_central_difference() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let basis = clamped_cubic(&x);
        let t = 3.7;
        let h = 1e-6;
        let f = |u: f64| -> Vec<f64> { basis.evaluate(u) };
        let plus = f(t + h);
        let minus = f(t - h);
        let analytic = basis.evaluate_derivative(t);
        for j in 0..basis.num_coefficients() {
            let numeric = (plus[j] - minus[j]) / (2.0 * h);
            assert!((numeric - analytic[j]).abs() < 1e-4, "col {j}: {numeric} vs {analytic:?}");
        }
    }

    #[test]
    fn design_matrix_has_bounded_row_nonzeros() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let basis = clamped_cubic(&x);
        let d = basis.create_design_matrix(&x);
        assert_eq!(d.rows(), x.len());
        assert_eq!(d.cols(), basis.num_coefficients());
        for i in 0..d.rows() {
            let nonzero = d.row(i).iter().filter(|v| v.abs() > 1e-12).count();
            assert!(nonzero <= basis.order() + 1);
        }
    }

    #[test]
    fn derivative_matrix_interleaves_midpoints() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let basis = clamped_cubic(&x);
        let m = basis.create_derivative_matrix(&x, 1).unwrap();
        assert_eq!(m.rows(), 2 * x.len() - 1);
    }
}
