//! The piecewise-polynomial view of a fitted spline: pure evaluators over a
//! fixed `(knots, order, coefficients)` triple.

use crate::basis::BSplineBasis;
use crate::error::Result;

/// Half-step used by [`PiecewisePolynomial::evaluate_second_derivative`]'s
/// central-difference formula.
const SECOND_DERIVATIVE_STEP: f64 = 1e-6;

/// A fitted B-spline curve: immutable knots, order and coefficients, with
/// pure evaluators over them.
///
/// Knots and order are fixed at fit time; the basis can always be rebuilt
/// from them on demand, so `PiecewisePolynomial` carries no back-reference
/// to the `Fitter` that produced it.
#[derive(Clone, Debug)]
pub struct PiecewisePolynomial {
    basis: BSplineBasis,
    coefficients: Vec<f64>,
}

impl PiecewisePolynomial {
    /// Reconstructs a polynomial from its serializable parts.
    pub fn from_parts(knots: Vec<f64>, order: usize, coefficients: Vec<f64>) -> Result<Self> {
        let basis = BSplineBasis::new(knots, order)?;
        Ok(Self { basis, coefficients })
    }

    /// Read-only view of the knot vector.
    pub fn knots(&self) -> &[f64] {
        self.basis.knots()
    }

    /// The spline order.
    pub fn order(&self) -> usize {
        self.basis.order()
    }

    /// Read-only view of the coefficient vector.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Evaluates `s(x) = sum_j c_j * B_j(x)`.
    pub fn evaluate(&self, x: f64) -> f64 {
        dot(&self.basis.evaluate(x), &self.coefficients)
    }

    /// Evaluates the first derivative via the exact de Boor derivative basis.
    pub fn evaluate_derivative(&self, x: f64) -> f64 {
        dot(&self.basis.evaluate_derivative(x), &self.coefficients)
    }

    /// Evaluates the second derivative using central finite differences with
    /// `h = 1e-6`, preserved from the source this crate reimplements rather
    /// than delegating to the exact second-derivative basis (see
    /// `DESIGN.md`).
    pub fn evaluate_second_derivative(&self, x: f64) -> f64 {
        let h = SECOND_DERIVATIVE_STEP;
        let plus = self.evaluate(x + h);
        let center = self.evaluate(x);
        let minus = self.evaluate(x - h);
        (plus - 2.0 * center + minus) / (h * h)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
