//! Orchestrator: generates knots, assembles the design matrix, builds
//! constraints, chooses between least-squares and LP, and assembles the
//! fit result.

use log::{debug, warn};

use crate::basis::BSplineBasis;
use crate::constraints::ConstraintBuilder;
use crate::error::{CobsError, Result};
use crate::matrix::Matrix;
use crate::options::FitOptions;
use crate::piecewise::PiecewisePolynomial;
use crate::simplex::{self, LpOutcome};

/// Decimal places coefficients are rounded to before assembling the result,
/// to reduce reporting jitter from the regularized solve / simplex pivots.
const COEFFICIENT_ROUNDING_DECIMALS: i32 = 12;

/// Magnitude below which an LP-returned coefficient vector is treated as the
/// degenerate all-zero solution rather than a genuine fit.
const DEGENERATE_EPS: f64 = 1e-9;

/// Statistics about the fit, plus the evaluator built from its coefficients.
#[derive(Clone, Debug)]
pub struct FitStats {
    /// Model-implied values `D * c` at the training abscissae.
    pub fitted: Vec<f64>,
    /// `y - fitted`.
    pub residuals: Vec<f64>,
    /// Alias of [`FitResult::coefficients`].
    pub coefficients: Vec<f64>,
    /// Evaluator over the fitted coefficients.
    pub pp: PiecewisePolynomial,
}

/// Result of a single [`fit`] call.
#[derive(Clone, Debug)]
pub struct FitResult {
    /// Fitted spline coefficients.
    pub coefficients: Vec<f64>,
    /// Knot vector used for the fit (generated or caller-supplied).
    pub knots: Vec<f64>,
    /// Spline order.
    pub order: usize,
    /// Sum of squared residuals.
    pub error: f64,
    /// Fitted values, residuals and an evaluator, grouped.
    pub fit: FitStats,
    /// Alias of `fit.pp`, exposed at the top level for convenience.
    pub pp: PiecewisePolynomial,
    /// Echoed quantile level; does not influence the loss (see `DESIGN.md`).
    pub tau: Option<f64>,
    /// Echoed smoothing parameter; currently inert.
    pub lambda: Option<f64>,
    /// Reserved for a future information-criterion score; always `None`.
    pub sic: Option<f64>,
}

impl FitResult {
    /// Alias of `self.pp.evaluate(x)`.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.pp.evaluate(x)
    }

    /// Alias of `self.pp.evaluate_second_derivative(x)`.
    pub fn evaluate_second_derivative(&self, x: f64) -> f64 {
        self.pp.evaluate_second_derivative(x)
    }
}

/// Fits a constrained regression B-spline to `(x, y)` under `options`.
///
/// See the crate documentation for the full contract; in short: builds a
/// knot vector and design matrix, builds constraint rows if any are
/// requested, solves by LP when constraints are present (falling back to
/// regularized least squares on any non-optimal LP outcome), and returns a
/// self-contained [`FitResult`].
pub fn fit(x: &[f64], y: &[f64], options: &FitOptions) -> Result<FitResult> {
    validate_input(x, y, options.order)?;

    let knots = match &options.knots {
        Some(k) => k.clone(),
        None => generate_knots(x, options.order),
    };
    debug!("fit: n={}, order={}, knots.len()={}", x.len(), options.order, knots.len());

    let basis = BSplineBasis::new(knots.clone(), options.order)?;
    let design = basis.create_design_matrix(x);

    let coefficients = if options.constraints.is_empty() {
        design.solve(y)?
    } else {
        let builder = ConstraintBuilder::new(&basis, x);
        let (a, b) = builder.build(&options.constraints)?;
        if a.rows() == 0 {
            design.solve(y)?
        } else {
            let objective = vec![1.0; a.cols()];
            match simplex::solve(&a, &b, Some(&objective)) {
                LpOutcome::Optimal(candidate)
                    if candidate.len() == basis.num_coefficients() && !is_degenerate(&candidate) =>
                {
                    candidate
                }
                LpOutcome::Optimal(candidate) if candidate.len() == basis.num_coefficients() => {
                    warn!(
                        "constrained LP returned a degenerate all-zero coefficient vector; \
                         falling back to regularized least squares"
                    );
                    design.solve(y)?
                }
                outcome => {
                    warn!(
                        "constrained LP did not produce a usable solution ({outcome:?}); \
                         falling back to regularized least squares"
                    );
                    design.solve(y)?
                }
            }
        }
    };

    let coefficients: Vec<f64> = coefficients.into_iter().map(round12).collect();

    let fitted = design.mul_vec(&coefficients)?;
    let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(yi, fi)| yi - fi).collect();
    let error = residuals.iter().map(|r| r * r).sum();

    let pp = PiecewisePolynomial::from_parts(knots.clone(), options.order, coefficients.clone())?;

    Ok(FitResult {
        coefficients: coefficients.clone(),
        knots,
        order: options.order,
        error,
        fit: FitStats {
            fitted,
            residuals,
            coefficients,
            pp: pp.clone(),
        },
        pp,
        tau: options.tau,
        lambda: options.lambda,
        sic: None,
    })
}

fn round12(v: f64) -> f64 {
    (v * 10f64.powi(COEFFICIENT_ROUNDING_DECIMALS)).round() / 10f64.powi(COEFFICIENT_ROUNDING_DECIMALS)
}

/// A homogeneous constraint block (monotone, convex/concave, periodic) has
/// `b = 0`, so `min 1ᵀx s.t. A x <= 0, x >= 0` is uniquely solved by `x = 0`
/// at every pivot. That `Optimal(vec![0.0; N])` is a feasible LP answer but
/// not a fit: it ignores `y` entirely, so it must be treated the same as a
/// non-optimal outcome and trigger the least-squares fallback.
fn is_degenerate(candidate: &[f64]) -> bool {
    candidate.iter().all(|v| v.abs() < DEGENERATE_EPS)
}

fn validate_input(x: &[f64], y: &[f64], order: usize) -> Result<()> {
    if x.len() != y.len() {
        return Err(CobsError::invalid_input(
            "fit",
            format!("x has {} samples but y has {}", x.len(), y.len()),
        ));
    }
    if x.len() < 2 {
        return Err(CobsError::invalid_input("fit", "at least 2 data points are required"));
    }
    if order < 1 {
        return Err(CobsError::invalid_input("fit", "order must be >= 1"));
    }
    Ok(())
}

/// Generates a clamped knot vector for `x` under `order` when the caller
/// does not supply one: `order + 1` copies of `x[0]`, interior knots
/// equally spaced in `(x[0], x[n-1])` when `n > order + 1`, then `order + 1`
/// copies of `x[n-1]`.
fn generate_knots(x: &[f64], order: usize) -> Vec<f64> {
    let n = x.len();
    let mut knots = vec![x[0]; order + 1];
    if n > order + 1 {
        let interior = n - order - 1;
        for i in 1..=interior {
            let t = i as f64 / (interior + 1) as f64;
            knots.push(x[0] + t * (x[n - 1] - x[0]));
        }
    }
    knots.extend(std::iter::repeat(x[n - 1]).take(order + 1));
    knots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Constraint;
    use approx::assert_relative_eq;

    #[test]
    fn generated_knots_match_bookkeeping_invariant() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let order = 4;
        let knots = generate_knots(&x, order);
        assert_eq!(knots.len(), x.len() + order + 1);
        assert!(knots[..=order].iter().all(|&k| k == x[0]));
        let tail = &knots[knots.len() - order - 1..];
        assert!(tail.iter().all(|&k| k == x[x.len() - 1]));
        assert!(knots.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn unconstrained_fit_interpolates_quadratic_data() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![1.0, 4.0, 9.0, 16.0, 25.0];
        let result = fit(&x, &y, &FitOptions::default()).unwrap();
        assert_eq!(result.coefficients.len(), 5);
        assert!(result.error < 1e-5);
        assert_relative_eq!(result.evaluate(3.0), 9.0, epsilon = 1e-4);
    }

    #[test]
    fn monotone_constraint_orders_fitted_values() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![1.0, 2.0, 4.0, 7.0, 11.0];
        let options = FitOptions::default().with_constraint(Constraint::Monotone { increasing: true });
        let result = fit(&x, &y, &options).unwrap();

        // The fit must actually track the data, not just satisfy `0 <= 0`: a
        // degenerate all-zero coefficient vector would also pass a bare
        // ordering check, so assert it lands near the training values too.
        assert!(!result.coefficients.iter().all(|c| c.abs() < 1e-9));
        assert_relative_eq!(result.evaluate(1.0), 1.0, epsilon = 1e-2);
        assert_relative_eq!(result.evaluate(5.0), 11.0, epsilon = 1e-2);

        let points = [1.5, 2.5, 3.5, 4.5];
        for w in points.windows(2) {
            assert!(result.evaluate(w[0]) <= result.evaluate(w[1]) + 1e-3);
        }
    }

    #[test]
    fn periodic_constraint_matches_endpoints() {
        let x: Vec<f64> = (0..=6).map(|i| i as f64).collect();
        let y = vec![0.0, 1.0, 0.0, -1.0, 0.0, 1.0, 0.0];
        let options = FitOptions::default().with_constraint(Constraint::Periodic);
        let result = fit(&x, &y, &options).unwrap();
        assert!((result.evaluate(0.0) - result.evaluate(6.0)).abs() < 1e-6);
    }

    #[test]
    fn pointwise_equality_is_honored() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![1.0, 4.0, 9.0, 16.0, 25.0];
        let options = FitOptions::default().with_constraint(Constraint::Pointwise {
            x: 3.0,
            y: 9.0,
            operator: "=".to_string(),
        });
        let result = fit(&x, &y, &options).unwrap();
        assert_relative_eq!(result.evaluate(3.0), 9.0, epsilon = 1e-4);
    }

    #[test]
    fn conflicting_constraints_do_not_panic() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![1.0, 2.0, 4.0, 7.0, 11.0];
        let options = FitOptions::default()
            .with_constraint(Constraint::Monotone { increasing: true })
            .with_constraint(Constraint::Pointwise {
                x: 3.0,
                y: 0.0,
                operator: "=".to_string(),
            });
        let result = fit(&x, &y, &options).unwrap();
        assert!(result.evaluate(3.0).is_finite());
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = fit(&[1.0, 2.0, 3.0], &[1.0, 2.0], &FitOptions::default()).unwrap_err();
        assert!(matches!(err, CobsError::InvalidInput { .. }));
    }

    #[test]
    fn rejects_too_few_points() {
        let err = fit(&[1.0], &[1.0], &FitOptions::default()).unwrap_err();
        assert!(matches!(err, CobsError::InvalidInput { .. }));
    }

    #[test]
    fn rejects_short_user_supplied_knots() {
        let options = FitOptions::default().with_knots(vec![0.0, 1.0]);
        let err = fit(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], &options).unwrap_err();
        assert!(matches!(err, CobsError::InvalidKnots { .. }));
    }
}
