//! Constrained regression B-splines for 1D scattered data.
//!
//! This crate fits a B-spline curve `s(x) = sum_j c_j * B_j(x)` to scattered
//! `(x, y)` observations, optionally subject to shape constraints:
//! monotonicity, convexity/concavity, periodicity, and pointwise
//! equality/inequality pins. Unconstrained fits solve a regularized normal-
//! equations least squares problem; constrained fits are posed as a linear
//! program over the spline coefficients and solved by revised simplex,
//! falling back to the unconstrained solve if the LP does not report an
//! optimal basis.
//!
//! - evaluate and differentiate a B-spline basis over a clamped knot vector
//!   (`basis` module),
//! - build the linear constraint rows for each supported shape constraint
//!   (`constraints` module),
//! - solve small dense linear systems and LPs (`matrix`, `simplex` modules),
//! - evaluate a fitted curve and its derivatives (`piecewise` module), and
//! - orchestrate a complete fit from raw data (`fitter` module).
//!
//! # Quick start
//!
//! ```
//! use cobs::{fit, FitOptions};
//!
//! let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
//! let y = vec![1.0, 4.0, 9.0, 16.0, 25.0];
//!
//! let result = fit(&x, &y, &FitOptions::default()).expect("well-formed fit");
//! println!("fitted value at x=3: {}", result.evaluate(3.0));
//! ```
//!
//! Shape constraints are added to [`FitOptions`] before fitting:
//!
//! ```
//! use cobs::{fit, FitOptions, Constraint};
//!
//! let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
//! let y = vec![1.0, 2.0, 4.0, 7.0, 11.0];
//! let options = FitOptions::default().with_constraint(Constraint::Monotone { increasing: true });
//! let result = fit(&x, &y, &options).expect("well-formed fit");
//! ```

pub mod basis;
pub mod constraints;
pub mod error;
pub mod fitter;
pub mod matrix;
pub mod options;
pub mod piecewise;
pub mod simplex;

pub use basis::BSplineBasis;
pub use constraints::ConstraintBuilder;
pub use error::{CobsError, Result};
pub use fitter::{fit, FitResult, FitStats};
pub use matrix::Matrix;
pub use options::{Constraint, FitOptions};
pub use piecewise::PiecewisePolynomial;
pub use simplex::LpOutcome;
