//! Configuration structures for [`crate::fit`], mirroring the keyword-option
//! surface of the library this crate's API is derived from while remaining
//! idiomatic Rust.

use serde::{Deserialize, Serialize};

/// A single shape or pointwise constraint on the fitted spline's
/// coefficients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Constraint {
    /// Require the fitted curve to be monotone increasing (or decreasing).
    Monotone {
        /// `true` for increasing, `false` for decreasing.
        increasing: bool,
    },
    /// Require the fitted curve to be convex (or, with `convex: false`,
    /// concave).
    Convex {
        #[serde(default = "default_true")]
        convex: bool,
    },
    /// Require the fitted curve to be concave. Equivalent to
    /// `Convex { convex: false }`.
    Concave,
    /// Require the fitted curve and its first derivative to agree at the
    /// endpoints of the data domain.
    Periodic,
    /// Pin the curve at a single abscissa via an equality or inequality.
    Pointwise {
        x: f64,
        y: f64,
        /// One of `"="`, `"<="`, `">="`.
        operator: String,
    },
}

fn default_true() -> bool {
    true
}

/// Options accepted by [`crate::fit`]. Unknown JSON fields are ignored by
/// `serde` when options are deserialized from a caller-supplied document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FitOptions {
    /// Spline order `k`; default 4 (cubic).
    #[serde(default = "default_order")]
    pub order: usize,

    /// Explicit knot sequence. When absent, knots are generated from `x`.
    #[serde(default)]
    pub knots: Option<Vec<f64>>,

    /// Shape and pointwise constraints to impose on the fit.
    #[serde(default)]
    pub constraints: Vec<Constraint>,

    /// Quantile level, echoed in the result but not used in the loss (the
    /// loss is always squared-error / LP feasibility). See `DESIGN.md`.
    #[serde(default)]
    pub tau: Option<f64>,

    /// Reserved: per-sample weights. Accepted, currently inert.
    #[serde(default)]
    pub weights: Option<Vec<f64>>,

    /// Reserved: smoothing parameter for a future penalized fit. Accepted,
    /// currently inert.
    #[serde(default)]
    pub lambda: Option<f64>,

    /// Reserved: information criterion for automatic smoothing-parameter
    /// selection. Accepted, currently inert.
    #[serde(default)]
    pub ic: Option<String>,

    /// Reserved: target interior knot count when knots are auto-generated.
    /// Accepted, currently inert (knot count is driven by `x.len()` per the
    /// generation rule in `fitter`).
    #[serde(default)]
    pub num_knots: Option<usize>,

    /// Reserved: LP iteration cap override. Accepted, currently inert (the
    /// simplex solver's internal 1000-iteration limit is fixed).
    #[serde(default)]
    pub maxiter: Option<usize>,

    /// Reserved: convergence tolerance override. Accepted, currently inert.
    #[serde(default)]
    pub tolerance: Option<f64>,

    /// Reserved: explicit polynomial degree. Accepted, currently inert;
    /// `order` is authoritative.
    #[serde(default)]
    pub degree: Option<usize>,
}

fn default_order() -> usize {
    4
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            order: default_order(),
            knots: None,
            constraints: Vec::new(),
            tau: None,
            weights: None,
            lambda: None,
            ic: None,
            num_knots: None,
            maxiter: None,
            tolerance: None,
            degree: None,
        }
    }
}

impl FitOptions {
    /// Starts from defaults, overriding the spline order.
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Supplies an explicit knot sequence.
    pub fn with_knots(mut self, knots: Vec<f64>) -> Self {
        self.knots = Some(knots);
        self
    }

    /// Appends one constraint to the list.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Sets the quantile level echoed in the result.
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = Some(tau);
        self
    }
}
