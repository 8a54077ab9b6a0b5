//! Revised primal simplex over a dense tableau.
//!
//! Finds a feasible or objective-minimizing coefficient vector `x >= 0`
//! subject to `A*x <= b`, operating directly on the caller-supplied `A`
//! (no slack columns are appended) via a heuristic Phase-I substitute that
//! looks for unit-vector columns already present in `A`.

use crate::matrix::Matrix;

/// Maximum number of pivots before the solver gives up.
const MAX_ITERATIONS: usize = 1000;

/// Numerical tolerance used for feasibility, optimality and ratio tests.
const TOL: f64 = 1e-12;

/// Outcome of one simplex run.
///
/// The source this crate reimplements returns a degenerate zero vector on
/// every non-optimal outcome; this crate instead reports an explicit tag so
/// callers (here, [`crate::fitter::Fitter`]) can log and fall back to
/// regularized least squares deliberately rather than by inspecting a
/// sentinel value.
#[derive(Clone, Debug, PartialEq)]
pub enum LpOutcome {
    /// A feasible, cost-minimizing `x >= 0` was found.
    Optimal(Vec<f64>),
    /// The current basis was infeasible (some `x_B[i] < -tol`).
    Infeasible,
    /// No positive entry in the pivot direction; the LP is unbounded.
    Unbounded,
    /// The basis matrix `B` was singular during a pivot.
    Singular,
    /// The iteration cap was exceeded before reaching optimality.
    MaxIter,
}

/// Solves `min c^T x` subject to `A x <= b`, `x >= 0` by revised simplex.
///
/// When `c` is `None`, a uniform all-ones objective is used so the LP
/// reduces to minimum-sum feasibility.
pub fn solve(a: &Matrix, b: &[f64], c: Option<&[f64]>) -> LpOutcome {
    let p = a.rows();
    let n = a.cols();
    if p == 0 {
        return LpOutcome::Optimal(vec![0.0; n]);
    }
    let objective: Vec<f64> = match c {
        Some(c) => c.to_vec(),
        None => vec![1.0; n],
    };

    let (mut basis, mut nonbasis) = initial_basis(a);

    for _ in 0..MAX_ITERATIONS {
        let b_mat = extract_columns(a, &basis);
        let b_inv = match b_mat.inverse() {
            Some(inv) => inv,
            None => return LpOutcome::Singular,
        };
        let x_b = b_inv.mul_vec(b).expect("basis matrix is square and conformant with b");
        if x_b.iter().any(|&v| v < -TOL) {
            return LpOutcome::Infeasible;
        }

        let c_b: Vec<f64> = basis.iter().map(|&j| objective[j]).collect();
        let y = b_inv.transpose().mul_vec(&c_b).expect("conformant dims");

        let mut entering: Option<usize> = None;
        let mut best_reduced_cost = -TOL;
        for &j in &nonbasis {
            let col = a.col(j);
            let yt_aj: f64 = y.iter().zip(col.iter()).map(|(yi, ai)| yi * ai).sum();
            let reduced_cost = objective[j] - yt_aj;
            if reduced_cost < best_reduced_cost {
                best_reduced_cost = reduced_cost;
                entering = Some(j);
            }
        }

        let entering = match entering {
            Some(j) => j,
            None => {
                let mut x = vec![0.0; n];
                for (i, &j) in basis.iter().enumerate() {
                    x[j] = x_b[i].max(0.0);
                }
                return LpOutcome::Optimal(x);
            }
        };

        let direction = b_inv.mul_vec(&a.col(entering)).expect("conformant dims");

        let mut leaving: Option<usize> = None;
        let mut best_ratio = f64::INFINITY;
        for i in 0..p {
            if direction[i] > TOL {
                let ratio = x_b[i] / direction[i];
                if ratio < best_ratio {
                    best_ratio = ratio;
                    leaving = Some(i);
                }
            }
        }

        let leaving = match leaving {
            Some(i) => i,
            None => return LpOutcome::Unbounded,
        };

        let outgoing = basis[leaving];
        basis[leaving] = entering;
        if let Some(slot) = nonbasis.iter().position(|&j| j == entering) {
            nonbasis[slot] = outgoing;
        }
    }

    LpOutcome::MaxIter
}

/// Builds the `p x p` matrix of `A`'s columns indexed by `basis`.
fn extract_columns(a: &Matrix, basis: &[usize]) -> Matrix {
    let p = a.rows();
    let mut m = Matrix::zeros(p, basis.len());
    for (col_idx, &j) in basis.iter().enumerate() {
        for i in 0..p {
            m.set(i, col_idx, a.get(i, j));
        }
    }
    m
}

/// Finds a starting basis by scanning for unit-vector columns in `A`; rows
/// without one borrow the highest-index remaining column as an artificial
/// basic variable (a heuristic Phase-I substitute, not an explicit two-phase
/// method).
fn initial_basis(a: &Matrix) -> (Vec<usize>, Vec<usize>) {
    let p = a.rows();
    let n = a.cols();
    let mut basis = vec![0usize; p];
    let mut used = vec![false; n];

    for i in 0..p {
        let mut found = None;
        for j in 0..n {
            if used[j] {
                continue;
            }
            if (a.get(i, j) - 1.0).abs() < 1e-9
                && (0..p).all(|r| r == i || a.get(r, j).abs() < 1e-9)
            {
                found = Some(j);
                break;
            }
        }
        let chosen = found.or_else(|| (0..n).rev().find(|&j| !used[j]));
        let chosen = chosen.unwrap_or(n.saturating_sub(1));
        basis[i] = chosen;
        used[chosen] = true;
    }

    let nonbasis: Vec<usize> = (0..n).filter(|&j| !used[j]).collect();
    (basis, nonbasis)
}
