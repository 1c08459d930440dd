//! Quadratic subproblem solver interface.
//!
//! The SQP driver treats the inner QP solver as a capability injected at
//! construction. Each outer iteration hands it the subproblem
//!
//! ```text
//! minimize    (1/2) dᵀH d + gᵀd
//! subject to  lbx ≤ d ≤ ubx,   lba ≤ A d ≤ uba
//! ```
//!
//! through [`QpSubproblem`], together with warm-start buffers that double
//! as outputs. Multiplier sign convention matches the outer solver:
//! positive on an active upper bound, negative on an active lower bound.

use crate::sparsity::Sparsity;
use thiserror::Error;

/// Hard failures of a QP solver. These abort the SQP solve; reportable
/// conditions (infeasible, iteration limit) go through [`QpStatus`]
/// instead, and the driver continues with whatever direction was written.
#[derive(Debug, Error)]
pub enum QpError {
    /// The subproblem violates the solver's contract (dimensions, pattern).
    #[error("QP subproblem rejected: {0}")]
    Rejected(String),

    /// The solver broke down internally.
    #[error("QP solver failure: {0}")]
    Internal(String),
}

/// Reported outcome of one QP solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QpStatus {
    /// Converged to the requested tolerance.
    Optimal,

    /// The subproblem has no feasible point; outputs were left untouched.
    Infeasible,

    /// Iteration limit hit; outputs hold the best iterate found.
    MaxIters,
}

/// Solve diagnostics returned alongside the in-place outputs.
#[derive(Debug, Clone, Copy)]
pub struct QpInfo {
    /// Objective value of the returned point.
    pub cost: f64,
    /// Outcome classification.
    pub status: QpStatus,
}

/// One QP subproblem, borrowed from the SQP workspace.
///
/// `h` and `a` are value arrays in the slot order of `hsp` and `asp`;
/// `hsp` is symmetric with both triangles stored.
#[derive(Debug)]
pub struct QpSubproblem<'a> {
    pub hsp: &'a Sparsity,
    pub h: &'a [f64],
    pub g: &'a [f64],
    pub lbx: &'a [f64],
    pub ubx: &'a [f64],
    pub asp: &'a Sparsity,
    pub a: &'a [f64],
    pub lba: &'a [f64],
    pub uba: &'a [f64],
}

/// A QP solver usable as the SQP inner solver.
///
/// `x`, `lam_x` and `lam_a` carry the warm start on entry and the solution
/// on exit. Implementations may keep internal state between calls within
/// one SQP solve.
pub trait QpSolver {
    fn solve(
        &mut self,
        qp: &QpSubproblem<'_>,
        x: &mut [f64],
        lam_x: &mut [f64],
        lam_a: &mut [f64],
    ) -> Result<QpInfo, QpError>;
}
