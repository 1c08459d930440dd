//! Caller-supplied evaluation oracles.
//!
//! The solver never differentiates anything itself: objective, constraints,
//! first-order derivatives and (optionally) the Lagrangian Hessian come
//! from an [`NlpOracle`] implementation. Outputs are written into slices
//! owned by the solver workspace; Jacobian and Hessian values must follow
//! the CSC slot order of the patterns declared in the problem.

use thiserror::Error;

/// An oracle call failed to produce a value.
///
/// Inside the line search this is recoverable (the step backtracks);
/// anywhere else the solve aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("oracle evaluation failed")]
pub struct EvalError;

/// Evaluation callbacks for one NLP.
pub trait NlpOracle {
    /// Objective and constraint values at `x`.
    fn fg(&self, x: &[f64], p: &[f64], f: &mut f64, g: &mut [f64]) -> Result<(), EvalError>;

    /// Objective, its dense gradient, constraint values and the constraint
    /// Jacobian (values in the declared Jacobian pattern's slot order).
    fn jac_fg(
        &self,
        x: &[f64],
        p: &[f64],
        f: &mut f64,
        gf: &mut [f64],
        g: &mut [f64],
        jac: &mut [f64],
    ) -> Result<(), EvalError>;

    /// Whether [`NlpOracle::hess_l`] is implemented. Exact-Hessian mode
    /// requires it; checked when the solver is constructed.
    fn has_hessian(&self) -> bool {
        false
    }

    /// Hessian of the Lagrangian lam_f·f + lam_gᵀg, values in the declared
    /// Hessian pattern's slot order (both triangles).
    fn hess_l(
        &self,
        _x: &[f64],
        _p: &[f64],
        _lam_f: f64,
        _lam_g: &[f64],
        _hess: &mut [f64],
    ) -> Result<(), EvalError> {
        Err(EvalError)
    }

    /// Whether [`NlpOracle::grad`] is implemented.
    fn has_grad(&self) -> bool {
        false
    }

    /// Post-solve polishing: recompute f, g, the Lagrangian gradient w.r.t.
    /// x (written to `grad_x`, without the bound multiplier term) and
    /// w.r.t. the parameters (written to `grad_p`).
    fn grad(
        &self,
        _x: &[f64],
        _p: &[f64],
        _lam_f: f64,
        _lam_g: &[f64],
        _f: &mut f64,
        _g: &mut [f64],
        _grad_x: &mut [f64],
        _grad_p: &mut [f64],
    ) -> Result<(), EvalError> {
        Err(EvalError)
    }
}
