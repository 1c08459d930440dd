//! Problem data structures, solver settings and solve results.
//!
//! This module defines the canonical NLP representation and all associated
//! types.

use std::fmt;

use crate::sparsity::Sparsity;

/// Nonlinear program in canonical form.
///
/// ```text
/// minimize    f(x, p)
/// subject to  lbx ≤ x ≤ ubx
///             lbg ≤ g(x, p) ≤ ubg
/// ```
///
/// # Dimensions
///
/// - `nx`: number of decision variables (length of lbx/ubx)
/// - `ng`: number of general constraints (length of lbg/ubg, rows of `asp`)
/// - `np`: number of fixed parameters (length of `p`)
///
/// Equality constraints are expressed as coinciding bounds. Infinite
/// bounds (`f64::INFINITY` / `f64::NEG_INFINITY`) disable a side.
#[derive(Debug, Clone)]
pub struct NlpProblem {
    /// Variable lower bounds (length nx).
    pub lbx: Vec<f64>,

    /// Variable upper bounds (length nx).
    pub ubx: Vec<f64>,

    /// Constraint lower bounds (length ng).
    pub lbg: Vec<f64>,

    /// Constraint upper bounds (length ng).
    pub ubg: Vec<f64>,

    /// Fixed parameters, read-only during a solve (length np).
    pub p: Vec<f64>,

    /// Constraint Jacobian pattern (ng × nx), shared with the oracle.
    pub asp: Sparsity,

    /// Lagrangian Hessian pattern (nx × nx, symmetric), shared with the
    /// oracle. Required for exact-Hessian mode; limited-memory mode falls
    /// back to a dense pattern when absent.
    pub hsp: Option<Sparsity>,
}

impl NlpProblem {
    /// Number of decision variables (nx).
    pub fn nx(&self) -> usize {
        self.lbx.len()
    }

    /// Number of general constraints (ng).
    pub fn ng(&self) -> usize {
        self.lbg.len()
    }

    /// Number of parameters (np).
    pub fn np(&self) -> usize {
        self.p.len()
    }

    /// Validate dimensions and patterns.
    pub fn validate(&self, exact_hessian: bool) -> Result<(), String> {
        let nx = self.nx();
        let ng = self.ng();

        if nx == 0 {
            return Err("problem has no decision variables".to_string());
        }
        if self.ubx.len() != nx {
            return Err(format!("ubx has length {}, expected {}", self.ubx.len(), nx));
        }
        if self.ubg.len() != ng {
            return Err(format!("ubg has length {}, expected {}", self.ubg.len(), ng));
        }
        if self.asp.nrow() != ng || self.asp.ncol() != nx {
            return Err(format!(
                "Jacobian pattern is {}×{}, expected {}×{}",
                self.asp.nrow(),
                self.asp.ncol(),
                ng,
                nx
            ));
        }
        if let Some(ref hsp) = self.hsp {
            if hsp.nrow() != nx || hsp.ncol() != nx {
                return Err(format!(
                    "Hessian pattern is {}×{}, expected {}×{}",
                    hsp.nrow(),
                    hsp.ncol(),
                    nx,
                    nx
                ));
            }
            if !hsp.is_symmetric_pattern() {
                return Err("Hessian pattern is not symmetric".to_string());
            }
        } else if exact_hessian {
            return Err("exact Hessian mode requires a Hessian pattern".to_string());
        }
        Ok(())
    }
}

/// Hessian handling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HessianApprox {
    /// Evaluate the Lagrangian Hessian through the oracle every iteration.
    Exact,
    /// Maintain a damped BFGS approximation, reset every `lbfgs_memory`
    /// iterations.
    LimitedMemory,
}

/// Solver settings and parameters.
#[derive(Debug, Clone)]
pub struct SqpSettings {
    /// Hessian strategy.
    pub hessian_approximation: HessianApprox,

    /// Maximum number of SQP iterations.
    pub max_iter: usize,

    /// Minimum number of SQP iterations before termination is allowed.
    pub min_iter: usize,

    /// Maximum line-search trials per iteration; 0 disables the line
    /// search entirely (full steps).
    pub max_iter_ls: usize,

    /// Stopping tolerance for primal infeasibility.
    pub tol_pr: f64,

    /// Stopping tolerance for dual infeasibility.
    pub tol_du: f64,

    /// Armijo condition coefficient.
    pub c1: f64,

    /// Line-search backtracking factor.
    pub beta: f64,

    /// Length of the non-monotone merit history.
    pub merit_memory: usize,

    /// Iterations between BFGS resets.
    pub lbfgs_memory: usize,

    /// Shift the Hessian diagonal by the Gershgorin bound when indefinite
    /// (exact mode only).
    pub regularize: bool,

    /// Terminate once the step inf-norm falls below this; a negative value
    /// disables the test.
    pub min_step_size: f64,

    /// Print the header with problem statistics.
    pub print_header: bool,

    /// Print the iteration table.
    pub print_iteration: bool,

    /// Print a status message after solving.
    pub print_status: bool,
}

impl Default for SqpSettings {
    fn default() -> Self {
        Self {
            hessian_approximation: HessianApprox::Exact,
            max_iter: 50,
            min_iter: 0,
            max_iter_ls: 3,
            tol_pr: 1e-6,
            tol_du: 1e-6,
            c1: 1e-4,
            beta: 0.8,
            merit_memory: 4,
            lbfgs_memory: 10,
            regularize: false,
            min_step_size: 1e-10,
            print_header: true,
            print_iteration: true,
            print_status: true,
        }
    }
}

impl SqpSettings {
    /// Validate option values.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(format!("beta must be in (0, 1), got {}", self.beta));
        }
        if self.c1 <= 0.0 {
            return Err(format!("c1 must be positive, got {}", self.c1));
        }
        if self.merit_memory == 0 {
            return Err("merit_memory must be at least 1".to_string());
        }
        if self.lbfgs_memory == 0 {
            return Err("lbfgs_memory must be at least 1".to_string());
        }
        if self.tol_pr <= 0.0 || self.tol_du <= 0.0 {
            return Err("tolerances must be positive".to_string());
        }
        Ok(())
    }
}

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnStatus {
    /// Converged: primal and dual infeasibility below tolerance.
    SolveSucceeded,

    /// Iteration limit reached without convergence.
    MaximumIterationsExceeded,

    /// Step shrank below `min_step_size` without meeting the convergence
    /// criteria.
    SearchDirectionBecomesTooSmall,

    /// The progress callback requested termination.
    UserRequestedStop,
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnStatus::SolveSucceeded => write!(f, "Solve_Succeeded"),
            ReturnStatus::MaximumIterationsExceeded => {
                write!(f, "Maximum_Iterations_Exceeded")
            }
            ReturnStatus::SearchDirectionBecomesTooSmall => {
                write!(f, "Search_Direction_Becomes_Too_Small")
            }
            ReturnStatus::UserRequestedStop => write!(f, "User_Requested_Stop"),
        }
    }
}

/// Coarse classification of [`ReturnStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnifiedStatus {
    /// Converged.
    Success,
    /// A resource limit was hit.
    Limited,
    /// Anything else.
    Unknown,
}

impl ReturnStatus {
    /// Coarse classification.
    pub fn unified(&self) -> UnifiedStatus {
        match self {
            ReturnStatus::SolveSucceeded => UnifiedStatus::Success,
            ReturnStatus::MaximumIterationsExceeded => UnifiedStatus::Limited,
            _ => UnifiedStatus::Unknown,
        }
    }
}

/// Solve result with solution and diagnostics.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// Primal solution (length nx).
    pub x: Vec<f64>,

    /// Objective value at the solution.
    pub f: f64,

    /// Constraint values at the solution (length ng).
    pub g: Vec<f64>,

    /// Bound multipliers (length nx): positive on an active upper bound,
    /// negative on an active lower bound.
    pub lam_x: Vec<f64>,

    /// Constraint multipliers (length ng), same sign convention.
    pub lam_g: Vec<f64>,

    /// Parameter sensitivities (length np); nonzero only when the oracle
    /// provides the post-solve gradient.
    pub lam_p: Vec<f64>,

    /// Terminal status.
    pub status: ReturnStatus,

    /// True only when the convergence criteria were met.
    pub success: bool,

    /// Iteration statistics.
    pub stats: SolveStats,
}

/// Iteration statistics.
#[derive(Debug, Clone, Copy)]
pub struct SolveStats {
    /// Number of completed SQP iterations.
    pub iter_count: usize,

    /// Coarse status classification.
    pub unified_status: UnifiedStatus,

    /// Primal infeasibility at termination.
    pub pr_inf: f64,

    /// Dual infeasibility at termination.
    pub du_inf: f64,
}
