//! sqp-core: a sequential quadratic programming solver core
//!
//! This library implements the Newton-type outer iteration of an SQP
//! method for smooth nonlinear programs
//!
//! ```text
//! minimize    f(x, p)
//! subject to  lbx ≤ x ≤ ubx,   lbg ≤ g(x, p) ≤ ubg
//! ```
//!
//! Objective, constraints and their derivatives are supplied by the caller
//! through the [`NlpOracle`] trait; the inner quadratic subproblem solver
//! is injected through the [`QpSolver`] trait (a dense reference
//! implementation ships as [`DenseQpSolver`]). Key features:
//!
//! - **ℓ₁ merit line search** with a non-monotone acceptance window
//! - **Powell-damped BFGS** Hessian approximation over a sparse pattern,
//!   or exact Hessians through the oracle
//! - **Gershgorin regularization** of indefinite exact Hessians
//! - **Allocation-free hot loop** over a preallocated workspace
//!
//! # Example
//!
//! ```ignore
//! use sqp_core::{DenseQpSolver, NlpProblem, Sqp, SqpSettings, Sparsity};
//!
//! // minimize f(x) subject to bounds, with derivatives supplied by
//! // an NlpOracle implementation `MyOracle`.
//! let problem = NlpProblem {
//!     lbx: vec![f64::NEG_INFINITY; 2],
//!     ubx: vec![f64::INFINITY; 2],
//!     lbg: vec![],
//!     ubg: vec![],
//!     p: vec![],
//!     asp: Sparsity::empty(0, 2),
//!     hsp: Some(Sparsity::dense(2, 2)),
//! };
//!
//! let mut solver = Sqp::new(
//!     problem,
//!     MyOracle,
//!     DenseQpSolver::default(),
//!     SqpSettings::default(),
//! )?;
//! let result = solver.solve(&[-1.2, 1.0], &[0.0; 2], &[])?;
//!
//! println!("Status: {}", result.status);
//! println!("Optimal value: {}", result.f);
//! println!("Solution: {:?}", result.x);
//! ```

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

pub mod bfgs;
pub mod dense_qp;
pub mod diagnostics;
pub mod error;
pub mod kernels;
pub mod linesearch;
pub mod nlp;
pub mod oracle;
pub mod qp;
pub mod regularize;
pub mod solver;
pub mod sparsity;
pub mod workspace;

// Re-export main types
pub use dense_qp::{DenseQpSettings, DenseQpSolver};
pub use error::SqpError;
pub use nlp::{
    HessianApprox, NlpProblem, ReturnStatus, SolveResult, SolveStats, SqpSettings, UnifiedStatus,
};
pub use oracle::{EvalError, NlpOracle};
pub use qp::{QpError, QpInfo, QpSolver, QpStatus, QpSubproblem};
pub use solver::{IterationInfo, Sqp};
pub use sparsity::Sparsity;
