//! Error types for the SQP core.

use thiserror::Error;

use crate::qp::QpError;

/// Errors that can occur while configuring or running a solve.
#[derive(Error, Debug)]
pub enum SqpError {
    /// Problem validation failed at construction.
    #[error("invalid problem: {0}")]
    InvalidProblem(String),

    /// Option validation failed at construction.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// An oracle failed outside the line search; the solve is aborted.
    #[error("oracle evaluation failed in {function}")]
    Eval {
        /// Name of the failing oracle function.
        function: &'static str,
    },

    /// The QP solver reported a hard failure.
    #[error("QP subproblem solve failed: {0}")]
    Qp(#[from] QpError),
}
