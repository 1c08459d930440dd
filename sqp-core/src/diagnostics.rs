//! Iteration printing and developer tracing.

use std::env;

/// Developer tracing, enabled through the environment rather than the
/// settings so it can be switched on without touching caller code.
#[derive(Debug, Clone)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    pub every: usize,
}

impl DiagnosticsConfig {
    pub fn from_env() -> Self {
        let enabled = match env::var("SQP_DIAGNOSTICS") {
            Ok(v) => v != "0" && v.to_lowercase() != "false",
            Err(_) => false,
        };

        let every = env::var("SQP_DIAGNOSTICS_EVERY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(1);

        Self { enabled, every }
    }

    #[inline]
    pub fn should_log(&self, iter: usize) -> bool {
        self.enabled && (iter % self.every == 0)
    }
}

/// Banner with problem statistics, printed once at construction.
pub(crate) fn print_banner(exact_hessian: bool, nx: usize, ng: usize, a_nnz: usize, h_nnz: usize) {
    println!("-------------------------------------------");
    println!("This is sqp-core.");
    if exact_hessian {
        println!("Using exact Hessian");
    } else {
        println!("Using limited memory BFGS Hessian approximation");
    }
    println!("Number of variables:                       {:9}", nx);
    println!("Number of constraints:                     {:9}", ng);
    println!("Number of nonzeros in constraint Jacobian: {:9}", a_nnz);
    println!("Number of nonzeros in Lagrangian Hessian:  {:9}", h_nnz);
    println!();
}

/// Column header, re-printed every 10 iteration rows.
pub(crate) fn print_iteration_header() {
    println!(
        "{:>4} {:>14} {:>9} {:>9} {:>9} {:>7} {:>2}",
        "iter", "objective", "inf_pr", "inf_du", "||d||", "lg(rg)", "ls"
    );
}

/// One iteration row. The regularization column shows log10 of the applied
/// shift, or "-" when no shift was applied; a trailing "F" marks a step
/// that was accepted only because the line search ran out of trials.
pub(crate) fn print_iteration_row(
    iter: usize,
    obj: f64,
    pr_inf: f64,
    du_inf: f64,
    dx_norm: f64,
    reg: f64,
    ls_trials: usize,
    ls_success: bool,
) {
    print!(
        "{:4} {:14.6e} {:9.2e} {:9.2e} {:9.2e} ",
        iter, obj, pr_inf, du_inf, dx_norm
    );
    if reg > 0.0 {
        print!("{:>7.2} ", reg.log10());
    } else {
        print!("{:>7} ", "-");
    }
    print!("{:2}", ls_trials);
    if !ls_success {
        print!("F");
    }
    println!();
}
