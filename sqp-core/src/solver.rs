//! Outer SQP driver.
//!
//! One iteration evaluates the oracles, assembles the Lagrangian gradient,
//! checks convergence, refreshes the Hessian (exact or BFGS), solves the
//! QP subproblem for a step, globalizes it with the non-monotone ℓ₁ line
//! search and commits the step. The QP solver and the oracles are
//! capabilities injected at construction.

use crate::bfgs::{bfgs_reset, bfgs_update};
use crate::diagnostics::{self, DiagnosticsConfig};
use crate::error::SqpError;
use crate::kernels::{axpy, bilin, copy, fill, max_viol, mv, norm_inf, scal};
use crate::linesearch::line_search;
use crate::nlp::{
    HessianApprox, NlpProblem, ReturnStatus, SolveResult, SolveStats, SqpSettings,
};
use crate::oracle::NlpOracle;
use crate::qp::{QpSolver, QpStatus, QpSubproblem};
use crate::regularize::{lb_eig, regularize};
use crate::sparsity::Sparsity;
use crate::workspace::SqpWorkspace;

/// Snapshot handed to the progress callback once per iteration.
#[derive(Debug)]
pub struct IterationInfo<'a> {
    pub iter_count: usize,
    pub f: f64,
    pub pr_inf: f64,
    pub du_inf: f64,
    pub dx_norm: f64,
    pub x: &'a [f64],
    pub g: &'a [f64],
    pub lam_x: &'a [f64],
    pub lam_g: &'a [f64],
}

/// Progress callback; returning `true` stops the solve at the current
/// iteration boundary with [`ReturnStatus::UserRequestedStop`].
pub type ProgressCallback = Box<dyn FnMut(&IterationInfo<'_>) -> bool>;

/// SQP solver instance: problem, oracles, inner QP solver and settings,
/// with all per-solve buffers allocated up front.
pub struct Sqp<O: NlpOracle, Q: QpSolver> {
    problem: NlpProblem,
    oracle: O,
    qpsol: Q,
    settings: SqpSettings,
    /// Resolved Hessian pattern (problem's, or dense in BFGS mode).
    hsp: Sparsity,
    work: SqpWorkspace,
    callback: Option<ProgressCallback>,
    diag: DiagnosticsConfig,
}

impl<O: NlpOracle, Q: QpSolver> Sqp<O, Q> {
    /// Validate the configuration and allocate the workspace.
    pub fn new(
        problem: NlpProblem,
        oracle: O,
        qpsol: Q,
        settings: SqpSettings,
    ) -> Result<Self, SqpError> {
        settings.validate().map_err(SqpError::InvalidOption)?;
        let exact = settings.hessian_approximation == HessianApprox::Exact;
        problem.validate(exact).map_err(SqpError::InvalidProblem)?;
        if exact && !oracle.has_hessian() {
            return Err(SqpError::InvalidProblem(
                "exact Hessian mode requested but the oracle does not provide hess_l".to_string(),
            ));
        }

        let hsp = match problem.hsp {
            Some(ref sp) => sp.clone(),
            None => Sparsity::dense(problem.nx(), problem.nx()),
        };
        let work = SqpWorkspace::new(
            problem.nx(),
            problem.ng(),
            settings.merit_memory,
            problem.asp.nnz(),
            hsp.nnz(),
        );

        if settings.print_header {
            diagnostics::print_banner(
                exact,
                problem.nx(),
                problem.ng(),
                problem.asp.nnz(),
                hsp.nnz(),
            );
        }

        Ok(Self {
            problem,
            oracle,
            qpsol,
            settings,
            hsp,
            work,
            callback: None,
            diag: DiagnosticsConfig::from_env(),
        })
    }

    /// Install a progress callback.
    pub fn set_callback<F>(&mut self, cb: F)
    where
        F: FnMut(&IterationInfo<'_>) -> bool + 'static,
    {
        self.callback = Some(Box::new(cb));
    }

    /// The problem this solver was built for.
    pub fn problem(&self) -> &NlpProblem {
        &self.problem
    }

    /// Run the SQP iteration from the given primal/dual starting point.
    pub fn solve(
        &mut self,
        x0: &[f64],
        lam_x0: &[f64],
        lam_g0: &[f64],
    ) -> Result<SolveResult, SqpError> {
        let nx = self.problem.nx();
        let ng = self.problem.ng();
        if x0.len() != nx || lam_x0.len() != nx || lam_g0.len() != ng {
            return Err(SqpError::InvalidProblem(format!(
                "starting point has lengths {}/{}/{}, expected {}/{}/{}",
                x0.len(),
                lam_x0.len(),
                lam_g0.len(),
                nx,
                nx,
                ng
            )));
        }
        let exact = self.settings.hessian_approximation == HessianApprox::Exact;

        let w = &mut self.work;
        w.z[..nx].copy_from_slice(x0);
        fill(&mut w.z[nx..], 0.0);
        w.lam[..nx].copy_from_slice(lam_x0);
        w.lam[nx..].copy_from_slice(lam_g0);
        w.lbz[..nx].copy_from_slice(&self.problem.lbx);
        w.lbz[nx..].copy_from_slice(&self.problem.lbg);
        w.ubz[..nx].copy_from_slice(&self.problem.ubx);
        w.ubz[nx..].copy_from_slice(&self.problem.ubg);
        fill(&mut w.dx, 0.0);
        fill(&mut w.merit_mem, 0.0);

        let mut iter_count = 0usize;
        let mut ls_iter = 0usize;
        let mut ls_success = true;
        let mut sigma = 0.0;
        let mut merit_ind = 0usize;
        let mut reg = 0.0;
        let mut f = 0.0;
        let mut pr_inf;
        let mut du_inf;

        // MAIN OPTIMIZATION LOOP
        let status = loop {
            // Evaluate f, g and first-order derivative information.
            {
                let (x, gz) = w.z.split_at_mut(nx);
                self.oracle
                    .jac_fg(x, &self.problem.p, &mut f, &mut w.gf, gz, &mut w.jk)
                    .map_err(|_| SqpError::Eval { function: "nlp_jac_fg" })?;
            }

            // Gradient of the Lagrangian.
            copy(&w.gf, &mut w.glag);
            mv(&w.jk, &self.problem.asp, &w.lam[nx..], &mut w.glag, true);
            axpy(1.0, &w.lam[..nx], &mut w.glag);

            pr_inf = max_viol(&w.z, &w.lbz, &w.ubz);
            du_inf = norm_inf(&w.glag);
            let dx_norm = norm_inf(&w.dx);

            if self.settings.print_iteration {
                if iter_count % 10 == 0 {
                    diagnostics::print_iteration_header();
                }
                diagnostics::print_iteration_row(
                    iter_count, f, pr_inf, du_inf, dx_norm, reg, ls_iter, ls_success,
                );
            }

            if let Some(cb) = self.callback.as_mut() {
                let info = IterationInfo {
                    iter_count,
                    f,
                    pr_inf,
                    du_inf,
                    dx_norm,
                    x: &w.z[..nx],
                    g: &w.z[nx..],
                    lam_x: &w.lam[..nx],
                    lam_g: &w.lam[nx..],
                };
                if cb(&info) {
                    if self.settings.print_status {
                        println!("WARNING(sqp-core): Aborted by callback...");
                    }
                    break ReturnStatus::UserRequestedStop;
                }
            }

            // Convergence criteria, checked in order.
            if iter_count >= self.settings.min_iter
                && pr_inf < self.settings.tol_pr
                && du_inf < self.settings.tol_du
            {
                if self.settings.print_status {
                    println!(
                        "MESSAGE(sqp-core): Convergence achieved after {} iterations",
                        iter_count
                    );
                }
                break ReturnStatus::SolveSucceeded;
            }

            if iter_count >= self.settings.max_iter {
                if self.settings.print_status {
                    println!("MESSAGE(sqp-core): Maximum number of iterations reached.");
                }
                break ReturnStatus::MaximumIterationsExceeded;
            }

            if iter_count >= 1
                && iter_count >= self.settings.min_iter
                && dx_norm <= self.settings.min_step_size
            {
                if self.settings.print_status {
                    println!(
                        "MESSAGE(sqp-core): Search direction becomes too small without \
                         convergence criteria being met."
                    );
                }
                break ReturnStatus::SearchDirectionBecomesTooSmall;
            }

            // Update/reset the Hessian.
            if exact {
                {
                    let (x, _) = w.z.split_at(nx);
                    self.oracle
                        .hess_l(x, &self.problem.p, 1.0, &w.lam[nx..], &mut w.bk)
                        .map_err(|_| SqpError::Eval { function: "nlp_hess_l" })?;
                }
                if self.settings.regularize {
                    reg = (-lb_eig(&self.hsp, &w.bk)).max(0.0);
                    if reg > 0.0 {
                        regularize(&self.hsp, &mut w.bk, reg);
                    }
                }
            } else if iter_count == 0 {
                fill(&mut w.bk, 1.0);
                bfgs_reset(&self.hsp, &mut w.bk);
            } else {
                if iter_count % self.settings.lbfgs_memory == 0 {
                    bfgs_reset(&self.hsp, &mut w.bk);
                }
                bfgs_update(
                    &self.hsp,
                    &mut w.bk,
                    &w.dx,
                    &w.glag,
                    &w.glag_old,
                    &mut w.bfgs_scratch,
                );
            }

            // Formulate the QP: shifted bounds and warm start.
            copy(&w.lbz, &mut w.lbdz);
            axpy(-1.0, &w.z, &mut w.lbdz);
            copy(&w.ubz, &mut w.ubdz);
            axpy(-1.0, &w.z, &mut w.ubdz);
            copy(&w.lam, &mut w.dlam);
            fill(&mut w.dx, 0.0);

            iter_count += 1;

            // Solve the QP.
            let qp_status = {
                let qp = QpSubproblem {
                    hsp: &self.hsp,
                    h: &w.bk,
                    g: &w.gf,
                    lbx: &w.lbdz[..nx],
                    ubx: &w.ubdz[..nx],
                    asp: &self.problem.asp,
                    a: &w.jk,
                    lba: &w.lbdz[nx..],
                    uba: &w.ubdz[nx..],
                };
                let (dlam_x, dlam_g) = w.dlam.split_at_mut(nx);
                self.qpsol.solve(&qp, &mut w.dx, dlam_x, dlam_g)?.status
            };
            if self.diag.should_log(iter_count) {
                eprintln!("QP solved");
            }
            if qp_status != QpStatus::Optimal && self.settings.print_status {
                println!("WARNING(sqp-core): QP solver returned {:?}", qp_status);
            }

            // Detect indefiniteness along the step (warning only).
            let gain = bilin(&w.bk, &self.hsp, &w.dx, &w.dx);
            if gain < 0.0 && self.settings.print_status {
                println!("WARNING(sqp-core): Indefinite Hessian detected");
            }

            // Line search; commits the dual update and scales dx.
            if self.diag.should_log(iter_count) {
                eprintln!("Starting line-search");
            }
            let out = line_search(
                &self.oracle,
                &self.problem.p,
                &self.settings,
                w,
                f,
                &mut sigma,
                &mut merit_ind,
                iter_count,
            );
            ls_iter = out.ls_iter;
            ls_success = out.ls_success;

            // Take the step.
            axpy(1.0, &w.dx, &mut w.z[..nx]);

            // BFGS secant pair: Lagrangian gradient at the old x with the
            // new multipliers.
            if !exact {
                copy(&w.gf, &mut w.glag_old);
                mv(&w.jk, &self.problem.asp, &w.lam[nx..], &mut w.glag_old, true);
                axpy(1.0, &w.lam[..nx], &mut w.glag_old);
            }
        };

        let success = status == ReturnStatus::SolveSucceeded;

        // Post-solve polish through nlp_grad when the oracle provides it.
        let mut lam_p = vec![0.0; self.problem.np()];
        let mut lam_x_out = w.lam[..nx].to_vec();
        if self.oracle.has_grad() {
            let mut grad_x = vec![0.0; nx];
            {
                let (x, gz) = w.z.split_at_mut(nx);
                self.oracle
                    .grad(
                        x,
                        &self.problem.p,
                        1.0,
                        &w.lam[nx..],
                        &mut f,
                        gz,
                        &mut grad_x,
                        &mut lam_p,
                    )
                    .map_err(|_| SqpError::Eval { function: "nlp_grad" })?;
            }
            scal(-1.0, &mut grad_x);
            scal(-1.0, &mut lam_p);
            lam_x_out = grad_x;
        }

        Ok(SolveResult {
            x: w.z[..nx].to_vec(),
            f,
            g: w.z[nx..].to_vec(),
            lam_x: lam_x_out,
            lam_g: w.lam[nx..].to_vec(),
            lam_p,
            status,
            success,
            stats: SolveStats {
                iter_count,
                unified_status: status.unified(),
                pr_inf,
                du_inf,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense_qp::DenseQpSolver;
    use crate::oracle::EvalError;

    struct NoHessianOracle;

    impl NlpOracle for NoHessianOracle {
        fn fg(&self, _x: &[f64], _p: &[f64], f: &mut f64, _g: &mut [f64]) -> Result<(), EvalError> {
            *f = 0.0;
            Ok(())
        }

        fn jac_fg(
            &self,
            _x: &[f64],
            _p: &[f64],
            f: &mut f64,
            gf: &mut [f64],
            _g: &mut [f64],
            _jac: &mut [f64],
        ) -> Result<(), EvalError> {
            *f = 0.0;
            fill(gf, 0.0);
            Ok(())
        }
    }

    fn unconstrained_problem() -> NlpProblem {
        NlpProblem {
            lbx: vec![f64::NEG_INFINITY; 2],
            ubx: vec![f64::INFINITY; 2],
            lbg: vec![],
            ubg: vec![],
            p: vec![],
            asp: Sparsity::empty(0, 2),
            hsp: Some(Sparsity::dense(2, 2)),
        }
    }

    #[test]
    fn test_exact_mode_requires_hessian_oracle() {
        let settings = SqpSettings { print_header: false, ..Default::default() };
        let err = Sqp::new(
            unconstrained_problem(),
            NoHessianOracle,
            DenseQpSolver::default(),
            settings,
        )
        .err()
        .expect("construction must fail");
        assert!(matches!(err, SqpError::InvalidProblem(_)));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let settings = SqpSettings { beta: 2.0, print_header: false, ..Default::default() };
        let err = Sqp::new(
            unconstrained_problem(),
            NoHessianOracle,
            DenseQpSolver::default(),
            settings,
        )
        .err()
        .expect("construction must fail");
        assert!(matches!(err, SqpError::InvalidOption(_)));
    }

    #[test]
    fn test_starting_point_length_checked() {
        let settings = SqpSettings {
            hessian_approximation: HessianApprox::LimitedMemory,
            print_header: false,
            print_iteration: false,
            print_status: false,
            ..Default::default()
        };
        let mut prob = unconstrained_problem();
        prob.hsp = None;
        let mut solver =
            Sqp::new(prob, NoHessianOracle, DenseQpSolver::default(), settings).unwrap();
        assert!(solver.solve(&[0.0], &[0.0, 0.0], &[]).is_err());
    }
}
