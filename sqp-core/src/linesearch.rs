//! Non-monotone ℓ₁-merit Armijo line search.
//!
//! Step acceptance compares the candidate merit φ = f + σ·V against the
//! largest merit in a recent window rather than the previous value alone,
//! which lets the iteration ride out temporary merit increases. The
//! penalty σ is never decreased.

use crate::kernels::{axpy, dot, max_viol, norm_inf, scal, vfmax};
use crate::nlp::SqpSettings;
use crate::oracle::NlpOracle;
use crate::workspace::SqpWorkspace;

/// Outcome of one line search.
#[derive(Debug, Clone, Copy)]
pub struct LineSearchOutcome {
    /// Accepted step size.
    pub t: f64,
    /// Number of trials.
    pub ls_iter: usize,
    /// False when the step was accepted only because the trial limit was
    /// reached.
    pub ls_success: bool,
}

/// Backtracking limit for consecutive failed oracle evaluations; a
/// candidate that can never be evaluated would otherwise backtrack
/// forever.
const MAX_EVAL_FAILURES: usize = 100;

/// Run the line search and commit the dual update.
///
/// On entry `w.dx`/`w.dlam` hold the QP direction and `f` the objective at
/// the current iterate; `iter_count` is the already-incremented iteration
/// counter. On exit `w.lam` holds the blended multipliers and `w.dx` the
/// scaled step; the caller applies it to the x block of `w.z`.
pub fn line_search(
    oracle: &dyn NlpOracle,
    p: &[f64],
    settings: &SqpSettings,
    w: &mut SqpWorkspace,
    f: f64,
    sigma: &mut f64,
    merit_ind: &mut usize,
    iter_count: usize,
) -> LineSearchOutcome {
    let nx = w.nx;

    if settings.max_iter_ls == 0 {
        // Line search disabled: full step, multipliers taken from the QP.
        w.lam.copy_from_slice(&w.dlam);
        return LineSearchOutcome { t: 1.0, ls_iter: 0, ls_success: true };
    }
    debug_assert!(iter_count >= 1);

    // Penalty update, then the merit value and its directional estimate at
    // the current iterate.
    *sigma = sigma.max(1.01 * norm_inf(&w.dlam));
    let l1_infeas = max_viol(&w.z, &w.lbz, &w.ubz);
    let f_sens = dot(&w.dx, &w.gf);
    let l1_dir = f_sens - *sigma * l1_infeas;
    let l1_merit = f + *sigma * l1_infeas;

    w.merit_mem[*merit_ind] = l1_merit;
    *merit_ind = (*merit_ind + 1) % settings.merit_memory;

    // Non-monotone reference: slots beyond iter_count−1 are unpopulated and
    // slot 0 only enters as the seed.
    let window = settings.merit_memory.min(iter_count) - 1;
    let meritmax = vfmax(&w.merit_mem[1..1 + window], w.merit_mem[0]);

    let mut t = 1.0;
    let mut ls_iter = 0;
    let mut ls_success = true;
    let mut eval_failures = 0;
    loop {
        ls_iter += 1;

        // Candidate step on the x block.
        let (xc, gc) = w.z_cand.split_at_mut(nx);
        xc.copy_from_slice(&w.z[..nx]);
        axpy(t, &w.dx, xc);

        let mut f_cand = 0.0;
        if oracle.fg(xc, p, &mut f_cand, gc).is_err() {
            eval_failures += 1;
            if eval_failures >= MAX_EVAL_FAILURES {
                ls_success = false;
                break;
            }
            t *= settings.beta;
            continue;
        }
        eval_failures = 0;

        let viol_cand = max_viol(&w.z_cand, &w.lbz, &w.ubz);
        let l1_merit_cand = f_cand + *sigma * viol_cand;
        if l1_merit_cand <= meritmax + t * settings.c1 * l1_dir {
            break;
        }

        // Not successful, but we accept it anyway.
        if ls_iter >= settings.max_iter_ls {
            ls_success = false;
            break;
        }

        t *= settings.beta;
    }

    // Candidate accepted: blend the dual variables and scale the step.
    scal(1.0 - t, &mut w.lam);
    axpy(t, &w.dlam, &mut w.lam);
    scal(t, &mut w.dx);

    LineSearchOutcome { t, ls_iter, ls_success }
}
