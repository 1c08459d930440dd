//! Damped BFGS update of a sparse Lagrangian Hessian approximation.
//!
//! The approximation `bk` lives on a fixed symmetric pattern; both the
//! reset and the rank-two update write only structural slots, so the
//! approximation can never grow fill-in.

use crate::kernels::{dot, fill, mv};
use crate::sparsity::Sparsity;

/// Powell damping threshold: damp whenever sᵀy < 0.2·sᵀBs.
const DAMPING_FRACTION: f64 = 0.2;

/// Reset the approximation to the identity: ones on the structural
/// diagonal, zeros on every other structural slot.
pub fn bfgs_reset(sp: &Sparsity, bk: &mut [f64]) {
    debug_assert_eq!(bk.len(), sp.nnz());
    let colptr = sp.colptr();
    let row = sp.row();
    for j in 0..sp.ncol() {
        for k in colptr[j]..colptr[j + 1] {
            bk[k] = if row[k] == j { 1.0 } else { 0.0 };
        }
    }
}

/// Powell-damped BFGS update.
///
/// `s` is the accepted step, the gradient difference is `glag − glag_old`.
/// When the curvature sᵀy falls below 0.2·sᵀBs the gradient difference is
/// blended with Bs (θ·y + (1−θ)·Bs, θ = 0.8·sᵀBs/(sᵀBs − sᵀy)), which keeps
/// sᵀBs > 0 across the update. `scratch` must hold 2·nx entries.
pub fn bfgs_update(
    sp: &Sparsity,
    bk: &mut [f64],
    s: &[f64],
    glag: &[f64],
    glag_old: &[f64],
    scratch: &mut [f64],
) {
    let nx = sp.ncol();
    debug_assert!(sp.is_square());
    debug_assert_eq!(bk.len(), sp.nnz());
    debug_assert_eq!(s.len(), nx);
    debug_assert_eq!(glag.len(), nx);
    debug_assert_eq!(glag_old.len(), nx);
    debug_assert_eq!(scratch.len(), 2 * nx);

    let (y, bs) = scratch.split_at_mut(nx);
    for i in 0..nx {
        y[i] = glag[i] - glag_old[i];
    }
    fill(bs, 0.0);
    mv(bk, sp, s, bs, false);

    let sbs = dot(s, bs);
    let mut sy = dot(s, y);
    if !(sbs > 0.0) || !sy.is_finite() {
        // Degenerate step (s ≈ 0 or broken approximation): skip the update.
        return;
    }

    if sy < DAMPING_FRACTION * sbs {
        let theta = (1.0 - DAMPING_FRACTION) * sbs / (sbs - sy);
        for i in 0..nx {
            y[i] = theta * y[i] + (1.0 - theta) * bs[i];
        }
        sy = dot(s, y);
    }

    // B ← B − (Bs)(Bs)ᵀ/(sᵀBs) + yyᵀ/(sᵀy), restricted to the pattern.
    let colptr = sp.colptr();
    let row = sp.row();
    for j in 0..sp.ncol() {
        for k in colptr[j]..colptr[j + 1] {
            let r = row[k];
            bk[k] += y[r] * y[j] / sy - bs[r] * bs[j] / sbs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::bilin;
    use crate::sparsity::Sparsity;

    #[test]
    fn test_reset_writes_identity() {
        let sp = Sparsity::dense(3, 3);
        let mut bk = vec![7.0; sp.nnz()];
        bfgs_reset(&sp, &mut bk);
        assert_eq!(bk, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_update_satisfies_secant_without_damping() {
        // B = I, s and y well aligned: plain BFGS, Bs maps to y.
        let sp = Sparsity::dense(2, 2);
        let mut bk = vec![0.0; 4];
        bfgs_reset(&sp, &mut bk);
        let s = vec![1.0, 0.0];
        let glag = vec![2.0, 0.5];
        let glag_old = vec![0.0, 0.0];
        let mut scratch = vec![0.0; 4];
        bfgs_update(&sp, &mut bk, &s, &glag, &glag_old, &mut scratch);

        // Secant condition: B s = y = (2, 0.5)
        let bs = vec![
            bk[0] * s[0] + bk[2] * s[1],
            bk[1] * s[0] + bk[3] * s[1],
        ];
        assert!((bs[0] - 2.0).abs() < 1e-12);
        assert!((bs[1] - 0.5).abs() < 1e-12);
        // Symmetry on the stored slots
        assert!((bk[1] - bk[2]).abs() < 1e-12);
    }

    #[test]
    fn test_damping_preserves_curvature() {
        // Negative sᵀy would destroy positive definiteness; damping must
        // keep sᵀBs > 0.
        let sp = Sparsity::dense(2, 2);
        let mut bk = vec![0.0; 4];
        bfgs_reset(&sp, &mut bk);
        let s = vec![1.0, 1.0];
        let glag = vec![-1.0, -1.0]; // y = (-1, -1), sᵀy = -2 < 0
        let glag_old = vec![0.0, 0.0];
        let mut scratch = vec![0.0; 4];
        bfgs_update(&sp, &mut bk, &s, &glag, &glag_old, &mut scratch);

        let sbs = bilin(&bk, &sp, &s, &s);
        assert!(sbs > 0.0, "curvature lost: sᵀBs = {}", sbs);
    }

    #[test]
    fn test_zero_step_is_a_noop() {
        let sp = Sparsity::dense(2, 2);
        let mut bk = vec![0.0; 4];
        bfgs_reset(&sp, &mut bk);
        let before = bk.clone();
        let mut scratch = vec![0.0; 4];
        bfgs_update(&sp, &mut bk, &[0.0, 0.0], &[1.0, 1.0], &[0.0, 0.0], &mut scratch);
        assert_eq!(bk, before);
    }
}
