//! Bundled dense QP solver.
//!
//! A small primal-dual interior point method for the box- and
//! range-constrained subproblems the SQP driver produces. Two-sided rows
//! whose bounds coincide are handled as equalities in the KKT system;
//! one-sided finite bounds become inequality rows with slacks. Problems
//! with only equality rows collapse to a single KKT solve.
//!
//! This is a reference inner solver for small and medium problems; any
//! other [`QpSolver`] implementation can be injected in its place.

use nalgebra::{DMatrix, DVector};

use crate::qp::{QpError, QpInfo, QpSolver, QpStatus, QpSubproblem};
use crate::sparsity::Sparsity;

/// Tuning knobs of [`DenseQpSolver`].
#[derive(Debug, Clone, Copy)]
pub struct DenseQpSettings {
    /// Maximum interior point iterations.
    pub max_iter: usize,
    /// KKT residual and complementarity tolerance.
    pub tol: f64,
    /// Fraction-to-boundary factor for the step length.
    pub tau: f64,
    /// Centering parameter σ.
    pub sigma: f64,
    /// Two-sided rows tighter than this are treated as equalities.
    pub eq_tol: f64,
}

impl Default for DenseQpSettings {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-10,
            tau: 0.995,
            sigma: 0.1,
            eq_tol: 1e-12,
        }
    }
}

/// Dense primal-dual interior point QP solver.
#[derive(Debug, Clone, Default)]
pub struct DenseQpSolver {
    settings: DenseQpSettings,
}

#[derive(Debug, Clone, Copy)]
enum RowSource {
    /// Bound on variable j.
    Bound(usize),
    /// General constraint row i.
    General(usize),
}

impl DenseQpSolver {
    pub fn new(settings: DenseQpSettings) -> Self {
        Self { settings }
    }

    fn densify(vals: &[f64], sp: &Sparsity) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(sp.nrow(), sp.ncol());
        let colptr = sp.colptr();
        let row = sp.row();
        for j in 0..sp.ncol() {
            for k in colptr[j]..colptr[j + 1] {
                mat[(row[k], j)] += vals[k];
            }
        }
        mat
    }
}

impl QpSolver for DenseQpSolver {
    fn solve(
        &mut self,
        qp: &QpSubproblem<'_>,
        x: &mut [f64],
        lam_x: &mut [f64],
        lam_a: &mut [f64],
    ) -> Result<QpInfo, QpError> {
        let n = qp.g.len();
        let m = qp.asp.nrow();
        if qp.hsp.nrow() != n || qp.hsp.ncol() != n || qp.asp.ncol() != n {
            return Err(QpError::Rejected(format!(
                "pattern shapes {}x{} / {}x{} do not match n={}",
                qp.hsp.nrow(),
                qp.hsp.ncol(),
                qp.asp.nrow(),
                qp.asp.ncol(),
                n
            )));
        }

        // Empty feasible set: report and leave the warm start untouched.
        for j in 0..n {
            if qp.lbx[j] > qp.ubx[j] {
                return Ok(QpInfo { cost: 0.0, status: QpStatus::Infeasible });
            }
        }
        for i in 0..m {
            if qp.lba[i] > qp.uba[i] {
                return Ok(QpInfo { cost: 0.0, status: QpStatus::Infeasible });
            }
        }

        let hd = Self::densify(qp.h, qp.hsp);
        let ad = Self::densify(qp.a, qp.asp);
        let gvec = DVector::from_column_slice(qp.g);

        // Classify rows: equalities vs one-sided inequalities (sign * row·d
        // ≤ rhs). Infinite bounds drop out.
        let mut eq_rows: Vec<(RowSource, f64)> = Vec::new();
        let mut ineq_rows: Vec<(RowSource, f64, f64)> = Vec::new();
        let eq_tol = self.settings.eq_tol;
        for j in 0..n {
            let (lb, ub) = (qp.lbx[j], qp.ubx[j]);
            if lb.is_finite() && ub.is_finite() && ub - lb <= eq_tol {
                eq_rows.push((RowSource::Bound(j), lb));
            } else {
                if lb.is_finite() {
                    ineq_rows.push((RowSource::Bound(j), -1.0, -lb));
                }
                if ub.is_finite() {
                    ineq_rows.push((RowSource::Bound(j), 1.0, ub));
                }
            }
        }
        for i in 0..m {
            let (lb, ub) = (qp.lba[i], qp.uba[i]);
            if lb.is_finite() && ub.is_finite() && ub - lb <= eq_tol {
                eq_rows.push((RowSource::General(i), lb));
            } else {
                if lb.is_finite() {
                    ineq_rows.push((RowSource::General(i), -1.0, -lb));
                }
                if ub.is_finite() {
                    ineq_rows.push((RowSource::General(i), 1.0, ub));
                }
            }
        }
        let me = eq_rows.len();
        let mc = ineq_rows.len();

        // Equality matrix E (me×n) and rhs e.
        let mut emat = DMatrix::zeros(me, n);
        let mut evec = DVector::zeros(me);
        for (k, &(src, rhs)) in eq_rows.iter().enumerate() {
            match src {
                RowSource::Bound(j) => emat[(k, j)] = 1.0,
                RowSource::General(i) => {
                    for j in 0..n {
                        emat[(k, j)] = ad[(i, j)];
                    }
                }
            }
            evec[k] = rhs;
        }

        // Inequality matrix C (mc×n) and rhs c, rows pre-multiplied by sign.
        let mut cmat = DMatrix::zeros(mc, n);
        let mut cvec = DVector::zeros(mc);
        for (k, &(src, sign, rhs)) in ineq_rows.iter().enumerate() {
            match src {
                RowSource::Bound(j) => cmat[(k, j)] = sign,
                RowSource::General(i) => {
                    for j in 0..n {
                        cmat[(k, j)] = sign * ad[(i, j)];
                    }
                }
            }
            cvec[k] = rhs;
        }

        let (d, y, z, status) = if mc == 0 {
            let (d, y) = solve_kkt_direct(&hd, &gvec, &emat, &evec)?;
            (d, y, DVector::zeros(0), QpStatus::Optimal)
        } else {
            self.solve_interior(&hd, &gvec, &emat, &evec, &cmat, &cvec, x)?
        };

        // Write the solution and map multipliers back to the signed
        // two-sided convention.
        for j in 0..n {
            x[j] = d[j];
        }
        for v in lam_x.iter_mut() {
            *v = 0.0;
        }
        for v in lam_a.iter_mut() {
            *v = 0.0;
        }
        for (k, &(src, _)) in eq_rows.iter().enumerate() {
            match src {
                RowSource::Bound(j) => lam_x[j] = y[k],
                RowSource::General(i) => lam_a[i] = y[k],
            }
        }
        for (k, &(src, sign, _)) in ineq_rows.iter().enumerate() {
            match src {
                RowSource::Bound(j) => lam_x[j] += sign * z[k],
                RowSource::General(i) => lam_a[i] += sign * z[k],
            }
        }

        let cost = 0.5 * (&hd * &d).dot(&d) + gvec.dot(&d);
        Ok(QpInfo { cost, status })
    }
}

impl DenseQpSolver {
    /// Primal-dual path following on
    /// min ½dᵀHd + gᵀd  s.t.  Ed = e,  Cd + s = c,  s ≥ 0.
    #[allow(clippy::too_many_arguments)]
    fn solve_interior(
        &self,
        hd: &DMatrix<f64>,
        gvec: &DVector<f64>,
        emat: &DMatrix<f64>,
        evec: &DVector<f64>,
        cmat: &DMatrix<f64>,
        cvec: &DVector<f64>,
        warm_x: &[f64],
    ) -> Result<(DVector<f64>, DVector<f64>, DVector<f64>, QpStatus), QpError> {
        let n = gvec.len();
        let me = evec.len();
        let mc = cvec.len();
        let tol = self.settings.tol;

        let mut d = DVector::from_column_slice(warm_x);
        let mut y = DVector::zeros(me);
        let mut z = DVector::from_element(mc, 1.0);
        let mut s = DVector::zeros(mc);
        let cd = cmat * &d;
        for k in 0..mc {
            s[k] = (cvec[k] - cd[k]).max(1.0);
        }

        let g_scale = 1.0 + inf_norm(gvec);
        let e_scale = 1.0 + inf_norm(evec);
        let c_scale = 1.0 + inf_norm(cvec);

        let mut status = QpStatus::MaxIters;
        for _ in 0..self.settings.max_iter {
            let r_d = hd * &d + gvec + emat.transpose() * &y + cmat.transpose() * &z;
            let r_e = emat * &d - evec;
            let r_c = cmat * &d + &s - cvec;
            let mu = s.dot(&z) / mc as f64;

            if inf_norm(&r_d) <= tol * g_scale
                && inf_norm(&r_e) <= tol * e_scale
                && inf_norm(&r_c) <= tol * c_scale
                && mu <= tol
            {
                status = QpStatus::Optimal;
                break;
            }

            // Reduced system: (H + CᵀS⁻¹ZC)Δd + EᵀΔy = -r_d - CᵀS⁻¹(Z r_c - r_comp)
            //                 EΔd = -r_e
            let sigma_mu = self.settings.sigma * mu;
            let dim = n + me;
            let mut kkt = DMatrix::zeros(dim, dim);
            for i in 0..n {
                for j in 0..n {
                    kkt[(i, j)] = hd[(i, j)];
                }
            }
            for k in 0..mc {
                let w = z[k] / s[k];
                for i in 0..n {
                    let ci = cmat[(k, i)];
                    if ci == 0.0 {
                        continue;
                    }
                    for j in 0..n {
                        kkt[(i, j)] += w * ci * cmat[(k, j)];
                    }
                }
            }
            for k in 0..me {
                for j in 0..n {
                    kkt[(n + k, j)] = emat[(k, j)];
                    kkt[(j, n + k)] = emat[(k, j)];
                }
            }

            let mut rhs = DVector::zeros(dim);
            for i in 0..n {
                rhs[i] = -r_d[i];
            }
            for k in 0..mc {
                let v = (z[k] * r_c[k] - (s[k] * z[k] - sigma_mu)) / s[k];
                for i in 0..n {
                    rhs[i] -= cmat[(k, i)] * v;
                }
            }
            for k in 0..me {
                rhs[n + k] = -r_e[k];
            }

            let sol = match kkt.clone().lu().solve(&rhs) {
                Some(sol) => sol,
                None => {
                    // Rank-deficient Newton system: nudge the (1,1) block.
                    let mut kkt2 = kkt;
                    for i in 0..n {
                        kkt2[(i, i)] += 1e-10 * g_scale;
                    }
                    kkt2.lu()
                        .solve(&rhs)
                        .ok_or_else(|| QpError::Internal("singular KKT system".into()))?
                }
            };

            let dd = sol.rows(0, n).into_owned();
            let dy = sol.rows(n, me).into_owned();
            let cdd = cmat * &dd;
            let mut ds = DVector::zeros(mc);
            let mut dz = DVector::zeros(mc);
            for k in 0..mc {
                ds[k] = -r_c[k] - cdd[k];
                dz[k] = -((s[k] * z[k] - sigma_mu) + z[k] * ds[k]) / s[k];
            }

            let mut alpha: f64 = 1.0;
            for k in 0..mc {
                if ds[k] < 0.0 {
                    alpha = alpha.min(-self.settings.tau * s[k] / ds[k]);
                }
                if dz[k] < 0.0 {
                    alpha = alpha.min(-self.settings.tau * z[k] / dz[k]);
                }
            }

            d += alpha * &dd;
            y += alpha * &dy;
            s += alpha * &ds;
            z += alpha * &dz;
        }

        Ok((d, y, z, status))
    }
}

/// Direct KKT solve for equality-only (or unconstrained) subproblems.
fn solve_kkt_direct(
    hd: &DMatrix<f64>,
    gvec: &DVector<f64>,
    emat: &DMatrix<f64>,
    evec: &DVector<f64>,
) -> Result<(DVector<f64>, DVector<f64>), QpError> {
    let n = gvec.len();
    let me = evec.len();
    let dim = n + me;
    let mut kkt = DMatrix::zeros(dim, dim);
    for i in 0..n {
        for j in 0..n {
            kkt[(i, j)] = hd[(i, j)];
        }
    }
    for k in 0..me {
        for j in 0..n {
            kkt[(n + k, j)] = emat[(k, j)];
            kkt[(j, n + k)] = emat[(k, j)];
        }
    }
    let mut rhs = DVector::zeros(dim);
    for i in 0..n {
        rhs[i] = -gvec[i];
    }
    for k in 0..me {
        rhs[n + k] = evec[k];
    }

    let sol = match kkt.clone().lu().solve(&rhs) {
        Some(sol) => sol,
        None => {
            let mut kkt2 = kkt;
            for i in 0..n {
                kkt2[(i, i)] += 1e-8;
            }
            kkt2.lu()
                .solve(&rhs)
                .ok_or_else(|| QpError::Internal("singular KKT system".into()))?
        }
    };
    Ok((sol.rows(0, n).into_owned(), sol.rows(n, me).into_owned()))
}

#[inline]
fn inf_norm(v: &DVector<f64>) -> f64 {
    v.iter().map(|x| x.abs()).fold(0.0_f64, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparsity::Sparsity;

    const INF: f64 = f64::INFINITY;

    fn solve(
        hsp: &Sparsity,
        h: &[f64],
        g: &[f64],
        lbx: &[f64],
        ubx: &[f64],
        asp: &Sparsity,
        a: &[f64],
        lba: &[f64],
        uba: &[f64],
    ) -> (Vec<f64>, Vec<f64>, Vec<f64>, QpInfo) {
        let qp = QpSubproblem { hsp, h, g, lbx, ubx, asp, a, lba, uba };
        let mut x = vec![0.0; g.len()];
        let mut lam_x = vec![0.0; g.len()];
        let mut lam_a = vec![0.0; asp.nrow()];
        let info = DenseQpSolver::default()
            .solve(&qp, &mut x, &mut lam_x, &mut lam_a)
            .expect("QP solve failed");
        (x, lam_x, lam_a, info)
    }

    #[test]
    fn test_equality_qp_single_kkt_solve() {
        // min ½‖d‖² + (2,0)·d  s.t.  d1 + d2 = -1
        let hsp = Sparsity::dense(2, 2);
        let h = vec![1.0, 0.0, 0.0, 1.0];
        let asp = Sparsity::dense(1, 2);
        let a = vec![1.0, 1.0];
        let (x, _, lam_a, info) = solve(
            &hsp,
            &h,
            &[2.0, 0.0],
            &[-INF, -INF],
            &[INF, INF],
            &asp,
            &a,
            &[-1.0],
            &[-1.0],
        );
        assert_eq!(info.status, QpStatus::Optimal);
        assert!((x[0] - (-1.5)).abs() < 1e-9);
        assert!((x[1] - 0.5).abs() < 1e-9);
        assert!((lam_a[0] - (-0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_box_qp_active_upper_bound() {
        // min ½‖d‖² − d1  s.t.  d ∈ [0, 0.3]²; optimum clips to (0.3, 0).
        let hsp = Sparsity::dense(2, 2);
        let h = vec![1.0, 0.0, 0.0, 1.0];
        let asp = Sparsity::empty(0, 2);
        let (x, lam_x, _, info) = solve(
            &hsp,
            &h,
            &[-1.0, 0.0],
            &[0.0, 0.0],
            &[0.3, 0.3],
            &asp,
            &[],
            &[],
            &[],
        );
        assert_eq!(info.status, QpStatus::Optimal);
        assert!((x[0] - 0.3).abs() < 1e-7);
        assert!(x[1].abs() < 1e-7);
        // Upper bound active on d1: positive multiplier 0.7.
        assert!((lam_x[0] - 0.7).abs() < 1e-6);
        assert!(lam_x[1].abs() < 1e-5);
    }

    #[test]
    fn test_lp_shaped_subproblem() {
        // min d1 + d2  s.t.  d ∈ [0, 5]²,  d1 + d2 ≥ 1; optimal cost 1.
        let hsp = Sparsity::empty(2, 2);
        let asp = Sparsity::dense(1, 2);
        let (x, _, lam_a, info) = solve(
            &hsp,
            &[],
            &[1.0, 1.0],
            &[0.0, 0.0],
            &[5.0, 5.0],
            &asp,
            &[1.0, 1.0],
            &[1.0],
            &[INF],
        );
        assert_eq!(info.status, QpStatus::Optimal);
        assert!((x[0] + x[1] - 1.0).abs() < 1e-7);
        assert!((info.cost - 1.0).abs() < 1e-7);
        // Lower bound active on the range row: negative multiplier.
        assert!((lam_a[0] - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_empty_box_reports_infeasible() {
        let hsp = Sparsity::dense(1, 1);
        let asp = Sparsity::empty(0, 1);
        let qp = QpSubproblem {
            hsp: &hsp,
            h: &[1.0],
            g: &[0.0],
            lbx: &[1.0],
            ubx: &[0.0],
            asp: &asp,
            a: &[],
            lba: &[],
            uba: &[],
        };
        let mut x = vec![0.25];
        let mut lam_x = vec![0.5];
        let mut lam_a = vec![];
        let info = DenseQpSolver::default()
            .solve(&qp, &mut x, &mut lam_x, &mut lam_a)
            .unwrap();
        assert_eq!(info.status, QpStatus::Infeasible);
        // Warm start untouched.
        assert_eq!(x[0], 0.25);
        assert_eq!(lam_x[0], 0.5);
    }

    #[test]
    fn test_fixed_variable_as_equality() {
        // min ½(d1² + d2²) with d2 fixed at 2 by its bounds.
        let hsp = Sparsity::dense(2, 2);
        let h = vec![1.0, 0.0, 0.0, 1.0];
        let asp = Sparsity::empty(0, 2);
        let (x, lam_x, _, info) = solve(
            &hsp,
            &h,
            &[0.0, 0.0],
            &[-INF, 2.0],
            &[INF, 2.0],
            &asp,
            &[],
            &[],
            &[],
        );
        assert_eq!(info.status, QpStatus::Optimal);
        assert!(x[0].abs() < 1e-9);
        assert!((x[1] - 2.0).abs() < 1e-9);
        // Stationarity: d2 + lam = 0 → lam = -2.
        assert!((lam_x[1] - (-2.0)).abs() < 1e-9);
    }
}
