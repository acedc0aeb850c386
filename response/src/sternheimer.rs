//! Sternheimer equation for a single band
//!
//! Solves (1 - P)(H - ε)(1 - P) δψ = -(1 - P) rhs where P projects onto the
//! occupied orbitals ψ. The orthogonal complement of ψ is split into the span
//! of the computed-but-unoccupied "extra" orbitals and the remaining space R.
//! Only the Schur complement on R goes through conjugate gradients, the extra
//! components follow from a diagonal system.

extern crate nalgebra as na;

use crate::cg::{cg, CgOptions};
use na::{DMatrix, DVector};
use num_complex::Complex64;
use pwbasis::preconditioner::{Preconditioner, PreconditionerTpa};
use pwbasis::HamiltonianBlock;
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SternheimerOptions {
    pub tol: f64,
    pub miniter: usize,
    pub maxiter: usize,
}

impl Default for SternheimerOptions {
    fn default() -> Self {
        SternheimerOptions {
            tol: 1e-9,
            miniter: 1,
            maxiter: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SternheimerResult {
    pub delta_psi: DVector<Complex64>,
    pub converged: bool,
    pub n_iter: usize,
    pub tol: f64,
    pub residual_norm: f64,
}

/// Orbitals outside the occupied set for which H has already been applied.
///
/// `eigenvalues` are the Rayleigh quotients diag Re(ψ_extra† H ψ_extra).
#[derive(Debug, Clone, Copy)]
pub struct ExtraBands<'a> {
    pub psi: &'a DMatrix<Complex64>,
    pub eigenvalues: &'a DVector<f64>,
    pub h_psi: &'a DMatrix<Complex64>,
}

impl ExtraBands<'_> {
    pub fn len(&self) -> usize {
        self.psi.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.psi.ncols() == 0
    }
}

fn columns_concat(a: &DMatrix<Complex64>, b: &DMatrix<Complex64>) -> DMatrix<Complex64> {
    let mut full = DMatrix::zeros(a.nrows(), a.ncols() + b.ncols());
    full.columns_mut(0, a.ncols()).copy_from(a);
    full.columns_mut(a.ncols(), b.ncols()).copy_from(b);
    full
}

/// Solve the Sternheimer equation of one band with energy `energy`.
pub fn solve_sternheimer(
    block: &HamiltonianBlock,
    psi: &DMatrix<Complex64>,
    energy: f64,
    rhs: &DVector<Complex64>,
    extra: Option<ExtraBands>,
    options: SternheimerOptions,
) -> SternheimerResult {
    let n = rhs.len();
    let empty = DMatrix::zeros(n, 0);
    let empty_values = DVector::zeros(0);
    let extra = extra.unwrap_or(ExtraBands {
        psi: &empty,
        eigenvalues: &empty_values,
        h_psi: &empty,
    });

    // Ψ = [ψ ψ_extra]
    let psi_full = columns_concat(psi, extra.psi);
    let project_occupied = |phi: &DVector<Complex64>| phi - psi * psi.ad_mul(phi);
    let project_residual = |phi: &DVector<Complex64>| phi - &psi_full * psi_full.ad_mul(phi);

    let a11_inv: DVector<f64> = extra.eigenvalues.map(|e| 1.0 / (e - energy));
    let scale_a11_inv = |v: DVector<Complex64>| -> DVector<Complex64> {
        DVector::from_iterator(v.len(), v.iter().zip(a11_inv.iter()).map(|(x, a)| *x * *a))
    };

    let b = -project_occupied(rhs);
    let b_extra = extra.psi.ad_mul(&b);
    let rhs_residual = project_residual(&(&b - extra.h_psi * scale_a11_inv(b_extra.clone())));

    let schur = |phi: &DVector<Complex64>| -> DVector<Complex64> {
        let rphi = project_residual(phi);
        let shifted = block.apply(&rphi) - &rphi * Complex64::new(energy, 0.0);
        let coupling = extra.h_psi * scale_a11_inv(extra.h_psi.ad_mul(&rphi));
        project_residual(&(shifted - coupling))
    };

    let mut tpa = PreconditionerTpa::new(block);
    let reference = (psi.ncols() > 0).then(|| psi.column(0).into_owned());
    tpa.prepare(reference.as_ref());
    let precon = |phi: &DVector<Complex64>| project_residual(&tpa.ldiv(&project_residual(phi)));

    let cg_options = CgOptions {
        tol: options.tol,
        miniter: options.miniter,
        maxiter: options.maxiter,
    };
    let result = cg(schur, &rhs_residual, precon, project_residual, cg_options, |info| {
        trace!(n_iter = info.n_iter, residual_norm = info.residual_norm, "Sternheimer CG step");
    });

    if !result.converged {
        warn!(
            n_iter = result.n_iter,
            tol = options.tol,
            residual_norm = result.residual_norm,
            "Sternheimer CG not converged"
        );
    }

    let delta_psi_residual = result.x;
    let alpha = scale_a11_inv(b_extra - extra.h_psi.ad_mul(&delta_psi_residual));
    let delta_psi = extra.psi * alpha + delta_psi_residual;

    SternheimerResult {
        delta_psi,
        converged: result.converged,
        n_iter: result.n_iter,
        tol: options.tol,
        residual_norm: result.residual_norm,
    }
}
