//! Projected, preconditioned conjugate gradients
//!
//! Solves A x = b for a Hermitian positive operator A restricted to the range
//! of a projector. Iterates, residuals and search directions are projected
//! after every update so that they never leave that range.

extern crate nalgebra as na;

use na::DVector;
use num_complex::Complex64;
use pwbasis::CZERO;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CgOptions {
    pub tol: f64,
    pub miniter: usize,
    pub maxiter: usize,
}

impl Default for CgOptions {
    fn default() -> Self {
        CgOptions {
            tol: 1e-10,
            miniter: 1,
            maxiter: 100,
        }
    }
}

/// Snapshot handed to the iteration callback before each convergence check.
#[derive(Debug)]
pub struct CgIteration<'a> {
    pub n_iter: usize,
    pub x: &'a DVector<Complex64>,
    pub residual_norm: f64,
}

#[derive(Debug, Clone)]
pub struct CgResult {
    pub x: DVector<Complex64>,
    pub converged: bool,
    pub n_iter: usize,
    pub residual_norm: f64,
}

/// Solve `operator(x) = b` starting from zero.
///
/// `precon` approximates the inverse of the operator, `proj` is the projector
/// onto the subspace the solution lives in. The residual norm is compared to
/// `tol` once at least `miniter` iterations were started; the loop stops after
/// `maxiter` iterations regardless.
pub fn cg<A, M, P, F>(
    operator: A,
    b: &DVector<Complex64>,
    precon: M,
    proj: P,
    options: CgOptions,
    mut callback: F,
) -> CgResult
where
    A: Fn(&DVector<Complex64>) -> DVector<Complex64>,
    M: Fn(&DVector<Complex64>) -> DVector<Complex64>,
    P: Fn(&DVector<Complex64>) -> DVector<Complex64>,
    F: FnMut(&CgIteration),
{
    let mut x = DVector::from_element(b.len(), CZERO);
    let mut r = b.clone();
    let mut c = precon(&r);
    let mut gamma = r.dotc(&c);
    let mut p = c.clone();
    let mut residual_norm = r.norm();
    let mut converged = false;
    let mut n_iter = 0;

    while n_iter < options.maxiter {
        callback(&CgIteration {
            n_iter,
            x: &x,
            residual_norm,
        });
        n_iter += 1;
        if n_iter >= options.miniter && residual_norm <= options.tol {
            converged = true;
            break;
        }

        c = operator(&p);
        let curvature = p.dotc(&c);
        if curvature.norm() == 0.0 {
            // search direction collapsed, nothing left to improve
            break;
        }
        let alpha = gamma / curvature;

        x = proj(&(&x + &p * alpha));
        r = proj(&(&r - &c * alpha));
        residual_norm = r.norm();

        c = precon(&r);
        let gamma_prev = gamma;
        gamma = r.dotc(&c);
        let beta = if gamma_prev.norm() == 0.0 {
            CZERO
        } else {
            gamma / gamma_prev
        };
        p = proj(&(&c + &p * beta));
    }

    CgResult {
        x,
        converged,
        n_iter,
        residual_norm,
    }
}
