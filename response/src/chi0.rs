//! Independent-particle susceptibility applied to a potential variation
//!
//! δρ = χ0 δV is obtained without forming χ0: δV is applied to the occupied
//! orbitals, the occupation and orbital responses are solved for, and the
//! density response is assembled from them.

extern crate nalgebra as na;

use crate::context::{default_occupation_threshold, ApplyChi0Context, BandToleranceHeuristic};
use crate::error::ResponseError;
use crate::occupation_response::compute_delta_occupation;
use crate::sternheimer::SternheimerOptions;
use crate::wavefunction_response::compute_delta_psi;
use na::{DMatrix, DVector};
use num_complex::Complex64;
use pwbasis::density::{compute_delta_density, multiply_by_potential};
use pwbasis::{GroundState, PlaneWaveBasis, CZERO};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chi0Options {
    /// Sternheimer tolerance before per-band scaling
    pub tol: f64,
    pub miniter: usize,
    pub maxiter: usize,
    /// Bands with |f| below this are treated as unoccupied
    pub occupation_threshold: f64,
    pub band_tolerance: BandToleranceHeuristic,
}

impl Default for Chi0Options {
    fn default() -> Self {
        Chi0Options {
            tol: 1e-9,
            miniter: 1,
            maxiter: 100,
            occupation_threshold: default_occupation_threshold(),
            band_tolerance: BandToleranceHeuristic::Uniform,
        }
    }
}

impl Chi0Options {
    fn sternheimer(&self) -> SternheimerOptions {
        SternheimerOptions {
            tol: self.tol,
            miniter: self.miniter,
            maxiter: self.maxiter,
        }
    }
}

/// Orbital, occupation and Fermi-level derivatives.
///
/// `delta_psi[ik]` and `delta_occupation[ik]` cover every band of the k-point
/// k - q, with zeros on unoccupied bands.
#[derive(Debug, Clone)]
pub struct ResponseQuantities {
    pub delta_psi: Vec<DMatrix<Complex64>>,
    pub delta_occupation: Vec<DVector<f64>>,
    pub delta_fermi: f64,
}

/// δρ = χ0 δV for a perturbation with momentum `q`.
///
/// `delta_v` is the periodic part of e^{iq·r} δV(r), shaped (n_fft x n_spin).
pub fn apply_chi0(
    gs: &GroundState,
    delta_v: &DMatrix<Complex64>,
    q: [f64; 3],
    options: Chi0Options,
) -> Result<DMatrix<Complex64>, ResponseError> {
    let ctx = ApplyChi0Context::new(gs, q, options.occupation_threshold, options.band_tolerance)?;
    apply_chi0_with_context(gs, &ctx, delta_v, options)
}

/// Like [`apply_chi0`], reusing the band partition of `ctx`.
pub fn apply_chi0_with_context(
    gs: &GroundState,
    ctx: &ApplyChi0Context,
    delta_v: &DMatrix<Complex64>,
    options: Chi0Options,
) -> Result<DMatrix<Complex64>, ResponseError> {
    let basis = gs.basis();
    ctx.check(gs)?;
    basis.check_real_space_shape(delta_v)?;

    let (delta_v, norm) = match normalized_perturbation(basis, delta_v) {
        Some(normalized) => normalized,
        None => return Ok(DMatrix::from_element(basis.n_fft(), basis.n_spin(), CZERO)),
    };

    let bands = ctx.partition(gs);
    let delta_h_psi = multiply_by_potential(basis, &bands.psi_occ, &delta_v, ctx.k_to_k_minus_q());
    let response = apply_chi0_4p(gs, ctx, &delta_h_psi, options)?;

    let delta_rho = compute_delta_density(
        basis,
        &gs.psi,
        &response.delta_psi,
        &gs.occupation,
        &response.delta_occupation,
        ctx.occupation_threshold(),
        ctx.k_to_k_minus_q(),
    );
    debug!(
        "apply_chi0: |δV| = {:.3e}, |δρ| = {:.3e}, δεF = {:.3e}",
        norm,
        delta_rho.norm() * norm,
        response.delta_fermi * norm
    );
    Ok(delta_rho * Complex64::new(norm, 0.0))
}

/// Symmetrized δV scaled to unit norm, with the norm it had.
///
/// `None` when the symmetrized δV is below machine epsilon: no response has
/// to be solved for.
pub(crate) fn normalized_perturbation(
    basis: &PlaneWaveBasis,
    delta_v: &DMatrix<Complex64>,
) -> Option<(DMatrix<Complex64>, f64)> {
    let delta_v = basis.symmetry().symmetrize(delta_v);
    let norm = delta_v.norm();
    if norm < f64::EPSILON {
        return None;
    }
    Some((delta_v.unscale(norm), norm))
}

/// Response to a given δHψ of the occupied orbitals of k - q.
///
/// The occupation response only enters at q = 0: at finite q the diagonal
/// matrix elements couple different momenta and δεF vanishes.
pub fn apply_chi0_4p(
    gs: &GroundState,
    ctx: &ApplyChi0Context,
    delta_h_psi: &[DMatrix<Complex64>],
    options: Chi0Options,
) -> Result<ResponseQuantities, ResponseError> {
    ctx.check(gs)?;
    let basis = gs.basis();
    let k_to_k_minus_q = ctx.k_to_k_minus_q();

    if delta_h_psi.len() != k_to_k_minus_q.len() {
        return Err(ResponseError::DimensionMismatch {
            what: "δHψ k-points",
            expected: k_to_k_minus_q.len().to_string(),
            got: delta_h_psi.len().to_string(),
        });
    }
    for (ik, target) in k_to_k_minus_q.iter().enumerate() {
        let n_occ = ctx.occupied_bands(target.index).len();
        if delta_h_psi[ik].ncols() != n_occ || delta_h_psi[ik].nrows() != gs.psi[ik].nrows() {
            return Err(ResponseError::DimensionMismatch {
                what: "δHψ block",
                expected: format!("{}x{}", gs.psi[ik].nrows(), n_occ),
                got: format!("{}x{}", delta_h_psi[ik].nrows(), delta_h_psi[ik].ncols()),
            });
        }
    }

    let bands = ctx.partition(gs);

    let (delta_occupation_occ, delta_fermi) = if ctx.is_q_zero() {
        let response = compute_delta_occupation(
            basis,
            &bands.psi_occ,
            &bands.eigenvalues_occ,
            gs.fermi_level,
            delta_h_psi,
        );
        (response.delta_occupation, response.delta_fermi)
    } else {
        let zeros = k_to_k_minus_q
            .iter()
            .map(|target| DVector::zeros(ctx.occupied_bands(target.index).len()))
            .collect();
        (zeros, 0.0)
    };

    let delta_psi_occ = compute_delta_psi(
        &gs.ham,
        &bands,
        gs.fermi_level,
        delta_h_psi,
        k_to_k_minus_q,
        ctx.q(),
        ctx.tolerance_factors(),
        options.sternheimer(),
    );

    let mut delta_psi = Vec::with_capacity(k_to_k_minus_q.len());
    let mut delta_occupation = Vec::with_capacity(k_to_k_minus_q.len());
    for (ik, target) in k_to_k_minus_q.iter().enumerate() {
        let n_bands = gs.n_bands(target.index);
        let mut psi_full = DMatrix::from_element(gs.psi[ik].nrows(), n_bands, CZERO);
        let mut occ_full = DVector::zeros(n_bands);
        for (j, &band) in ctx.occupied_bands(target.index).iter().enumerate() {
            psi_full.set_column(band, &delta_psi_occ[ik].column(j));
            occ_full[band] = delta_occupation_occ[ik][j];
        }
        delta_psi.push(psi_full);
        delta_occupation.push(occ_full);
    }

    Ok(ResponseQuantities {
        delta_psi,
        delta_occupation,
        delta_fermi,
    })
}
