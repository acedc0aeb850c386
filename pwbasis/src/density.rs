//! Densities, density responses and potential application to orbitals
//!
//! Real-space arrays are (n_fft x n_spin). For a momentum shift q, potentials
//! and density responses are represented by their lattice-periodic part v(r)
//! of e^{iq·r} v(r).

extern crate nalgebra as na;

use crate::basis::PlaneWaveBasis;
use crate::kpoints::KpointShift;
use crate::CZERO;
use na::{DMatrix, DVector};
use num_complex::Complex64;
use rayon::prelude::*;

/// Ground-state density ρ(r) = Σ_k w_k Σ_n f_nk |ψ_nk(r)|².
pub fn compute_density(
    basis: &PlaneWaveBasis,
    psi: &[DMatrix<Complex64>],
    occupation: &[DVector<f64>],
) -> DMatrix<f64> {
    let mut rho = (0..psi.len())
        .into_par_iter()
        .map(|ik| {
            let mut rho_k = DMatrix::zeros(basis.n_fft(), basis.n_spin());
            let spin = basis.kpoints[ik].spin;
            for n in 0..psi[ik].ncols() {
                let weight = basis.kweights[ik] * occupation[ik][n];
                if weight == 0.0 {
                    continue;
                }
                let psi_real = basis.to_real(&psi[ik].column(n).into_owned());
                rho_k
                    .column_mut(spin)
                    .iter_mut()
                    .zip(psi_real.iter())
                    .for_each(|(r, p)| *r += weight * p.norm_sqr());
            }
            rho_k
        })
        .reduce(
            || DMatrix::zeros(basis.n_fft(), basis.n_spin()),
            |a, b| a + b,
        );
    basis.reducer().sum_in_place(rho.as_mut_slice());
    basis.symmetry().symmetrize_real(&rho)
}

/// Periodic part of a Bloch function at k' + G0 from the one stored at k'.
fn shifted_real(basis: &PlaneWaveBasis, coeffs: &DVector<Complex64>, phases: Option<&DVector<Complex64>>) -> DVector<Complex64> {
    let mut values = basis.to_real(coeffs);
    if let Some(phases) = phases {
        values.component_mul_assign(phases);
    }
    values
}

/// δHψ_k = δV · ψ_{k-q} for every column of `psi[k - q]`.
///
/// The result at k-point `ik` has as many columns as the orbitals passed for
/// the k-point `k_to_k_minus_q[ik].index`.
pub fn multiply_by_potential(
    basis: &PlaneWaveBasis,
    psi: &[DMatrix<Complex64>],
    delta_v: &DMatrix<Complex64>,
    k_to_k_minus_q: &[KpointShift],
) -> Vec<DMatrix<Complex64>> {
    k_to_k_minus_q
        .iter()
        .enumerate()
        .map(|(ik, target)| {
            let source = &psi[target.index];
            let spin = basis.kpoints[ik].spin;
            let dv = delta_v.column(spin).into_owned();
            let phases = (!target.is_unshifted()).then(|| basis.shift_phases(target.shift));

            let columns: Vec<DVector<Complex64>> = (0..source.ncols())
                .into_par_iter()
                .map(|n| {
                    let mut values = shifted_real(basis, &source.column(n).into_owned(), phases.as_ref());
                    values.component_mul_assign(&dv);
                    basis.to_fourier(&values)
                })
                .collect();
            if columns.is_empty() {
                DMatrix::zeros(source.nrows(), 0)
            } else {
                DMatrix::from_columns(&columns)
            }
        })
        .collect()
}

/// Density response from orbital and occupation derivatives
///
/// δρ(r) = Σ_k w_k Σ_n [ 2 f_{n,k-q} conj(ψ_{n,k-q}(r)) δψ_{n,k}(r) + δf_{n,k} |ψ_{n,k}(r)|² ]
///
/// summed over bands with |f| ≥ `occupation_threshold`. Columns of
/// `delta_psi[ik]` and entries of `delta_occupation[ik]` follow the bands of
/// k - q. At q = 0 the real part is returned.
pub fn compute_delta_density(
    basis: &PlaneWaveBasis,
    psi: &[DMatrix<Complex64>],
    delta_psi: &[DMatrix<Complex64>],
    occupation: &[DVector<f64>],
    delta_occupation: &[DVector<f64>],
    occupation_threshold: f64,
    k_to_k_minus_q: &[KpointShift],
) -> DMatrix<Complex64> {
    let q_is_zero = k_to_k_minus_q
        .iter()
        .enumerate()
        .all(|(ik, t)| t.index == ik && t.is_unshifted());

    let mut delta_rho = (0..k_to_k_minus_q.len())
        .into_par_iter()
        .map(|ik| {
            let target = k_to_k_minus_q[ik];
            let spin = basis.kpoints[ik].spin;
            let weight = basis.kweights[ik];
            let phases = (!target.is_unshifted()).then(|| basis.shift_phases(target.shift));
            let mut delta_rho_k = DMatrix::from_element(basis.n_fft(), basis.n_spin(), CZERO);

            for n in 0..psi[target.index].ncols() {
                let occ = occupation[target.index][n];
                if occ.abs() < occupation_threshold {
                    continue;
                }
                let psi_real = shifted_real(basis, &psi[target.index].column(n).into_owned(), phases.as_ref());
                let delta_psi_real = basis.to_real(&delta_psi[ik].column(n).into_owned());
                let delta_occ = delta_occupation[ik][n];

                delta_rho_k
                    .column_mut(spin)
                    .iter_mut()
                    .zip(psi_real.iter().zip(delta_psi_real.iter()))
                    .for_each(|(d, (p, dp))| {
                        *d += (p.conj() * dp * (2.0 * occ) + p.norm_sqr() * delta_occ) * weight;
                    });
            }
            delta_rho_k
        })
        .reduce(
            || DMatrix::from_element(basis.n_fft(), basis.n_spin(), CZERO),
            |a, b| a + b,
        );

    basis.reducer().sum_complex_in_place(delta_rho.as_mut_slice());
    if q_is_zero {
        delta_rho.iter_mut().for_each(|d| d.im = 0.0);
    }
    basis.symmetry().symmetrize(&delta_rho)
}
