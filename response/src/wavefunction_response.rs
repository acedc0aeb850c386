//! First-order change of the occupied orbitals
//!
//! For an occupied band n at k - q the derivative at k is
//!
//! δψ_n = Σ_m α_mn ψ_m ⟨ψ_m|δHψ_n⟩ + δψ_n^⊥
//!
//! where m runs over the occupied bands at k and δψ_n^⊥ solves the
//! Sternheimer equation in the complement of the occupied space. The
//! coefficients satisfy f_n α_mn + f_m α_nm = (f_m - f_n) / (ε_m - ε_n), which
//! stays finite for degenerate and empty states.

extern crate nalgebra as na;

use crate::context::PartitionedBands;
use crate::sternheimer::{solve_sternheimer, ExtraBands, SternheimerOptions};
use na::{DMatrix, DVector};
use num_complex::Complex64;
use pwbasis::{Hamiltonian, KpointShift, CZERO};
use rayon::prelude::*;
use tracing::debug;

/// Coefficient of ψ_m ⟨ψ_m|δHψ_n⟩ given the occupations and their divided difference.
pub fn compute_alpha(f_m: f64, f_n: f64, ratio: f64) -> f64 {
    let denominator = f_n * f_n + f_m * f_m;
    if ratio == 0.0 || denominator == 0.0 {
        return 0.0;
    }
    ratio * f_n / denominator
}

/// Orbital derivatives for every occupied band.
///
/// `delta_h_psi[ik]` holds δHψ for the occupied bands of k - q, the result
/// has the same layout. `tolerance_factors` scale `options.tol` per band and
/// follow the occupied bands of each k-point.
#[allow(clippy::too_many_arguments)]
pub fn compute_delta_psi(
    ham: &Hamiltonian,
    bands: &PartitionedBands,
    fermi_level: f64,
    delta_h_psi: &[DMatrix<Complex64>],
    k_to_k_minus_q: &[KpointShift],
    q: [f64; 3],
    tolerance_factors: &[DVector<f64>],
    options: SternheimerOptions,
) -> Vec<DMatrix<Complex64>> {
    let model = &ham.basis.model;
    let q_is_zero = q == [0.0, 0.0, 0.0];

    k_to_k_minus_q
        .iter()
        .enumerate()
        .map(|(ik, target)| {
            let block = ham.block(ik);
            let psi_k = &bands.psi_occ[ik];
            let eigenvalues_k = &bands.eigenvalues_occ[ik];
            let eigenvalues_minus_q = &bands.eigenvalues_occ[target.index];
            let factors = &tolerance_factors[target.index];

            let psi_extra = &bands.psi_extra[ik];
            let h_psi_extra = block.apply_block(psi_extra);
            let eigenvalues_extra = DVector::from_fn(psi_extra.ncols(), |i, _| {
                psi_extra.column(i).dotc(&h_psi_extra.column(i)).re
            });
            let extra = ExtraBands {
                psi: psi_extra,
                eigenvalues: &eigenvalues_extra,
                h_psi: &h_psi_extra,
            };

            let solves: Vec<(DVector<Complex64>, bool)> = (0..eigenvalues_minus_q.len())
                .into_par_iter()
                .map(|n| {
                    let energy = eigenvalues_minus_q[n];
                    let f_n = model.occupation(energy, fermi_level);
                    let rhs = delta_h_psi[ik].column(n).into_owned();

                    let mut delta_psi = DVector::from_element(rhs.len(), CZERO);
                    for m in 0..psi_k.ncols() {
                        // the diagonal term comes from the occupation response
                        if q_is_zero && m == n {
                            continue;
                        }
                        let f_m = model.occupation(eigenvalues_k[m], fermi_level);
                        let ratio = model.occupation_divided_difference(eigenvalues_k[m], energy, fermi_level);
                        let alpha = compute_alpha(f_m, f_n, ratio);
                        if alpha == 0.0 {
                            continue;
                        }
                        let psi_m = psi_k.column(m);
                        let overlap = psi_m.dotc(&rhs);
                        delta_psi += psi_m * (overlap * alpha);
                    }

                    let tol = (options.tol * factors[n]).max(0.5 * f64::EPSILON);
                    let result = solve_sternheimer(
                        block,
                        psi_k,
                        energy,
                        &rhs,
                        Some(extra),
                        SternheimerOptions { tol, ..options },
                    );
                    (delta_psi + result.delta_psi, result.converged)
                })
                .collect();

            let n_unconverged = solves.iter().filter(|(_, converged)| !converged).count();
            debug!(
                "k-point {}: {} Sternheimer solves, {} not converged",
                ik,
                solves.len(),
                n_unconverged
            );

            let columns: Vec<DVector<Complex64>> = solves.into_iter().map(|(column, _)| column).collect();
            if columns.is_empty() {
                DMatrix::zeros(block.dim(), 0)
            } else {
                DMatrix::from_columns(&columns)
            }
        })
        .collect()
}
