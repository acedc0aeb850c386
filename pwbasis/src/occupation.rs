//! Occupations, Fermi level and densities of states

extern crate nalgebra as na;

use crate::basis::PlaneWaveBasis;
use crate::error::BasisError;
use na::{DMatrix, DVector};
use num_complex::Complex64;
use tracing::debug;

const MAX_BISECTION_STEPS: usize = 500;

/// Largest electron-count error accepted when the requested tolerance lies
/// below floating-point resolution of the bisection.
const ACCEPTABLE_EXCESS: f64 = 1e-9;

/// Occupations and Fermi level for the given band energies.
///
/// A pinned Fermi level on the model is used as is. Otherwise the electron
/// count is matched to `tol_n_elec` by bisection (smeared occupations) or the
/// level is placed in the middle of the gap (zero temperature).
pub fn compute_occupation(
    basis: &PlaneWaveBasis,
    eigenvalues: &[DVector<f64>],
    tol_n_elec: f64,
) -> Result<(Vec<DVector<f64>>, f64), BasisError> {
    let model = &basis.model;
    let occupations_at = |fermi_level: f64| -> Vec<DVector<f64>> {
        eigenvalues
            .iter()
            .map(|ek| ek.map(|e| model.occupation(e, fermi_level)))
            .collect()
    };

    if let Some(fermi_level) = model.fermi_level {
        return Ok((occupations_at(fermi_level), fermi_level));
    }

    let capacity = basis.reducer().sum(
        eigenvalues
            .iter()
            .zip(basis.kweights.iter())
            .map(|(ek, w)| w * model.filled_occupation() * ek.len() as f64)
            .sum(),
    );
    if capacity + tol_n_elec < model.n_electrons {
        let n_bands = eigenvalues.iter().map(|e| e.len()).min().unwrap_or(0);
        return Err(BasisError::TooFewBands {
            n_bands,
            n_electrons: model.n_electrons,
        });
    }

    let fermi_level = if model.is_smeared() {
        bisect_fermi_level(basis, eigenvalues, tol_n_elec)?
    } else {
        zero_temperature_fermi_level(basis, eigenvalues)?
    };
    Ok((occupations_at(fermi_level), fermi_level))
}

/// Total electron count Σ_k w_k Σ_n f_nk, reduced over k-point owners.
pub fn electron_count(basis: &PlaneWaveBasis, occupation: &[DVector<f64>]) -> f64 {
    basis.reducer().sum(
        occupation
            .iter()
            .zip(basis.kweights.iter())
            .map(|(occ, w)| w * occ.sum())
            .sum(),
    )
}

fn bisect_fermi_level(
    basis: &PlaneWaveBasis,
    eigenvalues: &[DVector<f64>],
    tol_n_elec: f64,
) -> Result<f64, BasisError> {
    let model = &basis.model;
    let excess = |fermi_level: f64| {
        let count = basis.reducer().sum(
            eigenvalues
                .iter()
                .zip(basis.kweights.iter())
                .map(|(ek, w)| w * ek.iter().map(|&e| model.occupation(e, fermi_level)).sum::<f64>())
                .sum(),
        );
        count - model.n_electrons
    };

    let local_min = eigenvalues.iter().flat_map(|e| e.iter().copied()).fold(f64::INFINITY, f64::min);
    let local_max = eigenvalues
        .iter()
        .flat_map(|e| e.iter().copied())
        .fold(f64::NEG_INFINITY, f64::max);
    let margin = 50.0 * model.temperature + 1.0;
    let mut lo = basis.reducer().min(local_min) - margin;
    let mut hi = basis.reducer().max(local_max) + margin;

    let mut mid = 0.5 * (lo + hi);
    let mut current = excess(mid);
    let mut steps = 0;
    while steps < MAX_BISECTION_STEPS && current.abs() >= tol_n_elec {
        if current < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        let next = 0.5 * (lo + hi);
        if next == mid {
            break;
        }
        mid = next;
        current = excess(mid);
        steps += 1;
    }

    debug!(
        "Fermi level {:.12} after {} bisection steps (electron excess {:.3e})",
        mid, steps, current
    );
    if current.abs() > tol_n_elec.max(ACCEPTABLE_EXCESS) {
        return Err(BasisError::FermiLevelNotFound {
            excess: current,
            iterations: steps,
        });
    }
    Ok(mid)
}

fn zero_temperature_fermi_level(
    basis: &PlaneWaveBasis,
    eigenvalues: &[DVector<f64>],
) -> Result<f64, BasisError> {
    let model = &basis.model;
    let bands_per_kpoint = model.n_electrons / (model.filled_occupation() * model.n_spin as f64);
    let n_occ = bands_per_kpoint.round();
    if (bands_per_kpoint - n_occ).abs() > 1e-10 {
        return Err(BasisError::FractionalFilling {
            n_electrons: model.n_electrons,
        });
    }
    let n_occ = n_occ as usize;

    let lowest = eigenvalues.iter().flat_map(|e| e.iter().copied()).fold(f64::INFINITY, f64::min);
    if n_occ == 0 {
        return Ok(basis.reducer().min(lowest) - 1.0);
    }

    let homo = basis.reducer().max(
        eigenvalues
            .iter()
            .map(|e| e[n_occ - 1])
            .fold(f64::NEG_INFINITY, f64::max),
    );
    let lumo = basis.reducer().min(
        eigenvalues
            .iter()
            .filter(|e| e.len() > n_occ)
            .map(|e| e[n_occ])
            .fold(f64::INFINITY, f64::min),
    );

    if !lumo.is_finite() {
        // every computed band is filled, any level above the HOMO will do
        return Ok(homo + 1.0);
    }
    if homo >= lumo {
        return Err(BasisError::NoBandGap { homo, lumo });
    }
    Ok(0.5 * (homo + lumo))
}

/// Density of states at `energy`, one value per spin channel.
pub fn compute_dos(basis: &PlaneWaveBasis, energy: f64, eigenvalues: &[DVector<f64>]) -> Vec<f64> {
    let model = &basis.model;
    let mut dos = vec![0.0; basis.n_spin()];
    for (ik, ek) in eigenvalues.iter().enumerate() {
        let spin = basis.kpoints[ik].spin;
        dos[spin] -= basis.kweights[ik]
            * ek.iter()
                .map(|&e| model.occupation_derivative(e, energy))
                .sum::<f64>();
    }
    basis.reducer().sum_in_place(&mut dos);
    dos
}

/// Local density of states at `energy` on the real-space grid (n_fft x n_spin).
pub fn compute_ldos(
    basis: &PlaneWaveBasis,
    energy: f64,
    eigenvalues: &[DVector<f64>],
    eigenvectors: &[DMatrix<Complex64>],
) -> DMatrix<f64> {
    let model = &basis.model;
    let mut ldos = DMatrix::zeros(basis.n_fft(), basis.n_spin());
    for (ik, (ek, psik)) in eigenvalues.iter().zip(eigenvectors.iter()).enumerate() {
        let spin = basis.kpoints[ik].spin;
        for (n, &e) in ek.iter().enumerate() {
            let weight = -basis.kweights[ik] * model.occupation_derivative(e, energy);
            if weight == 0.0 {
                continue;
            }
            let psi_real = basis.to_real(&psik.column(n).into_owned());
            let mut column = ldos.column_mut(spin);
            column
                .iter_mut()
                .zip(psi_real.iter())
                .for_each(|(l, p)| *l += weight * p.norm_sqr());
        }
    }
    basis.reducer().sum_in_place(ldos.as_mut_slice());
    basis.symmetry().symmetrize_real(&ldos)
}
