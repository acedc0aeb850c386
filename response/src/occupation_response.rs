//! First-order change of occupations and Fermi level

extern crate nalgebra as na;

use na::{DMatrix, DVector};
use num_complex::Complex64;
use pwbasis::PlaneWaveBasis;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct OccupationResponse {
    /// δf per k-point, one entry per band passed in
    pub delta_occupation: Vec<DVector<f64>>,
    pub delta_fermi: f64,
}

/// δf_n = f'_n (δε_n - δεF) with δε_n = Re⟨ψ_n|δH ψ_n⟩.
///
/// δεF is fixed by particle-number conservation unless the model pins the
/// Fermi level. At zero temperature everything vanishes.
pub fn compute_delta_occupation(
    basis: &PlaneWaveBasis,
    psi_occ: &[DMatrix<Complex64>],
    eigenvalues_occ: &[DVector<f64>],
    fermi_level: f64,
    delta_h_psi_occ: &[DMatrix<Complex64>],
) -> OccupationResponse {
    let model = &basis.model;
    if !model.is_smeared() {
        return OccupationResponse {
            delta_occupation: eigenvalues_occ.iter().map(|e| DVector::zeros(e.len())).collect(),
            delta_fermi: 0.0,
        };
    }

    let derivatives: Vec<DVector<f64>> = eigenvalues_occ
        .iter()
        .map(|ek| ek.map(|e| model.occupation_derivative(e, fermi_level)))
        .collect();

    // First pass, without the Fermi-level shift
    let mut delta_occupation: Vec<DVector<f64>> = derivatives
        .iter()
        .enumerate()
        .map(|(ik, fp)| {
            DVector::from_fn(fp.len(), |n, _| {
                let delta_energy = psi_occ[ik].column(n).dotc(&delta_h_psi_occ[ik].column(n)).re;
                delta_energy * fp[n]
            })
        })
        .collect();

    // minus the total density of states
    let dos_neg = basis.reducer().sum(
        derivatives
            .iter()
            .zip(basis.kweights.iter())
            .map(|(fp, w)| w * fp.sum())
            .sum(),
    );

    let delta_fermi = if model.fermi_level.is_some() || dos_neg == 0.0 {
        0.0
    } else {
        let delta_occ_total = basis.reducer().sum(
            delta_occupation
                .iter()
                .zip(basis.kweights.iter())
                .map(|(df, w)| w * df.sum())
                .sum(),
        );
        delta_occ_total / dos_neg
    };

    for (df, fp) in delta_occupation.iter_mut().zip(derivatives.iter()) {
        *df -= fp * delta_fermi;
    }

    debug!("Occupation response: δεF = {:.6e}, DOS(εF) = {:.6e}", delta_fermi, -dos_neg);
    OccupationResponse {
        delta_occupation,
        delta_fermi,
    }
}
