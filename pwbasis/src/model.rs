//! Physical model: cell, electron count, spin and smearing

use crate::error::BasisError;
use crate::smearing::Smearing;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A periodic system in an orthorhombic cell.
///
/// The Fermi level is found from `n_electrons` unless `fermi_level` pins it
/// (semi-grand-canonical mode).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Cell lengths along the three axes (bohr)
    pub lattice: [f64; 3],
    pub n_electrons: f64,
    pub n_spin: usize,
    pub temperature: f64,
    pub smearing: Smearing,
    pub fermi_level: Option<f64>,
}

impl Model {
    pub fn new(lattice: [f64; 3], n_electrons: f64) -> Result<Self, BasisError> {
        if lattice.iter().any(|&a| !(a > 0.0)) {
            return Err(BasisError::InvalidCell(format!(
                "lattice lengths must be positive, got {:?}",
                lattice
            )));
        }
        Ok(Model {
            lattice,
            n_electrons,
            n_spin: 1,
            temperature: 0.0,
            smearing: Smearing::None,
            fermi_level: None,
        })
    }

    pub fn with_temperature(mut self, temperature: f64, smearing: Smearing) -> Self {
        self.temperature = temperature.max(0.0);
        self.smearing = smearing;
        self
    }

    pub fn with_spin(mut self, n_spin: usize) -> Result<Self, BasisError> {
        if n_spin != 1 && n_spin != 2 {
            return Err(BasisError::UnsupportedSpin(n_spin));
        }
        self.n_spin = n_spin;
        Ok(self)
    }

    pub fn with_fixed_fermi_level(mut self, fermi_level: f64) -> Self {
        self.fermi_level = Some(fermi_level);
        self
    }

    pub fn unit_cell_volume(&self) -> f64 {
        self.lattice.iter().product()
    }

    /// Reciprocal lattice lengths 2π / a.
    pub fn reciprocal_lengths(&self) -> [f64; 3] {
        self.lattice.map(|a| 2.0 * PI / a)
    }

    /// Maximal occupation of a single band.
    pub fn filled_occupation(&self) -> f64 {
        if self.n_spin == 1 {
            2.0
        } else {
            1.0
        }
    }

    /// True when occupations are smeared, i.e. have a non-vanishing derivative.
    pub fn is_smeared(&self) -> bool {
        self.temperature > 0.0 && self.smearing != Smearing::None
    }

    /// Occupation of a band at energy `energy`.
    pub fn occupation(&self, energy: f64, fermi_level: f64) -> f64 {
        let x = if self.is_smeared() {
            (energy - fermi_level) / self.temperature
        } else {
            energy - fermi_level
        };
        let smearing = if self.is_smeared() {
            self.smearing
        } else {
            Smearing::None
        };
        self.filled_occupation() * smearing.occupation(x)
    }

    /// Derivative of the occupation with respect to the band energy,
    /// f'((ε - εF) / T) / T including the filled-occupation factor.
    pub fn occupation_derivative(&self, energy: f64, fermi_level: f64) -> f64 {
        if !self.is_smeared() {
            return 0.0;
        }
        let x = (energy - fermi_level) / self.temperature;
        self.filled_occupation() * self.smearing.occupation_derivative(x) / self.temperature
    }

    /// (f_i - f_j) / (ε_i - ε_j) including the filled-occupation factor.
    pub fn occupation_divided_difference(&self, ei: f64, ej: f64, fermi_level: f64) -> f64 {
        let temperature = if self.is_smeared() {
            self.temperature
        } else {
            0.0
        };
        self.filled_occupation()
            * self
                .smearing
                .occupation_divided_difference(ei, ej, fermi_level, temperature)
    }
}
