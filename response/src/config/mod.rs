//! Configuration management for response calculations
//!
//! A YAML file describes a toy periodic system (cell, grid, smearing and a
//! cosine-series local potential), the perturbation and the solver settings.
//! Every optional field is filled by `with_defaults()`.

mod args;

pub use args::Args;

use pwbasis::Smearing;
use response::context::default_occupation_threshold;
use serde::{Deserialize, Serialize};

/// Main configuration structure for response calculations
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub system: SystemParams,
    pub perturbation: Option<PerturbationParams>,
    pub response: Option<ResponseParams>,
}

/// One term amplitude · cos(2π m·x) of a real-space field, x in fractional coordinates
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct CosineTerm {
    pub amplitude: f64,
    pub miller: [i64; 3],
}

/// Periodic system and ground-state parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemParams {
    pub lattice: [f64; 3],
    pub fft_size: [usize; 3],
    pub n_electrons: f64,
    pub kgrid: Option<[usize; 3]>,
    pub n_spin: Option<usize>,
    pub temperature: Option<f64>,
    pub smearing: Option<Smearing>,
    pub fermi_level: Option<f64>,
    pub n_bands: Option<usize>,
    pub symmetry: Option<String>, // "none" or "inversion"
    pub potential: Option<Vec<CosineTerm>>,
}

impl SystemParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        if self.kgrid.is_none() {
            self.kgrid = Some([1, 1, 1]);
        }
        if self.n_spin.is_none() {
            self.n_spin = Some(1);
        }
        if self.temperature.is_none() {
            self.temperature = Some(0.0);
        }
        if self.smearing.is_none() {
            self.smearing = Some(Smearing::None);
        }
        if self.symmetry.is_none() {
            self.symmetry = Some("none".to_string());
        }
        if self.potential.is_none() {
            self.potential = Some(Vec::new());
        }
        self
    }
}

/// Perturbing potential δV and its momentum
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerturbationParams {
    pub q: Option<[f64; 3]>,
    pub terms: Option<Vec<CosineTerm>>,
}

impl Default for PerturbationParams {
    fn default() -> Self {
        PerturbationParams {
            q: Some([0.0, 0.0, 0.0]),
            terms: Some(vec![CosineTerm {
                amplitude: 0.1,
                miller: [1, 0, 0],
            }]),
        }
    }
}

impl PerturbationParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.q.is_none() {
            self.q = defaults.q;
        }
        if self.terms.is_none() {
            self.terms = defaults.terms;
        }
        self
    }
}

/// Solver parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResponseParams {
    pub tol: Option<f64>,
    pub miniter: Option<usize>,
    pub maxiter: Option<usize>,
    pub occupation_threshold: Option<f64>,
    pub band_tolerance: Option<String>, // "uniform", "guaranteed" or "balanced"
    pub compare_explicit: Option<bool>,
}

impl Default for ResponseParams {
    fn default() -> Self {
        ResponseParams {
            tol: Some(1e-9),
            miniter: Some(1),
            maxiter: Some(100),
            occupation_threshold: Some(default_occupation_threshold()),
            band_tolerance: Some("uniform".to_string()),
            compare_explicit: Some(false),
        }
    }
}

impl ResponseParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.tol.is_none() {
            self.tol = defaults.tol;
        }
        if self.miniter.is_none() {
            self.miniter = defaults.miniter;
        }
        if self.maxiter.is_none() {
            self.maxiter = defaults.maxiter;
        }
        if self.occupation_threshold.is_none() {
            self.occupation_threshold = defaults.occupation_threshold;
        }
        if self.band_tolerance.is_none() {
            self.band_tolerance = defaults.band_tolerance;
        }
        if self.compare_explicit.is_none() {
            self.compare_explicit = defaults.compare_explicit;
        }
        self
    }
}

impl Config {
    /// Apply defaults to all configuration sections
    pub fn with_defaults(mut self) -> Self {
        self.system = self.system.with_defaults();
        self.perturbation = Some(self.perturbation.take().unwrap_or_default().with_defaults());
        self.response = Some(self.response.take().unwrap_or_default().with_defaults());
        self
    }

    pub fn kgrid(&self) -> [usize; 3] {
        self.system.kgrid.unwrap_or([1, 1, 1])
    }

    pub fn n_spin(&self) -> usize {
        self.system.n_spin.unwrap_or(1)
    }

    pub fn temperature(&self) -> f64 {
        self.system.temperature.unwrap_or(0.0)
    }

    pub fn smearing(&self) -> Smearing {
        self.system.smearing.unwrap_or_default()
    }

    pub fn symmetry(&self) -> String {
        self.system
            .symmetry
            .clone()
            .unwrap_or_else(|| "none".to_string())
    }

    pub fn potential(&self) -> Vec<CosineTerm> {
        self.system.potential.clone().unwrap_or_default()
    }

    pub fn q(&self) -> [f64; 3] {
        self.perturbation
            .as_ref()
            .and_then(|p| p.q)
            .unwrap_or([0.0, 0.0, 0.0])
    }

    pub fn perturbation_terms(&self) -> Vec<CosineTerm> {
        self.perturbation
            .as_ref()
            .and_then(|p| p.terms.clone())
            .unwrap_or_else(|| PerturbationParams::default().terms.unwrap_or_default())
    }

    pub fn response_params(&self) -> ResponseParams {
        self.response.clone().unwrap_or_default().with_defaults()
    }
}
