//! Smearing functions for fractional occupations
//!
//! Every smearing maps a reduced energy x = (ε - εF) / T to an occupation in
//! [0, 1] (before the filled-occupation factor is applied). The derivative is
//! taken with respect to x.

use libm::erfc;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, SQRT_2};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smearing {
    /// Step function
    #[default]
    None,
    FermiDirac,
    Gaussian,
    /// Cold smearing
    MarzariVanderbilt,
}

impl Smearing {
    /// Occupation at reduced energy `x`.
    pub fn occupation(&self, x: f64) -> f64 {
        match self {
            Smearing::None => step(x),
            Smearing::FermiDirac => {
                if x > 0.0 {
                    let e = (-x).exp();
                    e / (1.0 + e)
                } else {
                    1.0 / (1.0 + x.exp())
                }
            }
            Smearing::Gaussian => 0.5 * erfc(x),
            Smearing::MarzariVanderbilt => {
                let xs = x + 1.0 / SQRT_2;
                0.5 * erfc(xs) + (-xs * xs).exp() / (2.0 * PI).sqrt()
            }
        }
    }

    /// Derivative of [`Smearing::occupation`] with respect to `x`.
    pub fn occupation_derivative(&self, x: f64) -> f64 {
        match self {
            Smearing::None => 0.0,
            Smearing::FermiDirac => {
                let f = self.occupation(x);
                -f * (1.0 - f)
            }
            Smearing::Gaussian => -(-x * x).exp() / PI.sqrt(),
            Smearing::MarzariVanderbilt => {
                let xs = x + 1.0 / SQRT_2;
                -(-xs * xs).exp() / PI.sqrt() * (1.0 + SQRT_2 * xs)
            }
        }
    }

    /// Divided difference (f(εi) - f(εj)) / (εi - εj) of the occupation as a
    /// function of energy, with f(ε) = occupation((ε - εF) / T).
    ///
    /// Coincident energies return the derivative limit. At zero temperature
    /// the step function is used and coincident energies give zero.
    pub fn occupation_divided_difference(
        &self,
        ei: f64,
        ej: f64,
        fermi_level: f64,
        temperature: f64,
    ) -> f64 {
        if temperature == 0.0 || *self == Smearing::None {
            if ei == ej {
                return 0.0;
            }
            return (step(ei - fermi_level) - step(ej - fermi_level)) / (ei - ej);
        }

        let f = |e: f64| self.occupation((e - fermi_level) / temperature);
        let fder = |e: f64| self.occupation_derivative((e - fermi_level) / temperature) / temperature;

        if (ei - ej).abs() < f64::EPSILON.sqrt() {
            return 0.5 * (fder(ei) + fder(ej));
        }

        if *self == Smearing::FermiDirac {
            // f(x) - f(y) = f(x) f(y) e^{x} expm1(y - x), symmetrized
            let xi = (ei - fermi_level) / temperature;
            let xj = (ej - fermi_level) / temperature;
            let limit = f64::MAX.ln() / 4.0;
            if (xi - xj).abs() < limit && xi.abs() < limit && xj.abs() < limit {
                let fifj = f(ei) * f(ej);
                let dij = fifj * xi.exp() * (xj - xi).exp_m1();
                let dji = fifj * xj.exp() * (xi - xj).exp_m1();
                return 0.5 * (dij - dji) / (ei - ej);
            }
        }

        (f(ei) - f(ej)) / (ei - ej)
    }
}

fn step(x: f64) -> f64 {
    if x < 0.0 {
        1.0
    } else if x > 0.0 {
        0.0
    } else {
        0.5
    }
}
