//! Kinetic-energy preconditioners for iterative solves

use crate::hamiltonian::HamiltonianBlock;
use nalgebra::DVector;
use num_complex::Complex64;

/// Approximate inverse of a shifted Hamiltonian block.
pub trait Preconditioner: Sync {
    fn ldiv(&self, r: &DVector<Complex64>) -> DVector<Complex64>;
}

/// Teter-Payne-Allan preconditioner.
///
/// Once prepared with a reference orbital of mean kinetic energy t̄, a
/// component with kinetic energy t is scaled by t̄ / (t̄ + t). Unprepared, it
/// falls back to 1 / (t + shift).
#[derive(Debug, Clone)]
pub struct PreconditionerTpa {
    kinetic: DVector<f64>,
    mean_kinetic: Option<f64>,
    default_shift: f64,
}

impl PreconditionerTpa {
    pub fn new(block: &HamiltonianBlock) -> Self {
        PreconditionerTpa {
            kinetic: block.kinetic().clone(),
            mean_kinetic: None,
            default_shift: 1.0,
        }
    }

    /// Set the reference orbital; `None` keeps the shifted kinetic diagonal.
    pub fn prepare(&mut self, reference: Option<&DVector<Complex64>>) {
        self.mean_kinetic = reference
            .map(|x| {
                x.iter()
                    .zip(self.kinetic.iter())
                    .map(|(c, t)| c.norm_sqr() * t)
                    .sum::<f64>()
            })
            .filter(|&t| t > f64::EPSILON);
    }

    pub fn mean_kinetic(&self) -> Option<f64> {
        self.mean_kinetic
    }
}

impl Preconditioner for PreconditionerTpa {
    fn ldiv(&self, r: &DVector<Complex64>) -> DVector<Complex64> {
        match self.mean_kinetic {
            Some(mean) => DVector::from_iterator(
                r.len(),
                r.iter()
                    .zip(self.kinetic.iter())
                    .map(|(ri, t)| *ri * (mean / (mean + t))),
            ),
            None => DVector::from_iterator(
                r.len(),
                r.iter()
                    .zip(self.kinetic.iter())
                    .map(|(ri, t)| *ri / (t + self.default_shift)),
            ),
        }
    }
}
