//! Plane-wave basis, Hamiltonian and ground-state collaborators
//!
//! This crate provides everything the linear-response solvers in `response`
//! consume: an orthorhombic periodic model, the plane-wave basis on a full FFT
//! grid, matrix-free Hamiltonian blocks, smearing functions, the Fermi-level
//! root-finder, dense diagonalization and the density/potential plumbing
//! between reciprocal and real space.

pub mod basis;
pub mod density;
pub mod eigen;
pub mod error;
pub mod fft;
pub mod ground_state;
pub mod hamiltonian;
pub mod kpoints;
pub mod model;
pub mod occupation;
pub mod preconditioner;
pub mod reducer;
pub mod smearing;
pub mod symmetry;

#[cfg(test)]
mod tests;

pub use basis::PlaneWaveBasis;
pub use error::BasisError;
pub use ground_state::GroundState;
pub use hamiltonian::{Hamiltonian, HamiltonianBlock};
pub use kpoints::{Kpoint, KpointShift};
pub use model::Model;
pub use smearing::Smearing;
pub use symmetry::SymmetryGroup;

pub use num_complex::Complex64;

/// Complex zero, used when allocating coefficient buffers.
pub const CZERO: Complex64 = Complex64::new(0.0, 0.0);
