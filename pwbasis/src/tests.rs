//! Tests for the plane-wave collaborators

#[cfg(test)]
mod tests {
    use crate::density::{compute_density, multiply_by_potential};
    use crate::fft::{miller_index, FftGrid};
    use crate::occupation::{compute_dos, compute_occupation, electron_count};
    use crate::preconditioner::{Preconditioner, PreconditionerTpa};
    use crate::reducer::KpointReducer;
    use crate::{BasisError, Complex64, GroundState, Hamiltonian, KpointShift, Model, PlaneWaveBasis, Smearing, SymmetryGroup};
    use nalgebra::{DMatrix, DVector};
    use std::f64::consts::PI;
    use std::sync::Arc;

    fn random_complex(n: usize) -> DVector<Complex64> {
        let re = DVector::<f64>::new_random(n);
        let im = DVector::<f64>::new_random(n);
        DVector::from_iterator(
            n,
            re.iter().zip(im.iter()).map(|(a, b)| Complex64::new(a - 0.5, b - 0.5)),
        )
    }

    fn cosine_potential(basis: &PlaneWaveBasis, amplitude: f64) -> DMatrix<f64> {
        DMatrix::from_fn(basis.n_fft(), basis.n_spin(), |idx, _| {
            let x = basis.fft.fractional_position(idx)[0];
            amplitude * (2.0 * PI * x).cos()
        })
    }

    fn metallic_basis(kgrid: [usize; 3]) -> Arc<PlaneWaveBasis> {
        let model = Model::new([10.0, 1.0, 1.0], 2.0)
            .unwrap()
            .with_temperature(0.01, Smearing::FermiDirac);
        Arc::new(PlaneWaveBasis::new(model, [8, 1, 1], kgrid).unwrap())
    }

    #[test]
    fn test_miller_index() {
        let indices: Vec<i64> = (0..5).map(|i| miller_index(i, 5)).collect();
        assert_eq!(indices, vec![0, 1, 2, -2, -1]);
        let indices: Vec<i64> = (0..4).map(|i| miller_index(i, 4)).collect();
        assert_eq!(indices, vec![0, 1, -2, -1]);
    }

    #[test]
    fn test_fft_round_trip_and_normalization() {
        let grid = FftGrid::new([6, 4, 3], 17.0).unwrap();
        let coeffs = random_complex(grid.len());

        let values = grid.to_real(&coeffs);
        let back = grid.to_fourier(&values);
        let error = (&back - &coeffs).norm();
        assert!(error < 1e-12, "FFT round trip error {}", error);

        let dvol = 17.0 / grid.len() as f64;
        let real_norm: f64 = values.iter().map(|v| v.norm_sqr()).sum::<f64>() * dvol;
        let coeff_norm: f64 = coeffs.iter().map(|c| c.norm_sqr()).sum();
        assert!((real_norm - coeff_norm).abs() < 1e-12);
    }

    #[test]
    fn test_fft_rejects_empty_grid() {
        assert!(matches!(
            FftGrid::new([4, 0, 1], 1.0),
            Err(BasisError::InvalidCell(_))
        ));
    }

    #[test]
    fn test_smearing_limits() {
        for smearing in [Smearing::FermiDirac, Smearing::Gaussian, Smearing::MarzariVanderbilt] {
            assert!((smearing.occupation(-40.0) - 1.0).abs() < 1e-12, "{:?}", smearing);
            assert!(smearing.occupation(40.0).abs() < 1e-12, "{:?}", smearing);
        }
        assert!((Smearing::FermiDirac.occupation(0.0) - 0.5).abs() < 1e-15);
        assert!((Smearing::Gaussian.occupation(0.0) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_smearing_derivative_matches_finite_difference() {
        let h = 1e-5;
        for smearing in [Smearing::FermiDirac, Smearing::Gaussian, Smearing::MarzariVanderbilt] {
            for &x in &[-1.3, -0.2, 0.0, 0.4, 2.1] {
                let fd = (smearing.occupation(x + h) - smearing.occupation(x - h)) / (2.0 * h);
                let exact = smearing.occupation_derivative(x);
                assert!((fd - exact).abs() < 1e-8, "{:?} at {}: {} vs {}", smearing, x, fd, exact);
            }
        }
    }

    #[test]
    fn test_divided_difference_tends_to_derivative() {
        let (fermi_level, temperature) = (0.1, 0.02);
        for smearing in [Smearing::FermiDirac, Smearing::Gaussian, Smearing::MarzariVanderbilt] {
            let e = 0.13;
            let derivative = smearing.occupation_derivative((e - fermi_level) / temperature) / temperature;
            let coincident = smearing.occupation_divided_difference(e, e, fermi_level, temperature);
            let close = smearing.occupation_divided_difference(e, e + 1e-7, fermi_level, temperature);
            assert!((coincident - derivative).abs() < 1e-10 * derivative.abs().max(1.0));
            assert!((close - derivative).abs() < 1e-4 * derivative.abs().max(1.0));
        }
    }

    #[test]
    fn test_divided_difference_fermi_dirac_far_from_fermi_level() {
        let ratio = Smearing::FermiDirac.occupation_divided_difference(-3.0, 2.0, 0.0, 0.01);
        assert!(ratio.is_finite());
        assert!((ratio - (1.0 - 0.0) / (-3.0 - 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_divided_difference_zero_temperature() {
        let s = Smearing::None;
        assert_eq!(s.occupation_divided_difference(0.5, 0.5, 0.0, 0.0), 0.0);
        assert!((s.occupation_divided_difference(-1.0, 1.0, 0.0, 0.0) + 0.5).abs() < 1e-15);
        assert_eq!(s.occupation_divided_difference(-1.0, -0.5, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_monkhorst_pack_weights() {
        let model = Model::new([1.0, 1.0, 1.0], 2.0).unwrap().with_spin(2).unwrap();
        let basis = PlaneWaveBasis::new(model, [2, 2, 2], [2, 3, 1]).unwrap();
        assert_eq!(basis.n_kpoints(), 12);
        for spin in 0..2 {
            let total: f64 = basis
                .kpoints
                .iter()
                .zip(basis.kweights.iter())
                .filter(|(k, _)| k.spin == spin)
                .map(|(_, w)| w)
                .sum();
            assert!((total - 1.0).abs() < 1e-14);
        }
    }

    #[test]
    fn test_k_to_k_minus_q() {
        let basis = metallic_basis([4, 1, 1]);
        let map = basis.k_to_k_minus_q([0.25, 0.0, 0.0]).unwrap();
        assert_eq!(map[0], KpointShift { index: 3, shift: [0, 0, 0] });
        assert_eq!(map[1], KpointShift { index: 0, shift: [0, 0, 0] });
        assert_eq!(map[3], KpointShift { index: 2, shift: [-1, 0, 0] });

        let identity = basis.k_to_k_minus_q([0.0, 0.0, 0.0]).unwrap();
        assert!(identity.iter().enumerate().all(|(ik, t)| t.index == ik && t.is_unshifted()));

        assert!(matches!(
            basis.k_to_k_minus_q([0.1, 0.0, 0.0]),
            Err(BasisError::IncommensurateShift { .. })
        ));
    }

    #[test]
    fn test_symmetrize_idempotent() {
        let basis = metallic_basis([1, 1, 1]);
        let group = SymmetryGroup::inversion(&basis.fft);
        assert_eq!(group.len(), 2);

        let x = DMatrix::from_fn(basis.n_fft(), 1, |i, _| Complex64::new(i as f64, (i * i) as f64));
        let once = group.symmetrize(&x);
        let twice = group.symmetrize(&once);
        assert!((&once - &twice).norm() < 1e-14);
        // inversion on a 1-D grid pairs i with n - i
        assert!((once[(1, 0)] - once[(7, 0)]).norm() < 1e-14);
    }

    #[test]
    fn test_symmetry_rejects_non_permutation() {
        let result = SymmetryGroup::from_permutations(3, vec![vec![0, 0, 1]]);
        assert!(matches!(result, Err(BasisError::InvalidSymmetry { index: 0, .. })));
    }

    #[test]
    fn test_hamiltonian_is_hermitian() {
        let basis = metallic_basis([2, 1, 1]);
        let potential = cosine_potential(&basis, -0.7);
        let ham = Hamiltonian::new(basis.clone(), &potential).unwrap();

        let block = ham.block(1);
        assert_eq!(block.potential(), &potential.column(0).into_owned());
        let x = random_complex(block.dim());
        let y = random_complex(block.dim());
        let xhy = x.dotc(&block.apply(&y));
        let yhx = y.dotc(&block.apply(&x));
        assert!((xhy - yhx.conj()).norm() < 1e-12);
    }

    #[test]
    fn test_hamiltonian_rejects_bad_potential() {
        let basis = metallic_basis([1, 1, 1]);
        let potential = DMatrix::zeros(basis.n_fft(), 2);
        assert!(matches!(
            Hamiltonian::new(basis, &potential),
            Err(BasisError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_free_electron_spectrum() {
        let basis = metallic_basis([1, 1, 1]);
        let ham = Hamiltonian::free(basis.clone());
        let gs = GroundState::from_dense_diagonalization(ham, 3, 1e-10).unwrap();
        let g = 2.0 * PI / 10.0;
        assert!(gs.eigenvalues[0][0].abs() < 1e-12);
        assert!((gs.eigenvalues[0][1] - 0.5 * g * g).abs() < 1e-12);
        assert!((gs.eigenvalues[0][2] - 0.5 * g * g).abs() < 1e-12);
    }

    #[test]
    fn test_root_finder_matches_electron_count() {
        let basis = metallic_basis([3, 1, 1]);
        let ham = Hamiltonian::new(basis.clone(), &cosine_potential(&basis, -0.3)).unwrap();
        let gs = GroundState::from_dense_diagonalization(ham, 4, 1e-12).unwrap();

        let count = electron_count(&basis, &gs.occupation);
        assert!((count - 2.0).abs() < 1e-9, "electron count {}", count);

        let rho = gs.density();
        let integral = rho.sum() * basis.dvol();
        assert!((integral - 2.0).abs() < 1e-9, "density integral {}", integral);
        assert!(rho.iter().all(|&r| r >= 0.0));

        let dos = compute_dos(&basis, gs.fermi_level, &gs.eigenvalues);
        assert!(dos[0] > 0.0);
    }

    #[test]
    fn test_pinned_fermi_level_is_kept() {
        let model = Model::new([10.0, 1.0, 1.0], 2.0)
            .unwrap()
            .with_temperature(0.01, Smearing::Gaussian)
            .with_fixed_fermi_level(0.05);
        let basis = Arc::new(PlaneWaveBasis::new(model, [8, 1, 1], [1, 1, 1]).unwrap());
        let eigenvalues = vec![DVector::from_vec(vec![-0.1, 0.05, 0.3])];
        let (occupation, fermi_level) = compute_occupation(&basis, &eigenvalues, 1e-10).unwrap();
        assert_eq!(fermi_level, 0.05);
        assert!((occupation[0][1] - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_zero_temperature_filling() {
        let model = Model::new([10.0, 1.0, 1.0], 4.0).unwrap();
        let basis = Arc::new(PlaneWaveBasis::new(model, [8, 1, 1], [1, 1, 1]).unwrap());
        let eigenvalues = vec![DVector::from_vec(vec![-1.0, -0.5, 0.5])];
        let (occupation, fermi_level) = compute_occupation(&basis, &eigenvalues, 1e-10).unwrap();
        assert_eq!(fermi_level, 0.0);
        assert_eq!(occupation[0].as_slice(), &[2.0, 2.0, 0.0]);

        let model = Model::new([10.0, 1.0, 1.0], 3.0).unwrap();
        let basis = Arc::new(PlaneWaveBasis::new(model, [8, 1, 1], [1, 1, 1]).unwrap());
        assert!(matches!(
            compute_occupation(&basis, &eigenvalues, 1e-10),
            Err(BasisError::FractionalFilling { .. })
        ));

        let eigenvalues = vec![DVector::from_vec(vec![-1.0])];
        let model = Model::new([10.0, 1.0, 1.0], 4.0).unwrap();
        let basis = Arc::new(PlaneWaveBasis::new(model, [8, 1, 1], [1, 1, 1]).unwrap());
        assert!(matches!(
            compute_occupation(&basis, &eigenvalues, 1e-10),
            Err(BasisError::TooFewBands { .. })
        ));
    }

    #[test]
    fn test_constant_potential_scales_orbitals() {
        let basis = metallic_basis([1, 1, 1]);
        let psi = vec![DMatrix::from_columns(&[random_complex(basis.n_fft()), random_complex(basis.n_fft())])];
        let delta_v = DMatrix::from_element(basis.n_fft(), 1, Complex64::new(0.25, 0.0));
        let map = basis.k_to_k_minus_q([0.0; 3]).unwrap();

        let delta_h_psi = multiply_by_potential(&basis, &psi, &delta_v, &map);
        let expected = &psi[0] * Complex64::new(0.25, 0.0);
        assert!((&delta_h_psi[0] - expected).norm() < 1e-12);
    }

    #[test]
    fn test_shift_phases_for_lattice_vector() {
        let basis = metallic_basis([1, 1, 1]);
        let phases = basis.shift_phases([1, 0, 0]);
        for idx in 0..basis.n_fft() {
            let x = basis.fft.fractional_position(idx)[0];
            let expected = Complex64::from_polar(1.0, -2.0 * PI * x);
            assert!((phases[idx] - expected).norm() < 1e-14);
        }
    }

    #[test]
    fn test_density_of_orthonormal_orbitals() {
        let basis = metallic_basis([1, 1, 1]);
        let n = basis.n_fft();
        let psi = vec![DMatrix::identity(n, 2)];
        let occupation = vec![DVector::from_vec(vec![2.0, 1.0])];
        let rho = compute_density(&basis, &psi, &occupation);
        // plane waves have uniform density 1/Ω
        for &r in rho.iter() {
            assert!((r - 3.0 / basis.volume()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_tpa_preconditioner() {
        let basis = metallic_basis([1, 1, 1]);
        let ham = Hamiltonian::free(basis.clone());
        let block = ham.block(0);
        let mut tpa = PreconditionerTpa::new(block);
        assert!(tpa.mean_kinetic().is_none());

        let ones = DVector::from_element(8, Complex64::new(1.0, 0.0));
        let unprepared = tpa.ldiv(&ones);
        for (p, t) in unprepared.iter().zip(block.kinetic().iter()) {
            assert!((p.re - 1.0 / (t + 1.0)).abs() < 1e-14);
        }

        // plane wave with Miller index 1 as reference
        let mut reference = DVector::from_element(8, Complex64::new(0.0, 0.0));
        reference[1] = Complex64::new(1.0, 0.0);
        tpa.prepare(Some(&reference));
        let mean = tpa.mean_kinetic().unwrap();
        assert!((mean - block.kinetic()[1]).abs() < 1e-14);

        let prepared = tpa.ldiv(&ones);
        assert!((prepared[0].re - 1.0).abs() < 1e-14);
        assert!((prepared[1].re - 0.5).abs() < 1e-14);

        // a zero-kinetic reference leaves the preconditioner unprepared
        let mut constant = DVector::from_element(8, Complex64::new(0.0, 0.0));
        constant[0] = Complex64::new(1.0, 0.0);
        tpa.prepare(Some(&constant));
        assert!(tpa.mean_kinetic().is_none());
    }

    /// Two workers holding identical copies of the k-points.
    struct MirroredReducer;

    impl KpointReducer for MirroredReducer {
        fn sum(&self, value: f64) -> f64 {
            2.0 * value
        }

        fn max(&self, value: f64) -> f64 {
            value
        }

        fn min(&self, value: f64) -> f64 {
            value
        }

        fn sum_in_place(&self, values: &mut [f64]) {
            values.iter_mut().for_each(|v| *v *= 2.0);
        }

        fn sum_complex_in_place(&self, values: &mut [Complex64]) {
            values.iter_mut().for_each(|v| *v *= 2.0);
        }
    }

    #[test]
    fn test_reductions_go_through_the_reducer() {
        let model = Model::new([10.0, 1.0, 1.0], 2.0)
            .unwrap()
            .with_temperature(0.01, Smearing::FermiDirac);
        let basis = Arc::new(
            PlaneWaveBasis::new(model, [8, 1, 1], [1, 1, 1])
                .unwrap()
                .with_reducer(Arc::new(MirroredReducer)),
        );
        let ham = Hamiltonian::new(basis.clone(), &cosine_potential(&basis, -0.5)).unwrap();
        let gs = GroundState::from_dense_diagonalization(ham, 4, 1e-12).unwrap();

        // each copy carries one electron
        let local: f64 = gs.occupation[0].sum() * basis.kweights[0];
        assert!((local - 1.0).abs() < 1e-10);
        assert!((electron_count(&basis, &gs.occupation) - 2.0).abs() < 1e-10);

        let rho = gs.density();
        let integral: f64 = rho.sum() * basis.dvol();
        assert!((integral - 2.0).abs() < 1e-10);
    }
}
