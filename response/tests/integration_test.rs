use nalgebra::{DMatrix, DVector};
use pwbasis::{Complex64, GroundState, Hamiltonian, Model, PlaneWaveBasis, Smearing};
use response::{apply_chi0, compute_chi0, BandToleranceHeuristic, Chi0Options};
use std::f64::consts::PI;
use std::sync::Arc;

const LATTICE: [f64; 3] = [10.0, 1.0, 1.0];

fn model(n_electrons: f64, temperature: f64, smearing: Smearing) -> Model {
    Model::new(LATTICE, n_electrons)
        .unwrap()
        .with_temperature(temperature, smearing)
}

/// Σ a cos(2π m x) on the grid, same in every spin channel.
fn field(basis: &PlaneWaveBasis, terms: &[(f64, i64)]) -> DMatrix<f64> {
    DMatrix::from_fn(basis.n_fft(), basis.n_spin(), |idx, _| {
        let x = basis.fft.fractional_position(idx)[0];
        terms
            .iter()
            .map(|&(a, m)| a * (2.0 * PI * m as f64 * x).cos())
            .sum::<f64>()
    })
}

fn solve(basis: Arc<PlaneWaveBasis>, potential: &DMatrix<f64>, n_bands: usize) -> GroundState {
    let ham = Hamiltonian::new(basis, potential).unwrap();
    GroundState::from_dense_diagonalization(ham, n_bands, 1e-13).unwrap()
}

fn options() -> Chi0Options {
    Chi0Options {
        tol: 1e-12,
        maxiter: 300,
        ..Chi0Options::default()
    }
}

fn complexify(x: &DMatrix<f64>) -> DMatrix<Complex64> {
    x.map(|v| Complex64::new(v, 0.0))
}

fn max_deviation(applied: &DMatrix<Complex64>, expected: &DVector<f64>) -> f64 {
    applied
        .iter()
        .zip(expected.iter())
        .map(|(a, e)| (a.re - e).abs())
        .fold(0.0, f64::max)
}

#[test]
fn test_apply_matches_explicit_metal() {
    let basis = Arc::new(
        PlaneWaveBasis::new(model(2.0, 0.03, Smearing::FermiDirac), [10, 1, 1], [3, 1, 1]).unwrap(),
    );
    let potential = field(&basis, &[(-0.8, 1), (0.3, 2)]);
    let delta_v = field(&basis, &[(0.2, 1), (-0.1, 3), (0.05, 0)]);
    let chi0 = compute_chi0(&Hamiltonian::new(basis.clone(), &potential).unwrap(), None).unwrap();
    let expected = &chi0 * DVector::from_column_slice(delta_v.as_slice());

    // all bands computed, and only a few with the rest left to the Sternheimer solver
    for n_bands in [10, 4] {
        let gs = solve(basis.clone(), &potential, n_bands);
        let delta_rho = apply_chi0(&gs, &complexify(&delta_v), [0.0; 3], options()).unwrap();
        let deviation = max_deviation(&delta_rho, &expected);
        assert!(deviation < 1e-7, "n_bands = {}: deviation {:.3e}", n_bands, deviation);
    }
}

#[test]
fn test_apply_matches_explicit_spin_polarized() {
    let model = model(2.0, 0.03, Smearing::Gaussian).with_spin(2).unwrap();
    let basis = Arc::new(PlaneWaveBasis::new(model, [8, 1, 1], [2, 1, 1]).unwrap());
    let potential = field(&basis, &[(-0.6, 1)]);
    let gs = solve(basis.clone(), &potential, 5);

    // different perturbation in each spin channel
    let delta_v = DMatrix::from_fn(8, 2, |idx, spin| {
        let x = basis.fft.fractional_position(idx)[0];
        if spin == 0 {
            0.1 * (2.0 * PI * x).cos() + 0.02
        } else {
            -0.05 * (4.0 * PI * x).cos()
        }
    });

    let chi0 = compute_chi0(&gs.ham, None).unwrap();
    let expected = &chi0 * DVector::from_column_slice(delta_v.as_slice());
    let delta_rho = apply_chi0(&gs, &complexify(&delta_v), [0.0; 3], options()).unwrap();
    let deviation = max_deviation(&delta_rho, &expected);
    assert!(deviation < 1e-7, "deviation {:.3e}", deviation);
}

#[test]
fn test_explicit_chi0_symmetric_and_charge_neutral() {
    let basis = Arc::new(
        PlaneWaveBasis::new(model(4.0, 0.02, Smearing::MarzariVanderbilt), [8, 1, 1], [2, 1, 1]).unwrap(),
    );
    let potential = field(&basis, &[(-0.5, 1)]);
    let ham = Hamiltonian::new(basis.clone(), &potential).unwrap();
    let chi0 = compute_chi0(&ham, None).unwrap();

    assert!((&chi0 - chi0.transpose()).norm() < 1e-12 * chi0.norm().max(1.0));
    for column in chi0.column_iter() {
        let charge: f64 = column.sum() * basis.dvol();
        assert!(charge.abs() < 1e-10, "column charge {:.3e}", charge);
    }
}

#[test]
fn test_explicit_temperature_override() {
    let basis = Arc::new(PlaneWaveBasis::new(model(2.0, 0.0, Smearing::FermiDirac), [8, 1, 1], [1, 1, 1]).unwrap());
    let potential = field(&basis, &[(-0.5, 1)]);
    let ham = Hamiltonian::new(basis.clone(), &potential).unwrap();

    let cold = compute_chi0(&ham, None).unwrap();
    let warm = compute_chi0(&ham, Some(0.05)).unwrap();
    assert!((&cold - &warm).norm() > 1e-6);

    let warm_basis = PlaneWaveBasis::new(model(2.0, 0.05, Smearing::FermiDirac), [8, 1, 1], [1, 1, 1]).unwrap();
    let warm_ham = Hamiltonian::new(Arc::new(warm_basis), &potential).unwrap();
    let reference = compute_chi0(&warm_ham, None).unwrap();
    assert!((&warm - &reference).norm() < 1e-12);
}

#[test]
fn test_finite_difference_density() {
    let basis = Arc::new(
        PlaneWaveBasis::new(model(2.0, 0.04, Smearing::FermiDirac), [8, 1, 1], [2, 1, 1]).unwrap(),
    );
    let potential = field(&basis, &[(-0.7, 1), (0.2, 2)]);
    let delta_v = field(&basis, &[(0.3, 1), (0.1, 3)]);
    let h = 1e-4;

    let gs = solve(basis.clone(), &potential, 6);
    let delta_rho = apply_chi0(&gs, &complexify(&delta_v), [0.0; 3], options()).unwrap();

    let rho_plus = solve(basis.clone(), &(&potential + &delta_v * h), 6).density();
    let rho_minus = solve(basis.clone(), &(&potential - &delta_v * h), 6).density();
    let finite_difference = (rho_plus - rho_minus) / (2.0 * h);

    let deviation = delta_rho
        .iter()
        .zip(finite_difference.iter())
        .map(|(a, e)| (a.re - e).abs())
        .fold(0.0, f64::max);
    assert!(deviation < 1e-6, "deviation {:.3e}", deviation);
}

#[test]
fn test_charge_conservation() {
    let basis = Arc::new(
        PlaneWaveBasis::new(model(3.0, 0.02, Smearing::Gaussian), [10, 1, 1], [4, 1, 1]).unwrap(),
    );
    let potential = field(&basis, &[(-0.4, 1)]);
    let gs = solve(basis.clone(), &potential, 6);
    let delta_v = field(&basis, &[(0.1, 0), (0.2, 1), (-0.3, 2)]);

    for heuristic in [BandToleranceHeuristic::Uniform, BandToleranceHeuristic::Guaranteed, BandToleranceHeuristic::Balanced] {
        let opts = Chi0Options {
            band_tolerance: heuristic,
            ..options()
        };
        let delta_rho = apply_chi0(&gs, &complexify(&delta_v), [0.0; 3], opts).unwrap();
        let charge: f64 = delta_rho.iter().map(|v| v.re).sum::<f64>() * basis.dvol();
        assert!(charge.abs() < 1e-9, "{:?}: charge {:.3e}", heuristic, charge);
        assert!(delta_rho.iter().all(|v| v.im == 0.0));
    }
}

#[test]
fn test_pinned_fermi_level_changes_charge() {
    let delta_v_terms = [(0.1, 0), (0.1, 1)];
    let free = Arc::new(
        PlaneWaveBasis::new(model(2.0, 0.03, Smearing::FermiDirac), [8, 1, 1], [2, 1, 1]).unwrap(),
    );
    let potential = field(&free, &[(-0.5, 1)]);
    let gs = solve(free.clone(), &potential, 6);
    let delta_v = complexify(&field(&free, &delta_v_terms));

    let pinned_model = model(2.0, 0.03, Smearing::FermiDirac).with_fixed_fermi_level(gs.fermi_level);
    let pinned = Arc::new(PlaneWaveBasis::new(pinned_model, [8, 1, 1], [2, 1, 1]).unwrap());
    let gs_pinned = solve(pinned.clone(), &potential, 6);

    let charge = |rho: &DMatrix<Complex64>| rho.iter().map(|v| v.re).sum::<f64>() * free.dvol();
    let delta_rho = apply_chi0(&gs, &delta_v, [0.0; 3], options()).unwrap();
    let delta_rho_pinned = apply_chi0(&gs_pinned, &delta_v, [0.0; 3], options()).unwrap();

    assert!(charge(&delta_rho).abs() < 1e-9);
    // a constant shift of the potential drains electrons at fixed εF
    assert!(charge(&delta_rho_pinned) < -1e-6);

    let chi0 = compute_chi0(&gs_pinned.ham, None).unwrap();
    let expected = &chi0 * DVector::from_iterator(8, delta_v.iter().map(|v| v.re));
    assert!(max_deviation(&delta_rho_pinned, &expected) < 1e-7);
}

/// For q a reciprocal lattice vector, the periodic response at q equals
/// e^{-iq·r} (χ0[cos(q·r) v] + i χ0[sin(q·r) v]).
#[test]
fn test_lattice_vector_shift() {
    let basis = Arc::new(PlaneWaveBasis::new(model(2.0, 0.0, Smearing::None), [8, 1, 1], [1, 1, 1]).unwrap());
    let potential = field(&basis, &[(-1.5, 1), (0.4, 2)]);
    let gs = solve(basis.clone(), &potential, 5);

    let x = |idx: usize| basis.fft.fractional_position(idx)[0];
    let v = field(&basis, &[(0.2, 1), (0.05, 0)]);
    let v_cos = DMatrix::from_fn(8, 1, |idx, _| v[(idx, 0)] * (2.0 * PI * x(idx)).cos());
    let v_sin = DMatrix::from_fn(8, 1, |idx, _| v[(idx, 0)] * (2.0 * PI * x(idx)).sin());

    let rho_q = apply_chi0(&gs, &complexify(&v), [1.0, 0.0, 0.0], options()).unwrap();
    let rho_cos = apply_chi0(&gs, &complexify(&v_cos), [0.0; 3], options()).unwrap();
    let rho_sin = apply_chi0(&gs, &complexify(&v_sin), [0.0; 3], options()).unwrap();

    for idx in 0..8 {
        let phase = Complex64::from_polar(1.0, -2.0 * PI * x(idx));
        let expected = phase * Complex64::new(rho_cos[(idx, 0)].re, rho_sin[(idx, 0)].re);
        let deviation = (rho_q[(idx, 0)] - expected).norm();
        assert!(deviation < 1e-8, "grid point {}: deviation {:.3e}", idx, deviation);
    }
}

#[test]
fn test_finite_q_insulator_is_hermitian_in_pairs() {
    // response at q and -q to conjugate perturbations are conjugate
    // the unpaired Nyquist component of an even grid breaks ±k symmetry, negligible at 32 points
    let basis = Arc::new(PlaneWaveBasis::new(model(2.0, 0.0, Smearing::None), [32, 1, 1], [4, 1, 1]).unwrap());
    let potential = field(&basis, &[(-1.5, 1)]);
    let gs = solve(basis.clone(), &potential, 4);

    let delta_v = complexify(&field(&basis, &[(0.3, 1), (0.1, 2)]));
    let plus = apply_chi0(&gs, &delta_v, [0.25, 0.0, 0.0], options()).unwrap();
    let minus = apply_chi0(&gs, &delta_v, [-0.25, 0.0, 0.0], options()).unwrap();

    assert!(plus.norm() > 1e-6);
    let deviation = (&plus - minus.map(|v| v.conj())).norm();
    assert!(deviation < 1e-8, "deviation {:.3e}", deviation);
}
