//! Dense Hermitian eigendecomposition

extern crate nalgebra as na;

use na::{DMatrix, DVector};
use num_complex::Complex64;

/// Eigenpairs of a Hermitian matrix, eigenvalues ascending.
pub fn eigh(matrix: &DMatrix<Complex64>) -> (DVector<f64>, DMatrix<Complex64>) {
    let eig = matrix.clone().symmetric_eigen();

    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

    let values = DVector::from_iterator(order.len(), order.iter().map(|&i| eig.eigenvalues[i]));
    let vectors = eig.eigenvectors.select_columns(order.iter());
    (values, vectors)
}

/// The `n_bands` lowest eigenpairs.
pub fn eigh_lowest(matrix: &DMatrix<Complex64>, n_bands: usize) -> (DVector<f64>, DMatrix<Complex64>) {
    let (values, vectors) = eigh(matrix);
    let n = n_bands.min(values.len());
    (values.rows(0, n).into_owned(), vectors.columns(0, n).into_owned())
}
