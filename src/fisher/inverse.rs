//! Fisher-matrix inversion.
//!
//! The matrix is normalized by its diagonal before factorization: parameters
//! such as distance (Mpc) and angles (rad) differ by many orders of magnitude,
//! and the normalized matrix has unit diagonal.

use nalgebra::DMatrix;

/// Largest condition number of the normalized matrix that is still inverted.
const MAX_CONDITION: f64 = 1e15;

/// A Fisher matrix that cannot be inverted into a covariance.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("singular Fisher matrix: {0}")]
pub struct SingularFisherMatrix(pub String);

/// Invert `fm` into a covariance matrix.
pub fn invert_fisher(fm: &DMatrix<f64>) -> Result<DMatrix<f64>, SingularFisherMatrix> {
    let n = fm.nrows();
    if n == 0 || fm.ncols() != n {
        return Err(SingularFisherMatrix(format!("shape {}x{}", n, fm.ncols())));
    }
    if fm.iter().any(|v| !v.is_finite()) {
        return Err(SingularFisherMatrix("non-finite entries".to_string()));
    }

    let mut scale = Vec::with_capacity(n);
    for i in 0..n {
        let d = fm[(i, i)];
        if d <= 0.0 {
            return Err(SingularFisherMatrix(format!("no information on parameter {i}")));
        }
        scale.push(1.0 / d.sqrt());
    }

    let normalized = DMatrix::from_fn(n, n, |i, j| {
        0.5 * (fm[(i, j)] + fm[(j, i)]) * scale[i] * scale[j]
    });

    let eigen = normalized.clone().symmetric_eigen();
    let max = eigen.eigenvalues.max();
    let min = eigen.eigenvalues.min();
    if !(min > 0.0 && max / min < MAX_CONDITION) {
        return Err(SingularFisherMatrix(format!(
            "ill-conditioned (eigenvalues {min:.3e}..{max:.3e})"
        )));
    }

    let chol = normalized
        .cholesky()
        .ok_or_else(|| SingularFisherMatrix("not positive definite".to_string()))?;
    let inv = chol.inverse();

    let cov = DMatrix::from_fn(n, n, |i, j| inv[(i, j)] * scale[i] * scale[j]);
    if (0..n).any(|i| !(cov[(i, i)].is_finite() && cov[(i, i)] > 0.0)) {
        return Err(SingularFisherMatrix("non-positive variance".to_string()));
    }
    Ok(cov)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_matrix_inverts_elementwise() {
        let fm = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![4.0, 1e-6, 1e8]));
        let cov = invert_fisher(&fm).unwrap();
        assert!((cov[(0, 0)] - 0.25).abs() < 1e-15);
        assert!((cov[(1, 1)] / 1e6 - 1.0).abs() < 1e-12);
        assert!((cov[(2, 2)] / 1e-8 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlated_matrix_round_trips() {
        let fm = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let cov = invert_fisher(&fm).unwrap();
        let id = &fm * &cov;
        assert!((id - DMatrix::identity(2, 2)).norm() < 1e-12);
    }

    #[test]
    fn zero_matrix_is_singular() {
        assert!(invert_fisher(&DMatrix::zeros(3, 3)).is_err());
    }

    #[test]
    fn degenerate_parameters_are_singular() {
        // Two parameters carrying identical information.
        let fm = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(invert_fisher(&fm).is_err());
        let nan = DMatrix::from_row_slice(1, 1, &[f64::NAN]);
        assert!(invert_fisher(&nan).is_err());
    }
}
