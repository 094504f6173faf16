/*
    Aither, ionospheric phase screens for radio interferometry
    Copyright (C) 2024-onwards Aither contributors

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::SimulationError;
use crate::linalg::DMatrix;

/// Diagonal jitter added to every factorization argument. Guards against loss of positive
/// definiteness from floating-point error; a standing numerical policy, not a one-off fix.
pub const DEFAULT_JITTER: f64 = 1e-6;

/// Returns a copy of `a` with `jitter` added to the diagonal.
pub(crate) fn jittered(a: &DMatrix<f64>, jitter: f64) -> DMatrix<f64> {
    let mut out = a.clone();
    for i in 0..out.nrows().min(out.ncols()) {
        out[(i, i)] += jitter;
    }
    out
}

/// Ratio of the largest to the smallest singular value, or infinity if the decomposition does
/// not converge.
pub fn condition_number(a: &DMatrix<f64>) -> f64 {
    match a.clone().try_svd(false, false, f64::EPSILON, 0) {
        Some(svd) => svd.singular_values.max() / svd.singular_values.min(),
        None => f64::INFINITY,
    }
}

/// A square matrix `M` with `M·Mᵀ ≈ A + jitter·I`, for a symmetric positive semi-definite `A`.
///
/// The primary path is the Cholesky factorization. If that fails (the matrix is numerically
/// indefinite), the SVD square root `U·√S` is used instead and the condition number is logged.
/// If the SVD path also yields non-finite entries the covariance is judged unsimulatable and the
/// error carries the last computed condition number. There is exactly one automatic retry; no
/// further fallback exists.
pub fn matrix_square_root(a: &DMatrix<f64>, jitter: f64) -> Result<DMatrix<f64>, SimulationError> {
    let stabilized = jittered(a, jitter);
    if let Some(chol) = stabilized.clone().cholesky() {
        return Ok(chol.l());
    }

    let svd = stabilized
        .try_svd(true, false, f64::EPSILON, 0)
        .ok_or(SimulationError::NumericallyUnsimulatable {
            condition_number: f64::INFINITY,
        })?;
    let cond = svd.singular_values.max() / svd.singular_values.min();
    warn!(
        "Cholesky factorization failed, falling back to SVD square root (condition number {:e})",
        cond
    );

    let mut factor = svd.u.ok_or(SimulationError::NumericallyUnsimulatable {
        condition_number: cond,
    })?;
    for (i, mut col) in factor.column_iter_mut().enumerate() {
        col *= svd.singular_values[i].sqrt();
    }

    if factor.iter().any(|v| !v.is_finite()) {
        return Err(SimulationError::NumericallyUnsimulatable {
            condition_number: cond,
        });
    }
    Ok(factor)
}

#[test]
fn cholesky_path_roundtrip() {
    use approx::assert_abs_diff_eq;
    let a = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 2.0]);
    let m = matrix_square_root(&a, 0.0).unwrap();
    let back = &m * m.transpose();
    assert_abs_diff_eq!(back, a, epsilon = 1e-10);
}

#[test]
fn svd_fallback_on_indefinite_matrix() {
    // Off-diagonal larger than the diagonal: one negative eigenvalue, Cholesky must fail.
    let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.1, 1.1, 1.0]);
    let m = matrix_square_root(&a, DEFAULT_JITTER).unwrap();
    assert!(m.iter().all(|v| v.is_finite()));
    let cond = condition_number(&a);
    assert!(cond.is_finite());
}
