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

use crate::linalg::{DMatrix, Vector3};

/// Guards the secant reciprocal and the square root at zero separation.
pub(crate) const SEP_EPSILON: f64 = 1e-6;

/// Separation of two slant rays crossing a thin ionospheric layer, via the planar cosine law on
/// the secants of the zenith angles. The third component of each direction is the cosine of the
/// zenith angle. `scale` is the pre-scaled `height/HPD` ratio times the shape's scale factor.
pub fn thin_layer_separation(
    k1: &[Vector3<f64>],
    k2: &[Vector3<f64>],
    scale: f64,
) -> DMatrix<f64> {
    let mut sep = DMatrix::zeros(k1.len(), k2.len());
    for (i, a) in k1.iter().enumerate() {
        let secphi1 = (a.z + SEP_EPSILON).recip();
        for (j, b) in k2.iter().enumerate() {
            let secphi2 = (b.z + SEP_EPSILON).recip();
            let costheta = a.dot(b);
            sep[(i, j)] = scale
                * (secphi1 * secphi1 + secphi2 * secphi2 - 2.0 * secphi1 * secphi2 * costheta
                    + SEP_EPSILON)
                    .sqrt();
        }
    }
    sep
}

/// Great-circle angle between two batches of (possibly non-unit) 3-vectors.
///
/// The `atan2(‖a×b‖, a·b)` form is exact over the whole of [0, π], unlike the acos of the
/// normalized dot product which loses precision at both ends.
pub fn great_circle_separation(a: &[Vector3<f64>], b: &[Vector3<f64>]) -> DMatrix<f64> {
    let mut sep = DMatrix::zeros(a.len(), b.len());
    for (i, u) in a.iter().enumerate() {
        for (j, v) in b.iter().enumerate() {
            sep[(i, j)] = u.cross(v).norm().atan2(u.dot(v));
        }
    }
    sep
}

#[test]
fn great_circle_endpoints() {
    use approx::assert_abs_diff_eq;
    let a = [Vector3::new(0.0, 0.0, 1.0)];
    let b = [
        Vector3::new(0.0, 0.0, 1.0),
        Vector3::new(0.0, 0.0, -1.0),
        Vector3::new(0.0, 1.0, 0.0),
    ];
    let sep = great_circle_separation(&a, &b);
    assert_abs_diff_eq!(sep[(0, 0)], 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(sep[(0, 1)], std::f64::consts::PI, epsilon = 1e-15);
    assert_abs_diff_eq!(sep[(0, 2)], std::f64::consts::FRAC_PI_2, epsilon = 1e-15);
}

#[test]
fn thin_layer_zero_at_coincidence() {
    // The epsilon guard keeps the value finite and tiny, not exactly zero.
    let k = [Vector3::new(0.05, 0.0, (1.0f64 - 0.05 * 0.05).sqrt())];
    let sep = thin_layer_separation(&k, &k, 1.7);
    assert!(sep[(0, 0)] < 1e-2);
    assert!(sep[(0, 0)] >= 0.0);
}
