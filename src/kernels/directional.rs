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

use super::{KernelError, ObsType, SkyKernel};
use crate::coords::pierce_point;
use crate::linalg::{DMatrix, DVector, Matrix3, Vector3};

/// Wraps a direction kernel into an observation-type kernel.
///
/// For `Ddtec` the covariance of `(k1 - k_ref)` against `(k2 - k_ref)` expands into four inner
/// evaluations; the symmetric entry point reuses the single `K(k, k_ref)` column and its
/// transpose instead of recomputing it, which saves an O(N²) inner call on every build.
///
/// `Dtec` evaluates identically to `Tec` here: single differencing against the reference antenna
/// is a position effect and is handled by the tomographic kernel, not by this direction-only
/// wrapper.
#[derive(Clone, Debug)]
pub struct DirectionalKernel<K: SkyKernel> {
    pub inner: K,
    pub obs_type: ObsType,
    /// Reference direction for double differencing
    pub ref_direction: Vector3<f64>,
    /// Optional lower-triangular linear map applied to directions before the inner kernel
    pub anisotropy: Option<Matrix3<f64>>,
    /// Optional amplitude, applied squared so the result stays non-negative
    pub amplitude: Option<f64>,
}

impl<K: SkyKernel> DirectionalKernel<K> {
    pub fn new(inner: K, obs_type: ObsType) -> Self {
        Self {
            inner,
            obs_type,
            ref_direction: Vector3::new(0.0, 0.0, 1.0),
            anisotropy: None,
            amplitude: None,
        }
    }

    pub fn with_ref_direction(mut self, ref_direction: Vector3<f64>) -> Self {
        self.ref_direction = ref_direction;
        self
    }

    pub fn with_anisotropy(mut self, m: Matrix3<f64>) -> Self {
        self.anisotropy = Some(m);
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = Some(amplitude);
        self
    }

    fn mapped(&self, k: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        match &self.anisotropy {
            Some(m) => k.iter().map(|v| m * v).collect(),
            None => k.to_vec(),
        }
    }

    fn eval(&self, k1: &[Vector3<f64>], k2: &[Vector3<f64>], sym: bool) -> DMatrix<f64> {
        let k1 = self.mapped(k1);
        let k2 = if sym { k1.clone() } else { self.mapped(k2) };

        let mut res = match self.obs_type {
            ObsType::Tec | ObsType::Dtec => self.inner.covariance(&k1, &k2),
            ObsType::Ddtec => {
                let kref = [self.ref_direction];
                let k00 = self.inner.covariance(&kref, &kref)[(0, 0)];
                let mut res = self.inner.covariance(&k1, &k2);
                let col1 = self.inner.covariance(&k1, &kref);
                if sym {
                    for i in 0..res.nrows() {
                        for j in 0..res.ncols() {
                            res[(i, j)] += k00 - col1[(i, 0)] - col1[(j, 0)];
                        }
                    }
                } else {
                    let row2 = self.inner.covariance(&kref, &k2);
                    for i in 0..res.nrows() {
                        for j in 0..res.ncols() {
                            res[(i, j)] += k00 - col1[(i, 0)] - row2[(0, j)];
                        }
                    }
                }
                res
            }
        };

        if let Some(amplitude) = self.amplitude {
            res *= amplitude * amplitude;
        }
        res
    }
}

impl<K: SkyKernel> SkyKernel for DirectionalKernel<K> {
    fn covariance(&self, x1: &[Vector3<f64>], x2: &[Vector3<f64>]) -> DMatrix<f64> {
        self.eval(x1, x2, false)
    }

    fn covariance_sym(&self, x: &[Vector3<f64>]) -> DMatrix<f64> {
        self.eval(x, x, true)
    }

    fn diagonal(&self, x: &[Vector3<f64>]) -> DVector<f64> {
        self.covariance_sym(x).diagonal()
    }
}

/// The full thin-layer differencing kernel over (direction, position) rows.
///
/// Every `{actual, reference}` substitution allowed by the observation type is enumerated for
/// both sides (positions only for `Dtec`, positions and directions for `Ddtec`), each term signed
/// by the parity of its reference substitutions: the inclusion-exclusion expansion of a double
/// difference. Each (position, direction) pair is first ray-traced to its pierce point at the
/// layer height, modeling that the covarying quantity lives at a fixed altitude rather than at
/// the antenna.
#[derive(Clone, Debug)]
pub struct FullDirectionalKernel<K: SkyKernel> {
    pub inner: K,
    pub obs_type: ObsType,
    pub ref_direction: Vector3<f64>,
    pub ref_location: Vector3<f64>,
    /// Layer height in km
    pub layer_height_km: f64,
    pub amplitude: Option<f64>,
}

impl<K: SkyKernel> FullDirectionalKernel<K> {
    pub fn new(inner: K, obs_type: ObsType, layer_height_km: f64) -> Self {
        Self {
            inner,
            obs_type,
            ref_direction: Vector3::new(0.0, 0.0, 1.0),
            ref_location: Vector3::zeros(),
            layer_height_km,
            amplitude: None,
        }
    }

    pub fn with_ref_direction(mut self, ref_direction: Vector3<f64>) -> Self {
        self.ref_direction = ref_direction;
        self
    }

    pub fn with_ref_location(mut self, ref_location: Vector3<f64>) -> Self {
        self.ref_location = ref_location;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = Some(amplitude);
        self
    }

    /// The `{actual, reference}` substitution choices for one side: (substitute position,
    /// substitute direction).
    fn substitutions(&self) -> Vec<(bool, bool)> {
        match self.obs_type {
            ObsType::Tec => vec![(false, false)],
            ObsType::Dtec => vec![(false, false), (true, false)],
            ObsType::Ddtec => vec![
                (false, false),
                (true, false),
                (false, true),
                (true, true),
            ],
        }
    }

    /// Pierce points of one side for a given substitution choice.
    fn pierce_points(
        &self,
        k: &[Vector3<f64>],
        x: &[Vector3<f64>],
        sub_x: bool,
        sub_k: bool,
    ) -> Vec<Vector3<f64>> {
        let a = self.layer_height_km;
        let x0 = &self.ref_location;
        (0..k.len())
            .map(|i| {
                let xi = if sub_x { x0 } else { &x[i] };
                let ki = if sub_k { &self.ref_direction } else { &k[i] };
                pierce_point(xi, ki, x0, a)
            })
            .collect()
    }

    /// Covariance between batches of (direction, position) observation rows.
    pub fn covariance(
        &self,
        k1: &[Vector3<f64>],
        x1: &[Vector3<f64>],
        k2: &[Vector3<f64>],
        x2: &[Vector3<f64>],
    ) -> Result<DMatrix<f64>, KernelError> {
        if x1.len() != k1.len() {
            return Err(KernelError::LengthMismatch {
                name: "x1",
                len: x1.len(),
                expected: k1.len(),
            });
        }
        if x2.len() != k2.len() {
            return Err(KernelError::LengthMismatch {
                name: "x2",
                len: x2.len(),
                expected: k2.len(),
            });
        }

        let subs = self.substitutions();
        let mut total = DMatrix::zeros(k1.len(), k2.len());
        for &(sxi, ski) in &subs {
            let ri = self.pierce_points(k1, x1, sxi, ski);
            let sign_i = if (sxi as u8 + ski as u8) % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            for &(sxj, skj) in &subs {
                let rj = self.pierce_points(k2, x2, sxj, skj);
                let sign_j = if (sxj as u8 + skj as u8) % 2 == 0 {
                    1.0
                } else {
                    -1.0
                };
                total += self.inner.covariance(&ri, &rj) * (sign_i * sign_j);
            }
        }

        if let Some(amplitude) = self.amplitude {
            total *= amplitude * amplitude;
        }
        Ok(total)
    }

    /// Diagonal of the symmetric covariance.
    pub fn diagonal(
        &self,
        k: &[Vector3<f64>],
        x: &[Vector3<f64>],
    ) -> Result<DVector<f64>, KernelError> {
        Ok(self.covariance(k, x, k, x)?.diagonal())
    }
}
