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

use super::stationary::CovarianceShape;
use super::{KernelError, ObsType};
use crate::coords::GeodesicTuple;
use crate::linalg::{DMatrix, DVector, Vector3};
use rayon::prelude::*;

/// Physical description of the turbulent, wind-advected ionospheric slab.
///
/// Free-electron density (FED) is modeled as a stationary Gaussian random field with the given
/// auto-correlation shape, length-scale, mean and standard deviation, frozen into a bulk wind
/// (Taylor's hypothesis): the field at time t is the field at time 0 displaced by `wind·t`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IonosphereModel {
    /// Slab base height in km
    pub bottom_km: f64,
    /// Slab thickness in km
    pub width_km: f64,
    /// FED auto-correlation shape
    pub shape: CovarianceShape,
    /// FED auto-correlation length-scale in km
    pub lengthscale_km: f64,
    /// FED standard deviation in mTECU/km
    pub fed_sigma: f64,
    /// FED mean in mTECU/km
    pub fed_mu: f64,
    /// Bulk wind velocity in km/s
    pub wind_velocity_km_s: Vector3<f64>,
}

impl IonosphereModel {
    /// The FED auto-correlation at a separation of `r` km.
    fn acf(&self, r: f64) -> f64 {
        self.shape
            .evaluate(self.fed_sigma * self.fed_sigma, r / self.lengthscale_km)
    }
}

/// A signed ray segment through the slab, pre-sampled at the quadrature nodes.
struct Ray {
    sign: f64,
    /// Arc length through the slab in km
    length_km: f64,
    /// Midpoint-rule sample positions, one per quadrature node
    nodes: Vec<Vector3<f64>>,
}

impl Ray {
    /// `origin` is the wind-advected antenna position. The segment is clipped to the slab:
    /// entry at `(bottom - z)/k_z` along the unit direction, exit `width/k_z` further.
    fn through_slab(
        origin: Vector3<f64>,
        direction: &Vector3<f64>,
        sign: f64,
        bottom_km: f64,
        width_km: f64,
        s_marg: usize,
    ) -> Self {
        let s_entry = (bottom_km - origin.z) / direction.z;
        let length_km = width_km / direction.z;
        let nodes = (0..s_marg)
            .map(|p| {
                let u = (p as f64 + 0.5) / s_marg as f64;
                origin + direction * (s_entry + u * length_km)
            })
            .collect();
        Self {
            sign,
            length_km,
            nodes,
        }
    }
}

/// The ray-integral tomographic kernel: covariance between two slant (D)(D)TEC observations,
/// derived from first principles by integrating the FED auto-correlation along both wind-advected
/// ray paths through the slab.
///
/// The double integral over each ray pair is approximated on an `s_marg × s_marg` midpoint grid,
/// the dominant cost at O(s_marg²) auto-correlation evaluations per pair of rays. Differencing
/// (per [ObsType]) expands each observation into up to four signed rays, and the covariance of
/// the differences is the signed sum over ray pairs.
#[derive(Clone, Debug)]
pub struct TomographicKernel {
    pub model: IonosphereModel,
    pub obs_type: ObsType,
    /// Reference direction for double differencing
    pub ref_direction: Vector3<f64>,
    s_marg: usize,
}

impl TomographicKernel {
    /// Builds the kernel, rejecting a zero quadrature resolution.
    pub fn new(
        model: IonosphereModel,
        obs_type: ObsType,
        s_marg: usize,
    ) -> Result<Self, KernelError> {
        if s_marg < 1 {
            return Err(KernelError::QuadratureResolution);
        }
        Ok(Self {
            model,
            obs_type,
            ref_direction: Vector3::new(0.0, 0.0, 1.0),
            s_marg,
        })
    }

    pub fn with_ref_direction(mut self, ref_direction: Vector3<f64>) -> Self {
        self.ref_direction = ref_direction;
        self
    }

    pub fn quadrature_resolution(&self) -> usize {
        self.s_marg
    }

    /// The signed rays of one observation row. Both the actual and the reference antenna are
    /// advected against the wind by the row's time offset, so only the elapsed time between two
    /// observations enters the covariance.
    fn rays(&self, coords: &GeodesicTuple, row: usize) -> Vec<Ray> {
        let m = &self.model;
        let shift = m.wind_velocity_km_s * coords.t[row];
        let x = coords.x[row] - shift;
        let x_ref = coords.ref_x[row] - shift;
        let k = &coords.k[row];

        let mut rays = Vec::with_capacity(4);
        let mut push = |origin: Vector3<f64>, direction: &Vector3<f64>, sign: f64| {
            rays.push(Ray::through_slab(
                origin,
                direction,
                sign,
                m.bottom_km,
                m.width_km,
                self.s_marg,
            ));
        };
        push(x, k, 1.0);
        if matches!(self.obs_type, ObsType::Dtec | ObsType::Ddtec) {
            push(x_ref, k, -1.0);
        }
        if self.obs_type == ObsType::Ddtec {
            push(x, &self.ref_direction, -1.0);
            push(x_ref, &self.ref_direction, 1.0);
        }
        rays
    }

    /// `Δᵢ·Δⱼ·⟨ACF⟩` over the midpoint product grid of one ray pair.
    fn ray_pair_integral(&self, a: &Ray, b: &Ray) -> f64 {
        let mut acc = 0.0;
        for pa in &a.nodes {
            for pb in &b.nodes {
                acc += self.model.acf((pa - pb).norm());
            }
        }
        a.length_km * b.length_km * acc / (self.s_marg * self.s_marg) as f64
    }

    fn pair_covariance(&self, rays_i: &[Ray], rays_j: &[Ray]) -> f64 {
        let mut total = 0.0;
        for a in rays_i {
            for b in rays_j {
                total += a.sign * b.sign * self.ray_pair_integral(a, b);
            }
        }
        total
    }

    /// Covariance matrix between two coordinate sets, shape `coords1.len() × coords2.len()`.
    ///
    /// Symmetric positive semi-definite when both sets coincide. Rows are computed in parallel;
    /// the result is identical regardless of worker count.
    pub fn evaluate_covariance(
        &self,
        coords1: &GeodesicTuple,
        coords2: &GeodesicTuple,
    ) -> DMatrix<f64> {
        let rays1: Vec<Vec<Ray>> = (0..coords1.len()).map(|i| self.rays(coords1, i)).collect();
        let rays2: Vec<Vec<Ray>> = (0..coords2.len()).map(|j| self.rays(coords2, j)).collect();

        let rows: Vec<Vec<f64>> = rays1
            .par_iter()
            .map(|ri| rays2.iter().map(|rj| self.pair_covariance(ri, rj)).collect())
            .collect();

        let mut cov = DMatrix::zeros(coords1.len(), coords2.len());
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                cov[(i, j)] = v;
            }
        }
        cov
    }

    /// Deterministic mean of each observation: the constant FED mean integrated along each
    /// signed ray is just `fed_mu` times the slab path length, no quadrature needed. Differenced
    /// observations of a constant field cancel exactly.
    pub fn evaluate_mean(&self, coords: &GeodesicTuple) -> DVector<f64> {
        DVector::from_iterator(
            coords.len(),
            (0..coords.len()).map(|i| {
                self.rays(coords, i)
                    .iter()
                    .map(|r| r.sign * self.model.fed_mu * r.length_km)
                    .sum::<f64>()
            }),
        )
    }
}
