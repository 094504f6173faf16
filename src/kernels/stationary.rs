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

use super::separation::{great_circle_separation, thin_layer_separation};
use super::SkyKernel;
use crate::linalg::{DMatrix, DVector, Vector3};
use serde_derive::{Deserialize, Serialize};

/// An isotropic stationary covariance shape, evaluated in log space so small covariances do not
/// underflow. All shapes satisfy `f(0) = 1` and decay monotonically.
///
/// Each shape carries the normalization converting a half-power distance (HPD) into its canonical
/// length-scale ℓ, such that `f(HPD/ℓ) = 1/2`. Parameterizing by HPD lets every shape be swapped
/// for another without retuning length hyperparameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CovarianceShape {
    /// `exp(-d²/2)`, infinitely differentiable sample paths
    SquaredExponential,
    /// `exp(-d)`, the exponential/Ornstein-Uhlenbeck shape, nowhere differentiable paths
    Matern12,
    /// `(1+√3d)·exp(-√3d)`, once differentiable paths
    Matern32,
    /// `(1+√5d+5d²/3)·exp(-√5d)`, twice differentiable paths
    Matern52,
    /// `(1+d²/2α)^(-α)`; α weighs small-scale against large-scale fluctuations, and the shape
    /// tends to the squared exponential as α → ∞
    RationalQuadratic { alpha: f64 },
}

impl CovarianceShape {
    /// `ℓ/HPD` for this shape: multiply an HPD to recover the canonical length-scale ℓ. The
    /// Matérn-3/2 and 5/2 values are numerical solutions of `f(x) = 1/2`.
    pub fn scale_factor(&self) -> f64 {
        match self {
            Self::SquaredExponential => (2.0 * 2.0_f64.ln()).sqrt().recip(),
            Self::Matern12 => 2.0_f64.ln().recip(),
            Self::Matern32 => 1.032,
            Self::Matern52 => 0.95958,
            Self::RationalQuadratic { alpha } => (std::f64::consts::SQRT_2
                * (2.0_f64.powf(alpha.recip()) - 1.0).sqrt()
                * alpha.sqrt())
            .recip(),
        }
    }

    /// `ln f(d)` for a length-scale-normalized separation `d ≥ 0`.
    pub fn log_profile(&self, d: f64) -> f64 {
        match self {
            Self::SquaredExponential => -0.5 * d * d,
            Self::Matern12 => -d,
            Self::Matern32 => {
                let r = 3.0_f64.sqrt() * d;
                (1.0 + r).ln() - r
            }
            Self::Matern52 => {
                let r = 5.0_f64.sqrt() * d;
                (1.0 + r + r * r / 3.0).ln() - r
            }
            Self::RationalQuadratic { alpha } => -alpha * (1.0 + d * d / (2.0 * alpha)).ln(),
        }
    }

    /// `σ²·f(d)`, computed as `exp(ln σ² + ln f(d))`.
    pub fn evaluate(&self, variance: f64, d: f64) -> f64 {
        (variance.ln() + self.log_profile(d)).exp()
    }
}

/// Covariance between ray directions crossing a thin ionospheric layer, parameterized by the
/// ratio of layer height to half-power distance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThinLayerKernel {
    pub shape: CovarianceShape,
    pub variance: f64,
    pub height_hpd_ratio: f64,
}

impl ThinLayerKernel {
    pub fn new(shape: CovarianceShape, variance: f64, hpd: f64, height: f64) -> Self {
        Self {
            shape,
            variance,
            height_hpd_ratio: height / hpd,
        }
    }
}

impl SkyKernel for ThinLayerKernel {
    fn covariance(&self, x1: &[Vector3<f64>], x2: &[Vector3<f64>]) -> DMatrix<f64> {
        // ℓ = HPD·scale_factor, so height/ℓ = (height/HPD)/scale_factor.
        let scale = self.height_hpd_ratio / self.shape.scale_factor();
        thin_layer_separation(x1, x2, scale).map(|d| self.shape.evaluate(self.variance, d))
    }

    fn diagonal(&self, x: &[Vector3<f64>]) -> DVector<f64> {
        DVector::from_element(x.len(), self.variance)
    }
}

/// Covariance between points on the unit sphere, over the exact great-circle angle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GreatCircleKernel {
    pub shape: CovarianceShape,
    pub variance: f64,
    pub hpd: f64,
}

impl GreatCircleKernel {
    pub fn new(shape: CovarianceShape, variance: f64, hpd: f64) -> Self {
        Self {
            shape,
            variance,
            hpd,
        }
    }

    /// The canonical length-scale recovered from the half-power distance.
    pub fn lengthscale(&self) -> f64 {
        self.hpd * self.shape.scale_factor()
    }
}

impl SkyKernel for GreatCircleKernel {
    fn covariance(&self, x1: &[Vector3<f64>], x2: &[Vector3<f64>]) -> DMatrix<f64> {
        let ell = self.lengthscale();
        great_circle_separation(x1, x2).map(|theta| self.shape.evaluate(self.variance, theta / ell))
    }

    fn diagonal(&self, x: &[Vector3<f64>]) -> DVector<f64> {
        DVector::from_element(x.len(), self.variance)
    }
}

/// Covariance over ordinary Euclidean 3-D distance, scaled by a plain length-scale in km. This is
/// the free-electron-density auto-correlation that the tomographic kernel integrates along rays.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IsotropicKernel {
    pub shape: CovarianceShape,
    pub variance: f64,
    pub lengthscale_km: f64,
}

impl IsotropicKernel {
    pub fn new(shape: CovarianceShape, variance: f64, lengthscale_km: f64) -> Self {
        Self {
            shape,
            variance,
            lengthscale_km,
        }
    }

    /// Auto-correlation at a separation of `r` km.
    pub fn acf(&self, r: f64) -> f64 {
        self.shape.evaluate(self.variance, r / self.lengthscale_km)
    }
}

impl SkyKernel for IsotropicKernel {
    fn covariance(&self, x1: &[Vector3<f64>], x2: &[Vector3<f64>]) -> DMatrix<f64> {
        let mut res = DMatrix::zeros(x1.len(), x2.len());
        for (i, a) in x1.iter().enumerate() {
            for (j, b) in x2.iter().enumerate() {
                res[(i, j)] = self.acf((a - b).norm());
            }
        }
        res
    }

    fn diagonal(&self, x: &[Vector3<f64>]) -> DVector<f64> {
        DVector::from_element(x.len(), self.variance)
    }
}

#[test]
fn half_power_at_hpd() {
    use approx::assert_relative_eq;
    // f(HPD/ℓ) = 1/2 by construction of the scale factors; analytic for three of the shapes,
    // numerical for the two Matérns.
    for (shape, tol) in [
        (CovarianceShape::SquaredExponential, 1e-12),
        (CovarianceShape::Matern12, 1e-12),
        (CovarianceShape::Matern32, 1e-3),
        (CovarianceShape::Matern52, 1e-3),
        (CovarianceShape::RationalQuadratic { alpha: 10.0 }, 1e-12),
    ] {
        let d = shape.scale_factor().recip();
        assert_relative_eq!(shape.log_profile(d).exp(), 0.5, epsilon = tol);
    }
}

#[test]
fn log_space_matches_direct_evaluation() {
    use approx::assert_relative_eq;
    let shape = CovarianceShape::Matern52;
    let d = 2.3;
    let r = 5.0_f64.sqrt() * d;
    let direct = 4.0 * (1.0 + r + r * r / 3.0) * (-r).exp();
    assert_relative_eq!(shape.evaluate(4.0, d), direct, epsilon = 1e-12);
}
