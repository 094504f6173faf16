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

use crate::linalg::{DMatrix, DVector, Vector3};
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::Snafu;

/// Geometric separation functions shared by the stationary family.
pub mod separation;

/// The stationary covariance family: one shape enum, three coordinate flavors.
pub mod stationary;

/// Differencing wrappers turning a point kernel into TEC/DTEC/DDTEC observation kernels.
pub mod directional;

/// The ray-integral tomographic kernel and its deterministic mean.
pub mod tomographic;

pub use directional::{DirectionalKernel, FullDirectionalKernel};
pub use stationary::{CovarianceShape, GreatCircleKernel, IsotropicKernel, ThinLayerKernel};
pub use tomographic::{IonosphereModel, TomographicKernel};

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum KernelError {
    #[snafu(display(
        "coordinate arrays must share a leading length: {name} has {len}, expected {expected}"
    ))]
    LengthMismatch {
        name: &'static str,
        len: usize,
        expected: usize,
    },
    #[snafu(display("quadrature resolution must be at least 1"))]
    QuadratureResolution,
    #[snafu(display("direction {index} is too close to the horizon (k_z = {kz:e})"))]
    DegenerateDirection { index: usize, kz: f64 },
}

/// The observation type an assembled kernel models.
///
/// Differencing against a reference antenna and/or reference direction cancels clock and
/// absolute-calibration errors; the kernels reproduce the covariance structure that the
/// differencing induces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObsType {
    /// Raw slant total electron content
    Tec,
    /// TEC differenced against a reference antenna
    Dtec,
    /// TEC differenced against a reference antenna and a reference direction
    Ddtec,
}

/// A Gaussian-process covariance over batches of 3-vectors.
///
/// `covariance` must be symmetric positive semi-definite when both batches coincide;
/// `covariance_sym` is the symmetric entry point implementations may specialize when the
/// differencing expansion allows reusing terms.
pub trait SkyKernel {
    /// Covariance matrix between two batches, shape `x1.len() × x2.len()`.
    fn covariance(&self, x1: &[Vector3<f64>], x2: &[Vector3<f64>]) -> DMatrix<f64>;

    /// Covariance of a batch against itself.
    fn covariance_sym(&self, x: &[Vector3<f64>]) -> DMatrix<f64> {
        self.covariance(x, x)
    }

    /// The diagonal of `covariance_sym` without building the full matrix.
    fn diagonal(&self, x: &[Vector3<f64>]) -> DVector<f64>;
}
