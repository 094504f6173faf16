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

/*! # aither

[Aither](https://en.wikipedia.org/wiki/Aether_(mythology)): the upper sky. Models directional
ionospheric delay (differential total electron content, DTEC) over radio-telescope arrays with
physically derived Gaussian-process covariance kernels, and simulates temporally consistent DTEC
time series by sequentially conditioned Gaussian draws.

The covariance between two slant TEC observations is computed by integrating an isotropic
free-electron-density covariance along both wind-advected ray paths through an ionospheric slab
(the tomographic kernel). Thin-layer and great-circle approximations of the same family are
provided for cheaper, direction-only modeling.
*/

/// Observation geometry: antenna positions, sky directions, and the geodesic bookkeeping
/// consumed by the kernels.
pub mod coords;

/// Gaussian-process covariance kernels: stationary shapes, directional differencing wrappers,
/// and the ray-integral tomographic kernel.
pub mod kernels;

/// Sequentially conditioned Gaussian simulation of DTEC screens.
pub mod sim;

/// Simulation run assembly and YAML configuration.
pub mod screen;

#[macro_use]
extern crate log;
extern crate nalgebra as na;

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub use self::coords::GeodesicTuple;
pub use self::kernels::{KernelError, ObsType, SkyKernel};
pub use self::sim::SimulationError;

pub mod prelude {
    pub use crate::coords::{pierce_point, GeodesicTuple};
    pub use crate::kernels::stationary::{
        CovarianceShape, GreatCircleKernel, IsotropicKernel, ThinLayerKernel,
    };
    pub use crate::kernels::directional::{DirectionalKernel, FullDirectionalKernel};
    pub use crate::kernels::tomographic::{IonosphereModel, TomographicKernel};
    pub use crate::kernels::{KernelError, ObsType, SkyKernel};
    pub use crate::screen::{ConfigRepr, ScreenConfig, ScreenRun};
    pub use crate::sim::conditional::{
        simulate_all, ConditionalMoments, ScreenBlock, ScreenSimulator,
    };
    pub use crate::sim::msqrt::{condition_number, matrix_square_root, DEFAULT_JITTER};
    pub use crate::sim::SimulationError;
}
