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

use crate::kernels::{CovarianceShape, IonosphereModel, ObsType};
use crate::linalg::Vector3;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read configuration file: {source}"))]
    ReadError { source: std::io::Error },
    #[snafu(display("failed to parse YAML configuration: {source}"))]
    ParseError { source: serde_yaml::Error },
    #[snafu(display("invalid configuration: {reason}"))]
    InvalidConfig { reason: String },
}

/// Trait for structures that can be loaded from a YAML file or string.
pub trait ConfigRepr: Debug + Sized + Serialize + DeserializeOwned {
    /// Builds the configuration representation from the path to a yaml
    fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds the configuration representation from a yaml string
    fn loads(data: &str) -> Result<Self, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }
}

/// Everything a phase-screen simulation run needs beyond the array itself: slab geometry,
/// turbulence statistics, wind, observation cadence, block size and RNG seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreenConfig {
    /// Ionosphere slab base height in km
    pub bottom_km: f64,
    /// Ionosphere slab thickness in km
    pub width_km: f64,
    /// FED auto-correlation shape
    pub shape: CovarianceShape,
    /// FED auto-correlation length-scale in km
    pub lengthscale_km: f64,
    /// FED standard deviation in mTECU/km
    pub fed_sigma: f64,
    /// FED mean in mTECU/km
    pub fed_mu: f64,
    /// Wind to the east at slab height in m/s
    pub east_wind_m_s: f64,
    /// Wind to the north at slab height in m/s
    pub north_wind_m_s: f64,
    /// Observation type to simulate
    pub obs_type: ObsType,
    /// Temporal resolution in seconds
    pub time_resolution_s: f64,
    /// Total duration in seconds
    pub duration_s: f64,
    /// Number of time steps simulated per block, at least 2
    pub time_block_size: usize,
    /// Quadrature resolution per ray for the tomographic double integral
    pub quadrature_resolution: usize,
    /// Seed for the 64-bit PCG random number generator
    pub seed: u64,
}

impl Default for ScreenConfig {
    /// The LoFAR-like defaults of the reference simulation scenario.
    fn default() -> Self {
        Self {
            bottom_km: 300.0,
            width_km: 50.0,
            shape: CovarianceShape::SquaredExponential,
            lengthscale_km: 4.0,
            fed_sigma: 1.0,
            fed_mu: 0.0,
            east_wind_m_s: -200.0,
            north_wind_m_s: 0.0,
            obs_type: ObsType::Dtec,
            time_resolution_s: 30.0,
            duration_s: 60.0,
            time_block_size: 2,
            quadrature_resolution: 25,
            seed: 24532,
        }
    }
}

impl ScreenConfig {
    /// Eagerly rejects values the kernels and simulator would choke on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quadrature_resolution < 1 {
            return Err(ConfigError::InvalidConfig {
                reason: "quadrature_resolution must be at least 1".to_string(),
            });
        }
        if self.time_block_size < 2 {
            return Err(ConfigError::InvalidConfig {
                reason: format!(
                    "time_block_size must be at least 2, got {}",
                    self.time_block_size
                ),
            });
        }
        for (name, value) in [
            ("bottom_km", self.bottom_km),
            ("width_km", self.width_km),
            ("lengthscale_km", self.lengthscale_km),
            ("fed_sigma", self.fed_sigma),
            ("time_resolution_s", self.time_resolution_s),
            ("duration_s", self.duration_s),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidConfig {
                    reason: format!("{name} must be finite and positive, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Wind velocity in km/s in the local ENU frame.
    pub fn wind_velocity_km_s(&self) -> Vector3<f64> {
        Vector3::new(self.east_wind_m_s, self.north_wind_m_s, 0.0) / 1000.0
    }

    /// Number of time steps covered by the configured duration.
    pub fn num_time_steps(&self) -> usize {
        (self.duration_s / self.time_resolution_s) as usize + 1
    }

    pub fn ionosphere_model(&self) -> IonosphereModel {
        IonosphereModel {
            bottom_km: self.bottom_km,
            width_km: self.width_km,
            shape: self.shape,
            lengthscale_km: self.lengthscale_km,
            fed_sigma: self.fed_sigma,
            fed_mu: self.fed_mu,
            wind_velocity_km_s: self.wind_velocity_km_s(),
        }
    }
}

impl ConfigRepr for ScreenConfig {}
