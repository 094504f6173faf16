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

use crate::kernels::{KernelError, TomographicKernel};
use crate::linalg::Vector3;
use crate::sim::{ScreenBlock, ScreenSimulator, SimulationError, DEFAULT_JITTER};
use snafu::prelude::Snafu;

mod config;
pub use config::{ConfigError, ConfigRepr, ScreenConfig};

#[derive(Debug, Snafu)]
pub enum ScreenError {
    #[snafu(display("{source}"), context(false))]
    Config { source: ConfigError },
    #[snafu(display("{source}"), context(false))]
    Kernel { source: KernelError },
    #[snafu(display("{source}"), context(false))]
    Simulation { source: SimulationError },
}

/// Assembles a configured simulation over a concrete array: antenna positions and sky directions
/// in the local ENU frame, with the first antenna as the differencing reference.
///
/// Writing the resulting blocks anywhere (HDF5 datapacks, plots) is the caller's concern; this
/// type only owns the geometry-to-sample pipeline.
pub struct ScreenRun {
    pub config: ScreenConfig,
    pub antennas: Vec<Vector3<f64>>,
    pub directions: Vec<Vector3<f64>>,
}

impl ScreenRun {
    pub fn new(
        config: ScreenConfig,
        antennas: Vec<Vector3<f64>>,
        directions: Vec<Vector3<f64>>,
    ) -> Result<Self, ScreenError> {
        config.validate()?;
        if antennas.is_empty() {
            return Err(ConfigError::InvalidConfig {
                reason: "at least one antenna is required".to_string(),
            }
            .into());
        }
        if directions.is_empty() {
            return Err(ConfigError::InvalidConfig {
                reason: "at least one direction is required".to_string(),
            }
            .into());
        }
        Ok(Self {
            config,
            antennas,
            directions,
        })
    }

    /// The tomographic kernel this run simulates from.
    pub fn kernel(&self) -> Result<TomographicKernel, ScreenError> {
        Ok(TomographicKernel::new(
            self.config.ionosphere_model(),
            self.config.obs_type,
            self.config.quadrature_resolution,
        )?)
    }

    /// Builds the block-sequential simulator, referenced against the first antenna.
    pub fn simulator(&self) -> Result<ScreenSimulator, ScreenError> {
        let kernel = self.kernel()?;
        Ok(ScreenSimulator::new(
            &kernel,
            &self.antennas,
            &self.directions,
            self.antennas[0],
            self.config.time_resolution_s,
            self.config.time_block_size,
            self.config.seed,
            DEFAULT_JITTER,
        )?)
    }

    /// Simulates the whole configured duration, one block at a time.
    pub fn run(&self) -> Result<Vec<ScreenBlock>, ScreenError> {
        let num_blocks =
            (self.config.num_time_steps() + self.config.time_block_size - 1)
                / self.config.time_block_size;
        info!(
            "simulating {} blocks of {} time steps over {} antennas x {} directions",
            num_blocks,
            self.config.time_block_size,
            self.antennas.len(),
            self.directions.len()
        );
        let mut simulator = self.simulator()?;
        Ok(simulator.simulate(num_blocks)?)
    }
}
