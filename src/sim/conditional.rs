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

use super::msqrt::{condition_number, jittered, matrix_square_root};
use super::SimulationError;
use crate::coords::GeodesicTuple;
use crate::kernels::TomographicKernel;
use crate::linalg::{DMatrix, DVector, Vector3};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64Mcg;

/// The Gaussian conditional moments linking a new time block to the trailing edge of the
/// previous one.
///
/// With `K_nn = K(new, new)`, `K_oo = K(old, old)` and `K_on = K(old, new)`:
/// `L_new·L_newᵀ = K_nn` (cold-start draw), `LC·LCᵀ = K_nn − K_no·K_oo⁻¹·K_on` (conditional
/// draw), and `mean_gain = K_no·K_oo⁻¹` so the conditional mean is `mean_gain · old_values`.
#[derive(Clone, Debug)]
pub struct ConditionalMoments {
    /// Cholesky factor of the unconditioned new-block covariance
    pub l_new: DMatrix<f64>,
    /// Cholesky factor of the conditional new-block covariance
    pub lc: DMatrix<f64>,
    /// Conditional-mean operator, shape new × old
    pub mean_gain: DMatrix<f64>,
}

impl ConditionalMoments {
    /// Computes the moments from a tomographic kernel and the two coordinate sets.
    pub fn compute(
        kernel: &TomographicKernel,
        x_new: &GeodesicTuple,
        x_old: &GeodesicTuple,
        jitter: f64,
    ) -> Result<Self, SimulationError> {
        let k_new_new = kernel.evaluate_covariance(x_new, x_new);
        let k_old_old = kernel.evaluate_covariance(x_old, x_old);
        let k_old_new = kernel.evaluate_covariance(x_old, x_new);
        Self::from_covariances(&k_new_new, &k_old_old, &k_old_new, jitter)
    }

    /// Computes the moments from pre-built covariance blocks.
    pub fn from_covariances(
        k_new_new: &DMatrix<f64>,
        k_old_old: &DMatrix<f64>,
        k_old_new: &DMatrix<f64>,
        jitter: f64,
    ) -> Result<Self, SimulationError> {
        let l_new = matrix_square_root(k_new_new, jitter)?;

        // The conditioning matrix must factor as a triangular Cholesky for the solves below;
        // an SVD square root is of no use here, so its failure is fatal.
        let l = jittered(k_old_old, jitter)
            .cholesky()
            .ok_or_else(|| SimulationError::NonPositiveDefiniteConditioning {
                condition_number: condition_number(k_old_old),
            })?
            .l();

        let jt = l.solve_lower_triangular(k_old_new).ok_or_else(|| {
            SimulationError::NonPositiveDefiniteConditioning {
                condition_number: condition_number(k_old_old),
            }
        })?;

        let conditional = k_new_new - jt.transpose() * &jt;
        let lc = matrix_square_root(&conditional, jitter)?;

        // mean_gain = (L⁻ᵀ·JT)ᵀ = K_new_old · K_old_old⁻¹
        let mean_gain = l
            .transpose()
            .solve_upper_triangular(&jt)
            .ok_or_else(|| SimulationError::NonPositiveDefiniteConditioning {
                condition_number: condition_number(k_old_old),
            })?
            .transpose();

        Ok(Self {
            l_new,
            lc,
            mean_gain,
        })
    }
}

/// One simulated block of DTEC values, shaped (antennas, directions, block size) and flattened
/// antenna-major, time-minor.
#[derive(Clone, Debug)]
pub struct ScreenBlock {
    pub num_antennas: usize,
    pub num_directions: usize,
    pub block_size: usize,
    /// DTEC in mTECU, row index `(antenna · directions + direction) · block_size + step`
    pub dtec: DVector<f64>,
}

impl ScreenBlock {
    pub fn value(&self, antenna: usize, direction: usize, step: usize) -> f64 {
        self.dtec[(antenna * self.num_directions + direction) * self.block_size + step]
    }

    /// The trailing two time-steps, ordered oldest first: the sole state carried between
    /// blocks.
    pub fn trailing(&self) -> DVector<f64> {
        let n = self.num_antennas * self.num_directions;
        DVector::from_iterator(
            2 * n,
            (0..n).flat_map(|i| {
                let base = i * self.block_size + self.block_size - 2;
                [self.dtec[base], self.dtec[base + 1]]
            }),
        )
    }
}

/// Block-sequential DTEC screen simulator.
///
/// Each block of `block_size` time-steps is drawn conditioned on the trailing two time-steps of
/// the previous block (a Markov window), so consecutive blocks join into one statistically
/// consistent time series. The kernel is stationary in time through the frozen-flow wind
/// advection, so the conditional moments are computed once and reused for every step.
///
/// State is passed explicitly: `next_block` consumes the previous block's trailing values and
/// returns a new block; nothing is mutated behind the caller's back except the RNG stream.
#[derive(Debug)]
pub struct ScreenSimulator {
    moments: ConditionalMoments,
    num_antennas: usize,
    num_directions: usize,
    block_size: usize,
    rng: Pcg64Mcg,
    std_norm: Normal<f64>,
}

impl ScreenSimulator {
    /// Assembles the simulator: builds the new-block and trailing-window coordinate grids,
    /// evaluates the kernel on them, and computes the conditional moments.
    pub fn new(
        kernel: &TomographicKernel,
        antennas: &[Vector3<f64>],
        directions: &[Vector3<f64>],
        ref_antenna: Vector3<f64>,
        time_resolution_s: f64,
        block_size: usize,
        seed: u64,
        jitter: f64,
    ) -> Result<Self, SimulationError> {
        if block_size < 2 {
            return Err(SimulationError::BlockTooSmall { block_size });
        }

        let t_new: Vec<f64> = (0..block_size)
            .map(|i| i as f64 * time_resolution_s)
            .collect();
        // Trailing window of the previous block, oldest first.
        let t_old = vec![-2.0 * time_resolution_s, -time_resolution_s];

        let x_new = GeodesicTuple::from_grid(antennas, directions, &t_new, ref_antenna)?;
        let x_old = GeodesicTuple::from_grid(antennas, directions, &t_old, ref_antenna)?;

        info!(
            "conditioning {} observations on a trailing window of {}",
            x_new.len(),
            x_old.len()
        );
        let moments = ConditionalMoments::compute(kernel, &x_new, &x_old, jitter)?;

        Ok(Self {
            moments,
            num_antennas: antennas.len(),
            num_directions: directions.len(),
            block_size,
            rng: Pcg64Mcg::new(seed.into()),
            std_norm: Normal::new(0.0, 1.0).unwrap(),
        })
    }

    fn draw(&mut self, n: usize) -> DVector<f64> {
        DVector::from_iterator(n, (0..n).map(|_| self.std_norm.sample(&mut self.rng)))
    }

    fn block(&self, dtec: DVector<f64>) -> ScreenBlock {
        ScreenBlock {
            num_antennas: self.num_antennas,
            num_directions: self.num_directions,
            block_size: self.block_size,
            dtec,
        }
    }

    /// The unconditioned cold-start draw `L_new·z`.
    pub fn first_block(&mut self) -> ScreenBlock {
        let z = self.draw(self.moments.l_new.ncols());
        self.block(&self.moments.l_new * z)
    }

    /// Draws the next block conditioned on the previous block's trailing values:
    /// `mean_gain·trailing + LC·z` with a fresh `z ~ N(0, I)` per step.
    pub fn next_block(&mut self, previous: &ScreenBlock) -> Result<ScreenBlock, SimulationError> {
        let trailing = previous.trailing();
        let expected = self.moments.mean_gain.ncols();
        if trailing.len() != expected {
            return Err(SimulationError::TrailingStateMismatch {
                len: trailing.len(),
                expected,
            });
        }
        let z = self.draw(self.moments.lc.ncols());
        let dtec = &self.moments.mean_gain * trailing + &self.moments.lc * z;
        Ok(self.block(dtec))
    }

    /// Runs the cold start plus `num_blocks - 1` conditioned steps.
    pub fn simulate(&mut self, num_blocks: usize) -> Result<Vec<ScreenBlock>, SimulationError> {
        let mut blocks = Vec::with_capacity(num_blocks);
        if num_blocks == 0 {
            return Ok(blocks);
        }
        let mut current = self.first_block();
        for step in 1..num_blocks {
            debug!("simulating block {}/{}", step + 1, num_blocks);
            let next = self.next_block(&current)?;
            blocks.push(std::mem::replace(&mut current, next));
        }
        blocks.push(current);
        Ok(blocks)
    }
}

/// Whole-run variant: one covariance over every (antenna, direction, time) observation at once,
/// drawn through the Cholesky-then-SVD square root.
pub fn simulate_all<R: Rng>(
    kernel: &TomographicKernel,
    coords: &GeodesicTuple,
    jitter: f64,
    rng: &mut R,
) -> Result<DVector<f64>, SimulationError> {
    let cov = kernel.evaluate_covariance(coords, coords);
    let factor = matrix_square_root(&cov, jitter)?;
    let std_norm = Normal::new(0.0, 1.0).unwrap();
    let z = DVector::from_iterator(
        coords.len(),
        (0..coords.len()).map(|_| std_norm.sample(rng)),
    );
    Ok(kernel.evaluate_mean(coords) + factor * z)
}
