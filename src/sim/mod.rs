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

use snafu::prelude::Snafu;

/// Matrix square roots with the Cholesky-then-SVD fallback.
pub mod msqrt;

/// Conditional Gaussian moments and the block-sequential screen simulator.
pub mod conditional;

pub use conditional::{simulate_all, ConditionalMoments, ScreenBlock, ScreenSimulator};
pub use msqrt::{condition_number, matrix_square_root, DEFAULT_JITTER};

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SimulationError {
    /// Both the Cholesky and the SVD square-root paths produced non-finite results; the
    /// covariance is too ill-conditioned to simulate from and there is no further fallback.
    #[snafu(display(
        "covariance is numerically unsimulatable (condition number {condition_number:e})"
    ))]
    NumericallyUnsimulatable { condition_number: f64 },
    /// The conditioning matrix K(old, old) did not admit a triangular factorization even after
    /// jitter, so the forward/backward solves for the conditional moments cannot proceed.
    #[snafu(display(
        "conditioning covariance is not positive definite (condition number {condition_number:e})"
    ))]
    NonPositiveDefiniteConditioning { condition_number: f64 },
    #[snafu(display("time block size must be at least 2, got {block_size}"))]
    BlockTooSmall { block_size: usize },
    #[snafu(display("trailing state has length {len}, expected {expected}"))]
    TrailingStateMismatch { len: usize, expected: usize },
    #[snafu(display("{source}"), context(false))]
    Kernel { source: crate::kernels::KernelError },
}
