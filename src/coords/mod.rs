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

use crate::kernels::KernelError;
use crate::linalg::Vector3;

/// Directions closer to the horizon than this in the z-component are rejected: the pierce-point
/// projection divides by `k_z`.
pub const MIN_KZ: f64 = 1e-3;

/// One row per (antenna, direction, time) observation, stored as four parallel arrays.
///
/// Positions are in kilometers in a local East-North-Up frame relative to an arbitrary origin;
/// directions are unit vectors in the same frame; times are offsets in seconds from the first
/// sample. Frame conversion from Earth-fixed coordinates is the caller's concern.
#[derive(Clone, Debug, PartialEq)]
pub struct GeodesicTuple {
    /// Antenna positions in km (ENU)
    pub x: Vec<Vector3<f64>>,
    /// Unit direction vectors
    pub k: Vec<Vector3<f64>>,
    /// Time offsets in seconds since the first sample
    pub t: Vec<f64>,
    /// Reference antenna position in km, one per observation
    pub ref_x: Vec<Vector3<f64>>,
}

impl GeodesicTuple {
    /// Builds a tuple from its four parallel arrays, rejecting mismatched lengths and
    /// directions too close to the horizon.
    pub fn new(
        x: Vec<Vector3<f64>>,
        k: Vec<Vector3<f64>>,
        t: Vec<f64>,
        ref_x: Vec<Vector3<f64>>,
    ) -> Result<Self, KernelError> {
        let expected = x.len();
        for (name, len) in [("k", k.len()), ("t", t.len()), ("ref_x", ref_x.len())] {
            if len != expected {
                return Err(KernelError::LengthMismatch {
                    name,
                    len,
                    expected,
                });
            }
        }
        for (index, dir) in k.iter().enumerate() {
            if !dir.z.is_finite() || dir.z.abs() < MIN_KZ {
                return Err(KernelError::DegenerateDirection { index, kz: dir.z });
            }
        }
        Ok(Self { x, k, t, ref_x })
    }

    /// Flattens the Cartesian product antennas × directions × times into observation rows,
    /// antenna-major and time-minor, so a block reshapes to (antennas, directions, times).
    pub fn from_grid(
        antennas: &[Vector3<f64>],
        directions: &[Vector3<f64>],
        times: &[f64],
        ref_antenna: Vector3<f64>,
    ) -> Result<Self, KernelError> {
        let n = antennas.len() * directions.len() * times.len();
        let mut x = Vec::with_capacity(n);
        let mut k = Vec::with_capacity(n);
        let mut t = Vec::with_capacity(n);
        for ant in antennas {
            for dir in directions {
                for &epoch in times {
                    x.push(*ant);
                    k.push(*dir);
                    t.push(epoch);
                }
            }
        }
        let ref_x = vec![ref_antenna; n];
        Self::new(x, k, t, ref_x)
    }

    /// Number of observation rows.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Projects a (position, direction) pair onto the plane at altitude `a` above the reference
/// location `x0`: the point where the ray pierces the layer.
pub fn pierce_point(x: &Vector3<f64>, k: &Vector3<f64>, x0: &Vector3<f64>, a: f64) -> Vector3<f64> {
    x + k * ((a - (x.z - x0.z)) / k.z)
}

/// Estimates how many directions a Poisson-disk sampling of the field of view yields for a given
/// average spacing. Spacing and diameter must be in the same angular unit. Never fewer than 50.
pub fn num_directions(avg_spacing: f64, field_of_view_diameter: f64) -> usize {
    let v = 2.0 * std::f64::consts::PI * (field_of_view_diameter / 2.0).powi(2);
    let pp: f64 = 0.5;
    let n = -v * (1.0 - pp).ln() / avg_spacing.powi(2) / std::f64::consts::PI / 2.0;
    (n as usize).max(50)
}

#[test]
fn geodesic_grid_ordering() {
    let antennas = [Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)];
    let directions = [Vector3::new(0.0, 0.0, 1.0)];
    let times = [0.0, 30.0, 60.0];
    let coords = GeodesicTuple::from_grid(&antennas, &directions, &times, antennas[0]).unwrap();
    assert_eq!(coords.len(), 6);
    // Time-minor: the first three rows share the first antenna.
    assert_eq!(coords.x[2], antennas[0]);
    assert_eq!(coords.x[3], antennas[1]);
    assert_eq!(coords.t[4], 30.0);
}

#[test]
fn geodesic_rejects_horizon_directions() {
    let bad = GeodesicTuple::new(
        vec![Vector3::zeros()],
        vec![Vector3::new(1.0, 0.0, 0.0)],
        vec![0.0],
        vec![Vector3::zeros()],
    );
    assert!(matches!(
        bad,
        Err(KernelError::DegenerateDirection { index: 0, .. })
    ));
}

#[test]
fn direction_count_follows_spacing() {
    // 6-arcmin average spacing over a 4-degree field: (d/2)²·ln2/s² = 400·ln2 ≈ 277.
    assert_eq!(num_directions(0.1, 4.0), 277);
    // Invariant under a change of angular unit (the same geometry in arcminutes).
    assert_eq!(num_directions(6.0, 240.0), 277);
    // Sparse samplings bottom out at the floor.
    assert_eq!(num_directions(2.0, 4.0), 50);
}

#[test]
fn pierce_point_at_zenith() {
    let x = Vector3::new(10.0, -5.0, 0.1);
    let k = Vector3::new(0.0, 0.0, 1.0);
    let x0 = Vector3::zeros();
    let p = pierce_point(&x, &k, &x0, 250.0);
    assert_eq!(p, Vector3::new(10.0, -5.0, 250.0));
}
