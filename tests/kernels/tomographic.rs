use crate::{test_array, test_kernel, test_model};
use aither::linalg::Vector3;
use aither::prelude::*;
use approx::{assert_abs_diff_eq, assert_relative_eq};

#[test]
fn reference_scenario_covariance_is_symmetric_psd() {
    // 2 antennas x 3 directions, bottom=300, width=50, l=4, sigma=1, s_marg=25.
    let (antennas, directions) = test_array();
    let kernel = test_kernel(ObsType::Tec, 25);
    let coords = GeodesicTuple::from_grid(&antennas, &directions, &[0.0], antennas[0]).unwrap();
    assert_eq!(coords.len(), 6);

    let cov = kernel.evaluate_covariance(&coords, &coords);
    assert_eq!(cov.nrows(), 6);
    assert_eq!(cov.ncols(), 6);

    for i in 0..6 {
        for j in 0..6 {
            assert_relative_eq!(cov[(i, j)], cov[(j, i)], epsilon = 1e-10);
        }
    }

    // All directions share the zenith angle, so every raw-TEC variance coincides.
    let d0 = cov[(0, 0)];
    assert!(d0 > 0.0);
    for i in 1..6 {
        assert_relative_eq!(cov[(i, i)], d0, epsilon = 1e-8);
    }

    let eigenvalues = cov.symmetric_eigen().eigenvalues;
    for ev in eigenvalues.iter() {
        assert!(*ev > -1e-8 * d0, "negative eigenvalue {ev}");
    }
}

#[test]
fn dtec_covariance_is_symmetric_psd() {
    let (antennas, directions) = test_array();
    let kernel = test_kernel(ObsType::Dtec, 15);
    let coords =
        GeodesicTuple::from_grid(&antennas, &directions, &[0.0, 30.0], antennas[0]).unwrap();
    let cov = kernel.evaluate_covariance(&coords, &coords);
    for i in 0..coords.len() {
        for j in 0..coords.len() {
            assert_relative_eq!(cov[(i, j)], cov[(j, i)], epsilon = 1e-9);
        }
    }
    let eigenvalues = cov.symmetric_eigen().eigenvalues;
    for ev in eigenvalues.iter() {
        assert!(*ev > -1e-8, "negative eigenvalue {ev}");
    }
}

#[test]
fn cross_covariance_is_the_transpose() {
    let (antennas, directions) = test_array();
    let kernel = test_kernel(ObsType::Dtec, 10);
    let c1 = GeodesicTuple::from_grid(&antennas, &directions, &[0.0], antennas[0]).unwrap();
    let c2 = GeodesicTuple::from_grid(&antennas, &directions, &[30.0, 60.0], antennas[0]).unwrap();
    let k12 = kernel.evaluate_covariance(&c1, &c2);
    let k21 = kernel.evaluate_covariance(&c2, &c1);
    assert_abs_diff_eq!(k12, k21.transpose(), epsilon = 1e-10);
}

#[test]
fn ddtec_reference_observation_is_degenerate() {
    let kernel = test_kernel(ObsType::Ddtec, 10);
    // Looking along the reference direction from the reference antenna: the four signed rays
    // cancel pairwise.
    let coords = GeodesicTuple::new(
        vec![Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0)],
        vec![
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.05, 0.0, (1.0f64 - 0.0025).sqrt()),
        ],
        vec![0.0, 0.0],
        vec![Vector3::zeros(), Vector3::zeros()],
    )
    .unwrap();
    let cov = kernel.evaluate_covariance(&coords, &coords);
    assert_abs_diff_eq!(cov[(0, 0)], 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(cov[(0, 1)], 0.0, epsilon = 1e-9);
    assert!(cov[(1, 1)] > 0.0);
}

#[test]
fn frozen_flow_is_stationary_in_time() {
    // Shifting both observations by the same elapsed time leaves the covariance unchanged:
    // only the time difference enters through the wind advection.
    let (antennas, directions) = test_array();
    let kernel = test_kernel(ObsType::Dtec, 10);
    let early =
        GeodesicTuple::from_grid(&antennas, &directions, &[0.0, 30.0], antennas[0]).unwrap();
    let late =
        GeodesicTuple::from_grid(&antennas, &directions, &[300.0, 330.0], antennas[0]).unwrap();
    let k_early = kernel.evaluate_covariance(&early, &early);
    let k_late = kernel.evaluate_covariance(&late, &late);
    assert_abs_diff_eq!(k_early, k_late, epsilon = 1e-9);
}

#[test]
fn wind_decorrelates_over_time() {
    // With a 120 m/s wind and a 4 km length-scale, two samples of the same geometry a few
    // minutes apart must covary less than simultaneous ones.
    let (antennas, directions) = test_array();
    let kernel = test_kernel(ObsType::Dtec, 10);
    let now = GeodesicTuple::from_grid(&antennas, &directions, &[0.0], antennas[0]).unwrap();
    let later = GeodesicTuple::from_grid(&antennas, &directions, &[300.0], antennas[0]).unwrap();
    let k_same = kernel.evaluate_covariance(&now, &now);
    let k_lagged = kernel.evaluate_covariance(&now, &later);
    // Compare a well-separated DTEC observation against its own lagged copy.
    assert!(k_lagged[(3, 3)] < k_same[(3, 3)]);
}

#[test]
fn quadrature_refinement_converges() {
    let (antennas, directions) = test_array();
    let coarse = test_kernel(ObsType::Dtec, 25);
    let fine = test_kernel(ObsType::Dtec, 50);
    let coords = GeodesicTuple::from_grid(&antennas, &directions, &[0.0], antennas[0]).unwrap();
    let k_coarse = coarse.evaluate_covariance(&coords, &coords);
    let k_fine = fine.evaluate_covariance(&coords, &coords);
    let scale = k_fine[(3, 3)].abs().max(1e-12);
    assert!(
        (k_coarse[(3, 3)] - k_fine[(3, 3)]).abs() / scale < 0.05,
        "quadrature far from converged: {} vs {}",
        k_coarse[(3, 3)],
        k_fine[(3, 3)]
    );
}

#[test]
fn mean_follows_differencing() {
    let (antennas, directions) = test_array();
    let mut model = test_model();
    model.fed_mu = 0.5;
    let tec = TomographicKernel::new(model, ObsType::Tec, 5).unwrap();
    let dtec = TomographicKernel::new(model, ObsType::Dtec, 5).unwrap();

    let coords = GeodesicTuple::from_grid(&antennas, &directions, &[0.0], antennas[0]).unwrap();
    let mean_tec = tec.evaluate_mean(&coords);
    let mean_dtec = dtec.evaluate_mean(&coords);
    for i in 0..coords.len() {
        // Raw TEC sees mu times the slant path; differencing against an antenna at the same
        // height along the same direction cancels it exactly.
        assert_relative_eq!(mean_tec[i], 0.5 * 50.0 / coords.k[i].z, epsilon = 1e-10);
        assert_abs_diff_eq!(mean_dtec[i], 0.0, epsilon = 1e-10);
    }
}
