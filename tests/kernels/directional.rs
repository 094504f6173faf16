use aither::linalg::{Matrix3, Vector3};
use aither::prelude::*;
use approx::{assert_abs_diff_eq, assert_relative_eq};

fn inner() -> GreatCircleKernel {
    GreatCircleKernel::new(CovarianceShape::SquaredExponential, 1.0, 0.05)
}

fn directions() -> Vec<Vector3<f64>> {
    vec![
        Vector3::new(0.0, 0.0, 1.0),
        Vector3::new(0.06, -0.01, (1.0f64 - 0.0037).sqrt()),
        Vector3::new(-0.03, 0.04, (1.0f64 - 0.0025).sqrt()),
    ]
}

#[test]
fn ddtec_kernel_is_symmetric() {
    let kernel = DirectionalKernel::new(inner(), ObsType::Ddtec);
    let dirs = directions();
    let cov = kernel.covariance_sym(&dirs);
    for i in 0..dirs.len() {
        for j in 0..dirs.len() {
            assert_relative_eq!(cov[(i, j)], cov[(j, i)], epsilon = 1e-14);
        }
    }
}

#[test]
fn ddtec_symmetric_path_matches_general_path() {
    // The column-reuse shortcut must agree with the two-batch evaluation exactly.
    let kernel = DirectionalKernel::new(inner(), ObsType::Ddtec)
        .with_ref_direction(Vector3::new(0.01, 0.0, (1.0f64 - 1e-4).sqrt()));
    let dirs = directions();
    let sym = kernel.covariance_sym(&dirs);
    let general = kernel.covariance(&dirs, &dirs);
    assert_abs_diff_eq!(sym, general, epsilon = 1e-14);
}

#[test]
fn ddtec_reference_direction_has_zero_variance() {
    let ref_dir = Vector3::new(0.0, 0.0, 1.0);
    let kernel = DirectionalKernel::new(inner(), ObsType::Ddtec).with_ref_direction(ref_dir);
    let batch = vec![ref_dir];
    let cov = kernel.covariance_sym(&batch);
    assert_abs_diff_eq!(cov[(0, 0)], 0.0, epsilon = 1e-12);
}

#[test]
fn dtec_wrapper_passes_through_like_tec() {
    // Single differencing is a position effect handled by the tomographic kernel; here the Dtec
    // branch must match Tec exactly.
    let dirs = directions();
    let tec = DirectionalKernel::new(inner(), ObsType::Tec).covariance(&dirs, &dirs);
    let dtec = DirectionalKernel::new(inner(), ObsType::Dtec).covariance(&dirs, &dirs);
    assert_abs_diff_eq!(tec, dtec, epsilon = 1e-15);
}

#[test]
fn amplitude_scales_squared() {
    let dirs = directions();
    let plain = DirectionalKernel::new(inner(), ObsType::Tec);
    let amped = DirectionalKernel::new(inner(), ObsType::Tec).with_amplitude(3.0);
    let base = plain.covariance(&dirs, &dirs);
    let scaled = amped.covariance(&dirs, &dirs);
    assert_abs_diff_eq!(scaled, base * 9.0, epsilon = 1e-12);
}

#[test]
fn anisotropy_identity_is_a_no_op() {
    let dirs = directions();
    let plain = DirectionalKernel::new(inner(), ObsType::Ddtec);
    let aniso = DirectionalKernel::new(inner(), ObsType::Ddtec).with_anisotropy(Matrix3::identity());
    assert_abs_diff_eq!(
        plain.covariance_sym(&dirs),
        aniso.covariance_sym(&dirs),
        epsilon = 1e-15
    );
}

#[test]
fn full_kernel_ddtec_degenerate_at_reference() {
    // An observation at the reference location looking along the reference direction has zero
    // covariance with everything after double differencing.
    let iso = IsotropicKernel::new(CovarianceShape::SquaredExponential, 1.0, 10.0);
    let ref_dir = Vector3::new(0.0, 0.0, 1.0);
    let ref_loc = Vector3::zeros();
    let kernel = FullDirectionalKernel::new(iso, ObsType::Ddtec, 250.0)
        .with_ref_direction(ref_dir)
        .with_ref_location(ref_loc);

    let k = vec![ref_dir, Vector3::new(0.05, 0.0, (1.0f64 - 0.0025).sqrt())];
    let x = vec![ref_loc, Vector3::new(0.8, -0.2, 0.0)];
    let cov = kernel.covariance(&k, &x, &k, &x).unwrap();
    assert_abs_diff_eq!(cov[(0, 0)], 0.0, epsilon = 1e-10);
    assert_abs_diff_eq!(cov[(0, 1)], 0.0, epsilon = 1e-10);
    // The genuinely offset observation keeps a positive variance.
    assert!(cov[(1, 1)] > 0.0);
}

#[test]
fn full_kernel_is_symmetric() {
    let iso = IsotropicKernel::new(CovarianceShape::Matern32, 1.0, 10.0);
    let kernel = FullDirectionalKernel::new(iso, ObsType::Ddtec, 250.0);
    let k = directions();
    let x = vec![
        Vector3::zeros(),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 2.0, 0.1),
    ];
    let cov = kernel.covariance(&k, &x, &k, &x).unwrap();
    for i in 0..k.len() {
        for j in 0..k.len() {
            assert_relative_eq!(cov[(i, j)], cov[(j, i)], epsilon = 1e-12);
        }
    }
}

#[test]
fn full_kernel_rejects_mismatched_batches() {
    let iso = IsotropicKernel::new(CovarianceShape::SquaredExponential, 1.0, 10.0);
    let kernel = FullDirectionalKernel::new(iso, ObsType::Tec, 250.0);
    let k = directions();
    let x = vec![Vector3::zeros()];
    assert!(matches!(
        kernel.covariance(&k, &x, &k, &x),
        Err(KernelError::LengthMismatch { name: "x1", .. })
    ));
}
