use crate::test_array;
use aither::prelude::*;
use aither::screen::ConfigError;

#[test]
fn default_config_validates() {
    ScreenConfig::default().validate().unwrap();
}

#[test]
fn config_loads_from_yaml() {
    let yaml = r#"
bottom_km: 250.0
width_km: 100.0
shape: Matern52
lengthscale_km: 7.5
fed_sigma: 0.3
fed_mu: 0.1
east_wind_m_s: -150.0
north_wind_m_s: 40.0
obs_type: Ddtec
time_resolution_s: 15.0
duration_s: 600.0
time_block_size: 4
quadrature_resolution: 13
seed: 42
"#;
    let config = ScreenConfig::loads(yaml).unwrap();
    assert_eq!(config.shape, CovarianceShape::Matern52);
    assert_eq!(config.obs_type, ObsType::Ddtec);
    assert_eq!(config.time_block_size, 4);
    assert_eq!(config.num_time_steps(), 41);
    let wind = config.wind_velocity_km_s();
    assert_eq!(wind.x, -0.15);
    assert_eq!(wind.y, 0.04);
    assert_eq!(wind.z, 0.0);
    config.validate().unwrap();
}

#[test]
fn config_roundtrips_through_yaml() {
    let config = ScreenConfig::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let reloaded = ScreenConfig::loads(&yaml).unwrap();
    assert_eq!(reloaded, config);
}

#[test]
fn config_rejects_unknown_fields() {
    let yaml = serde_yaml::to_string(&ScreenConfig::default()).unwrap() + "refractivity: 1.0\n";
    assert!(matches!(
        ScreenConfig::loads(&yaml),
        Err(ConfigError::ParseError { .. })
    ));
}

fn assert_invalid(config: ScreenConfig) {
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidConfig { .. })
    ));
}

#[test]
fn config_rejects_bad_values() {
    let mut config = ScreenConfig::default();
    config.quadrature_resolution = 0;
    assert_invalid(config);

    let mut config = ScreenConfig::default();
    config.time_block_size = 1;
    assert_invalid(config);

    let mut config = ScreenConfig::default();
    config.width_km = -50.0;
    assert_invalid(config);

    let mut config = ScreenConfig::default();
    config.time_resolution_s = f64::NAN;
    assert_invalid(config);
}

#[test]
fn run_rejects_empty_geometry() {
    let (antennas, directions) = test_array();
    assert!(ScreenRun::new(ScreenConfig::default(), vec![], directions.clone()).is_err());
    assert!(ScreenRun::new(ScreenConfig::default(), antennas, vec![]).is_err());
}

#[test]
fn run_simulates_the_configured_duration() {
    let _ = pretty_env_logger::try_init();
    let (antennas, directions) = test_array();
    let config = ScreenConfig {
        duration_s: 150.0,
        time_resolution_s: 30.0,
        time_block_size: 3,
        quadrature_resolution: 5,
        ..Default::default()
    };
    // 6 time steps in blocks of 3.
    let run = ScreenRun::new(config, antennas, directions).unwrap();
    let blocks = run.run().unwrap();
    assert_eq!(blocks.len(), 2);
    for block in &blocks {
        assert_eq!(block.dtec.len(), 2 * 3 * 3);
        assert!(block.dtec.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn dtec_run_vanishes_at_the_reference_antenna() {
    let (antennas, directions) = test_array();
    let config = ScreenConfig {
        duration_s: 30.0,
        time_block_size: 2,
        quadrature_resolution: 5,
        ..Default::default()
    };
    let run = ScreenRun::new(config, antennas, directions).unwrap();
    let blocks = run.run().unwrap();
    // Antenna 0 is the differencing reference: its DTEC is zero up to the jitter floor, against
    // a signal variance of order unity elsewhere.
    for block in &blocks {
        for direction in 0..block.num_directions {
            for step in 0..block.block_size {
                assert!(block.value(0, direction, step).abs() < 0.05);
            }
        }
    }
}
