//! Process-wide configuration. Tests share the global state, so they run
//! one at a time.

use proptrail::{
    ConfigError, Parameters, QualifiedParameters, Verbosity, check, configure_global, nat,
    property, read_configure_global, reset_configure_global,
};
use serial_test::serial;

#[test]
#[serial]
fn test_configure_read_reset_roundtrip() {
    reset_configure_global();
    assert_eq!(read_configure_global(), Parameters::new());

    let global = Parameters::new().num_runs(33).seed(9).verbose(Verbosity::Verbose);
    configure_global(global.clone()).expect("valid configuration");
    assert_eq!(read_configure_global(), global);

    reset_configure_global();
    assert_eq!(read_configure_global(), Parameters::new());
}

#[test]
#[serial]
fn test_invalid_global_configuration_is_rejected() {
    reset_configure_global();
    assert_eq!(
        configure_global(Parameters::new().max_skips_per_run(0)),
        Err(ConfigError::InvalidMaxSkipsPerRun(0))
    );
    assert!(matches!(
        configure_global(Parameters::new().path("1x")),
        Err(ConfigError::InvalidPath(_))
    ));
    assert_eq!(read_configure_global(), Parameters::new());
}

#[test]
#[serial]
fn test_global_parameters_apply_to_runs() {
    reset_configure_global();
    configure_global(Parameters::new().num_runs(12).seed(4)).expect("valid configuration");

    let details = check(&property(nat(), |_| true), Parameters::new());
    assert_eq!(details.num_runs, 12);
    assert_eq!(details.seed, 4);

    let overridden = check(&property(nat(), |_| true), Parameters::new().num_runs(3));
    assert_eq!(overridden.num_runs, 3);
    assert_eq!(overridden.seed, 4);

    reset_configure_global();
}

#[test]
#[serial]
fn test_resolution_falls_back_to_defaults() {
    reset_configure_global();
    configure_global(Parameters::new().end_on_failure(true)).expect("valid configuration");

    let resolved = QualifiedParameters::resolve(&Parameters::new().seed(1)).expect("valid");
    assert!(resolved.end_on_failure);
    assert_eq!(resolved.num_runs, 100);
    assert_eq!(resolved.max_skips_per_run, 100);
    assert_eq!(resolved.max_shrink_steps, 1000);

    reset_configure_global();
}
