//! Integration test: configuration file → simulated rig → range check.

use kp_common::capture::CaptureDirs;
use kp_common::config::{ConfigLoader, KeypeckerConfig};
use kp_common::sample::SampleResult;
use kp_core::Keypecker;
use kp_hal::drivers::simulation::SimulatedBench;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn check(config: &KeypeckerConfig, passes: usize) -> (SampleResult, usize) {
    config.validate().unwrap();
    let capture = config.capture.to_capture_config().unwrap();
    let (_bench, bindings) = SimulatedBench::new(&config.simulation).unwrap();
    let kp = Keypecker::new(bindings, config.actuator).unwrap();
    kp.actuator().power_on();
    let check = &config.check;
    let outcome = kp
        .sampler()
        .check(check.top, check.bottom, check.speed, passes, &capture);
    (outcome.result, outcome.triggers)
}

#[test]
fn shipped_config_triggers_every_pass() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/keypecker.toml");
    let config = KeypeckerConfig::load(&path).unwrap();
    let capture = config.capture.to_capture_config().unwrap();
    assert_eq!(capture.ch_num(CaptureDirs::DOWN), 2);
    assert_eq!(capture.ch_num(CaptureDirs::UP), 1);

    assert_eq!(check(&config, 2), (SampleResult::Ok, 2));
}

#[test]
fn disconnected_switch_never_triggers() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        br#"
        [shared]
        service_name = "keypecker-disconnected"

        [capture]
        timeout_us = 5000
        channels = [{ dirs = "both", edge = "rising" }]

        [check]
        top = 0
        bottom = 8
        speed = 100
        passes = 2

        [simulation]
        actuation = 4
        channels = ["disconnected", "disconnected"]
        "#,
    )
    .unwrap();
    let config = KeypeckerConfig::load(file.path()).unwrap();

    assert_eq!(check(&config, config.check.passes), (SampleResult::Ok, 0));
}
