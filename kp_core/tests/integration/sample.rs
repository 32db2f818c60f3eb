//! Integration test: sampling and range checks.

use super::common::{one_channel, pulse_rig, rig};
use kp_common::actuator::{MoveResult, Speed};
use kp_common::capture::{CaptureDirs, ChannelResult, ChannelStatus};
use kp_common::config::ChannelWiring;
use kp_common::consts::CAP_CH_NUM;
use kp_common::sample::SampleResult;
use kp_core::input::InputMsg;
use std::thread;
use std::time::{Duration, Instant};

const SENTINEL: ChannelResult = ChannelResult {
    status: ChannelStatus::Overcapture,
    value_us: 12345,
};

#[test]
fn powered_off_sample_does_nothing() {
    let (bench, kp) = pulse_rig();
    let conf = one_channel(CaptureDirs::BOTH, 10_000, 0);
    let mut results = [SENTINEL; CAP_CH_NUM];

    let rc = kp.sampler().sample(10, Speed::MAX, &conf, CaptureDirs::DOWN, &mut results);
    assert_eq!(rc, SampleResult::PoweredOff);
    assert_eq!(results, [SENTINEL; CAP_CH_NUM]);
    assert_eq!(bench.actuator_toggles(), 0);
    assert!(!bench.capture.inject_trigger());
}

#[test]
fn sample_at_current_position_reports_zeroed_timeouts() {
    let (bench, kp) = pulse_rig();
    kp.actuator().power_on();
    let conf = one_channel(CaptureDirs::BOTH, 10_000, 0);
    let mut results = [SENTINEL; CAP_CH_NUM];

    let rc = kp.sampler().sample(0, Speed::MAX, &conf, CaptureDirs::DOWN, &mut results);
    assert_eq!(rc, SampleResult::Ok);
    for result in results {
        assert_eq!(result.status, ChannelStatus::Timeout);
        assert_eq!(result.value_us, 0);
    }
    assert_eq!(bench.step.toggles(), 0);
}

#[test]
fn sample_captures_press() {
    let (bench, kp) = pulse_rig();
    kp.actuator().power_on();
    let conf = one_channel(CaptureDirs::DOWN, 50_000, 1000);
    let mut results = [SENTINEL; CAP_CH_NUM];

    let rc = kp.sampler().sample(10, Speed::MAX, &conf, CaptureDirs::DOWN, &mut results);
    assert_eq!(rc, SampleResult::Ok);
    assert_eq!(kp.actuator().locate(), 10);
    assert!(bench.switch.is_pressed());
    assert_eq!(results[0].status, ChannelStatus::Ok);
    // The press happens four step periods after the triggering step.
    assert!(results[0].value_us >= 500, "{:?}", results[0]);
    assert_eq!(results[1], ChannelResult::default());
}

#[test]
fn check_counts_every_triggered_pass() {
    let (_bench, kp) = pulse_rig();
    kp.actuator().power_on();
    let conf = one_channel(CaptureDirs::BOTH, 20_000, 1000);

    let outcome = kp.sampler().check(0, 10, Speed::MAX, 4, &conf);
    assert_eq!(outcome.result, SampleResult::Ok);
    assert_eq!(outcome.triggers, 4);
    assert_eq!(kp.actuator().locate(), 0);
}

#[test]
fn check_counts_nothing_when_never_triggered() {
    let (_bench, kp) = rig(5, ChannelWiring::Disconnected);
    kp.actuator().power_on();
    let conf = one_channel(CaptureDirs::BOTH, 10_000, 0);

    let outcome = kp.sampler().check(0, 10, Speed::MAX, 4, &conf);
    assert_eq!(outcome.result, SampleResult::Ok);
    assert_eq!(outcome.triggers, 0);
}

#[test]
fn check_skips_passes_without_channels() {
    let (_bench, kp) = pulse_rig();
    kp.actuator().power_on();
    let conf = one_channel(CaptureDirs::DOWN, 20_000, 1000);

    // Two captured passes down, with uncaptured passes up in between.
    let outcome = kp.sampler().check(0, 10, Speed::MAX, 2, &conf);
    assert_eq!(outcome.result, SampleResult::Ok);
    assert_eq!(outcome.triggers, 2);
    assert_eq!(kp.actuator().locate(), 10);
}

#[test]
fn check_starts_from_nearer_boundary() {
    let (_bench, kp) = pulse_rig();
    kp.actuator().power_on();
    assert_eq!(kp.actuator().move_to(12, Speed::MAX), MoveResult::Ok);
    let conf = one_channel(CaptureDirs::BOTH, 20_000, 1000);

    // Nearer to the bottom: the first pass goes up.
    let outcome = kp.sampler().check(0, 10, Speed::MAX, 1, &conf);
    assert_eq!(outcome.result, SampleResult::Ok);
    assert_eq!(outcome.triggers, 1);
    assert_eq!(kp.actuator().locate(), 0);
}

#[test]
fn check_with_no_passes_does_nothing() {
    let (bench, kp) = pulse_rig();
    kp.actuator().power_on();
    let conf = one_channel(CaptureDirs::BOTH, 20_000, 0);

    let outcome = kp.sampler().check(0, 10, Speed::MAX, 0, &conf);
    assert_eq!(outcome.result, SampleResult::Ok);
    assert_eq!(outcome.triggers, 0);
    assert_eq!(bench.step.toggles(), 0);
}

#[test]
fn user_abort_aborts_sample() {
    let (_bench, kp) = rig(5, ChannelWiring::Disconnected);
    kp.actuator().power_on();
    let conf = one_channel(CaptureDirs::BOTH, 1_000_000, 0);
    let mut results = [SENTINEL; CAP_CH_NUM];

    assert!(kp.input().send(InputMsg::Abort));
    let start = Instant::now();
    let rc = kp.sampler().sample(1000, Speed::MAX, &conf, CaptureDirs::DOWN, &mut results);
    assert_eq!(rc, SampleResult::Aborted);
    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(results, [SENTINEL; CAP_CH_NUM]);
    assert!(kp.input().is_empty());

    // Both components are available again.
    let conf = one_channel(CaptureDirs::BOTH, 10_000, 0);
    let rc = kp.sampler().sample(0, Speed::MAX, &conf, CaptureDirs::UP, &mut results);
    assert_eq!(rc, SampleResult::Ok);
    assert_eq!(kp.actuator().locate(), 0);
}

#[test]
fn other_input_does_not_abort() {
    let (_bench, kp) = pulse_rig();
    kp.actuator().power_on();
    let conf = one_channel(CaptureDirs::DOWN, 50_000, 1000);
    let mut results = [SENTINEL; CAP_CH_NUM];

    kp.input().send(InputMsg::Enter);
    let rc = kp.sampler().sample(10, Speed::MAX, &conf, CaptureDirs::DOWN, &mut results);
    assert_eq!(rc, SampleResult::Ok);
    assert_eq!(results[0].status, ChannelStatus::Ok);
}

#[test]
fn power_off_during_sample_is_reported() {
    let (_bench, kp) = rig(5, ChannelWiring::Disconnected);
    kp.actuator().power_on();
    let conf = one_channel(CaptureDirs::BOTH, 1_000_000, 0);
    let mut results = [SENTINEL; CAP_CH_NUM];

    let start = Instant::now();
    let rc = thread::scope(|s| {
        s.spawn(|| {
            thread::sleep(Duration::from_millis(20));
            kp.actuator().power_off();
        });
        kp.sampler().sample(1000, Speed::MAX, &conf, CaptureDirs::DOWN, &mut results)
    });
    assert_eq!(rc, SampleResult::PoweredOff);
    assert!(start.elapsed() < Duration::from_millis(500));
}
