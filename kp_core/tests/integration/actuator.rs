//! Integration test: actuator power, moves and aborts on the simulated bench.

use super::common::pulse_rig;
use kp_common::actuator::{MoveResult, POS_INVALID, Speed};
use kp_core::sync::{Pollable, Poller, Timeout};
use proptest::prelude::*;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn powered_off_moves_do_not_toggle_outputs() {
    let (bench, kp) = pulse_rig();
    let act = kp.actuator();

    assert!(act.is_off());
    assert_eq!(act.move_to(10, Speed::MAX), MoveResult::PoweredOff);
    assert_eq!(act.move_by(-3, Speed::MAX), MoveResult::PoweredOff);
    assert_eq!(act.locate(), POS_INVALID);
    assert_eq!(bench.actuator_toggles(), 0);
}

#[test]
fn power_is_idempotent_and_rezeroes() {
    let (_bench, kp) = pulse_rig();
    let act = kp.actuator();

    assert!(act.power_on());
    assert!(!act.power_on());
    assert_eq!(act.locate(), 0);
    assert_eq!(act.move_to(3, Speed::MAX), MoveResult::Ok);
    assert_eq!(act.locate(), 3);

    assert!(act.power_off());
    assert!(!act.power_off());
    assert_eq!(act.locate(), POS_INVALID);

    assert!(act.power_on());
    assert_eq!(act.locate(), 0);
}

#[test]
fn relative_moves_round_trip() {
    let (bench, kp) = pulse_rig();
    let act = kp.actuator();
    act.power_on();

    assert_eq!(act.move_by(7, Speed::MAX), MoveResult::Ok);
    assert_eq!(act.locate(), 7);
    assert_eq!(bench.switch.position(), 7);
    assert!(!bench.dir.level());

    assert_eq!(act.move_by(-7, Speed::MAX), MoveResult::Ok);
    assert_eq!(act.locate(), 0);
    assert_eq!(bench.switch.position(), 0);
    assert!(bench.dir.level());

    // One rising and one falling edge per step.
    assert_eq!(bench.step.toggles(), 28);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn relative_moves_return_to_start(start in -10i32..10, steps in -20i32..20) {
        let (bench, kp) = pulse_rig();
        let act = kp.actuator();
        act.power_on();
        prop_assert_eq!(act.move_to(start, Speed::MAX), MoveResult::Ok);
        let toggles = bench.step.toggles();

        prop_assert_eq!(act.move_by(steps, Speed::MAX), MoveResult::Ok);
        prop_assert_eq!(act.locate(), start + steps);
        prop_assert_eq!(act.move_by(-steps, Speed::MAX), MoveResult::Ok);
        prop_assert_eq!(act.locate(), start);
        prop_assert_eq!(bench.switch.position(), start);
        prop_assert_eq!(bench.step.toggles() - toggles, 4 * u64::from(steps.unsigned_abs()));
    }
}

#[test]
fn move_to_current_position_does_not_step() {
    let (bench, kp) = pulse_rig();
    let act = kp.actuator();
    act.power_on();

    assert_eq!(act.move_to(0, Speed::MAX), MoveResult::Ok);
    assert_eq!(bench.step.toggles(), 0);
}

#[test]
fn finish_move_times_out_without_affecting_the_move() {
    let (_bench, kp) = pulse_rig();
    let act = kp.actuator();
    act.power_on();

    act.start_move_to(100, Speed::MAX);
    assert_eq!(act.finish_move(Timeout::NoWait), MoveResult::Timeout);
    assert_eq!(act.finish_move(Timeout::Forever), MoveResult::Ok);
    assert_eq!(act.locate(), 100);
}

#[test]
fn abort_stops_within_range() {
    let (_bench, kp) = pulse_rig();
    let act = kp.actuator();
    act.power_on();

    act.start_move_to(1000, Speed::MAX);
    thread::sleep(Duration::from_millis(5));
    assert!(act.abort());
    let rc = act.finish_move(Timeout::Forever);
    assert!(matches!(rc, MoveResult::Aborted | MoveResult::Ok), "{rc}");
    let pos = act.locate();
    assert!((0..=1000).contains(&pos), "position {pos} out of range");

    // A stale abort is forgotten by the next move.
    assert!(act.abort());
    assert_eq!(act.move_to(0, Speed::MAX), MoveResult::Ok);
    assert_eq!(act.locate(), 0);
}

#[test]
fn power_off_finishes_move_in_flight() {
    let (bench, kp) = pulse_rig();
    let act = kp.actuator();
    act.power_on();

    act.start_move_to(1000, Speed::MAX);
    thread::sleep(Duration::from_millis(5));
    assert!(act.power_off());
    assert_eq!(act.finish_move(Timeout::Forever), MoveResult::PoweredOff);
    assert_eq!(act.locate(), POS_INVALID);
    assert!(!act.abort());

    let toggles = bench.step.toggles();
    thread::sleep(Duration::from_millis(5));
    assert_eq!(bench.step.toggles(), toggles);
}

#[test]
fn power_cycle_during_move_reports_powered_off() {
    let (bench, kp) = pulse_rig();
    let act = kp.actuator();
    act.power_on();

    // 4ms per step.
    act.start_move_to(20, Speed::MIN);
    thread::sleep(Duration::from_millis(10));
    assert!(act.power_off());
    assert!(act.power_on());
    assert_eq!(act.finish_move(Timeout::Forever), MoveResult::PoweredOff);
    assert_eq!(act.locate(), 0);

    let toggles = bench.step.toggles();
    thread::sleep(Duration::from_millis(10));
    assert_eq!(bench.step.toggles(), toggles);

    // The next move runs normally.
    assert_eq!(act.move_to(2, Speed::MAX), MoveResult::Ok);
    assert_eq!(act.locate(), 2);
}

#[test]
fn start_move_waits_for_previous_result_collection() {
    let (_bench, kp) = pulse_rig();
    let act = kp.actuator();
    act.power_on();

    act.start_move_to(20, Speed::MAX);
    thread::scope(|s| {
        let second = s.spawn(|| act.start_move_to(0, Speed::MAX));
        thread::sleep(Duration::from_millis(20));
        assert!(!second.is_finished());
        assert_eq!(act.finish_move(Timeout::Forever), MoveResult::Ok);
        second.join().unwrap();
    });
    assert_eq!(act.finish_move(Timeout::Forever), MoveResult::Ok);
    assert_eq!(act.locate(), 0);
}

#[test]
fn reversing_waits_for_turnaround() {
    let (_bench, kp) = pulse_rig();
    let act = kp.actuator();
    act.power_on();

    assert_eq!(act.move_by(2, Speed::MAX), MoveResult::Ok);
    let start = Instant::now();
    assert_eq!(act.move_by(-2, Speed::MAX), MoveResult::Ok);
    // 2 x 4000us at full speed with the default periods, less the time
    // since the last step.
    assert!(start.elapsed() >= Duration::from_millis(5));
}

#[test]
fn done_event_wakes_a_poller() {
    let (_bench, kp) = pulse_rig();
    let act = kp.actuator();
    act.power_on();

    act.start_move_to(20, Speed::MAX);
    let poller = Poller::new();
    let ready = poller.poll(
        [act.done_event() as &dyn Pollable],
        Timeout::After(Duration::from_secs(5)),
    );
    assert_eq!(ready, Some([true]));
    assert_eq!(act.finish_move(Timeout::NoWait), MoveResult::Ok);
}
