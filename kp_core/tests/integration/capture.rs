//! Integration test: capture windows, overcapture and late edges.

use super::common::{one_channel, pulse_rig};
use kp_common::capture::{CaptureDirs, CaptureResultCode, ChannelResult, ChannelStatus, Edge};
use kp_common::consts::{CAP_CH_NUM, CAP_RES_US, CAP_VALUE_NONE_US};
use kp_core::sync::Timeout;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn window_without_channels_elapses_in_full() {
    let (bench, kp) = pulse_rig();
    let capturer = kp.capturer();

    capturer.start(&one_channel(CaptureDirs::NONE, 1000, 0), CaptureDirs::BOTH);
    let start = Instant::now();
    assert!(bench.capture.inject_trigger());
    let mut results = [ChannelResult::default(); CAP_CH_NUM];
    assert_eq!(
        capturer.finish(&mut results, Timeout::Forever),
        CaptureResultCode::Ok
    );
    assert!(start.elapsed() >= Duration::from_micros(u64::from(1000 - CAP_RES_US)));
    assert!(!bench.capture.is_counting());
}

#[test]
fn second_edge_overcaptures_keeping_the_first() {
    let (bench, kp) = pulse_rig();
    let capturer = kp.capturer();

    capturer.start(&one_channel(CaptureDirs::DOWN, 100_000, 50_000), CaptureDirs::DOWN);
    assert!(bench.capture.inject_trigger());
    assert!(bench.capture.inject_edge(0, Edge::Rising));
    thread::sleep(Duration::from_millis(10));
    assert!(bench.capture.inject_edge(0, Edge::Rising));

    let mut results = [ChannelResult::default(); CAP_CH_NUM];
    assert_eq!(
        capturer.finish(&mut results, Timeout::Forever),
        CaptureResultCode::Ok
    );
    assert_eq!(results[0].status, ChannelStatus::Overcapture);
    assert!(results[0].value_us < 10_000, "{:?}", results[0]);
    assert_eq!(results[1], ChannelResult::default());
}

#[test]
fn edge_after_timeout_is_reported_as_timeout() {
    let (bench, kp) = pulse_rig();
    let capturer = kp.capturer();

    // Only the bounce period is still open after 5ms.
    capturer.start(&one_channel(CaptureDirs::BOTH, 1000, 50_000), CaptureDirs::UP);
    assert!(bench.capture.inject_trigger());
    thread::sleep(Duration::from_millis(5));
    assert!(bench.capture.inject_edge(0, Edge::Rising));

    let mut results = [ChannelResult::default(); CAP_CH_NUM];
    assert_eq!(
        capturer.finish(&mut results, Timeout::Forever),
        CaptureResultCode::Ok
    );
    assert_eq!(results[0].status, ChannelStatus::Timeout);
    assert_ne!(results[0].value_us, CAP_VALUE_NONE_US);
    assert!(results[0].value_us > 1000);
}

#[test]
fn start_waits_for_previous_result_collection() {
    let (bench, kp) = pulse_rig();
    let capturer = kp.capturer();
    let conf = one_channel(CaptureDirs::BOTH, 1000, 0);

    capturer.start(&conf, CaptureDirs::BOTH);
    bench.capture.inject_trigger();
    thread::scope(|s| {
        let second = s.spawn(|| {
            capturer.start(&conf, CaptureDirs::BOTH);
            assert!(capturer.abort());
        });
        thread::sleep(Duration::from_millis(20));
        assert!(!second.is_finished());
        let mut results = [ChannelResult::default(); CAP_CH_NUM];
        assert_eq!(
            capturer.finish(&mut results, Timeout::Forever),
            CaptureResultCode::Ok
        );
        second.join().unwrap();
    });
    let mut results = [ChannelResult::default(); CAP_CH_NUM];
    assert_eq!(
        capturer.finish(&mut results, Timeout::Forever),
        CaptureResultCode::Aborted
    );
}
