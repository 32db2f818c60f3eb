//! Integration test: multi-pass measurement acquisition.

use super::common::{one_channel, pulse_rig};
use kp_common::actuator::Speed;
use kp_common::capture::{CaptureConfig, CaptureDirs, ChannelConfig, ChannelStatus, Edge};
use kp_common::sample::SampleResult;
use kp_core::input::InputMsg;
use kp_core::measure::Measurement;

#[test]
fn acquires_every_pass() {
    let (_bench, kp) = pulse_rig();
    kp.actuator().power_on();
    let conf = one_channel(CaptureDirs::BOTH, 20_000, 1000);
    let mut meas = Measurement::new(0, 10, Speed::MAX, 3, &conf, true);
    let mut seen = Vec::new();

    let rc = meas.acquire(&kp.sampler(), |meas| seen.push(meas.passes()));
    assert_eq!(rc, SampleResult::Ok);
    assert_eq!(seen, [1, 2, 3]);
    assert_eq!(meas.passes(), 3);
    assert_eq!(meas.captured_passes(), 3);
    assert_eq!(kp.actuator().locate(), 10);

    for pass in 0..3 {
        let down = pass % 2 == 0;
        assert_eq!(meas.pass_dirs(pass), CaptureDirs::from_down(down));
        assert_eq!(meas.pass_ch_res(pass).len(), 1);
        let res = meas.ch_res(pass, 0).unwrap();
        assert_eq!(res.status, ChannelStatus::Ok, "pass {pass}");
        assert!(meas.ch_res(pass, 1).is_none());
    }
}

#[test]
fn channels_are_packed_per_direction() {
    let (_bench, kp) = pulse_rig();
    kp.actuator().power_on();
    let conf = CaptureConfig {
        channels: [
            ChannelConfig::new(CaptureDirs::DOWN, Edge::Rising),
            ChannelConfig::new(CaptureDirs::BOTH, Edge::Falling),
        ],
        timeout_us: 20_000,
        bounce_us: 1000,
    };
    let mut meas = Measurement::new(0, 10, Speed::MAX, 2, &conf, true);
    assert_eq!(meas.requested_ch_num(), 2);

    assert_eq!(meas.acquire(&kp.sampler(), |_| {}), SampleResult::Ok);
    assert_eq!(meas.pass_ch_num(0), 2);
    assert_eq!(meas.pass_ch_num(1), 1);
    assert_eq!(meas.pass_ch_res(0).len(), 2);
    assert_eq!(meas.pass_ch_res(1).len(), 1);
    // The pulse wiring gives both polarities on every transition.
    assert!(meas.pass_ch_res(0).iter().all(|res| res.triggered()));
    assert_eq!(meas.ch_res(1, 1), meas.pass_ch_res(1).first());
    assert!(meas.ch_res(1, 0).is_none());
}

#[test]
fn interrupted_acquisition_keeps_completed_passes() {
    let (_bench, kp) = pulse_rig();
    let conf = one_channel(CaptureDirs::BOTH, 20_000, 1000);
    let mut meas = Measurement::new(0, 10, Speed::MAX, 2, &conf, true);

    // Powered off: fails before the first pass.
    assert_eq!(meas.acquire(&kp.sampler(), |_| {}), SampleResult::PoweredOff);
    assert!(meas.is_empty());

    kp.actuator().power_on();
    let input = kp.input_handle();
    let rc = meas.acquire(&kp.sampler(), |meas| {
        if meas.passes() == 1 {
            input.send(InputMsg::Abort);
        }
    });
    assert_eq!(rc, SampleResult::Aborted);
    assert_eq!(meas.passes(), 1);
    assert_eq!(meas.pass_ch_res(0).len(), 1);
}
