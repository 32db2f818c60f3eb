//! Shared fixtures: simulated benches and capture configurations.

use kp_common::actuator::StepPeriods;
use kp_common::capture::{CaptureConfig, CaptureDirs, ChannelConfig, Edge};
use kp_common::config::{ChannelWiring, SimulationConfig};
use kp_core::Keypecker;
use kp_hal::drivers::simulation::SimulatedBench;

/// A rig on a simulated bench whose switch actuates at `actuation`, with
/// both capture channels wired the same way.
pub fn rig(actuation: i32, wiring: ChannelWiring) -> (SimulatedBench, Keypecker) {
    let sim = SimulationConfig {
        actuation,
        channels: [wiring; 2],
        ..Default::default()
    };
    let (bench, bindings) = SimulatedBench::new(&sim).unwrap();
    let kp = Keypecker::new(bindings, StepPeriods::default()).unwrap();
    (bench, kp)
}

/// A powered-off rig whose switch always triggers between positions 0
/// and 10.
pub fn pulse_rig() -> (SimulatedBench, Keypecker) {
    rig(5, ChannelWiring::Pulse)
}

/// Channel 0 capturing rising edges in `dirs`, channel 1 disabled.
pub fn one_channel(dirs: CaptureDirs, timeout_us: u32, bounce_us: u32) -> CaptureConfig {
    CaptureConfig {
        channels: [
            ChannelConfig::new(dirs, Edge::Rising),
            ChannelConfig::new(CaptureDirs::NONE, Edge::Rising),
        ],
        timeout_us,
        bounce_us,
    }
}
