//! # Keypecker
//!
//! Exercises a key switch on a simulated Keypecker bench: checks that the
//! configured capture channels trigger over the configured range, then
//! acquires a measurement over the same range and logs every pass.
//!
//! Ctrl-C aborts the movement and capture in progress.

use clap::Parser;
use kp_common::actuator::pos_is_valid;
use kp_common::capture::{CaptureConfig, CaptureDirs};
use kp_common::config::{ConfigLoader, KeypeckerConfig, LogLevel};
use kp_common::consts::CAP_CH_NUM;
use kp_common::sample::SampleResult;
use kp_core::Keypecker;
use kp_core::input::InputMsg;
use kp_core::measure::Measurement;
use kp_hal::drivers::simulation::SimulatedBench;
use std::path::PathBuf;
use std::process;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Keypecker - key switch actuation and edge timing bench
#[derive(Parser, Debug)]
#[command(name = "keypecker")]
#[command(version)]
#[command(about = "Key switch actuation and edge timing bench (simulated)")]
struct Args {
    /// Path to the configuration TOML.
    #[arg(short, long, default_value = "config/keypecker.toml")]
    config: PathBuf,

    /// Number of passes, overriding the configured `check.passes`.
    #[arg(long, value_name = "N")]
    passes: Option<usize>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = KeypeckerConfig::load(&args.config);
    let log_level = config
        .as_ref()
        .map(|config| config.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    info!("Keypecker v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, &config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Keypecker shutdown complete");
}

fn run(args: &Args, config: &KeypeckerConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let capture = config.capture.to_capture_config()?;
    if capture.ch_num(CaptureDirs::BOTH) == 0 {
        return Err("no capture channels enabled".into());
    }
    let check = &config.check;
    let passes = args.passes.unwrap_or(check.passes);
    info!(
        service = %config.shared.service_name,
        top = check.top,
        bottom = check.bottom,
        speed = %check.speed,
        passes,
        "Config OK"
    );

    let (bench, bindings) = SimulatedBench::new(&config.simulation)?;
    let kp = Keypecker::new(bindings, config.actuator)?;

    let input = kp.input_handle();
    ctrlc::set_handler(move || {
        input.send(InputMsg::Abort);
    })?;

    kp.actuator().power_on();
    let result = exercise(&kp, config, &capture, passes);
    kp.actuator().power_off();

    info!(
        transitions = bench.switch.transitions(),
        "simulated switch transitions"
    );
    result
}

fn exercise(
    kp: &Keypecker,
    config: &KeypeckerConfig,
    capture: &CaptureConfig,
    passes: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let check = &config.check;
    let sampler = kp.sampler();

    let outcome = sampler.check(check.top, check.bottom, check.speed, passes, capture);
    info!(result = %outcome.result, triggers = outcome.triggers, passes, "check done");
    if outcome.result != SampleResult::Ok {
        warn!("skipping measurement");
        return Ok(());
    }

    let pos = kp.actuator().locate();
    if !pos_is_valid(pos) {
        return Err("actuator powered off".into());
    }
    let even_down = pos.abs_diff(check.top) < pos.abs_diff(check.bottom);
    if !Measurement::fits(capture, even_down, passes) {
        return Err(format!("{passes} passes don't fit the measurement result list").into());
    }

    let mut meas = Measurement::new(check.top, check.bottom, check.speed, passes, capture, even_down);
    if meas.is_null() {
        warn!("measurement captures no channels");
    }
    let rc = meas.acquire(&sampler, log_pass);
    info!(
        result = %rc,
        passes = meas.passes(),
        captured_passes = meas.captured_passes(),
        "measurement done"
    );
    Ok(())
}

/// Log the channel results of the latest pass.
fn log_pass(meas: &Measurement) {
    let pass = meas.passes() - 1;
    let dirs = meas.pass_dirs(pass);
    for ch in 0..CAP_CH_NUM {
        let Some(res) = meas.ch_res(pass, ch) else {
            continue;
        };
        info!(
            pass,
            dir = dirs.title(),
            ch,
            name = %meas.conf().channels[ch].name,
            status = %res.status,
            value_us = res.value_us,
            "pass result"
        );
    }
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        log_level.as_level()
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
