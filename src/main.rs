// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Thermalert demo driver
//!
//! Feeds synthetic temperature-grid frames (ambient field plus a drifting
//! hot spot) through the engine and logs the alerts it emits. Real
//! deployments replace this loop with their own frame source.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::prelude::*;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use thermalert::detection::{AlertRule, RuleType};
use thermalert::notify::{run_dispatch, LogSink};
use thermalert::range::{AlertThreshold, ThresholdCondition};
use thermalert::{Config, ThermalEngine, ThermalFrame, VERSION};

/// Thermalert - Thermal Alert Engine
#[derive(Parser, Debug)]
#[command(name = "thermalert")]
#[command(author = "Thermalert Project")]
#[command(version = VERSION)]
#[command(about = "Thermal anomaly alerting over temperature-grid streams")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to generate
    #[arg(long, default_value = "300")]
    frames: u64,

    /// Frames per second
    #[arg(long, default_value = "10.0")]
    fps: f64,

    /// Grid width in pixels
    #[arg(long, default_value = "32")]
    width: usize,

    /// Grid height in pixels
    #[arg(long, default_value = "24")]
    height: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let mut args = Args::parse();

    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Thermalert v{VERSION} - Thermal Alert Engine");

    let config_path = args.config.take().unwrap_or_else(Config::default_path);
    let config = Config::load_or_create(&config_path)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_demo(config, args))
}

async fn run_demo(config: Config, args: Args) -> Result<()> {
    let engine = Arc::new(ThermalEngine::new(config));

    let mut overheat = AlertRule::new("demo_overheat", "Overheat", RuleType::HighTemperature, 60.0);
    overheat.conditions.min_pixel_count = 4;
    overheat.cooldown_ms = 5_000;
    overheat.hysteresis = 2.0;
    engine.add_rule(overheat)?;

    let mut anomaly = AlertRule::new("demo_anomaly", "Statistical anomaly", RuleType::Anomaly, 4.0);
    anomaly.cooldown_ms = 10_000;
    engine.add_rule(anomaly)?;

    engine.add_alert_threshold(AlertThreshold::new(
        "scalding",
        80.0,
        ThresholdCondition::Above,
    ))?;

    // Drain the alert bus off the frame path
    let (shutdown_tx, _) = broadcast::channel(1);
    let dispatch = tokio::spawn(run_dispatch(
        engine.bus(),
        Arc::new(LogSink),
        shutdown_tx.subscribe(),
    ));

    let frame_interval = Duration::from_secs_f64(1.0 / args.fps.max(0.1));
    let frame_ms = frame_interval.as_millis() as u64;
    let mut rng = rand::rngs::StdRng::from_entropy();

    info!(
        frames = args.frames,
        width = args.width,
        height = args.height,
        "starting synthetic frame loop"
    );

    for n in 0..args.frames {
        let frame = synth_frame(&mut rng, n, n * frame_ms, args.width, args.height);
        let alerts = engine.process_frame(&frame);
        if !alerts.is_empty() {
            info!(frame = n, emitted = alerts.len(), "alerts emitted");
        }
        tokio::time::sleep(frame_interval).await;
    }

    let stats = engine.statistics();
    let range = engine.temperature_range();
    info!(
        total_alerts = stats.total_alerts,
        range_min = range.min,
        range_max = range.max,
        "demo complete"
    );

    let _ = shutdown_tx.send(());
    let _ = dispatch.await;
    Ok(())
}

/// Ambient field with sensor noise plus a hot spot that wanders and
/// periodically flares past the demo rule thresholds.
fn synth_frame(
    rng: &mut rand::rngs::StdRng,
    frame_number: u64,
    timestamp_ms: u64,
    width: usize,
    height: usize,
) -> ThermalFrame {
    let t = frame_number as f64 * 0.1;
    let cx = width as f64 * (0.5 + 0.3 * (t * 0.23).sin());
    let cy = height as f64 * (0.5 + 0.3 * (t * 0.31).cos());
    let flare = if (t * 0.07).sin() > 0.6 { 70.0 } else { 25.0 };

    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let ambient = 22.0 + rng.gen_range(-0.5..0.5);
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            let spot = flare * (-(dx * dx + dy * dy) / 8.0).exp();
            data.push(ambient + spot);
        }
    }

    ThermalFrame::from_data(timestamp_ms, frame_number, width, height, data)
        .expect("generated frame is well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let mut args = Args::try_parse_from(["thermalert"]).unwrap();
        assert!(args.config.take().is_none());
        assert_eq!(args.frames, 300);
        assert_eq!(args.width, 32);
        assert_eq!(args.height, 24);
    }

    #[test]
    fn test_synth_frame_geometry() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let frame = synth_frame(&mut rng, 0, 0, 32, 24);
        assert_eq!(frame.temperature_data.len(), 32 * 24);
        assert!(frame.max_temp >= frame.min_temp);
    }
}
