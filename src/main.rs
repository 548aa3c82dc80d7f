// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! HydroWatch - Water Infrastructure Level Monitor
//!
//! Polls the reservoir water level, classifies it against the configured
//! thresholds and raises notifications when the status changes. A critical
//! level keeps re-notifying until the level recovers or alerts are stopped.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hydrowatch::core::{Engine, EventPayload};
use hydrowatch::notify::Notifier;
use hydrowatch::{build_info, open_source, Config, NAME, VERSION};

/// HydroWatch - Water Infrastructure Level Monitor
#[derive(Parser, Debug)]
#[command(name = "hydrowatch")]
#[command(author = "HydroWatch Project")]
#[command(version = VERSION)]
#[command(about = "Water-level monitoring with escalating critical alerts")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Water level source (file path or http(s) URL)
    #[arg(short, long)]
    source: Option<String>,

    /// Demo mode with a simulated water level
    #[arg(long)]
    demo: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// MQTT broker address for alert delivery
    #[arg(long)]
    mqtt_broker: Option<String>,

    /// Print every published snapshot as a JSON line on stdout
    #[arg(long)]
    print_snapshots: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
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
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let build = build_info();
    info!("💧 {} v{} - Water Infrastructure Level Monitor", NAME, build.version);
    info!("   Built for {}-{}", build.target, build.os);

    // Load or create configuration
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(source) = args.source {
        config.source.location = source;
    }
    if let Some(mqtt) = args.mqtt_broker {
        config.notifications.mqtt_enabled = true;
        config.notifications.mqtt_broker = mqtt;
    }
    config.validate()?;

    info!("Configuration loaded from {:?}", config_path);
    info!("Demo mode: {}", config.demo_mode);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, args.print_snapshots))
}

/// Run the monitor until Ctrl+C
async fn run(config: Config, print_snapshots: bool) -> Result<()> {
    let source = open_source(&config.source, config.demo_mode)?;
    let notifier = Notifier::from_config(&config).await?;

    let mut engine = Engine::start(config, source, notifier).await?;
    let mut snapshots = engine.subscribe();
    let mut events = engine.subscribe_events();

    info!("🚀 Monitoring started");
    info!("   Press Ctrl+C to shutdown");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("Snapshot channel closed");
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if print_snapshots {
                    println!("{}", serde_json::to_string(&*snapshot)?);
                }
            }
            event = events.recv() => match event {
                Ok(event) => match event.payload {
                    EventPayload::StatusChanged { from, to, value } => {
                        info!("Status changed {} -> {} at {}m", from, to, value);
                    }
                    EventPayload::Escalation { active } => {
                        info!("Critical escalation {}", if active { "running" } else { "stopped" });
                    }
                    EventPayload::Reading(reading) => {
                        debug!("Reading {}m at {}", reading.value, reading.observed_at);
                    }
                    EventPayload::Notification { notification, delivered } => {
                        debug!("Notification {:?} delivered: {}", notification.kind, delivered);
                    }
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event listener lagged, {} events dropped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            result = &mut shutdown => {
                result?;
                info!("Shutdown signal received, cleaning up...");
                break;
            }
        }
    }

    engine.stop().await?;
    info!("{} shutdown complete", NAME);

    Ok(())
}
