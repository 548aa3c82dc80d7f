// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! HydroWatch - Water Infrastructure Level Monitor
//!
//! A headless monitoring engine for a water reservoir:
//! - Periodic water-level polling from a file, an HTTP endpoint or a simulator
//! - Normal / Warning / Critical classification with trend detection
//! - Transition-driven notifications with a repeating critical escalation
//! - Terminal and MQTT notification channels
//! - Published dashboard snapshots with simulated secondary metrics
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      HydroWatch Engine                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐   │
//! │  │ Value   │ → │ Analysis │ → │ Alerting │ → │ Notifier  │   │
//! │  │ Source  │   │          │   │ FSM      │   │ (sinks)   │   │
//! │  └─────────┘   └──────────┘   └──────────┘   └───────────┘   │
//! │       ↓              ↓              ↓              ↓         │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │          Metrics Store (watch) / Event Bus             │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod core;
pub mod sensors;
pub mod analysis;
pub mod alerting;
pub mod notify;
pub mod metrics;
pub mod config;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use config::Config;
pub use core::{Engine, EngineError, EventBus, PollOutcome};
pub use sensors::{open_source, Reading, ValueSource};
pub use analysis::{Status, Thresholds, Trend};
pub use alerting::{AlertStateMachine, Transition};
pub use notify::{Notification, Notifier, Permission};
pub use metrics::{MetricsStore, Snapshot};

/// HydroWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// HydroWatch name
pub const NAME: &str = "HydroWatch";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
}
