//! Metrics module - the published dashboard snapshot

mod seed;
mod store;

pub use seed::{initial_metrics, initial_sensors};
pub use store::MetricsStore;

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{Status, Trend};
use crate::notify::Permission;

/// Id of the metric driven by the polling engine
pub const WATER_LEVEL_ID: &str = "1";

/// One monitored quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    pub label: String,
    pub value: f64,
    pub unit: String,
    pub trend: Trend,
    pub change: f64,
    pub status: Status,
}

/// Field-device operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    Active,
    Maintenance,
    Offline,
}

/// A field device shown in the sensor grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSensor {
    pub id: String,
    pub name: String,
    pub location: String,
    pub status: SensorStatus,
    /// Battery charge in percent, 0-100
    pub battery: f64,
    pub last_reading: String,
}

/// A labelled chart sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time: String,
    pub value: f64,
}

/// Immutable view handed to readers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub metrics: Vec<Metric>,
    pub sensors: Vec<FieldSensor>,
    pub realtime: VecDeque<ChartPoint>,
    pub historical: Vec<ChartPoint>,
    pub alert_active: bool,
    pub permission: Permission,
    pub polls: u64,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn metric(&self, id: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.id == id)
    }

    pub fn water_level(&self) -> Option<&Metric> {
        self.metric(WATER_LEVEL_ID)
    }
}
