// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Single-writer metrics store
//!
//! The store keeps one working [`Snapshot`] that only its owner mutates.
//! [`MetricsStore::publish`] hands readers a fresh `Arc<Snapshot>` through a
//! watch channel; readers never see a half-applied update.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;

use super::seed::{historical_series, initial_metrics, initial_sensors, minute_label, realtime_series, realtime_value};
use super::{ChartPoint, Metric, Snapshot, WATER_LEVEL_ID};
use crate::analysis::{classify_trend, round_tenth, Status, Trend};
use crate::config::PollingConfig;
use crate::notify::Permission;

pub struct MetricsStore {
    current: Snapshot,
    tx: watch::Sender<Arc<Snapshot>>,
    rng: StdRng,
    realtime_window: usize,
    metric_sensitivity: f64,
}

impl MetricsStore {
    pub fn new(polling: &PollingConfig, water_level: f64, metric_sensitivity: f64) -> Self {
        Self::with_rng(polling, water_level, metric_sensitivity, StdRng::from_entropy())
    }

    /// Deterministic jitter for tests and replays
    pub fn seeded(polling: &PollingConfig, water_level: f64, metric_sensitivity: f64, seed: u64) -> Self {
        Self::with_rng(polling, water_level, metric_sensitivity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(polling: &PollingConfig, water_level: f64, metric_sensitivity: f64, mut rng: StdRng) -> Self {
        let now = Local::now();
        let current = Snapshot {
            metrics: initial_metrics(water_level),
            sensors: initial_sensors(),
            realtime: realtime_series(&mut rng, now, polling.realtime_window),
            historical: historical_series(&mut rng, now, polling.history_hours),
            alert_active: false,
            permission: Permission::Default,
            polls: 0,
            updated_at: Utc::now(),
        };
        let (tx, _) = watch::channel(Arc::new(current.clone()));

        Self {
            current,
            tx,
            rng,
            realtime_window: polling.realtime_window,
            metric_sensitivity,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// Last published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    /// Working copy, including unpublished changes
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn water_level(&self) -> Option<&Metric> {
        self.current.water_level()
    }

    pub fn update_water_level(&mut self, value: f64, change: f64, trend: Trend, status: Status) {
        if let Some(metric) = self.current.metrics.iter_mut().find(|m| m.id == WATER_LEVEL_ID) {
            metric.value = value;
            metric.change = round_tenth(change);
            metric.trend = trend;
            metric.status = status;
        }
    }

    pub fn record_poll(&mut self) {
        self.current.polls += 1;
    }

    pub fn set_alert_active(&mut self, active: bool) {
        self.current.alert_active = active;
    }

    pub fn set_permission(&mut self, permission: Permission) {
        self.current.permission = permission;
    }

    /// Periodic simulation step: small jitter on secondary metrics and one
    /// new live-chart point, oldest point dropped
    pub fn simulate_tick(&mut self, now: DateTime<Local>) {
        self.jitter_secondary(0.1, 0.1);

        let point = ChartPoint {
            time: minute_label(now),
            value: realtime_value(&mut self.rng),
        };
        if self.current.realtime.len() >= self.realtime_window {
            self.current.realtime.pop_front();
        }
        self.current.realtime.push_back(point);
    }

    /// Manual refresh pass: wider jitter on secondary metrics, battery drift
    /// and fresh "last reading" ages on the field sensors
    pub fn refresh_jitter(&mut self) {
        self.jitter_secondary(1.0, 0.2);

        for sensor in self.current.sensors.iter_mut() {
            let drift = (self.rng.gen::<f64>() - 0.5) * 2.0;
            sensor.battery = (sensor.battery + drift).clamp(0.0, 100.0);
            sensor.last_reading = format!("{}m ago", self.rng.gen_range(1..=10));
        }
    }

    /// `value += U(-v/2, v/2)`, `change += U(-c/2, c/2)`, both to one decimal
    fn jitter_secondary(&mut self, value_span: f64, change_span: f64) {
        for metric in self.current.metrics.iter_mut().filter(|m| m.id != WATER_LEVEL_ID) {
            metric.value = round_tenth(metric.value + (self.rng.gen::<f64>() - 0.5) * value_span);
            metric.change = round_tenth(metric.change + (self.rng.gen::<f64>() - 0.5) * change_span);
            metric.trend = classify_trend(metric.change, self.metric_sensitivity);
        }
    }

    /// Publish the working copy to every reader
    pub fn publish(&mut self) -> Arc<Snapshot> {
        self.current.updated_at = Utc::now();
        let snapshot = Arc::new(self.current.clone());
        self.tx.send_replace(snapshot.clone());
        snapshot
    }
}
