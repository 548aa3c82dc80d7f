// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Start-up dashboard data

use chrono::{DateTime, Duration, Local, Timelike};
use rand::Rng;
use std::collections::VecDeque;

use super::{ChartPoint, FieldSensor, Metric, SensorStatus, WATER_LEVEL_ID};
use crate::analysis::{Status, Trend};

fn metric(id: &str, label: &str, value: f64, unit: &str, trend: Trend, change: f64, status: Status) -> Metric {
    Metric {
        id: id.to_string(),
        label: label.to_string(),
        value,
        unit: unit.to_string(),
        trend,
        change,
        status,
    }
}

fn sensor(id: &str, name: &str, location: &str, status: SensorStatus, battery: f64, last_reading: &str) -> FieldSensor {
    FieldSensor {
        id: id.to_string(),
        name: name.to_string(),
        location: location.to_string(),
        status,
        battery,
        last_reading: last_reading.to_string(),
    }
}

/// Metric cards before the first poll
pub fn initial_metrics(water_level: f64) -> Vec<Metric> {
    vec![
        metric(WATER_LEVEL_ID, "Water Level", water_level, "m", Trend::Rising, 2.3, Status::Normal),
        metric("2", "Flow Rate", 450.0, "m³/h", Trend::Falling, -1.2, Status::Normal),
        metric("3", "Pressure", 8.2, "bar", Trend::Stable, 0.1, Status::Warning),
        metric("4", "Temperature", 18.5, "°C", Trend::Rising, 0.5, Status::Normal),
    ]
}

/// Field devices in the sensor grid
pub fn initial_sensors() -> Vec<FieldSensor> {
    vec![
        sensor("s1", "Inlet Valve A", "North Sector", SensorStatus::Active, 85.0, "2m ago"),
        sensor("s2", "Pump Station B", "East Sector", SensorStatus::Active, 92.0, "1m ago"),
        sensor("s3", "Overflow Sensor", "South Sector", SensorStatus::Maintenance, 45.0, "15m ago"),
        sensor("s4", "Quality Monitor", "Main Tank", SensorStatus::Active, 78.0, "5m ago"),
    ]
}

pub(super) fn minute_label(t: DateTime<Local>) -> String {
    format!("{}:{:02}", t.hour(), t.minute())
}

pub(super) fn hour_label(t: DateTime<Local>) -> String {
    format!("{}:00", t.hour())
}

pub(super) fn realtime_value<R: Rng>(rng: &mut R) -> f64 {
    12.0 + rng.gen::<f64>() * 0.5
}

/// `hours + 1` hourly points ending at `now`
pub(super) fn historical_series<R: Rng>(rng: &mut R, now: DateTime<Local>, hours: u32) -> Vec<ChartPoint> {
    (0..=hours)
        .rev()
        .map(|i| ChartPoint {
            time: hour_label(now - Duration::hours(i as i64)),
            value: 10.0 + rng.gen::<f64>() * 5.0,
        })
        .collect()
}

/// `points` minute samples ending at `now`
pub(super) fn realtime_series<R: Rng>(rng: &mut R, now: DateTime<Local>, points: usize) -> VecDeque<ChartPoint> {
    (0..points)
        .rev()
        .map(|i| ChartPoint {
            time: minute_label(now - Duration::minutes(i as i64)),
            value: realtime_value(rng),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_initial_roster() {
        let metrics = initial_metrics(220.8);
        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics[0].id, WATER_LEVEL_ID);
        assert_eq!(metrics[0].value, 220.8);
        assert_eq!(metrics[2].status, Status::Warning);
        assert_eq!(initial_sensors()[2].status, SensorStatus::Maintenance);
    }

    #[test]
    fn test_series_shapes_and_labels() {
        let mut rng = StdRng::seed_from_u64(1);
        let now = Local.with_ymd_and_hms(2026, 3, 14, 9, 5, 0).unwrap();

        let history = historical_series(&mut rng, now, 24);
        assert_eq!(history.len(), 25);
        assert_eq!(history.last().unwrap().time, "9:00");
        assert_eq!(history.first().unwrap().time, "9:00");
        assert_eq!(history[1].time, "10:00");
        assert!(history.iter().all(|p| (10.0..15.0).contains(&p.value)));

        let live = realtime_series(&mut rng, now, 31);
        assert_eq!(live.len(), 31);
        assert_eq!(live.back().unwrap().time, "9:05");
        assert_eq!(live.front().unwrap().time, "8:35");
        assert!(live.iter().all(|p| (12.0..12.5).contains(&p.value)));
    }
}
