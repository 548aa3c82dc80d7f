// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Status and trend classification
//!
//! Both classifiers are pure: the same input always yields the same output
//! and nothing is stored. Status is recomputed from every reading rather than
//! cached next to it.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

/// Trend sensitivity for the water-level metric (metres per poll)
pub const WATER_LEVEL_SENSITIVITY: f64 = 0.1;

/// Trend sensitivity for every secondary metric
pub const METRIC_SENSITIVITY: f64 = 0.5;

/// Discrete classification of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Normal,
    Warning,
    Critical,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Normal => "normal",
            Status::Warning => "warning",
            Status::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Discrete classification of the rate of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

/// Water-level status bands.
///
/// `[normal_min, normal_max]` is Normal, `(normal_max, warning_max]` is
/// Warning, anything else (including NaN) is Critical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub normal_min: f64,
    pub normal_max: f64,
    pub warning_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            normal_min: 200.0,
            normal_max: 250.0,
            warning_max: 280.0,
        }
    }
}

impl From<&AnalysisConfig> for Thresholds {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            normal_min: config.normal_min,
            normal_max: config.normal_max,
            warning_max: config.warning_max,
        }
    }
}

impl Thresholds {
    pub fn classify(&self, value: f64) -> Status {
        if value >= self.normal_min && value <= self.normal_max {
            Status::Normal
        } else if value > self.normal_max && value <= self.warning_max {
            Status::Warning
        } else {
            Status::Critical
        }
    }
}

/// Classify a water level against the default bands (200 / 250 / 280 m)
pub fn classify_status(value: f64) -> Status {
    Thresholds::default().classify(value)
}

/// Classify a change against a sensitivity threshold
pub fn classify_trend(change: f64, sensitivity: f64) -> Trend {
    if change > sensitivity {
        Trend::Rising
    } else if change < -sensitivity {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

/// Round to one decimal place, the precision every published metric uses
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_bands() {
        assert_eq!(classify_status(220.8), Status::Normal);
        assert_eq!(classify_status(200.0), Status::Normal);
        assert_eq!(classify_status(199.9), Status::Critical);
        assert_eq!(classify_status(265.0), Status::Warning);
        assert_eq!(classify_status(290.0), Status::Critical);
        assert_eq!(classify_status(-1.0), Status::Critical);
    }

    #[test]
    fn test_status_boundaries_are_exact() {
        assert_eq!(classify_status(250.0), Status::Normal);
        assert_eq!(classify_status(250.0001), Status::Warning);
        assert_eq!(classify_status(280.0), Status::Warning);
        assert_eq!(classify_status(280.0001), Status::Critical);
    }

    #[test]
    fn test_status_sweep_matches_bands() {
        let mut v = 150.0;
        while v < 330.0 {
            let expected = if (200.0..=250.0).contains(&v) {
                Status::Normal
            } else if v > 250.0 && v <= 280.0 {
                Status::Warning
            } else {
                Status::Critical
            };
            assert_eq!(classify_status(v), expected, "value {}", v);
            v += 0.37;
        }
    }

    #[test]
    fn test_nan_is_critical() {
        assert_eq!(classify_status(f64::NAN), Status::Critical);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = Thresholds { normal_min: 1.0, normal_max: 2.0, warning_max: 3.0 };
        assert_eq!(t.classify(1.5), Status::Normal);
        assert_eq!(t.classify(2.5), Status::Warning);
        assert_eq!(t.classify(3.5), Status::Critical);
    }

    #[test]
    fn test_trend_water_level_sensitivity() {
        assert_eq!(classify_trend(0.2, WATER_LEVEL_SENSITIVITY), Trend::Rising);
        assert_eq!(classify_trend(-0.2, WATER_LEVEL_SENSITIVITY), Trend::Falling);
        assert_eq!(classify_trend(0.1, WATER_LEVEL_SENSITIVITY), Trend::Stable);
        assert_eq!(classify_trend(-0.1, WATER_LEVEL_SENSITIVITY), Trend::Stable);
        assert_eq!(classify_trend(0.0, WATER_LEVEL_SENSITIVITY), Trend::Stable);
    }

    #[test]
    fn test_trend_metric_sensitivity_is_coarser() {
        assert_eq!(classify_trend(0.3, WATER_LEVEL_SENSITIVITY), Trend::Rising);
        assert_eq!(classify_trend(0.3, METRIC_SENSITIVITY), Trend::Stable);
        assert_eq!(classify_trend(0.51, METRIC_SENSITIVITY), Trend::Rising);
        assert_eq!(classify_trend(-0.51, METRIC_SENSITIVITY), Trend::Falling);
    }

    #[test]
    fn test_round_tenth() {
        assert_eq!(round_tenth(2.34), 2.3);
        assert_eq!(round_tenth(-1.26), -1.3);
        assert_eq!(round_tenth(0.0), 0.0);
    }
}
