// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Configuration module

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Log level
    pub log_level: String,

    /// Enable demo mode (simulated water level)
    pub demo_mode: bool,

    /// Water-level source
    pub source: SourceConfig,

    /// Status bands and trend sensitivities
    pub analysis: AnalysisConfig,

    /// Poll and simulation cadence
    pub polling: PollingConfig,

    /// Critical escalation
    pub alerts: AlertConfig,

    /// Notification channels
    pub notifications: NotificationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "HydroWatch".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            demo_mode: false,
            source: SourceConfig::default(),
            analysis: AnalysisConfig::default(),
            polling: PollingConfig::default(),
            alerts: AlertConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        if !(a.normal_min <= a.normal_max && a.normal_max <= a.warning_max) {
            bail!(
                "thresholds must satisfy normal_min <= normal_max <= warning_max (got {} / {} / {})",
                a.normal_min, a.normal_max, a.warning_max
            );
        }
        for sensitivity in [a.water_level_sensitivity, a.metric_sensitivity] {
            if !(sensitivity.is_finite() && sensitivity > 0.0) {
                bail!("trend sensitivities must be positive finite numbers (got {})", sensitivity);
            }
        }
        if !self.source.default_value.is_finite() {
            bail!("source.default_value must be a finite number");
        }

        let p = &self.polling;
        if p.water_level_interval_secs == 0 || p.simulation_interval_secs == 0 {
            bail!("polling intervals must be at least one second");
        }
        if p.realtime_window == 0 {
            bail!("polling.realtime_window must be at least 1");
        }
        if self.alerts.escalation_interval_secs == 0 {
            bail!("alerts.escalation_interval_secs must be at least one second");
        }
        Ok(())
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("hydrowatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Where the water level is read from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Filesystem path or http(s) URL of the single-value text resource
    pub location: String,

    /// Substituted until the first value is accepted
    pub default_value: f64,

    /// HTTP request timeout
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            location: "./Water_level.txt".to_string(),
            default_value: 220.8,
            request_timeout_secs: 5,
        }
    }
}

/// Analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Lower edge of the Normal band (inclusive)
    pub normal_min: f64,

    /// Upper edge of the Normal band (inclusive)
    pub normal_max: f64,

    /// Upper edge of the Warning band (inclusive)
    pub warning_max: f64,

    /// Trend threshold for the water level
    pub water_level_sensitivity: f64,

    /// Trend threshold for secondary metrics
    pub metric_sensitivity: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            normal_min: 200.0,
            normal_max: 250.0,
            warning_max: 280.0,
            water_level_sensitivity: 0.1,
            metric_sensitivity: 0.5,
        }
    }
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub water_level_interval_secs: u64,
    pub simulation_interval_secs: u64,

    /// Settle delay before a manual refresh runs
    pub refresh_delay_ms: u64,

    /// Number of points kept in the live chart
    pub realtime_window: usize,

    /// Hours of synthetic history seeded at start
    pub history_hours: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            water_level_interval_secs: 5,
            simulation_interval_secs: 3,
            refresh_delay_ms: 1500,
            realtime_window: 31,
            history_hours: 24,
        }
    }
}

impl PollingConfig {
    pub fn water_level_interval(&self) -> Duration {
        Duration::from_secs(self.water_level_interval_secs)
    }

    pub fn simulation_interval(&self) -> Duration {
        Duration::from_secs(self.simulation_interval_secs)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }
}

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Repeat period while the level stays critical
    pub escalation_interval_secs: u64,

    /// Play the audible cue on critical notifications
    pub sound_enabled: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            escalation_interval_secs: 7,
            sound_enabled: true,
        }
    }
}

impl AlertConfig {
    pub fn escalation_interval(&self) -> Duration {
        Duration::from_secs(self.escalation_interval_secs)
    }
}

/// Notification channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub terminal_enabled: bool,

    pub mqtt_enabled: bool,
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            terminal_enabled: true,
            mqtt_enabled: false,
            mqtt_broker: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_client_id: "hydrowatch".to_string(),
            mqtt_username: None,
            mqtt_password: None,
            mqtt_topic: "hydrowatch/alerts".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = Config::default();
        config.analysis.normal_max = 300.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_or_nan_sensitivity_rejected() {
        let mut config = Config::default();
        config.analysis.water_level_sensitivity = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.metric_sensitivity = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.metric_sensitivity = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = Config::default();
        config.polling.realtime_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_create_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.source.location, created.source.location);
        assert_eq!(loaded.alerts.escalation_interval_secs, 7);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[source]\nlocation = \"http://gauge.local/level.txt\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.source.location, "http://gauge.local/level.txt");
        assert_eq!(config.source.default_value, 220.8);
        assert_eq!(config.polling.water_level_interval_secs, 5);
    }
}
