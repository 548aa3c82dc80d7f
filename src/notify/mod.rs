// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Notification module - user-visible alerts and their delivery channels
//!
//! The alerting state machine only ever talks to a [`Notifier`]. Delivery is
//! best effort: a channel that is unauthorized, unreachable or failing is
//! logged and skipped, and the caller never sees an error.

mod terminal;
mod mqtt;

pub use terminal::TerminalSink;
pub use mqtt::MqttSink;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::core::EventBus;

/// Tag shared by every water-level notification so channels can coalesce them
pub const NOTIFICATION_TAG: &str = "water-level-alert";

/// Authorization state of a delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not asked yet
    Default,
    Granted,
    Denied,
}

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Critical,
    CriticalRepeat,
    Warning,
    Normal,
    Test,
    Stopped,
}

/// A user-visible alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub critical: bool,
    pub tag: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            body: body.into(),
            critical: matches!(kind, NotificationKind::Critical | NotificationKind::CriticalRepeat),
            tag: NOTIFICATION_TAG.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn critical(level: f64) -> Self {
        Self::new(
            NotificationKind::Critical,
            "🚨 CRITICAL WATER LEVEL ALERT",
            format!("Water level is at {}m (CRITICAL LEVEL!). Immediate action required!", level),
        )
    }

    pub fn critical_repeat(level: f64) -> Self {
        Self::new(
            NotificationKind::CriticalRepeat,
            "🚨 CONTINUING CRITICAL ALERT",
            format!("Water level STILL at {}m (CRITICAL!). Immediate action STILL required!", level),
        )
    }

    pub fn warning(level: f64) -> Self {
        Self::new(
            NotificationKind::Warning,
            "⚠️ WATER LEVEL WARNING",
            format!("Water level is at {}m (WARNING ZONE). Monitor closely.", level),
        )
    }

    pub fn back_to_normal(level: f64) -> Self {
        Self::new(
            NotificationKind::Normal,
            "✅ WATER LEVEL NORMAL",
            format!("Water level is back to normal at {}m.", level),
        )
    }

    pub fn test() -> Self {
        Self::new(
            NotificationKind::Test,
            "🔔 TEST NOTIFICATION",
            "This is a test notification from Water Monitoring System.",
        )
    }

    pub fn alerts_stopped() -> Self {
        Self::new(
            NotificationKind::Stopped,
            "⏹️ ALERTS STOPPED",
            "All critical alerts have been manually stopped.",
        )
    }
}

/// Why a channel could not present a notification
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("channel error: {0}")]
    Channel(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A delivery channel for notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Channel name used in logs
    fn name(&self) -> &str;

    /// Current authorization state
    fn permission(&self) -> Permission;

    /// Ask for authorization and report the outcome
    async fn request_permission(&self) -> Permission;

    /// Show the notification
    async fn present(&self, notification: &Notification) -> Result<(), DeliveryError>;

    /// Audible cue for critical notifications
    async fn play_alert_sound(&self) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Result of one [`Notifier::notify`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    pub delivered: usize,
    pub skipped: usize,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        self.delivered > 0
    }
}

/// Fans notifications out to every authorized sink
pub struct Notifier {
    sinks: Vec<Arc<dyn NotificationSink>>,
    sound_enabled: bool,
    event_bus: Option<Arc<EventBus>>,
    emitted: AtomicU64,
}

impl Notifier {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>, sound_enabled: bool) -> Self {
        Self {
            sinks,
            sound_enabled,
            event_bus: None,
            emitted: AtomicU64::new(0),
        }
    }

    /// Build the sinks enabled in the configuration
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut sinks: Vec<Arc<dyn NotificationSink>> = Vec::new();

        if config.notifications.terminal_enabled {
            sinks.push(Arc::new(TerminalSink::new(true)));
        }
        if config.notifications.mqtt_enabled {
            sinks.push(Arc::new(MqttSink::new(&config.notifications).await?));
        }

        Ok(Self::new(sinks, config.alerts.sound_enabled))
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Aggregate permission: granted if any channel is granted
    pub fn permission(&self) -> Permission {
        let states: Vec<Permission> = self.sinks.iter().map(|s| s.permission()).collect();
        if states.contains(&Permission::Granted) {
            Permission::Granted
        } else if states.contains(&Permission::Default) {
            Permission::Default
        } else {
            Permission::Denied
        }
    }

    /// Request authorization from every channel not yet granted
    pub async fn request_permission(&self) -> Permission {
        for sink in &self.sinks {
            if sink.permission() != Permission::Granted {
                let outcome = sink.request_permission().await;
                info!("Notification permission for {}: {:?}", sink.name(), outcome);
            }
        }
        self.permission()
    }

    /// Number of notifications emitted so far, delivered or not
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Present a notification on every authorized channel
    pub async fn notify(&self, notification: Notification) -> Delivery {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        info!("{}: {}: {}", notification.created_at.format("%H:%M:%S"), notification.title, notification.body);

        let mut delivery = Delivery::default();
        for sink in &self.sinks {
            if sink.permission() != Permission::Granted {
                info!("Notification permission not granted for {}, skipping", sink.name());
                delivery.skipped += 1;
                continue;
            }

            match sink.present(&notification).await {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    warn!("{} could not present notification: {}", sink.name(), e);
                    delivery.skipped += 1;
                    continue;
                }
            }

            if notification.critical && self.sound_enabled {
                if let Err(e) = sink.play_alert_sound().await {
                    warn!("{} alert sound failed: {}", sink.name(), e);
                }
            }
        }

        if let Some(bus) = &self.event_bus {
            bus.publish_notification(notification, delivery.is_delivered());
        }
        delivery
    }
}
