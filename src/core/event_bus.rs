// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Event bus for inter-component communication

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::analysis::Status;
use crate::notify::Notification;
use crate::sensors::Reading;

/// Event types in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Reading,
    StatusChanged,
    Notification,
    Escalation,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Reading(Reading),
    StatusChanged { from: Status, to: Status, value: f64 },
    Notification { notification: Notification, delivered: bool },
    Escalation { active: bool },
}

/// Central event bus for pub/sub communication
pub struct EventBus {
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_reading(&self, reading: Reading) {
        self.publish_event(EventType::Reading, EventPayload::Reading(reading));
    }

    pub fn publish_status_change(&self, from: Status, to: Status, value: f64) {
        self.publish_event(EventType::StatusChanged, EventPayload::StatusChanged { from, to, value });
    }

    pub fn publish_notification(&self, notification: Notification, delivered: bool) {
        self.publish_event(
            EventType::Notification,
            EventPayload::Notification { notification, delivered },
        );
    }

    pub fn publish_escalation(&self, active: bool) {
        self.publish_event(EventType::Escalation, EventPayload::Escalation { active });
    }

    fn publish_event(&self, event_type: EventType, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            timestamp: Utc::now(),
            payload,
        };
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
