// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Water-level alert state machine
//!
//! ```text
//!   prev → new              action
//!   ─────────────────────   ──────────────────────────────────────────────
//!   any → Critical          immediate critical alert, arm repeat timer
//!   Critical → Critical     send the owed alert of a silent start-up arm,
//!                           re-arm only if no timer is running
//!   any → Warning           disarm, one warning
//!   Warning/Critical → Normal  disarm, one back-to-normal
//!   unchanged otherwise     nothing
//! ```
//!
//! The machine owns its escalation timer. At the end of every processed
//! reading the timer is armed exactly when the status is Critical; the
//! diagnostic [`AlertStateMachine::trigger`] is the only way to arm it
//! outside that rule.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Escalation;
use crate::analysis::Status;
use crate::core::EventBus;
use crate::notify::{Notification, Notifier};

/// Snapshot of the machine's state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    pub previous_value: f64,
    pub previous_status: Status,
    pub escalation_active: bool,
}

/// What processing a reading did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Silent initialization, no notification
    Seeded,
    /// Status unchanged, nothing emitted
    Unchanged,
    EnteredCritical,
    /// Still critical but the timer had been stopped; it was restarted
    EscalationRestored,
    /// Critical since start-up; the deferred immediate alert was sent
    CriticalAnnounced,
    EnteredWarning,
    ReturnedToNormal,
}

pub struct AlertStateMachine {
    previous_value: f64,
    previous_status: Status,
    escalation: Option<Escalation>,
    escalation_period: Duration,
    notifier: Arc<Notifier>,
    event_bus: Option<Arc<EventBus>>,
}

impl AlertStateMachine {
    /// `baseline` is the level changes are measured against until the first reading
    pub fn new(baseline: f64, escalation_period: Duration, notifier: Arc<Notifier>) -> Self {
        Self {
            previous_value: baseline,
            previous_status: Status::Normal,
            escalation: None,
            escalation_period,
            notifier,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn state(&self) -> AlertState {
        AlertState {
            previous_value: self.previous_value,
            previous_status: self.previous_status,
            escalation_active: self.escalation.is_some(),
        }
    }

    pub fn previous_value(&self) -> f64 {
        self.previous_value
    }

    pub fn previous_status(&self) -> Status {
        self.previous_status
    }

    pub fn escalation_active(&self) -> bool {
        self.escalation.is_some()
    }

    /// Repeats sent by the current escalation, zero when disarmed
    pub fn escalation_repeats(&self) -> u64 {
        self.escalation.as_ref().map(|e| e.repeats()).unwrap_or(0)
    }

    /// Record a reading without emitting anything.
    ///
    /// The timer is still brought in line with the status: a Critical seed
    /// arms it silently (first repeat one period later), anything else
    /// disarms it. The immediate critical alert of a silent arm is sent by
    /// the next alerting reading or, failing that, by the first repeat.
    pub fn seed(&mut self, value: f64, status: Status) -> Transition {
        if status == Status::Critical {
            match self.escalation.as_mut() {
                Some(escalation) => escalation.set_level(value),
                None => {
                    self.escalation = Some(Escalation::arm_silent(self.escalation_period, value));
                    info!("Critical level at start-up, escalation armed, initial alert deferred");
                    self.publish_escalation(true);
                }
            }
        } else {
            self.disarm();
        }

        self.previous_value = value;
        self.previous_status = status;
        Transition::Seeded
    }

    /// Process one classified reading
    pub async fn on_reading(&mut self, value: f64, status: Status) -> Transition {
        let previous = self.previous_status;

        let transition = if status != previous {
            if let Some(bus) = &self.event_bus {
                bus.publish_status_change(previous, status, value);
            }

            match status {
                Status::Critical => {
                    self.start_escalation(value).await;
                    Transition::EnteredCritical
                }
                Status::Warning => {
                    self.stop_escalation();
                    self.notifier.notify(Notification::warning(value)).await;
                    Transition::EnteredWarning
                }
                Status::Normal => {
                    self.stop_escalation();
                    self.notifier.notify(Notification::back_to_normal(value)).await;
                    Transition::ReturnedToNormal
                }
            }
        } else if status == Status::Critical {
            if self.announce_deferred(value).await {
                Transition::CriticalAnnounced
            } else if self.ensure_escalation(value).await {
                Transition::EscalationRestored
            } else {
                Transition::Unchanged
            }
        } else {
            Transition::Unchanged
        };

        self.previous_value = value;
        self.previous_status = status;
        transition
    }

    /// Arm the escalation unless it is already running.
    ///
    /// Returns `true` when a new timer was started. A running timer only has
    /// its reported level refreshed.
    pub async fn ensure_escalation(&mut self, value: f64) -> bool {
        if let Some(escalation) = self.escalation.as_mut() {
            escalation.set_level(value);
            debug!("Escalation already running ({} repeats)", escalation.repeats());
            return false;
        }
        self.start_escalation(value).await;
        true
    }

    /// Diagnostic: start a fresh escalation regardless of status
    pub async fn trigger(&mut self, value: f64) {
        self.start_escalation(value).await;
    }

    /// Diagnostic: stop the escalation and say so
    pub async fn stop_all(&mut self) {
        self.stop_escalation();
        self.notifier.notify(Notification::alerts_stopped()).await;
    }

    /// Resolves when a repeat is due; never resolves while disarmed
    pub async fn escalation_due(&mut self) {
        match self.escalation.as_mut() {
            Some(escalation) => escalation.due().await,
            None => std::future::pending().await,
        }
    }

    /// Send one repeat for the running escalation
    pub async fn send_escalation_repeat(&mut self) {
        let Some(escalation) = self.escalation.as_mut() else {
            return;
        };
        let level = escalation.level();
        if escalation.announce() {
            info!("Deferred critical alert sent on first escalation tick");
            self.notifier.notify(Notification::critical(level)).await;
            return;
        }
        let count = escalation.record_repeat();
        debug!("Critical repeat #{} at {}m", count, level);
        self.notifier.notify(Notification::critical_repeat(level)).await;
    }

    /// Send the immediate critical alert owed by a silent arm
    async fn announce_deferred(&mut self, value: f64) -> bool {
        let Some(escalation) = self.escalation.as_mut() else {
            return false;
        };
        if !escalation.announce() {
            return false;
        }
        escalation.set_level(value);
        self.notifier.notify(Notification::critical(value)).await;
        info!("Critical level persists after start-up, initial alert sent");
        true
    }

    /// Disarm without notifying; used on engine teardown
    pub fn shutdown(&mut self) {
        self.disarm();
    }

    async fn start_escalation(&mut self, value: f64) {
        // Replacing the option drops any previous timer, so at most one exists
        self.escalation = Some(Escalation::arm(self.escalation_period, value));
        self.notifier.notify(Notification::critical(value)).await;
        info!("Started continuous critical alerts every {:?}", self.escalation_period);
        self.publish_escalation(true);
    }

    fn stop_escalation(&mut self) {
        if let Some(escalation) = self.escalation.take() {
            info!(
                "Stopped continuous critical alerts after {:?} ({} repeats)",
                escalation.elapsed(),
                escalation.repeats()
            );
            self.publish_escalation(false);
        }
    }

    fn disarm(&mut self) {
        if self.escalation.take().is_some() {
            debug!("Escalation disarmed");
            self.publish_escalation(false);
        }
    }

    fn publish_escalation(&self, active: bool) {
        if let Some(bus) = &self.event_bus {
            bus.publish_escalation(active);
        }
    }
}
