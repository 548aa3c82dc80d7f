// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Console notification channel

use async_trait::async_trait;
use parking_lot::RwLock;
use std::io::Write;

use super::{DeliveryError, Notification, NotificationSink, Permission};

/// Prints notifications to stdout; the audible cue is the terminal bell
pub struct TerminalSink {
    enabled: bool,
    permission: RwLock<Permission>,
}

impl TerminalSink {
    /// A disabled terminal sink denies every permission request
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            permission: RwLock::new(Permission::Default),
        }
    }
}

#[async_trait]
impl NotificationSink for TerminalSink {
    fn name(&self) -> &str {
        "terminal"
    }

    fn permission(&self) -> Permission {
        *self.permission.read()
    }

    async fn request_permission(&self) -> Permission {
        let outcome = if self.enabled { Permission::Granted } else { Permission::Denied };
        *self.permission.write() = outcome;
        outcome
    }

    async fn present(&self, notification: &Notification) -> Result<(), DeliveryError> {
        if self.permission() != Permission::Granted {
            return Err(DeliveryError::PermissionDenied);
        }

        let mut out = std::io::stdout().lock();
        writeln!(
            out,
            "[{}] {} | {}",
            notification.created_at.with_timezone(&chrono::Local).format("%H:%M:%S"),
            notification.title,
            notification.body
        )?;
        out.flush()?;
        Ok(())
    }

    async fn play_alert_sound(&self) -> Result<(), DeliveryError> {
        let mut out = std::io::stdout().lock();
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }
}
