//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::notify::{DeliveryError, Notification, NotificationKind, NotificationSink, Permission};
use crate::sensors::{Reading, ValueSource};

/// Sink that remembers everything it was asked to present
pub struct RecordingSink {
    permission: RwLock<Permission>,
    presented: Mutex<Vec<Notification>>,
    sounds: AtomicUsize,
    permission_requests: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn with_permission(permission: Permission) -> Self {
        Self {
            permission: RwLock::new(permission),
            presented: Mutex::new(Vec::new()),
            sounds: AtomicUsize::new(0),
            permission_requests: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn granted() -> Self {
        Self::with_permission(Permission::Granted)
    }

    pub fn presented(&self) -> Vec<Notification> {
        self.presented.lock().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.presented.lock().iter().map(|n| n.kind).collect()
    }

    pub fn sounds(&self) -> usize {
        self.sounds.load(Ordering::SeqCst)
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    pub fn fail_deliveries(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn permission(&self) -> Permission {
        *self.permission.read()
    }

    async fn request_permission(&self) -> Permission {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        let mut permission = self.permission.write();
        if *permission == Permission::Default {
            *permission = Permission::Granted;
        }
        *permission
    }

    async fn present(&self, notification: &Notification) -> Result<(), DeliveryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::Channel("scripted failure".to_string()));
        }
        self.presented.lock().push(notification.clone());
        Ok(())
    }

    async fn play_alert_sound(&self) -> Result<(), DeliveryError> {
        self.sounds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Source that replays queued values, repeating the last one when drained.
///
/// Clones share the queue, so a test can keep a handle and push values
/// while the engine owns the source.
#[derive(Clone)]
pub struct ScriptedSource {
    queue: Arc<Mutex<VecDeque<f64>>>,
    last: Arc<Mutex<f64>>,
    reads: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(values: &[f64]) -> Self {
        let last = values.first().copied().unwrap_or(220.8);
        Self {
            queue: Arc::new(Mutex::new(values.iter().copied().collect())),
            last: Arc::new(Mutex::new(last)),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn push(&self, value: f64) {
        self.queue.lock().push_back(value);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ValueSource for ScriptedSource {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn read(&mut self) -> Reading {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock();
        if let Some(next) = self.queue.lock().pop_front() {
            *last = next;
        }
        Reading::new(*last)
    }
}
