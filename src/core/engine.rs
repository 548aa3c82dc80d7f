//! Main monitoring engine
//!
//! All mutable state (value source, alert state machine, metrics store) is
//! owned by one monitor task. Poll timers, the escalation timer and handle
//! commands are multiplexed in a single `select!` loop, so a poll cycle's
//! read → classify → alert update → publish sequence never interleaves with
//! another cycle or with an escalation repeat.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::{Event, EventBus};
use crate::alerting::{AlertState, AlertStateMachine, Transition};
use crate::analysis::{classify_trend, Status, Thresholds, Trend};
use crate::config::Config;
use crate::metrics::{MetricsStore, Snapshot};
use crate::notify::{Notification, Notifier, Permission};
use crate::sensors::{Reading, ValueSource};

/// Change shown on the first paint when the first reading equals the baseline
pub const INITIAL_NOMINAL_CHANGE: f64 = 0.1;

/// Level used by the diagnostic trigger when no water level is known
pub const DIAGNOSTIC_CRITICAL_LEVEL: f64 = 290.0;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is stopped")]
    Stopped,

    #[error("monitor task failed: {0}")]
    Task(#[from] JoinError),
}

/// Result of one water-level poll
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollOutcome {
    pub reading: Reading,
    pub status: Status,
    pub trend: Trend,
    pub change: f64,
    pub transition: Transition,
}

enum Command {
    Poll { check_alerts: bool, reply: oneshot::Sender<PollOutcome> },
    Refresh { reply: oneshot::Sender<PollOutcome> },
    TestNotification { reply: oneshot::Sender<()> },
    TriggerCriticalAlert { reply: oneshot::Sender<f64> },
    StopAllAlerts { reply: oneshot::Sender<()> },
    AlertState { reply: oneshot::Sender<AlertState> },
    Shutdown,
}

/// Handle to a running engine
pub struct Engine {
    commands: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<Arc<Snapshot>>,
    event_bus: Arc<EventBus>,
    notifier: Arc<Notifier>,
    task: Option<JoinHandle<()>>,
    refresh_delay: Duration,
    start_time: Instant,
}

impl Engine {
    /// Initialize from the first reading and start the poll timers
    pub async fn start(config: Config, source: Box<dyn ValueSource>, notifier: Notifier) -> anyhow::Result<Self> {
        config.validate()?;
        info!("Starting {} engine...", config.app_name);

        let event_bus = Arc::new(EventBus::default());
        let notifier = Arc::new(notifier.with_event_bus(event_bus.clone()));

        if notifier.permission() == Permission::Default {
            let permission = notifier.request_permission().await;
            info!("Notification permission: {:?}", permission);
        }

        let alerts = AlertStateMachine::new(
            config.source.default_value,
            config.alerts.escalation_interval(),
            notifier.clone(),
        )
        .with_event_bus(event_bus.clone());

        let store = MetricsStore::new(
            &config.polling,
            config.source.default_value,
            config.analysis.metric_sensitivity,
        );

        let (commands, command_rx) = mpsc::channel(32);
        let mut monitor = Monitor {
            source,
            thresholds: Thresholds::from(&config.analysis),
            water_level_sensitivity: config.analysis.water_level_sensitivity,
            alerts,
            store,
            notifier: notifier.clone(),
            event_bus: event_bus.clone(),
            commands: command_rx,
            water_level_interval: config.polling.water_level_interval(),
            simulation_interval: config.polling.simulation_interval(),
        };

        let first = monitor.initialize().await;
        info!(
            "Initial water level {}m ({}), alerts armed: {}",
            first.reading.value,
            first.status,
            monitor.alerts.escalation_active()
        );

        let snapshot_rx = monitor.store.subscribe();
        let task = tokio::spawn(monitor.run());

        info!("Engine started");
        Ok(Self {
            commands,
            snapshot_rx,
            event_bus,
            notifier,
            task: Some(task),
            refresh_delay: config.polling.refresh_delay(),
            start_time: Instant::now(),
        })
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_rx.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe_events()
    }

    pub fn is_alert_active(&self) -> bool {
        self.snapshot().alert_active
    }

    pub fn notification_permission(&self) -> Permission {
        self.notifier.permission()
    }

    /// Ask the notification channels for authorization again
    pub async fn request_notification_permission(&self) -> Permission {
        self.notifier.request_permission().await
    }

    /// Poll the source now; with `check_alerts` false the alert state is
    /// synchronized without notifying
    pub async fn update_water_level(&self, check_alerts: bool) -> Result<PollOutcome, EngineError> {
        self.request(|reply| Command::Poll { check_alerts, reply }).await
    }

    /// Manual refresh: after the settle delay, one alerting poll plus the
    /// secondary-metric and sensor jitter pass. Resolves once both are done.
    pub async fn refresh(&self) -> Result<PollOutcome, EngineError> {
        tokio::time::sleep(self.refresh_delay).await;
        self.request(|reply| Command::Refresh { reply }).await
    }

    pub async fn test_notification(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::TestNotification { reply }).await
    }

    /// Start the critical escalation by hand; returns the level it reports
    pub async fn trigger_critical_alert(&self) -> Result<f64, EngineError> {
        self.request(|reply| Command::TriggerCriticalAlert { reply }).await
    }

    pub async fn stop_all_alerts(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::StopAllAlerts { reply }).await
    }

    pub async fn alert_state(&self) -> Result<AlertState, EngineError> {
        self.request(|reply| Command::AlertState { reply }).await
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Cancel the poll timers and the escalation, then wait for the monitor to exit
    pub async fn stop(&mut self) -> Result<(), EngineError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        info!("Stopping engine...");
        let _ = self.commands.send(Command::Shutdown).await;
        task.await?;
        info!("Engine stopped");
        Ok(())
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| EngineError::Stopped)?;
        response.await.map_err(|_| EngineError::Stopped)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            // The escalation timer lives inside the monitor and dies with it
            task.abort();
        }
    }
}

/// The single owner of all engine state
struct Monitor {
    source: Box<dyn ValueSource>,
    thresholds: Thresholds,
    water_level_sensitivity: f64,
    alerts: AlertStateMachine,
    store: MetricsStore,
    notifier: Arc<Notifier>,
    event_bus: Arc<EventBus>,
    commands: mpsc::Receiver<Command>,
    water_level_interval: Duration,
    simulation_interval: Duration,
}

impl Monitor {
    /// First poll: alerts suppressed, and a zero change is shown as a small
    /// stable one
    async fn initialize(&mut self) -> PollOutcome {
        let mut outcome = self.poll_water_level(false).await;

        if outcome.change == 0.0 {
            outcome.trend = Trend::Stable;
            outcome.change = INITIAL_NOMINAL_CHANGE;
            self.store.update_water_level(
                outcome.reading.value,
                outcome.change,
                outcome.trend,
                outcome.status,
            );
        }

        self.publish();
        outcome
    }

    async fn poll_water_level(&mut self, check_alerts: bool) -> PollOutcome {
        let reading = self.source.read().await;
        self.event_bus.publish_reading(reading);

        let value = reading.value;
        let change = value - self.alerts.previous_value();
        let status = self.thresholds.classify(value);
        let trend = classify_trend(change, self.water_level_sensitivity);

        let transition = if check_alerts {
            self.alerts.on_reading(value, status).await
        } else {
            self.alerts.seed(value, status)
        };

        self.store.update_water_level(value, change, trend, status);
        self.store.record_poll();
        debug!("Water level {}m {} {:?} ({:+.1}) -> {:?}", value, status, trend, change, transition);

        PollOutcome {
            reading,
            status,
            trend,
            change,
            transition,
        }
    }

    fn publish(&mut self) {
        self.store.set_alert_active(self.alerts.escalation_active());
        self.store.set_permission(self.notifier.permission());
        self.store.publish();
    }

    async fn run(mut self) {
        let start = Instant::now();
        let mut water_level_tick = interval_at(start + self.water_level_interval, self.water_level_interval);
        water_level_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut simulation_tick = interval_at(start + self.simulation_interval, self.simulation_interval);
        simulation_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = water_level_tick.tick() => {
                    self.poll_water_level(true).await;
                    self.publish();
                }
                _ = simulation_tick.tick() => {
                    self.store.simulate_tick(Local::now());
                    self.publish();
                }
                _ = self.alerts.escalation_due() => {
                    self.alerts.send_escalation_repeat().await;
                }
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command).await,
                },
            }
        }

        self.alerts.shutdown();
        self.publish();
        info!("Monitor loop exited");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Poll { check_alerts, reply } => {
                let outcome = self.poll_water_level(check_alerts).await;
                self.publish();
                let _ = reply.send(outcome);
            }
            Command::Refresh { reply } => {
                let outcome = self.poll_water_level(true).await;
                self.store.refresh_jitter();
                self.publish();
                let _ = reply.send(outcome);
            }
            Command::TestNotification { reply } => {
                self.notifier.notify(Notification::test()).await;
                let _ = reply.send(());
            }
            Command::TriggerCriticalAlert { reply } => {
                let level = self
                    .store
                    .water_level()
                    .map(|m| m.value)
                    .filter(|v| *v != 0.0)
                    .unwrap_or(DIAGNOSTIC_CRITICAL_LEVEL);
                self.alerts.trigger(level).await;
                self.publish();
                let _ = reply.send(level);
            }
            Command::StopAllAlerts { reply } => {
                self.alerts.stop_all().await;
                self.publish();
                let _ = reply.send(());
            }
            Command::AlertState { reply } => {
                let _ = reply.send(self.alerts.state());
            }
            Command::Shutdown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{NotificationKind, NotificationSink};
    use crate::core::EventPayload;
    use crate::testing::{RecordingSink, ScriptedSource};

    async fn start_with(values: &[f64], sink: Arc<RecordingSink>) -> (Engine, ScriptedSource) {
        let source = ScriptedSource::new(values);
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![sink];
        let engine = Engine::start(Config::default(), Box::new(source.clone()), Notifier::new(sinks, true))
            .await
            .unwrap();
        (engine, source)
    }

    async fn sleep_secs(secs: f64) {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialization_is_silent_with_nominal_change() {
        let sink = Arc::new(RecordingSink::granted());
        let (mut engine, _) = start_with(&[220.8], sink.clone()).await;

        let snap = engine.snapshot();
        let wl = snap.water_level().unwrap();
        assert_eq!(wl.value, 220.8);
        assert_eq!(wl.trend, Trend::Stable);
        assert_eq!(wl.change, INITIAL_NOMINAL_CHANGE);
        assert_eq!(wl.status, Status::Normal);
        assert!(sink.presented().is_empty());
        assert!(!snap.alert_active);

        engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialization_keeps_real_change() {
        let sink = Arc::new(RecordingSink::granted());
        let (mut engine, _) = start_with(&[230.0], sink.clone()).await;

        let wl = engine.snapshot().water_level().cloned().unwrap();
        assert_eq!(wl.change, 9.2);
        assert_eq!(wl.trend, Trend::Rising);
        assert!(sink.presented().is_empty());

        engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_critical_episode_timeline() {
        let sink = Arc::new(RecordingSink::granted());
        // polls at t=5, 10, 15
        let (mut engine, _) = start_with(&[220.0, 290.0, 295.0, 230.0], sink.clone()).await;

        sleep_secs(5.5).await;
        assert_eq!(sink.kinds(), vec![NotificationKind::Critical]);
        assert!(engine.is_alert_active());

        // repeat fires 7s after the escalation started, at t=12
        sleep_secs(7.0).await;
        assert_eq!(sink.kinds(), vec![NotificationKind::Critical, NotificationKind::CriticalRepeat]);

        sleep_secs(3.0).await;
        assert_eq!(
            sink.kinds(),
            vec![NotificationKind::Critical, NotificationKind::CriticalRepeat, NotificationKind::Normal]
        );
        assert!(!engine.is_alert_active());

        sleep_secs(30.0).await;
        assert_eq!(sink.presented().len(), 3);

        let state = engine.alert_state().await.unwrap();
        assert_eq!(state.previous_status, Status::Normal);
        assert!(!state.escalation_active);

        engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_critical_start_sends_initial_alert_on_first_poll() {
        let sink = Arc::new(RecordingSink::granted());
        let (mut engine, _) = start_with(&[290.0], sink.clone()).await;
        assert!(sink.presented().is_empty());
        assert!(engine.is_alert_active());

        // first alerting poll at t=5 sends the owed alert
        sleep_secs(5.5).await;
        assert_eq!(sink.kinds(), vec![NotificationKind::Critical]);

        // the start-up timer repeats at t=7
        sleep_secs(2.0).await;
        assert_eq!(sink.kinds(), vec![NotificationKind::Critical, NotificationKind::CriticalRepeat]);

        engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_completes_poll_and_jitter() {
        let sink = Arc::new(RecordingSink::granted());
        let (mut engine, source) = start_with(&[220.0], sink.clone()).await;
        source.push(262.0);

        let before = engine.snapshot();

        // settles for 1.5s, well before the first simulation tick at t=3
        let outcome = engine.refresh().await.unwrap();
        assert_eq!(outcome.reading.value, 262.0);
        assert_eq!(outcome.transition, Transition::EnteredWarning);

        let snap = engine.snapshot();
        assert_eq!(snap.polls, 2);
        assert_eq!(snap.water_level().unwrap().value, 262.0);
        assert_eq!(source.reads(), 2);
        assert_eq!(sink.kinds(), vec![NotificationKind::Warning]);
        assert_eq!(snap.realtime, before.realtime);

        // the jitter pass is already visible when refresh resolves
        for (old, new) in before.metrics.iter().zip(snap.metrics.iter()).skip(1) {
            assert!((new.value - old.value).abs() <= 0.55);
            assert!((new.change - old.change).abs() <= 0.15);
        }
        for (old, new) in before.sensors.iter().zip(snap.sensors.iter()) {
            assert!((new.battery - old.battery).abs() <= 1.0);
            let minutes: u32 = new.last_reading.trim_end_matches("m ago").parse().unwrap();
            assert!((1..=10).contains(&minutes));
        }
        assert_eq!(before.sensors[2].last_reading, "15m ago");
        assert_ne!(snap.sensors[2].last_reading, "15m ago");

        engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_poll_without_alerts_stays_silent() {
        let sink = Arc::new(RecordingSink::granted());
        let (mut engine, source) = start_with(&[220.0], sink.clone()).await;
        source.push(300.0);

        let outcome = engine.update_water_level(false).await.unwrap();
        assert_eq!(outcome.transition, Transition::Seeded);
        assert_eq!(outcome.status, Status::Critical);
        assert!(sink.presented().is_empty());
        assert!(engine.is_alert_active());

        engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnostics() {
        let sink = Arc::new(RecordingSink::granted());
        let (mut engine, _) = start_with(&[221.5], sink.clone()).await;

        engine.test_notification().await.unwrap();
        let level = engine.trigger_critical_alert().await.unwrap();
        assert_eq!(level, 221.5);
        assert!(engine.is_alert_active());

        engine.stop_all_alerts().await.unwrap();
        assert!(!engine.is_alert_active());
        assert_eq!(
            sink.kinds(),
            vec![NotificationKind::Test, NotificationKind::Critical, NotificationKind::Stopped]
        );
        assert_eq!(sink.sounds(), 1);

        engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_escalation() {
        let sink = Arc::new(RecordingSink::granted());
        let (mut engine, _) = start_with(&[290.0], sink.clone()).await;
        engine.trigger_critical_alert().await.unwrap();

        engine.stop().await.unwrap();
        assert!(!engine.is_running());
        assert!(!engine.is_alert_active());

        sleep_secs(60.0).await;
        assert_eq!(sink.kinds(), vec![NotificationKind::Critical]);
        assert!(matches!(engine.test_notification().await, Err(EngineError::Stopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_escalation() {
        let sink = Arc::new(RecordingSink::granted());
        let (engine, _) = start_with(&[220.0], sink.clone()).await;
        engine.trigger_critical_alert().await.unwrap();
        drop(engine);

        sleep_secs(60.0).await;
        assert_eq!(sink.kinds(), vec![NotificationKind::Critical]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_requests_permission_once() {
        let sink = Arc::new(RecordingSink::with_permission(Permission::Default));
        let (mut engine, _) = start_with(&[220.0], sink.clone()).await;

        assert_eq!(sink.permission_requests(), 1);
        assert_eq!(engine.notification_permission(), Permission::Granted);
        assert_eq!(engine.snapshot().permission, Permission::Granted);

        engine.request_notification_permission().await;
        assert_eq!(sink.permission_requests(), 1);

        engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_channel_degrades_to_log_only() {
        let sink = Arc::new(RecordingSink::with_permission(Permission::Denied));
        let (mut engine, source) = start_with(&[220.0], sink.clone()).await;
        source.push(300.0);

        let outcome = engine.update_water_level(true).await.unwrap();
        assert_eq!(outcome.transition, Transition::EnteredCritical);
        assert!(engine.is_alert_active());
        assert!(sink.presented().is_empty());
        assert_eq!(engine.snapshot().permission, Permission::Denied);

        engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulation_ticks_move_live_chart() {
        let sink = Arc::new(RecordingSink::granted());
        let (mut engine, _) = start_with(&[220.0], sink).await;
        let mut rx = engine.subscribe();
        rx.borrow_and_update();

        // first simulation tick at t=3, before the first poll at t=5
        sleep_secs(3.5).await;
        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.realtime.len(), 31);
        assert_eq!(snap.polls, 1);

        engine.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_poll_order() {
        let sink = Arc::new(RecordingSink::granted());
        let (mut engine, source) = start_with(&[220.0], sink).await;
        let mut events = engine.subscribe_events();
        source.push(265.0);

        engine.update_water_level(true).await.unwrap();

        let mut types = Vec::new();
        while let Ok(event) = events.try_recv() {
            types.push(event.payload);
        }
        assert!(matches!(types[0], EventPayload::Reading(r) if r.value == 265.0));
        assert!(matches!(
            types[1],
            EventPayload::StatusChanged { from: Status::Normal, to: Status::Warning, .. }
        ));
        assert!(matches!(types[2], EventPayload::Notification { delivered: true, .. }));

        engine.stop().await.unwrap();
    }
}
