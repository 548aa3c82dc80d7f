// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Repeating critical-alert timer

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// An armed escalation.
///
/// Owning the value is owning the timer: there is no background task, the
/// holder polls [`Escalation::due`] and dropping the value cancels it.
#[derive(Debug)]
pub struct Escalation {
    ticker: Interval,
    level: f64,
    repeats: u64,
    announced: bool,
    started_at: Instant,
}

impl Escalation {
    /// First tick is one full period after arming. The caller has already
    /// sent the immediate critical alert.
    pub fn arm(period: Duration, level: f64) -> Self {
        Self::armed(period, level, true)
    }

    /// Arm without the immediate alert; it is owed until [`Escalation::announce`]
    pub fn arm_silent(period: Duration, level: f64) -> Self {
        Self::armed(period, level, false)
    }

    fn armed(period: Duration, level: f64, announced: bool) -> Self {
        let now = Instant::now();
        let mut ticker = interval_at(now + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            ticker,
            level,
            repeats: 0,
            announced,
            started_at: now,
        }
    }

    /// Resolves at the next repeat deadline
    pub async fn due(&mut self) {
        self.ticker.tick().await;
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Latest critical level, reported by subsequent repeats
    pub fn set_level(&mut self, level: f64) {
        self.level = level;
    }

    pub fn record_repeat(&mut self) -> u64 {
        self.repeats += 1;
        self.repeats
    }

    pub fn is_announced(&self) -> bool {
        self.announced
    }

    /// Mark the immediate alert as sent; `true` only for the first call on a
    /// silently armed escalation
    pub fn announce(&mut self) -> bool {
        !std::mem::replace(&mut self.announced, true)
    }

    pub fn repeats(&self) -> u64 {
        self.repeats
    }

    pub fn period(&self) -> Duration {
        self.ticker.period()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
