// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Water-level simulator for demo/testing

use async_trait::async_trait;
use rand::prelude::*;
use rand_distr::Normal;

use super::{Reading, ValueSource};

/// Simulates a drifting reservoir level with occasional surges
pub struct SimulatedSource {
    id: String,
    rng: StdRng,
    noise: Normal<f64>,

    // Simulation state
    level: f64,
    baseline: f64,
    surge_probability: f64,
    surge_remaining: u32,
    surge_step: f64,
}

impl SimulatedSource {
    pub fn new(id: &str, baseline: f64) -> Self {
        Self::with_rng(id, baseline, StdRng::from_entropy())
    }

    /// Deterministic simulator for reproducible runs
    pub fn seeded(id: &str, baseline: f64, seed: u64) -> Self {
        Self::with_rng(id, baseline, StdRng::seed_from_u64(seed))
    }

    fn with_rng(id: &str, baseline: f64, rng: StdRng) -> Self {
        Self {
            id: id.to_string(),
            rng,
            noise: Normal::new(0.0, 0.4).expect("constant std dev is valid"),
            level: baseline,
            baseline,
            surge_probability: 0.03,
            surge_remaining: 0,
            surge_step: 0.0,
        }
    }

    fn step(&mut self) -> f64 {
        let settled = (self.level - self.baseline).abs() < 5.0;
        if self.surge_remaining == 0 && settled && self.rng.gen::<f64>() < self.surge_probability {
            // A surge spans a handful of polls and carries the level past a band edge
            self.surge_remaining = self.rng.gen_range(4..12);
            let offset = self.rng.gen_range(35.0..70.0);
            let offset = if self.rng.gen_bool(0.7) { offset } else { -offset };
            self.surge_step = offset / self.surge_remaining as f64;
        }

        if self.surge_remaining > 0 {
            self.surge_remaining -= 1;
            self.level += self.surge_step;
        } else {
            // Mean reversion toward the baseline
            self.level += (self.baseline - self.level) * 0.15;
        }

        self.level += self.noise.sample(&mut self.rng);
        (self.level * 10.0).round() / 10.0
    }
}

#[async_trait]
impl ValueSource for SimulatedSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn read(&mut self) -> Reading {
        Reading::new(self.step())
    }
}
