// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Value source traits and common types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// One sampled water level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            observed_at: Utc::now(),
        }
    }
}

/// Why a source could not produce a value
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid number in source content: {0:?}")]
    Parse(String),

    #[error("source value is not finite: {0}")]
    NonFinite(f64),
}

/// Trait for anything that yields the current water level.
///
/// `read` never fails: implementations recover from their own errors by
/// substituting a fallback value, so the engine always has something to
/// classify.
#[async_trait]
pub trait ValueSource: Send + Sync {
    /// Source identifier used in logs
    fn id(&self) -> &str;

    /// Read the current level
    async fn read(&mut self) -> Reading;
}

/// Last-accepted-value bookkeeping shared by the concrete sources
#[derive(Debug, Clone)]
pub struct Fallback {
    last_good: f64,
}

impl Fallback {
    pub fn new(default_value: f64) -> Self {
        Self { last_good: default_value }
    }

    pub fn last_good(&self) -> f64 {
        self.last_good
    }

    /// Turn a fetch result into a reading, logging and substituting on failure
    pub fn resolve(&mut self, source_id: &str, result: Result<f64, SourceError>) -> Reading {
        match result {
            Ok(value) => {
                self.last_good = value;
                Reading::new(value)
            }
            Err(e) => {
                warn!("{}: {}, using {}", source_id, e, self.last_good);
                Reading::new(self.last_good)
            }
        }
    }
}

/// Parse the numeric content of a level resource.
///
/// Surrounding whitespace is ignored and the longest leading decimal number
/// is taken, so `"231.4 m"` reads as 231.4.
pub fn parse_level(content: &str) -> Result<f64, SourceError> {
    let trimmed = content.trim();
    let prefix = numeric_prefix(trimmed);
    if prefix.is_empty() {
        return Err(SourceError::Parse(trimmed.to_string()));
    }

    let value: f64 = prefix
        .parse()
        .map_err(|_| SourceError::Parse(trimmed.to_string()))?;

    if !value.is_finite() {
        return Err(SourceError::NonFinite(value));
    }
    Ok(value)
}

fn numeric_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return "";
    }

    // exponent only counts when at least one digit follows it
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    &s[..end]
}
