// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Level resource served over HTTP

use async_trait::async_trait;
use std::time::Duration;

use super::{parse_level, Fallback, Reading, SourceError, ValueSource};

/// Fetches a plain-text level document with a GET request
pub struct HttpSource {
    id: String,
    url: String,
    client: reqwest::Client,
    fallback: Fallback,
}

impl HttpSource {
    pub fn new(url: &str, default_value: f64, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            id: format!("http:{}", url),
            url: url.to_string(),
            client,
            fallback: Fallback::new(default_value),
        })
    }

    async fn fetch(&self) -> Result<f64, SourceError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::Unavailable(format!(
                "{} returned {}",
                self.url,
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_level(&body)
    }
}

#[async_trait]
impl ValueSource for HttpSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn read(&mut self) -> Reading {
        let result = self.fetch().await;
        self.fallback.resolve(&self.id, result)
    }
}
