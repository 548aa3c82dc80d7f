// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/hydrowatch-rs

//! Level file on the local filesystem

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{parse_level, Fallback, Reading, SourceError, ValueSource};

/// Reads a text file holding a single number
pub struct FileSource {
    id: String,
    path: PathBuf,
    fallback: Fallback,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, default_value: f64) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            id: format!("file:{}", path.display()),
            path,
            fallback: Fallback::new(default_value),
        }
    }

    async fn fetch(&self) -> Result<f64, SourceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        parse_level(&content)
    }
}

#[async_trait]
impl ValueSource for FileSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn read(&mut self) -> Reading {
        let result = self.fetch().await;
        self.fallback.resolve(&self.id, result)
    }
}
