//! Sensor module - water-level value sources

mod traits;
mod file;
mod http;
mod simulator;

pub use traits::{parse_level, Fallback, Reading, SourceError, ValueSource};
pub use file::FileSource;
pub use http::HttpSource;
pub use simulator::SimulatedSource;

use std::time::Duration;
use tracing::info;

use crate::config::SourceConfig;

/// Build the value source described by the configuration.
///
/// Demo mode always wins; otherwise an `http://` or `https://` location is
/// fetched over HTTP and anything else is treated as a file path.
pub fn open_source(config: &SourceConfig, demo: bool) -> Result<Box<dyn ValueSource>, SourceError> {
    let source: Box<dyn ValueSource> = if demo {
        Box::new(SimulatedSource::new("simulated-level", config.default_value))
    } else if config.location.starts_with("http://") || config.location.starts_with("https://") {
        Box::new(HttpSource::new(
            &config.location,
            config.default_value,
            Duration::from_secs(config.request_timeout_secs),
        )?)
    } else {
        Box::new(FileSource::new(&config.location, config.default_value))
    };

    info!("Water level source: {}", source.id());
    Ok(source)
}
