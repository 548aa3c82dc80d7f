//! Core engine module - owns polling, alerting and snapshot publication

mod engine;
mod event_bus;

pub use engine::{Engine, EngineError, PollOutcome, DIAGNOSTIC_CRITICAL_LEVEL, INITIAL_NOMINAL_CHANGE};
pub use event_bus::{Event, EventBus, EventPayload, EventType};
