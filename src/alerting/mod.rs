//! Alerting module - status-transition notifications and critical escalation

mod escalation;
mod machine;

pub use escalation::Escalation;
pub use machine::{AlertState, AlertStateMachine, Transition};
