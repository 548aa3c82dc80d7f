//! Analysis module - status and trend classification

mod classifier;

pub use classifier::*;
