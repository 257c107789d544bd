//! # Configuration Module
//!
//! Recognised run options with their defaults, range validation and JSON
//! loading. Configuration problems are fatal at startup: a run never
//! starts on an out-of-range option, and RL modes refuse to start without
//! a policy snapshot rather than silently falling back.
pub mod options;

pub use options::{ConfigError, RunMode, SimConfig};
