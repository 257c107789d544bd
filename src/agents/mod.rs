// src/agents/mod.rs
//! # Agents Module
//!
//! This module provides the vehicle snapshot types consumed by the rest of
//! the co-simulation core.
//!
//! Unlike a microsimulation that owns its agents, this core only *observes*
//! vehicles: the external simulator reports the active population every
//! tick, and each report is rebuilt into a fresh set of [`Vehicle`] values.
//! Nothing here persists across ticks beyond id stability.
//!
//! ## Key Components
//!
//! - [`Vehicle`] - Per-tick snapshot of one simulated vehicle
//! - [`VehicleKind`] - Normal vs. emergency classification
//! - [`EmergencyMatcher`] - Configurable substring predicate that performs
//!   the classification from the simulator's naming convention
//!
//! ## Usage
//!
//! ```rust
//! use vanet_cosim_core::agents::{EmergencyMatcher, VehicleKind};
//!
//! let matcher = EmergencyMatcher::default();
//! assert_eq!(matcher.classify("ambulance_3", "passenger"), VehicleKind::Emergency);
//! assert_eq!(matcher.classify("veh_17", "passenger"), VehicleKind::Normal);
//! ```
pub mod vehicle;

pub use vehicle::{EmergencyMatcher, Vehicle, VehicleID, VehicleKind};
