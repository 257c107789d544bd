// src/client/mod.rs
//! # Simulator Client Module
//!
//! Typed wrapper contract over the external microscopic traffic simulator.
//!
//! The core never talks a wire protocol directly; every interaction with the
//! simulator goes through the [`SimulatorClient`] trait. A production build
//! plugs in a TraCI-speaking implementation, tests and examples plug in
//! [`MockSimulatorClient`].
//!
//! ## Key Components
//!
//! - [`SimulatorClient`] - The operation contract (step, snapshots, lane
//!   counts, phase commands, close)
//! - [`VehicleSnapshot`] / [`TrafficLightSnapshot`] - Raw per-tick state
//! - [`ClientError`] - Typed failure kinds; protocol-level kinds are fatal
//!   to the tick loop, entity-level kinds are recoverable
//! - [`MockSimulatorClient`] - Scriptable in-memory implementation
//!
//! ## Contract notes
//!
//! All operations are synchronous and blocking; the loop issues them from a
//! single thread. The per-call timeout (configuration, default 30 s) is
//! enforced inside the transport of the concrete implementation - on expiry
//! it must return [`ClientError::Timeout`], which the session treats as
//! fatal after a best-effort close.
pub mod mock;
pub mod simulator;

pub use mock::MockSimulatorClient;
pub use simulator::{ClientError, SimulatorClient, TrafficLightSnapshot, VehicleSnapshot};
