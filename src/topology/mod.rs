//! # Topology Module
//!
//! Static network catalog and the long-lived junction/RSU entities.
//!
//! The catalog is loaded once at startup from two JSON files (junction
//! sites with their signal-lane order, RSU placements) and is immutable
//! afterwards; every other component receives read-only views. Live
//! [`Junction`] values are built at session start by joining the catalog
//! with the signal programs the simulator reports.
//!
//! ## Key Components
//!
//! - [`NetworkTopology`] - Immutable junction/RSU/lane-direction catalog
//! - [`Junction`] - Long-lived junction: program, phase bookkeeping, runtime mode
//! - [`JunctionRuntime`] / [`ControlMode`] - The coordinator→controller handshake:
//!   the emergency coordinator is the sole writer of the runtime record,
//!   the signal controller its sole reader
//! - [`Rsu`] - Roadside unit with tier and coverage radius
//! - [`Cardinal`] - Approach directions with the three-stage direction
//!   determination (movement → lane tokens → heading)
//!
//! ## Ownership
//!
//! The catalog owns junction sites and RSUs exclusively. Phase bookkeeping
//! (`current_phase_index`, `time_in_phase`) on a live junction belongs to
//! the signal controller; the `runtime` record belongs to the emergency
//! coordinator. Both run sequentially inside one tick, so the discipline
//! is by convention, not by locking.
pub mod catalog;
pub mod direction;
pub mod junction;
pub mod rsu;

pub use catalog::{JunctionSite, NetworkTopology, TopologyError};
pub use direction::Cardinal;
pub use junction::{ControlMode, Junction, JunctionError, JunctionID, JunctionRuntime, LaneID};
pub use rsu::{DEFAULT_COVERAGE_RADIUS_M, Rsu, RsuID};
