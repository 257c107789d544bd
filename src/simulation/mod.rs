//! # Simulation Module
//!
//! The top-level tick loop driver.
//!
//! A [`Session`] wires the whole control plane together: simulator client,
//! topology catalog, emergency coordinator, signal controller, network
//! bridge and metrics sinks. One [`Session::step`] runs the strict per-tick
//! sequence; [`Session::run`] loops it to the stop condition and produces
//! the final run summary.
//!
//! ## Per-tick sequence
//!
//! 1. Advance the simulator by one step
//! 2. Pull the vehicle / traffic-light / lane-count snapshot
//! 3. Coordinator update (tracks, preemption, junction runtime modes)
//! 4. Controller decision + command per junction
//! 5. Network bridge sweep, epoch rollup
//! 6. Stop-condition check
//!
//! The loop is single-threaded and cooperative: there are no suspension
//! points inside a tick and no background threads in the core. External
//! drivers observe progress through the [`TickState`] returned by each
//! step and stop the loop through the shared stop flag.
pub mod session;
pub mod states;

pub use session::{Session, SessionError, SessionSinks};
pub use states::{JunctionTickState, TickState};
