//! # Signal Control Module
//!
//! Adaptive traffic-signal control for junctions driven through the
//! simulator client.
//!
//! ## Architecture
//!
//! ### Two-layer system. Example:
//! ```text
//! AdaptiveSignalController - Layer #1 (per-run scheduler, all junctions)
//! ├── Junction "J1" - Layer #2 (phase program + runtime mode)
//! │   ├── Phases: ["GGrr", "yyrr", "rrGG", "rryy"]
//! │   └── Mode: Density | RL | Preempt
//! └── Junction "J2"
//!     ├── Phases: ["GGGrrr", "yyyrrr", "rrrGGG", "rrryyy"]
//!     └── Mode: Density | RL | Preempt
//! ```
//!
//! The controller makes one decision per junction per tick: hold the
//! current phase, advance to the next, or (in the overlays) force the
//! preempt phase or the policy's phase. Decisions become `set_phase` /
//! `set_phase_duration` commands on the simulator client.
//!
//! ## Components
//!
//! ### Core Structures
//! - [`controller::AdaptiveSignalController`] - Density scheduler with
//!   preempt and RL overlays
//! - [`states::Phase`] - Validated signal-state string of one phase
//! - [`states::SignalState`] - Individual signal states (Red, Yellow, Green...)
//!
//! ### Error Handling
//! - [`states::PhaseError`] - Phase string parsing and validation errors
//! - [`controller::ControllerError`] - Decision/command errors
//!
//! ## Signal States
//!
//! Reference for signal states based on SUMO definitions:
//! https://sumo.dlr.de/docs/Simulation/Traffic_Lights.html#signal_state_definitions
//!
//! | Signal | Code | Meaning |
//! |--------|------|---------|
//! | `Red` | `r` | Vehicles must stop |
//! | `Yellow` | `y` | Prepare to stop |
//! | `Green` | `g` | Vehicles may proceed (permitted) |
//! | `GreenPriority` | `G` | Vehicles proceed with priority (protected) |
//!
//! `G` and `g` are treated equivalently as green by the density metric and
//! the preempt target-phase selection.
pub mod controller;
pub mod states;

pub use controller::{
    AdaptiveSignalController, ControllerError, LaneOccupancy, PhaseDecision, SignalTiming,
};
pub use states::{Phase, PhaseError, SignalState};
