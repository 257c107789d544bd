//! # Policy Module
//!
//! Pluggable RL hook: the core consults an external policy for phase
//! selection in RL-controlled modes, but never trains one.
//!
//! ## Key Components
//!
//! - [`Policy`] - The narrow contract: an observation vector in, an action
//!   index out
//! - [`LinearPolicy`] - Snapshot adapter reading a JSON weight matrix;
//!   `act` is an argmax over `W·obs + b`
//! - [`observation`] - Fixed-schema observation vector per junction
//!
//! ## Startup contract
//!
//! The observation length is a deterministic function of a junction's
//! phase count ([`observation::observation_len`]) and is published at
//! startup; a loaded policy must accept that length for every controlled
//! junction or loading fails. There is no silent fallback: RL modes
//! without a loadable snapshot abort before the first tick.
pub mod adapter;
pub mod observation;

pub use adapter::{LinearPolicy, Policy, PolicyError};
pub use observation::{LANE_SERVICE_RATE_VPS, build_observation, observation_len};
