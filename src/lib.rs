//! # VANET Co-Simulation Core
//!
//! Adaptive traffic-signal control plane driving an external microscopic
//! traffic simulator, coupled to a wireless-network model (V2V broadcast +
//! V2I uplink) with first-class emergency-vehicle preemption.
//!
//! ## Architecture
//!
//! ```text
//! Session (tick loop)
//! ├── SimulatorClient ── typed wrapper over the external microsimulator
//! ├── NetworkTopology ── immutable junction/RSU/lane catalog
//! ├── EmergencyCoordinator ── distance-band preemption state machines
//! ├── AdaptiveSignalController ── density scheduler + preempt/RL overlays
//! ├── NetworkBridge ── per-tick V2V/V2I sweep under the link model
//! └── Metrics ── packet stream, epoch rollups, run summary
//! ```
//!
//! Per tick, the session advances the simulator, pulls the snapshot, lets
//! the coordinator write each junction's runtime mode, lets the controller
//! turn modes into phase commands, and runs the wireless sweep. The whole
//! loop is single-threaded and, for a fixed seed, byte-reproducible.
//!
//! ## Quick Start
//!
//! ```rust
//! use vanet_cosim_core::client::MockSimulatorClient;
//! use vanet_cosim_core::config::SimConfig;
//! use vanet_cosim_core::simulation::Session;
//! use vanet_cosim_core::topology::NetworkTopology;
//! use std::collections::HashMap;
//!
//! let mut sim = MockSimulatorClient::new();
//! sim.add_traffic_light("J1", vec!["GGrr", "yyrr", "rrGG", "rryy"]);
//!
//! let topology = NetworkTopology::from_parts(vec![], vec![], HashMap::new()).unwrap();
//! let config = SimConfig { max_ticks: 10, ..SimConfig::default() };
//!
//! let mut session = Session::new(sim, config, topology).unwrap();
//! let summary = session.run().unwrap();
//! assert_eq!(summary.run.ticks, 10);
//! ```
pub mod agents;
pub mod bridge;
pub mod client;
pub mod config;
pub mod emergency;
pub mod geom;
pub mod metrics;
pub mod policy;
pub mod radio;
pub mod signal;
pub mod simulation;
pub mod topology;
pub mod verbose;
