//! # Bridge Module
//!
//! The SUMO↔network bridge: each tick it couples the simulator's vehicle
//! snapshot to the wireless model, attempting one V2V beacon per ordered
//! in-range vehicle pair and one V2I packet per (vehicle, in-range RSU).
//!
//! ## Determinism
//!
//! The bridge owns the run's only PRNG, seeded from configuration.
//! Vehicles are swept in snapshot order and spatial-index candidates are
//! visited in ascending snapshot index, so the RNG call sequence - and
//! with it the packet log - is byte-reproducible for a fixed seed.
//!
//! ## Complexity
//!
//! The naive pairwise sweep is O(V² + V·R) per tick. The uniform grid
//! ([`spatial::UniformGrid`], cell size = short-range radius) bounds V2V
//! neighbour enumeration to the 3×3 cell neighbourhood, giving expected
//! O(V) for realistic densities.
pub mod packet;
pub mod spatial;
pub mod sweep;

pub use packet::Packet;
pub use spatial::UniformGrid;
pub use sweep::NetworkBridge;
