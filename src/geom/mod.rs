//! # Geometry Module
//!
//! Geometric primitives for the co-simulation core.
//!
//! The traffic simulator reports every position in its own Cartesian plane
//! (metres, origin at the network's lower-left corner), so the whole crate
//! works in plain Euclidean space.
//!
//! ## Key Components
//!
//! - [`Point`] - A position in the simulator plane (metres)
//! - [`new_point`] - Shorthand constructor
//!
//! ## Usage Examples
//!
//! ```rust
//! use vanet_cosim_core::geom::new_point;
//!
//! let junction = new_point(100.0, 200.0);
//! let vehicle = new_point(40.0, 200.0);
//! assert_eq!(vehicle.distance_to(&junction), 60.0);
//! ```
pub mod point;

pub use point::{Point, new_point};
