//! # Radio Module
//!
//! Wireless link model for V2V beacons and V2I uplinks.
//!
//! Contains helpers for:
//! - Delivery probability as a piecewise analytic function of distance
//! - Base latency with Gaussian jitter
//! - Link-kind selection between short-range (DSRC-like) and long-range
//!   (cellular, emergency V2I) channels
//!
//! Units:
//! - Distance: metres in the simulator plane
//! - Latency: milliseconds (f64)
//!
//! The model is deliberately *not* a physical propagation model: the
//! delivery curves are back-fitted empirical bands (monotone decreasing
//! probability with range, linear latency). The curve shape is the
//! contract; the radii are configurable.
pub mod link;

pub use link::{LinkKind, LinkModel, LinkOutcome};
