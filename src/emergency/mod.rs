//! # Emergency Preemption Module
//!
//! Distance-banded preemption of traffic signals for emergency vehicles.
//!
//! ## Architecture
//!
//! The coordinator consumes the per-tick vehicle snapshot and arbitrates
//! at most one priority vehicle per junction:
//!
//! ```text
//! EmergencyCoordinator
//! ├── EmergencyTrack "ambulance_1"   (per-active-vehicle state)
//! │   ├── position history, travel direction
//! │   ├── served junctions
//! │   └── wait_start per queued junction
//! └── per-junction arbitration
//!     ├── priority holder (at most one, first detected wins)
//!     ├── queue promotion (earliest wait first, next tick after release)
//!     └── global cooldown between preempt commands
//! ```
//!
//! Distance bands drive the per-(vehicle, junction) state machine:
//!
//! | Band | Range | Action |
//! |---|---|---|
//! | Far | > 250 m | no effect |
//! | RLActivate | 150-250 m | proximity mode switches the junction to RL |
//! | Preempt | 30-150 m | claim the junction, force the approach green |
//! | PassThrough | <= 30 m | release, mark served |
//!
//! The coordinator is the **sole writer** of every junction's runtime
//! record; the signal controller only reads it. All coordinator state is
//! instance-scoped, so independent instances (tests) never interfere.
pub mod bands;
pub mod coordinator;
pub mod track;

pub use bands::{BandThresholds, DistanceBand};
pub use coordinator::{
    ApproachFeatures, CoordinatorSettings, EmergencyApproach, EmergencyCoordinator,
};
pub use track::{EmergencyTrack, TrackState};
