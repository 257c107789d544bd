use crate::agents::Vehicle;
use crate::metrics::EpochRecord;
use crate::signal::controller::PhaseDecision;
use crate::topology::{ControlMode, JunctionID};

/// State of the control plane after one executed tick.
///
/// Returned by [`Session::step`](crate::simulation::Session::step) so
/// embedding drivers and tests can observe every tick without reaching
/// into the components.
#[derive(Debug)]
pub struct TickState {
    pub tick: u64,
    /// Classified vehicle snapshot this tick ran on.
    pub vehicles: Vec<Vehicle>,
    /// Per-junction bookkeeping after the controller ran.
    pub junctions: Vec<JunctionTickState>,
    /// Decisions the controller took, in junction order.
    pub decisions: Vec<(JunctionID, PhaseDecision)>,
    /// Present when this tick closed a metrics epoch.
    pub epoch_record: Option<EpochRecord>,
}

/// One junction's bookkeeping at the end of a tick.
#[derive(Debug, Clone)]
pub struct JunctionTickState {
    pub id: JunctionID,
    pub phase_index: usize,
    pub time_in_phase: f64,
    pub mode: ControlMode,
    pub faulted: bool,
}
