use crate::agents::VehicleID;
use crate::geom::{Point, new_point};
use crate::signal::Phase;
use crate::topology::direction::Cardinal;
use std::fmt;

pub type JunctionID = String; // Alias for JunctionID
pub type LaneID = String; // Alias for LaneID

/// Error types for junction construction and validation.
#[derive(Debug, Clone)]
pub enum JunctionError {
    /// The program has no phases at all.
    NoPhases { id: JunctionID },
    /// A phase length differs from the program's signal count (invariant:
    /// every phase string has the length of `phases[0]`).
    PhaseLengthMismatch {
        id: JunctionID,
        expected: usize,
        found: usize,
        phase_index: usize,
    },
    /// The signal-lane mapping does not cover the program's signal count.
    LaneCountMismatch {
        id: JunctionID,
        signals: usize,
        lanes: usize,
    },
}

impl fmt::Display for JunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JunctionError::NoPhases { id } => {
                write!(f, "Junction '{}' declares no phases", id)
            }
            JunctionError::PhaseLengthMismatch {
                id,
                expected,
                found,
                phase_index,
            } => {
                write!(
                    f,
                    "Junction '{}': phase {} has length {} but the program signal count is {}",
                    id, phase_index, found, expected
                )
            }
            JunctionError::LaneCountMismatch { id, signals, lanes } => {
                write!(
                    f,
                    "Junction '{}': {} signal lanes mapped for {} signals",
                    id, lanes, signals
                )
            }
        }
    }
}

impl std::error::Error for JunctionError {}

/// Which scheduler currently drives a junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControlMode {
    /// Density-responsive scheduling (the default).
    #[default]
    Density,
    /// The external policy picks the phase.
    Rl,
    /// Emergency preemption holds a fixed phase.
    Preempt,
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControlMode::Density => "density",
            ControlMode::Rl => "rl",
            ControlMode::Preempt => "preempt",
        };
        write!(f, "{}", s)
    }
}

/// Per-junction runtime record: the single communication channel from the
/// emergency coordinator to the signal controller.
///
/// The coordinator is the sole writer, the controller the sole reader; no
/// back-pointer between the two exists.
#[derive(Debug, Clone, Default)]
pub struct JunctionRuntime {
    pub mode: ControlMode,
    /// Vehicle currently holding preemption priority at this junction.
    pub preempt_vehicle: Option<VehicleID>,
    /// Target phase index while preempting.
    pub preempt_phase: Option<usize>,
    /// Tick at which the preemption hold expires.
    pub preempt_deadline: Option<u64>,
    /// Advisory hold duration re-issued with every preempt command.
    pub preempt_duration: f64,
}

impl JunctionRuntime {
    /// Clears all preemption state and returns the junction to `fallback`.
    pub fn release(&mut self, fallback: ControlMode) {
        self.mode = fallback;
        self.preempt_vehicle = None;
        self.preempt_phase = None;
        self.preempt_deadline = None;
    }
}

/// A signalised junction: immutable program plus the mutable per-tick
/// bookkeeping of the controller and the runtime record of the coordinator.
#[derive(Debug, Clone)]
pub struct Junction {
    /// Junction identifier (matches the simulator's traffic light id).
    id: JunctionID,
    /// Coordinates in the simulator plane.
    position: Point,
    /// Ordered signal program.
    phases: Vec<Phase>,
    /// Lane feeding each signal position, in program order.
    signal_lanes: Vec<LaneID>,
    /// Approach direction served by each signal position.
    signal_directions: Vec<Option<Cardinal>>,
    /// Index of the phase the controller believes is active.
    current_phase_index: usize,
    /// Seconds the controller has accounted to the active phase.
    time_in_phase: f64,
    /// Coordinator-owned runtime record.
    runtime: JunctionRuntime,
    /// Configured preferred preempt state string, if any. Target-phase
    /// selection prefers the program phase equal to it.
    preempt_override: Option<Phase>,
    /// Set when the simulator rejected a command for this junction; a
    /// faulted junction runs under the simulator's built-in program.
    faulted: bool,
}

impl Junction {
    /// Creates a new `JunctionBuilder` for constructing a `Junction`.
    ///
    /// # Arguments
    /// * `id` - The identifier for the junction.
    ///
    /// # Returns
    /// A `JunctionBuilder` instance for configuring and building the junction.
    pub fn new(id: JunctionID) -> JunctionBuilder {
        JunctionBuilder {
            junction: Junction {
                id,
                position: new_point(0.0, 0.0),
                phases: Vec::new(),
                signal_lanes: Vec::new(),
                signal_directions: Vec::new(),
                current_phase_index: 0,
                time_in_phase: 0.0,
                runtime: JunctionRuntime::default(),
                preempt_override: None,
                faulted: false,
            },
        }
    }

    /// Returns the unique identifier (ID) of the junction
    pub fn get_id(&self) -> &JunctionID {
        &self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Ordered signal program.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Number of controlled signals (the length of every phase string).
    pub fn signal_count(&self) -> usize {
        self.phases.first().map_or(0, Phase::len)
    }

    /// Lanes feeding the signal positions, in program order.
    pub fn signal_lanes(&self) -> &[LaneID] {
        &self.signal_lanes
    }

    /// Approach direction served by the given signal position.
    pub fn direction_at(&self, signal_index: usize) -> Option<Cardinal> {
        self.signal_directions.get(signal_index).copied().flatten()
    }

    /// The phase the controller believes is active.
    pub fn current_phase_index(&self) -> usize {
        self.current_phase_index
    }

    pub fn current_phase(&self) -> &Phase {
        &self.phases[self.current_phase_index]
    }

    /// Seconds accounted to the active phase by the controller.
    pub fn time_in_phase(&self) -> f64 {
        self.time_in_phase
    }

    /// Read-only view of the coordinator's runtime record.
    pub fn runtime(&self) -> &JunctionRuntime {
        &self.runtime
    }

    /// Mutable runtime record. By ownership convention only the emergency
    /// coordinator calls this.
    pub fn runtime_mut(&mut self) -> &mut JunctionRuntime {
        &mut self.runtime
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Marks the junction faulted; the controller stops issuing commands
    /// and the simulator's built-in program takes over.
    pub fn set_faulted(&mut self) {
        self.faulted = true;
    }

    /// Installs the configured preferred preempt state string.
    /// The caller validates its length against the program first.
    pub fn set_preempt_override(&mut self, phase: Phase) {
        self.preempt_override = Some(phase);
    }

    pub fn preempt_override(&self) -> Option<&Phase> {
        self.preempt_override.as_ref()
    }

    /// Reconciles the controller bookkeeping with a simulator snapshot.
    ///
    /// When the simulator advanced the phase on its own (built-in program,
    /// another client), the snapshot wins and the timer restarts from the
    /// reported elapsed time. When the phase matches, the accounted time
    /// advances by `dt` - a re-issued identical command never resets it.
    pub fn sync_phase(&mut self, snapshot_index: usize, snapshot_elapsed: f64, dt: f64) {
        if snapshot_index != self.current_phase_index {
            self.current_phase_index = snapshot_index.min(self.phases.len().saturating_sub(1));
            self.time_in_phase = snapshot_elapsed;
        } else {
            self.time_in_phase += dt;
        }
    }

    /// Moves the controller bookkeeping to a newly commanded phase.
    /// Commanding the already-active phase keeps the timer running.
    pub fn record_commanded_phase(&mut self, index: usize) {
        if index != self.current_phase_index {
            self.current_phase_index = index.min(self.phases.len().saturating_sub(1));
            self.time_in_phase = 0.0;
        }
    }

    /// Signal positions serving the given approach.
    pub fn signals_serving(&self, approach: Cardinal) -> Vec<usize> {
        self.signal_directions
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == Some(approach))
            .map(|(i, _)| i)
            .collect()
    }

    /// Picks the preemption target phase for an approach: a program phase
    /// matching the configured override first, else the lowest-index phase
    /// with green on every signal serving the approach, falling back to
    /// the lowest-index phase with green on any of them.
    ///
    /// Returns `None` when no signal serves the approach or no phase shows
    /// it green.
    pub fn preempt_phase_for(&self, approach: Cardinal) -> Option<usize> {
        if let Some(override_phase) = &self.preempt_override {
            if let Some(index) = self
                .phases
                .iter()
                .position(|phase| phase.as_str() == override_phase.as_str())
            {
                return Some(index);
            }
        }
        let serving = self.signals_serving(approach);
        if serving.is_empty() {
            return None;
        }
        let all_green = self.phases.iter().position(|phase| {
            serving.iter().all(|i| phase.is_green_at(*i))
        });
        if all_green.is_some() {
            return all_green;
        }
        self.phases.iter().position(|phase| {
            serving.iter().any(|i| phase.is_green_at(*i))
        })
    }
}

impl fmt::Display for Junction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Junction '{}' at {} [phases: {}, mode: {}]",
            self.id,
            self.position,
            self.phases.len(),
            self.runtime.mode
        )
    }
}

/// A builder for constructing `Junction` instances.
pub struct JunctionBuilder {
    junction: Junction,
}

impl JunctionBuilder {
    /// Sets the coordinates for the junction.
    pub fn with_position(mut self, position: Point) -> Self {
        self.junction.position = position;
        self
    }

    /// Sets the ordered signal program, overwriting any existing phases.
    pub fn with_phases(mut self, phases: Vec<Phase>) -> Self {
        self.junction.phases = phases;
        self
    }

    /// Sets the lane feeding each signal position, in program order.
    pub fn with_signal_lanes(mut self, lanes: Vec<LaneID>) -> Self {
        self.junction.signal_lanes = lanes;
        self
    }

    /// Sets the approach direction served by each signal position.
    pub fn with_signal_directions(mut self, directions: Vec<Option<Cardinal>>) -> Self {
        self.junction.signal_directions = directions;
        self
    }

    /// Validates the program and builds the final `Junction` object.
    ///
    /// # Returns
    /// The junction, or an error when the program is empty, a phase length
    /// deviates from the signal count, or a non-empty lane mapping does not
    /// cover every signal.
    pub fn build(mut self) -> Result<Junction, JunctionError> {
        let id = self.junction.id.clone();
        if self.junction.phases.is_empty() {
            return Err(JunctionError::NoPhases { id });
        }
        let expected = self.junction.phases[0].len();
        for (phase_index, phase) in self.junction.phases.iter().enumerate() {
            if phase.len() != expected {
                return Err(JunctionError::PhaseLengthMismatch {
                    id,
                    expected,
                    found: phase.len(),
                    phase_index,
                });
            }
        }
        if !self.junction.signal_lanes.is_empty() && self.junction.signal_lanes.len() != expected {
            return Err(JunctionError::LaneCountMismatch {
                id,
                signals: expected,
                lanes: self.junction.signal_lanes.len(),
            });
        }
        if self.junction.signal_directions.is_empty() {
            self.junction.signal_directions = vec![None; expected];
        }
        Ok(self.junction)
    }
}
