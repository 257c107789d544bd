use crate::client::{ClientError, SimulatorClient};
use crate::emergency::ApproachFeatures;
use crate::policy::{Policy, PolicyError, build_observation};
use crate::topology::{ControlMode, Junction, LaneID};
use crate::verbose::{
    EVENT_JUNCTION_FAULT, EVENT_PHASE_ADVANCE, EVENT_RL_ACTION, VerboseLevel,
    verbose_log_with_fields,
};
use std::collections::HashMap;
use std::fmt;

/// Error types for controller decisions.
#[derive(Debug)]
pub enum ControllerError {
    /// A simulator command failed with a protocol-level error.
    Client(ClientError),
    /// The policy hook failed; RL modes cannot continue without it.
    Policy(PolicyError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Client(err) => write!(f, "Controller command failed: {}", err),
            ControllerError::Policy(err) => write!(f, "Policy query failed: {}", err),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ClientError> for ControllerError {
    fn from(err: ClientError) -> Self {
        ControllerError::Client(err)
    }
}

impl From<PolicyError> for ControllerError {
    fn from(err: PolicyError) -> Self {
        ControllerError::Policy(err)
    }
}

/// Signal timing tunables of the density scheduler.
#[derive(Debug, Clone)]
pub struct SignalTiming {
    /// Shortest green hold, seconds.
    pub min_green_s: f64,
    /// Longest green hold, seconds (hard cap).
    pub max_green_s: f64,
    /// Clearance phase duration, seconds.
    pub yellow_s: f64,
    /// Advisory extension granted while density stays high, seconds.
    pub extension_step_s: f64,
    /// Density at or below which a green ends early.
    pub density_low: f64,
    /// Density at or above which a green extends to the cap.
    pub density_high: f64,
}

impl Default for SignalTiming {
    fn default() -> Self {
        SignalTiming {
            min_green_s: 10.0,
            max_green_s: 45.0,
            yellow_s: 3.0,
            extension_step_s: 3.0,
            density_low: 3.0,
            density_high: 10.0,
        }
    }
}

/// Per-lane counts sampled from the simulator this tick.
#[derive(Debug, Clone, Default)]
pub struct LaneOccupancy {
    samples: HashMap<LaneID, (u32, u32)>,
}

impl LaneOccupancy {
    pub fn new() -> Self {
        LaneOccupancy::default()
    }

    /// Records a lane sample: total vehicles and halting vehicles.
    pub fn insert(&mut self, lane_id: &str, vehicles: u32, halting: u32) {
        self.samples.insert(lane_id.to_string(), (vehicles, halting));
    }

    /// Vehicles on the lane; unsampled lanes count as empty.
    pub fn vehicles(&self, lane_id: &str) -> u32 {
        self.samples.get(lane_id).map_or(0, |(v, _)| *v)
    }

    /// Halting vehicles on the lane; unsampled lanes count as empty.
    pub fn halting(&self, lane_id: &str) -> u32 {
        self.samples.get(lane_id).map_or(0, |(_, h)| *h)
    }
}

/// What the controller decided for one junction this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseDecision {
    /// Keep the current phase; the advisory remaining duration was refreshed.
    Hold { remaining_s: f64 },
    /// Advance to the given phase.
    Advance { to: usize, duration_s: f64 },
    /// Preemption overlay re-issued its phase.
    Preempt { phase: usize, duration_s: f64 },
    /// The policy selected a phase.
    RlSelect { phase: usize },
}

/// Density-responsive phase scheduler with preemption and RL overlays.
///
/// One instance drives all junctions of a run. Per junction and tick it
/// evaluates the mode the emergency coordinator left in the junction's
/// runtime record and emits `set_phase` / `set_phase_duration` commands to
/// the simulator client.
///
/// Faults are isolated per junction: a rejected command marks only that
/// junction Faulted (one warning, then the simulator's built-in program
/// runs it), while protocol-level client errors abort the run.
pub struct AdaptiveSignalController {
    timing: SignalTiming,
    policy: Option<Box<dyn Policy>>,
    /// RL-Activate outer radius, the distance normaliser of observations.
    proximity_threshold_m: f64,
}

impl AdaptiveSignalController {
    /// Creates a controller.
    ///
    /// # Arguments
    /// * `timing` - Signal timing tunables.
    /// * `policy` - Loaded policy for RL modes; `None` disallows RL.
    /// * `proximity_threshold_m` - Observation distance normaliser.
    pub fn new(timing: SignalTiming, policy: Option<Box<dyn Policy>>, proximity_threshold_m: f64) -> Self {
        AdaptiveSignalController {
            timing,
            policy,
            proximity_threshold_m,
        }
    }

    pub fn timing(&self) -> &SignalTiming {
        &self.timing
    }

    pub fn has_policy(&self) -> bool {
        self.policy.is_some()
    }

    /// Mean `vehicles + 0.5 × halting` over the lanes feeding the green
    /// signals of the junction's current phase.
    pub fn green_density(&self, junction: &Junction, occupancy: &LaneOccupancy) -> f64 {
        let phase = junction.current_phase();
        let lanes = junction.signal_lanes();
        let mut total = 0.0;
        let mut greens = 0u32;
        for signal_index in phase.green_indices() {
            greens += 1;
            if let Some(lane_id) = lanes.get(signal_index) {
                total += occupancy.vehicles(lane_id) as f64
                    + 0.5 * occupancy.halting(lane_id) as f64;
            }
        }
        if greens == 0 { 0.0 } else { total / greens as f64 }
    }

    /// Runs the per-tick decision for one junction and applies it through
    /// the client.
    ///
    /// Returns the decision taken, or `None` for a faulted junction.
    /// Protocol-level command failures surface as
    /// [`ControllerError::Client`]; entity-level rejections fault the
    /// junction and return `Ok(None)`.
    pub fn control_junction<C: SimulatorClient>(
        &mut self,
        junction: &mut Junction,
        occupancy: &LaneOccupancy,
        features: &ApproachFeatures,
        client: &mut C,
    ) -> Result<Option<PhaseDecision>, ControllerError> {
        if junction.is_faulted() {
            return Ok(None);
        }
        let decision = match junction.runtime().mode {
            ControlMode::Preempt => self.decide_preempt(junction),
            ControlMode::Rl => self.decide_rl(junction, occupancy, features)?,
            ControlMode::Density => self.decide_density(junction, occupancy),
        };
        self.apply(junction, &decision, client)?;
        Ok(Some(decision))
    }

    fn decide_preempt(&self, junction: &Junction) -> PhaseDecision {
        let runtime = junction.runtime();
        let phase = runtime
            .preempt_phase
            .unwrap_or_else(|| junction.current_phase_index());
        PhaseDecision::Preempt {
            phase,
            duration_s: runtime.preempt_duration,
        }
    }

    fn decide_rl(
        &mut self,
        junction: &Junction,
        occupancy: &LaneOccupancy,
        features: &ApproachFeatures,
    ) -> Result<PhaseDecision, ControllerError> {
        let policy = self
            .policy
            .as_mut()
            .ok_or(ControllerError::Policy(PolicyError::NotLoaded))?;
        let observation = build_observation(
            junction,
            occupancy,
            features,
            self.timing.max_green_s,
            self.proximity_threshold_m,
        );
        let action = policy.act(&observation)?;
        // Bounds safety regardless of the policy's action cardinality
        let phase = action % junction.phases().len();
        verbose_log_with_fields(
            VerboseLevel::Additional,
            EVENT_RL_ACTION,
            "policy selected phase",
            &[
                ("junction", &junction.get_id()),
                ("action", &action),
                ("phase", &phase),
            ],
        );
        Ok(PhaseDecision::RlSelect { phase })
    }

    fn decide_density(&self, junction: &Junction, occupancy: &LaneOccupancy) -> PhaseDecision {
        let timing = &self.timing;
        let elapsed = junction.time_in_phase();
        let phase = junction.current_phase();

        if !phase.has_green() {
            // Clearance (yellow or all-red) phases run exactly yellow_s
            if elapsed >= timing.yellow_s {
                return self.advance(junction);
            }
            return PhaseDecision::Hold {
                remaining_s: timing.yellow_s - elapsed,
            };
        }

        if elapsed < timing.min_green_s {
            return PhaseDecision::Hold {
                remaining_s: timing.min_green_s - elapsed,
            };
        }
        // Hard cap wins over any density reading
        if elapsed >= timing.max_green_s {
            return self.advance(junction);
        }
        let density = self.green_density(junction, occupancy);
        if density >= timing.density_high {
            return PhaseDecision::Hold {
                remaining_s: timing.extension_step_s,
            };
        }
        if density <= timing.density_low {
            return self.advance(junction);
        }
        // Scale the green linearly between the thresholds
        let span = timing.density_high - timing.density_low;
        let target = timing.min_green_s
            + (density - timing.density_low) / span * (timing.max_green_s - timing.min_green_s);
        if elapsed >= target {
            self.advance(junction)
        } else {
            PhaseDecision::Hold {
                remaining_s: target - elapsed,
            }
        }
    }

    fn advance(&self, junction: &Junction) -> PhaseDecision {
        let next = (junction.current_phase_index() + 1) % junction.phases().len();
        let duration_s = if junction.phases()[next].is_yellow() {
            self.timing.yellow_s
        } else {
            self.timing.min_green_s
        };
        PhaseDecision::Advance { to: next, duration_s }
    }

    fn apply<C: SimulatorClient>(
        &self,
        junction: &mut Junction,
        decision: &PhaseDecision,
        client: &mut C,
    ) -> Result<(), ControllerError> {
        let commands: (Option<usize>, f64) = match decision {
            PhaseDecision::Hold { remaining_s } => (None, *remaining_s),
            PhaseDecision::Advance { to, duration_s } => (Some(*to), *duration_s),
            PhaseDecision::Preempt { phase, duration_s } => (Some(*phase), *duration_s),
            PhaseDecision::RlSelect { phase } => (Some(*phase), self.timing.min_green_s),
        };
        let junction_id = junction.get_id().clone();
        if let Some(index) = commands.0 {
            match client.set_phase(&junction_id, index) {
                Ok(()) => {
                    if matches!(decision, PhaseDecision::Advance { .. }) {
                        verbose_log_with_fields(
                            VerboseLevel::Additional,
                            EVENT_PHASE_ADVANCE,
                            "phase advanced",
                            &[("junction", &junction_id), ("to", &index)],
                        );
                    }
                    junction.record_commanded_phase(index);
                }
                Err(err) => return self.handle_command_error(junction, err),
            }
        }
        if let Err(err) = client.set_phase_duration(&junction_id, commands.1) {
            return self.handle_command_error(junction, err);
        }
        Ok(())
    }

    fn handle_command_error(
        &self,
        junction: &mut Junction,
        err: ClientError,
    ) -> Result<(), ControllerError> {
        if err.is_fatal() {
            return Err(ControllerError::Client(err));
        }
        // Entity-level rejection: fault this junction, keep the rest running
        tracing::warn!(
            event = EVENT_JUNCTION_FAULT,
            junction = %junction.get_id(),
            error = %err,
            "junction faulted, reverting to the simulator program"
        );
        junction.set_faulted();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockSimulatorClient;
    use crate::geom::new_point;
    use crate::signal::Phase;
    use crate::topology::Cardinal;

    fn junction() -> Junction {
        let phases = ["rrGG", "rryy", "GGrr", "yyrr"]
            .iter()
            .map(|p| Phase::parse(p).unwrap())
            .collect();
        Junction::new("J1".to_string())
            .with_position(new_point(0.0, 0.0))
            .with_phases(phases)
            .with_signal_lanes(vec![
                "n_in_0".to_string(),
                "n_in_1".to_string(),
                "e_in_0".to_string(),
                "e_in_1".to_string(),
            ])
            .with_signal_directions(vec![
                Some(Cardinal::North),
                Some(Cardinal::North),
                Some(Cardinal::East),
                Some(Cardinal::East),
            ])
            .build()
            .unwrap()
    }

    fn controller() -> AdaptiveSignalController {
        AdaptiveSignalController::new(SignalTiming::default(), None, 250.0)
    }

    fn mock() -> MockSimulatorClient {
        let mut sim = MockSimulatorClient::new();
        sim.add_traffic_light("J1", vec!["rrGG", "rryy", "GGrr", "yyrr"]);
        sim
    }

    #[test]
    fn test_hold_under_min_green() {
        let mut controller = controller();
        let mut junction = junction();
        let mut sim = mock();
        junction.sync_phase(0, 0.0, 4.0);
        let decision = controller
            .control_junction(&mut junction, &LaneOccupancy::new(), &ApproachFeatures::default(), &mut sim)
            .unwrap()
            .unwrap();
        assert_eq!(decision, PhaseDecision::Hold { remaining_s: 6.0 });
        assert!(sim.set_phase_commands().is_empty());
    }

    #[test]
    fn test_low_density_advances_after_min_green() {
        let mut controller = controller();
        let mut junction = junction();
        let mut sim = mock();
        junction.sync_phase(0, 0.0, 10.0);
        let decision = controller
            .control_junction(&mut junction, &LaneOccupancy::new(), &ApproachFeatures::default(), &mut sim)
            .unwrap()
            .unwrap();
        assert_eq!(decision, PhaseDecision::Advance { to: 1, duration_s: 3.0 });
        assert_eq!(junction.current_phase_index(), 1);
        assert_eq!(junction.time_in_phase(), 0.0);
    }

    #[test]
    fn test_high_density_extends_until_cap() {
        let mut controller = controller();
        let mut junction = junction();
        let mut sim = mock();
        let mut occupancy = LaneOccupancy::new();
        // Green signals are e_in_* in phase 0 ("rrGG")
        occupancy.insert("e_in_0", 12, 0);
        occupancy.insert("e_in_1", 11, 0);
        junction.sync_phase(0, 0.0, 20.0);
        let decision = controller
            .control_junction(&mut junction, &occupancy, &ApproachFeatures::default(), &mut sim)
            .unwrap()
            .unwrap();
        assert_eq!(decision, PhaseDecision::Hold { remaining_s: 3.0 });

        // At the hard cap the phase advances regardless of density
        junction.sync_phase(0, 0.0, 25.0);
        let decision = controller
            .control_junction(&mut junction, &occupancy, &ApproachFeatures::default(), &mut sim)
            .unwrap()
            .unwrap();
        assert_eq!(decision, PhaseDecision::Advance { to: 1, duration_s: 3.0 });
    }

    #[test]
    fn test_density_scaling_between_thresholds() {
        let mut controller = controller();
        let mut junction = junction();
        let mut sim = mock();
        let mut occupancy = LaneOccupancy::new();
        // Density (6.5 + 6.5) / 2 = 6.5 -> target = 10 + 0.5*35 = 27.5
        occupancy.insert("e_in_0", 6, 1);
        occupancy.insert("e_in_1", 6, 1);
        junction.sync_phase(0, 0.0, 27.0);
        let decision = controller
            .control_junction(&mut junction, &occupancy, &ApproachFeatures::default(), &mut sim)
            .unwrap()
            .unwrap();
        assert!(matches!(decision, PhaseDecision::Hold { .. }));

        junction.sync_phase(0, 27.0, 1.0);
        let decision = controller
            .control_junction(&mut junction, &occupancy, &ApproachFeatures::default(), &mut sim)
            .unwrap()
            .unwrap();
        assert_eq!(decision, PhaseDecision::Advance { to: 1, duration_s: 3.0 });
    }

    #[test]
    fn test_yellow_runs_exactly_yellow_duration() {
        let mut controller = controller();
        let mut junction = junction();
        let mut sim = mock();
        junction.sync_phase(1, 2.0, 0.0);
        let decision = controller
            .control_junction(&mut junction, &LaneOccupancy::new(), &ApproachFeatures::default(), &mut sim)
            .unwrap()
            .unwrap();
        assert_eq!(decision, PhaseDecision::Hold { remaining_s: 1.0 });

        junction.sync_phase(1, 2.0, 1.0);
        let decision = controller
            .control_junction(&mut junction, &LaneOccupancy::new(), &ApproachFeatures::default(), &mut sim)
            .unwrap()
            .unwrap();
        assert_eq!(decision, PhaseDecision::Advance { to: 2, duration_s: 10.0 });
    }

    #[test]
    fn test_preempt_overlay_reissues_without_timer_reset() {
        let mut controller = controller();
        let mut junction = junction();
        let mut sim = mock();
        {
            let runtime = junction.runtime_mut();
            runtime.mode = ControlMode::Preempt;
            runtime.preempt_phase = Some(2);
            runtime.preempt_duration = 10.0;
        }
        junction.sync_phase(0, 0.0, 1.0);
        for _ in 0..3 {
            let decision = controller
                .control_junction(&mut junction, &LaneOccupancy::new(), &ApproachFeatures::default(), &mut sim)
                .unwrap()
                .unwrap();
            assert_eq!(decision, PhaseDecision::Preempt { phase: 2, duration_s: 10.0 });
            junction.sync_phase(2, junction.time_in_phase(), 1.0);
        }
        // Re-issued identical commands never reset the bookkeeping timer
        assert!(junction.time_in_phase() >= 2.0);
    }

    #[test]
    fn test_rejected_command_faults_junction() {
        let mut controller = controller();
        let mut junction = junction();
        let mut sim = mock();
        sim.reject_phase_commands("J1");
        junction.sync_phase(0, 0.0, 10.0);
        let decision = controller
            .control_junction(&mut junction, &LaneOccupancy::new(), &ApproachFeatures::default(), &mut sim)
            .unwrap();
        assert!(decision.is_some());
        assert!(junction.is_faulted());
        // Subsequent ticks skip the junction entirely
        let decision = controller
            .control_junction(&mut junction, &LaneOccupancy::new(), &ApproachFeatures::default(), &mut sim)
            .unwrap();
        assert!(decision.is_none());
    }
}
