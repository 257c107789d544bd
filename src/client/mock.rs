//! Scriptable in-memory simulator used by tests, benches and examples.
//!
//! The mock keeps a tiny world: a tick counter, a set of traffic lights
//! with programs, per-lane counts and a vehicle population that can either
//! be set directly or scheduled per tick. Every phase command issued by the
//! core is recorded so tests can assert on the exact command stream.

use crate::client::{ClientError, SimulatorClient, TrafficLightSnapshot, VehicleSnapshot};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A phase command recorded by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    SetPhase { tl_id: String, index: usize },
    SetPhaseDuration { tl_id: String, seconds: f64 },
}

/// Scriptable [`SimulatorClient`] implementation.
///
/// # Example
///
/// ```
/// use vanet_cosim_core::client::{MockSimulatorClient, SimulatorClient};
///
/// let mut sim = MockSimulatorClient::new();
/// sim.add_traffic_light("J1", vec!["GGrr", "yyrr", "rrGG", "rryy"]);
/// sim.set_lane_counts("e_in_0", 4, 1);
///
/// assert_eq!(sim.step().unwrap(), 1);
/// assert_eq!(sim.lane_vehicle_count("e_in_0").unwrap(), 4);
/// ```
#[derive(Debug, Default)]
pub struct MockSimulatorClient {
    tick: u64,
    closed: bool,
    lights: Vec<TrafficLightSnapshot>,
    lane_counts: HashMap<String, (u32, u32)>,
    /// Population used when no schedule entry covers the current tick.
    current_vehicles: Vec<VehicleSnapshot>,
    /// Tick-keyed population script; the entry with the greatest key not
    /// exceeding the current tick wins.
    schedule: BTreeMap<u64, Vec<VehicleSnapshot>>,
    commands: Vec<MockCommand>,
    /// Error injected into the next `step` call.
    fail_next_step: Option<ClientError>,
    /// Traffic lights whose `set_phase` is forced to fail.
    reject_phase_for: HashSet<String>,
}

impl MockSimulatorClient {
    pub fn new() -> Self {
        MockSimulatorClient::default()
    }

    /// Registers a traffic light with the given signal program.
    /// The light starts at phase 0 with zero elapsed time.
    pub fn add_traffic_light(&mut self, id: &str, phases: Vec<&str>) {
        self.lights.push(TrafficLightSnapshot {
            id: id.to_string(),
            phases: phases.into_iter().map(|p| p.to_string()).collect(),
            current_phase_index: 0,
            time_in_phase: 0.0,
        });
    }

    /// Overrides a light's phase bookkeeping, e.g. to start a scenario
    /// mid-green.
    pub fn force_light_state(&mut self, id: &str, index: usize, time_in_phase: f64) {
        if let Some(light) = self.lights.iter_mut().find(|l| l.id == id) {
            light.current_phase_index = index;
            light.time_in_phase = time_in_phase;
        }
    }

    /// Sets the fallback vehicle population returned by `vehicles()`.
    pub fn set_vehicles(&mut self, vehicles: Vec<VehicleSnapshot>) {
        self.current_vehicles = vehicles;
    }

    /// Schedules a population that takes effect from `tick` onwards
    /// (until a later entry takes over).
    pub fn schedule_vehicles(&mut self, tick: u64, vehicles: Vec<VehicleSnapshot>) {
        self.schedule.insert(tick, vehicles);
    }

    /// Sets per-lane counts: total vehicles and halting vehicles.
    pub fn set_lane_counts(&mut self, lane_id: &str, vehicles: u32, halting: u32) {
        self.lane_counts.insert(lane_id.to_string(), (vehicles, halting));
    }

    /// Injects an error to be returned by the next `step()` call.
    pub fn fail_next_step(&mut self, err: ClientError) {
        self.fail_next_step = Some(err);
    }

    /// Makes every `set_phase` for the given light fail with a protocol
    /// rejection, regardless of the index.
    pub fn reject_phase_commands(&mut self, tl_id: &str) {
        self.reject_phase_for.insert(tl_id.to_string());
    }

    /// All phase commands recorded so far, in issue order.
    pub fn commands(&self) -> &[MockCommand] {
        &self.commands
    }

    /// Recorded `SetPhase` commands only.
    pub fn set_phase_commands(&self) -> Vec<MockCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, MockCommand::SetPhase { .. }))
            .cloned()
            .collect()
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    fn ensure_open(&self) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(())
    }
}

impl SimulatorClient for MockSimulatorClient {
    fn step(&mut self) -> Result<u64, ClientError> {
        self.ensure_open()?;
        if let Some(err) = self.fail_next_step.take() {
            return Err(err);
        }
        self.tick += 1;
        // One tick is one simulated second
        for light in &mut self.lights {
            light.time_in_phase += 1.0;
        }
        Ok(self.tick)
    }

    fn vehicles(&mut self) -> Result<Vec<VehicleSnapshot>, ClientError> {
        self.ensure_open()?;
        let scheduled = self
            .schedule
            .range(..=self.tick)
            .next_back()
            .map(|(_, v)| v.clone());
        Ok(scheduled.unwrap_or_else(|| self.current_vehicles.clone()))
    }

    fn traffic_lights(&mut self) -> Result<Vec<TrafficLightSnapshot>, ClientError> {
        self.ensure_open()?;
        Ok(self.lights.clone())
    }

    fn lane_vehicle_count(&mut self, lane_id: &str) -> Result<u32, ClientError> {
        self.ensure_open()?;
        match self.lane_counts.get(lane_id) {
            Some((vehicles, _)) => Ok(*vehicles),
            None => Ok(0),
        }
    }

    fn lane_halting_count(&mut self, lane_id: &str) -> Result<u32, ClientError> {
        self.ensure_open()?;
        match self.lane_counts.get(lane_id) {
            Some((_, halting)) => Ok(*halting),
            None => Ok(0),
        }
    }

    fn set_phase(&mut self, tl_id: &str, index: usize) -> Result<(), ClientError> {
        self.ensure_open()?;
        let light = self
            .lights
            .iter_mut()
            .find(|l| l.id == tl_id)
            .ok_or_else(|| ClientError::UnknownTrafficLight(tl_id.to_string()))?;
        if self.reject_phase_for.contains(tl_id) {
            // Entity-level rejection, as a mismatched program produces
            return Err(ClientError::PhaseOutOfRange {
                tl_id: tl_id.to_string(),
                index,
                phases: light.phases.len(),
            });
        }
        if index >= light.phases.len() {
            return Err(ClientError::PhaseOutOfRange {
                tl_id: tl_id.to_string(),
                index,
                phases: light.phases.len(),
            });
        }
        // Idempotent: re-setting the current index keeps the phase timer running
        if light.current_phase_index != index {
            light.current_phase_index = index;
            light.time_in_phase = 0.0;
        }
        self.commands.push(MockCommand::SetPhase {
            tl_id: tl_id.to_string(),
            index,
        });
        Ok(())
    }

    fn set_phase_duration(&mut self, tl_id: &str, seconds: f64) -> Result<(), ClientError> {
        self.ensure_open()?;
        if !self.lights.iter().any(|l| l.id == tl_id) {
            return Err(ClientError::UnknownTrafficLight(tl_id.to_string()));
        }
        self.commands.push(MockCommand::SetPhaseDuration {
            tl_id: tl_id.to_string(),
            seconds,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), ClientError> {
        self.closed = true;
        Ok(())
    }
}

/// Builds a [`VehicleSnapshot`] for scripting mock populations.
///
/// # Arguments
/// * `id` - Vehicle id (also drives emergency classification downstream).
/// * `x`, `y` - Position in metres.
/// * `speed` - Speed in m/s.
/// * `heading` - Degrees, 0 = east, counter-clockwise positive.
/// * `lane_id` - Occupied lane id.
pub fn vehicle_snapshot(id: &str, x: f64, y: f64, speed: f64, heading: f64, lane_id: &str) -> VehicleSnapshot {
    VehicleSnapshot {
        id: id.to_string(),
        vehicle_type: "passenger".to_string(),
        x,
        y,
        speed,
        heading,
        lane_id: lane_id.to_string(),
        edge_id: lane_id.split('_').next().unwrap_or(lane_id).to_string(),
        route: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_advances_lights() {
        let mut sim = MockSimulatorClient::new();
        sim.add_traffic_light("J1", vec!["GGrr", "yyrr", "rrGG", "rryy"]);
        sim.step().unwrap();
        sim.step().unwrap();
        let lights = sim.traffic_lights().unwrap();
        assert_eq!(lights[0].time_in_phase, 2.0);
        assert_eq!(lights[0].current_phase_index, 0);
    }

    #[test]
    fn test_set_phase_idempotent() {
        let mut sim = MockSimulatorClient::new();
        sim.add_traffic_light("J1", vec!["GGrr", "yyrr"]);
        sim.step().unwrap();
        sim.step().unwrap();
        // Same index: timer keeps running
        sim.set_phase("J1", 0).unwrap();
        assert_eq!(sim.traffic_lights().unwrap()[0].time_in_phase, 2.0);
        // New index: timer resets
        sim.set_phase("J1", 1).unwrap();
        let light = &sim.traffic_lights().unwrap()[0];
        assert_eq!(light.current_phase_index, 1);
        assert_eq!(light.time_in_phase, 0.0);
    }

    #[test]
    fn test_phase_out_of_range() {
        let mut sim = MockSimulatorClient::new();
        sim.add_traffic_light("J1", vec!["GGrr", "yyrr"]);
        let err = sim.set_phase("J1", 5).unwrap_err();
        assert!(matches!(err, ClientError::PhaseOutOfRange { index: 5, .. }));
    }

    #[test]
    fn test_schedule_takes_over() {
        let mut sim = MockSimulatorClient::new();
        sim.set_vehicles(vec![vehicle_snapshot("a", 0.0, 0.0, 10.0, 0.0, "e_0")]);
        sim.schedule_vehicles(2, vec![]);
        sim.step().unwrap();
        assert_eq!(sim.vehicles().unwrap().len(), 1);
        sim.step().unwrap();
        assert!(sim.vehicles().unwrap().is_empty());
    }

    #[test]
    fn test_closed_client_rejects_calls() {
        let mut sim = MockSimulatorClient::new();
        sim.close().unwrap();
        assert!(matches!(sim.step(), Err(ClientError::ConnectionClosed)));
    }
}
