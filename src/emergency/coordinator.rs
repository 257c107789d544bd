use crate::agents::{Vehicle, VehicleID};
use crate::config::RunMode;
use crate::emergency::bands::{BandThresholds, DistanceBand};
use crate::emergency::track::{EmergencyTrack, TrackState};
use crate::topology::{Cardinal, ControlMode, Junction, JunctionID, NetworkTopology};
use crate::verbose::{
    EVENT_PREEMPT_CLAIM, EVENT_PREEMPT_EXTEND, EVENT_PREEMPT_QUEUE, EVENT_PREEMPT_RELEASE,
    EVENT_TRACK_CREATE, EVENT_TRACK_DROP,
};
use crate::{log_additional, log_detailed};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Nearest approaching emergency on one cardinal, as seen from a junction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmergencyApproach {
    pub distance_m: f64,
    pub speed_mps: f64,
}

/// Per-junction emergency presence, one slot per cardinal, used by the RL
/// observation vector.
#[derive(Debug, Clone, Default)]
pub struct ApproachFeatures {
    slots: [Option<EmergencyApproach>; 4],
}

impl ApproachFeatures {
    /// Records an approaching emergency, keeping the nearest per cardinal.
    pub fn set(&mut self, cardinal: Cardinal, approach: EmergencyApproach) {
        let slot = &mut self.slots[cardinal.index()];
        match slot {
            Some(existing) if existing.distance_m <= approach.distance_m => {}
            _ => *slot = Some(approach),
        }
    }

    pub fn get(&self, cardinal: Cardinal) -> Option<EmergencyApproach> {
        self.slots[cardinal.index()]
    }
}

/// Coordinator tunables, resolved from configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub bands: BandThresholds,
    /// Global rate limit between any two preempt commands, ticks.
    pub cooldown_ticks: u64,
    /// Default preempt hold, seconds (one tick = one second).
    pub preempt_duration_s: f64,
    /// Distance past a junction at which a re-observed vehicle's served
    /// entry is cleared again.
    pub redetect_clearance_m: f64,
    /// Consecutive unreported ticks after which a track is destroyed.
    pub missing_tick_limit: u32,
    /// Global signal-control mode the junction fallback derives from.
    pub run_mode: RunMode,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        CoordinatorSettings {
            bands: BandThresholds::default(),
            cooldown_ticks: 3,
            preempt_duration_s: 10.0,
            redetect_clearance_m: 200.0,
            missing_tick_limit: 2,
            run_mode: RunMode::Density,
        }
    }
}

struct Candidate {
    wait_key: u64,
    distance_m: f64,
    vehicle_id: VehicleID,
    direction: Cardinal,
}

/// Arbitrates preemption per junction from the emergency-vehicle
/// population: one priority vehicle per junction, first detected wins,
/// queued latecomers promote in wait order no sooner than the tick after a
/// release, and a global cooldown rate-limits preempt commands
/// system-wide.
///
/// The coordinator exclusively owns all [`EmergencyTrack`] state and every
/// junction's runtime record. All of its state is instance-scoped.
pub struct EmergencyCoordinator {
    settings: CoordinatorSettings,
    tracks: IndexMap<VehicleID, EmergencyTrack>,
    /// Vehicles that already cleared a junction; survives track
    /// destruction so a briefly lost vehicle cannot re-trigger.
    served: HashMap<JunctionID, HashSet<VehicleID>>,
    last_override_tick: Option<u64>,
    preempt_events: u64,
}

impl EmergencyCoordinator {
    pub fn new(settings: CoordinatorSettings) -> Self {
        EmergencyCoordinator {
            settings,
            tracks: IndexMap::new(),
            served: HashMap::new(),
            last_override_tick: None,
            preempt_events: 0,
        }
    }

    /// Number of preemption activations so far.
    pub fn preempt_events(&self) -> u64 {
        self.preempt_events
    }

    /// Number of currently tracked emergency vehicles.
    pub fn active_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// The track of a vehicle, if one is active.
    pub fn track(&self, vehicle_id: &str) -> Option<&EmergencyTrack> {
        self.tracks.get(vehicle_id)
    }

    /// Tick of the last issued preempt command.
    pub fn last_override_tick(&self) -> Option<u64> {
        self.last_override_tick
    }

    /// Whether the vehicle is recorded as having cleared the junction.
    pub fn is_served(&self, junction_id: &str, vehicle_id: &str) -> bool {
        self.served
            .get(junction_id)
            .is_some_and(|s| s.contains(vehicle_id))
    }

    fn cooldown_ok(&self, tick: u64) -> bool {
        self.last_override_tick
            .is_none_or(|last| tick.saturating_sub(last) >= self.settings.cooldown_ticks)
    }

    /// Runs the coordinator for one tick: folds the vehicle snapshot into
    /// the tracks, drives every (vehicle, junction) state machine, manages
    /// priority claims/releases/extensions and finally writes each
    /// junction's runtime mode.
    ///
    /// Returns the per-junction emergency approach features for the RL
    /// observation vector.
    pub fn update(
        &mut self,
        tick: u64,
        vehicles: &[Vehicle],
        junctions: &mut IndexMap<JunctionID, Junction>,
        topology: &NetworkTopology,
    ) -> HashMap<JunctionID, ApproachFeatures> {
        let seen = self.observe_vehicles(tick, vehicles, junctions, topology);
        self.drop_missing(&seen, junctions);
        let features = self.arbitrate(tick, junctions);
        self.write_modes(junctions, &features);
        features
    }

    /// Folds the snapshot into tracks; creates tracks for emergencies
    /// first detected inside any RSU's coverage and applies the
    /// re-detection clearance rule to returning vehicles.
    fn observe_vehicles(
        &mut self,
        tick: u64,
        vehicles: &[Vehicle],
        junctions: &IndexMap<JunctionID, Junction>,
        topology: &NetworkTopology,
    ) -> HashSet<VehicleID> {
        let mut seen = HashSet::new();
        for vehicle in vehicles.iter().filter(|v| v.is_emergency()) {
            seen.insert(vehicle.id.clone());
            if let Some(track) = self.tracks.get_mut(&vehicle.id) {
                track.observe(vehicle);
                continue;
            }
            if !topology.rsus().any(|rsu| rsu.covers(&vehicle.position)) {
                continue;
            }
            let track = EmergencyTrack::new(vehicle, tick);
            log_additional!(
                EVENT_TRACK_CREATE,
                "emergency vehicle detected",
                vehicle = vehicle.id.as_str(),
                tick = tick
            );
            self.clear_stale_served(&track, junctions);
            self.tracks.insert(vehicle.id.clone(), track);
        }
        seen
    }

    /// Re-detection rule: a returning vehicle's served entry is cleared
    /// only when it is re-observed at least the clearance distance past
    /// the junction and moving away.
    fn clear_stale_served(&mut self, track: &EmergencyTrack, junctions: &IndexMap<JunctionID, Junction>) {
        let Some(direction) = track.travel_direction() else {
            return;
        };
        for (junction_id, junction) in junctions {
            let Some(entry) = self.served.get_mut(junction_id) else {
                continue;
            };
            if !entry.contains(&track.vehicle_id) {
                continue;
            }
            let position = junction.position();
            let distance = track.last_position.distance_to(&position);
            let moving_away = !direction.approaching(&track.last_position, &position);
            if distance >= self.settings.redetect_clearance_m && moving_away {
                entry.remove(&track.vehicle_id);
            }
        }
    }

    /// Ages unreported tracks, destroys expired ones and releases any
    /// junction whose priority vehicle disappeared this tick.
    fn drop_missing(&mut self, seen: &HashSet<VehicleID>, junctions: &mut IndexMap<JunctionID, Junction>) {
        let mut dropped = Vec::new();
        for (vehicle_id, track) in self.tracks.iter_mut() {
            if seen.contains(vehicle_id) {
                continue;
            }
            track.mark_missing();
            if track.missing_ticks >= self.settings.missing_tick_limit {
                dropped.push(vehicle_id.clone());
            }
        }
        for vehicle_id in dropped {
            self.tracks.shift_remove(&vehicle_id);
            log_additional!(
                EVENT_TRACK_DROP,
                "emergency track destroyed",
                vehicle = vehicle_id.as_str(),
                reason = "unreported"
            );
        }
        // A vehicle gone mid-preempt releases its junction this tick
        for (junction_id, junction) in junctions.iter_mut() {
            let Some(holder) = junction.runtime().preempt_vehicle.clone() else {
                continue;
            };
            if !seen.contains(&holder) {
                junction.runtime_mut().release(ControlMode::Density);
                log_additional!(
                    EVENT_PREEMPT_RELEASE,
                    "priority vehicle disappeared",
                    junction = junction_id.as_str(),
                    vehicle = holder.as_str()
                );
            }
        }
    }

    /// Drives the distance-band state machines and the per-junction
    /// priority arbitration.
    fn arbitrate(
        &mut self,
        tick: u64,
        junctions: &mut IndexMap<JunctionID, Junction>,
    ) -> HashMap<JunctionID, ApproachFeatures> {
        let holders_at_start: HashMap<JunctionID, Option<VehicleID>> = junctions
            .iter()
            .map(|(id, junction)| (id.clone(), junction.runtime().preempt_vehicle.clone()))
            .collect();
        let mut features: HashMap<JunctionID, ApproachFeatures> = HashMap::new();

        for (junction_id, junction) in junctions.iter_mut() {
            if junction.is_faulted() {
                continue;
            }
            let position = junction.position();
            let holder = junction.runtime().preempt_vehicle.clone();
            let mut holder_in_band = false;
            let mut candidates: Vec<Candidate> = Vec::new();

            for (vehicle_id, track) in self.tracks.iter_mut() {
                if track.missing_ticks > 0 {
                    continue;
                }
                let distance = track.last_position.distance_to(&position);
                let band = DistanceBand::classify(distance, &self.settings.bands);
                let direction = track.travel_direction();
                let approaching =
                    direction.is_some_and(|c| c.approaching(&track.last_position, &position));
                let served = self
                    .served
                    .get(junction_id)
                    .is_some_and(|s| s.contains(vehicle_id));

                if approaching && !served {
                    if let Some(cardinal) = direction {
                        features.entry(junction_id.clone()).or_default().set(
                            cardinal,
                            EmergencyApproach {
                                distance_m: distance,
                                speed_mps: track.speed,
                            },
                        );
                    }
                }

                match band {
                    DistanceBand::PassThrough => {
                        // Reached the junction, direction no longer matters
                        track.wait_start.remove(junction_id);
                        if !served {
                            self.served
                                .entry(junction_id.clone())
                                .or_default()
                                .insert(vehicle_id.clone());
                            track.served_junctions.insert(junction_id.clone());
                            track.set_state(junction_id, TrackState::Cleared);
                        }
                        if holder.as_deref() == Some(vehicle_id.as_str()) {
                            junction.runtime_mut().release(ControlMode::Density);
                            log_additional!(
                                EVENT_PREEMPT_RELEASE,
                                "priority vehicle passed through",
                                junction = junction_id.as_str(),
                                vehicle = vehicle_id.as_str()
                            );
                        }
                    }
                    DistanceBand::Preempt => {
                        if holder.as_deref() == Some(vehicle_id.as_str()) {
                            holder_in_band = true;
                            track.set_state(junction_id, TrackState::Preempt);
                        } else if approaching && !served {
                            track.set_state(junction_id, TrackState::Preempt);
                            let wait_key =
                                track.wait_start.get(junction_id.as_str()).copied().unwrap_or(tick);
                            candidates.push(Candidate {
                                wait_key,
                                distance_m: distance,
                                vehicle_id: vehicle_id.clone(),
                                // Approaching implies a known direction
                                direction: direction.unwrap_or(Cardinal::East),
                            });
                        }
                    }
                    DistanceBand::RlActivate => {
                        if approaching && !served {
                            track.set_state(junction_id, TrackState::RlActivate);
                        }
                    }
                    DistanceBand::Far => {
                        if track.state_for(junction_id) == TrackState::Unseen {
                            track.set_state(junction_id, TrackState::Far);
                        }
                    }
                }
            }

            self.manage_deadline(tick, junction_id, junction, holder_in_band);
            self.claim_or_queue(tick, junction_id, junction, &holders_at_start, candidates);
        }

        features
    }

    /// Extends an active preemption whose vehicle is still in band at the
    /// deadline, or releases it when the vehicle left without passing
    /// through.
    fn manage_deadline(
        &mut self,
        tick: u64,
        junction_id: &str,
        junction: &mut Junction,
        holder_in_band: bool,
    ) {
        let Some(holder) = junction.runtime().preempt_vehicle.clone() else {
            return;
        };
        let deadline = junction.runtime().preempt_deadline.unwrap_or(tick);
        if tick < deadline {
            return;
        }
        if holder_in_band {
            // Re-issue: a preempt command, so the global cooldown applies
            if self.cooldown_ok(tick) {
                let duration_ticks = self.settings.preempt_duration_s.round().max(1.0) as u64;
                junction.runtime_mut().preempt_deadline = Some(tick + duration_ticks);
                self.last_override_tick = Some(tick);
                log_additional!(
                    EVENT_PREEMPT_EXTEND,
                    "preemption extended",
                    junction = junction_id,
                    vehicle = holder.as_str(),
                    tick = tick
                );
            }
        } else {
            junction.runtime_mut().release(ControlMode::Density);
            log_additional!(
                EVENT_PREEMPT_RELEASE,
                "preemption expired",
                junction = junction_id,
                vehicle = holder.as_str()
            );
        }
    }

    /// Claims the junction for the best candidate when it is free, or
    /// records wait starts for everyone left queued.
    ///
    /// A junction released earlier in this same tick is not reclaimed
    /// before the next tick: claims require the junction to have been free
    /// at tick start, so queued vehicles promote one tick after a release.
    fn claim_or_queue(
        &mut self,
        tick: u64,
        junction_id: &str,
        junction: &mut Junction,
        holders_at_start: &HashMap<JunctionID, Option<VehicleID>>,
        mut candidates: Vec<Candidate>,
    ) {
        if candidates.is_empty() {
            return;
        }
        candidates.sort_by(|a, b| {
            a.wait_key
                .cmp(&b.wait_key)
                .then(a.distance_m.partial_cmp(&b.distance_m).unwrap_or(Ordering::Equal))
                .then(a.vehicle_id.cmp(&b.vehicle_id))
        });

        let free_at_start = holders_at_start
            .get(junction_id)
            .is_none_or(|holder| holder.is_none());
        let free_now = junction.runtime().preempt_vehicle.is_none();

        let mut queue_from = 0;
        if free_at_start && free_now && self.cooldown_ok(tick) {
            let leader = &candidates[0];
            if let Some(phase) = junction.preempt_phase_for(leader.direction) {
                let duration_ticks = self.settings.preempt_duration_s.round().max(1.0) as u64;
                let runtime = junction.runtime_mut();
                runtime.mode = ControlMode::Preempt;
                runtime.preempt_vehicle = Some(leader.vehicle_id.clone());
                runtime.preempt_phase = Some(phase);
                runtime.preempt_deadline = Some(tick + duration_ticks);
                runtime.preempt_duration = self.settings.preempt_duration_s;
                self.last_override_tick = Some(tick);
                self.preempt_events += 1;
                if let Some(track) = self.tracks.get_mut(&leader.vehicle_id) {
                    track.wait_start.remove(junction_id);
                }
                log_additional!(
                    EVENT_PREEMPT_CLAIM,
                    "junction preempted",
                    junction = junction_id,
                    vehicle = leader.vehicle_id.as_str(),
                    phase = phase,
                    distance = leader.distance_m
                );
                queue_from = 1;
            }
        }

        for candidate in &candidates[queue_from..] {
            if let Some(track) = self.tracks.get_mut(&candidate.vehicle_id) {
                if !track.wait_start.contains_key(junction_id) {
                    track.wait_start.insert(junction_id.to_string(), tick);
                    log_detailed!(
                        EVENT_PREEMPT_QUEUE,
                        "emergency queued behind priority vehicle",
                        junction = junction_id,
                        vehicle = candidate.vehicle_id.as_str(),
                        wait_start = tick
                    );
                }
            }
        }
    }

    /// Writes every junction's effective control mode. Preemption always
    /// wins; otherwise the fallback derives from the global run mode.
    fn write_modes(
        &self,
        junctions: &mut IndexMap<JunctionID, Junction>,
        features: &HashMap<JunctionID, ApproachFeatures>,
    ) {
        let any_active_emergency = self.tracks.values().any(|t| t.missing_ticks == 0);
        for (junction_id, junction) in junctions.iter_mut() {
            if junction.is_faulted() {
                continue;
            }
            let mode = if junction.runtime().preempt_vehicle.is_some() {
                ControlMode::Preempt
            } else {
                match self.settings.run_mode {
                    RunMode::Density => ControlMode::Density,
                    RunMode::Rl => ControlMode::Rl,
                    RunMode::Proximity => {
                        let activated = features.get(junction_id).is_some_and(|f| {
                            Cardinal::ALL.iter().any(|c| {
                                f.get(*c).is_some_and(|a| {
                                    a.distance_m <= self.settings.bands.rl_activate_m
                                })
                            })
                        });
                        if activated { ControlMode::Rl } else { ControlMode::Density }
                    }
                    RunMode::Hybrid => {
                        if any_active_emergency {
                            ControlMode::Rl
                        } else {
                            ControlMode::Density
                        }
                    }
                }
            };
            junction.runtime_mut().mode = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{EmergencyMatcher, Vehicle};
    use crate::client::mock::vehicle_snapshot;
    use crate::geom::new_point;
    use crate::signal::Phase;
    use crate::topology::{JunctionSite, Rsu};
    use std::collections::HashMap;

    fn junction(id: &str, x: f64) -> Junction {
        let phases = ["rrGG", "rryy", "GGrr", "yyrr"]
            .iter()
            .map(|p| Phase::parse(p).unwrap())
            .collect();
        Junction::new(id.to_string())
            .with_position(new_point(x, 0.0))
            .with_phases(phases)
            .with_signal_directions(vec![
                Some(Cardinal::North),
                Some(Cardinal::North),
                Some(Cardinal::East),
                Some(Cardinal::East),
            ])
            .build()
            .unwrap()
    }

    fn world(junction_xs: &[(&str, f64)]) -> (IndexMap<JunctionID, Junction>, NetworkTopology) {
        let mut junctions = IndexMap::new();
        let mut sites = Vec::new();
        let mut rsus = Vec::new();
        for (id, x) in junction_xs {
            junctions.insert(id.to_string(), junction(id, *x));
            sites.push(JunctionSite {
                id: id.to_string(),
                position: new_point(*x, 0.0),
                signal_lanes: Vec::new(),
            });
            rsus.push(
                Rsu::new(format!("rsu_{}", id))
                    .with_position(new_point(*x, 0.0))
                    .build(),
            );
        }
        let topology = NetworkTopology::from_parts(sites, rsus, HashMap::new()).unwrap();
        (junctions, topology)
    }

    fn eastbound(id: &str, x: f64) -> Vehicle {
        let matcher = EmergencyMatcher::default();
        Vehicle::from_snapshot(vehicle_snapshot(id, x, 0.0, 12.0, 0.0, "lane_0"), &matcher)
    }

    #[test]
    fn test_single_priority_holder_per_junction() {
        let (mut junctions, topology) = world(&[("J1", 0.0)]);
        let mut coordinator = EmergencyCoordinator::new(CoordinatorSettings::default());
        let vehicles = vec![
            eastbound("ambulance_1", -140.0),
            eastbound("ambulance_2", -60.0),
            eastbound("fire_1", -100.0),
        ];
        coordinator.update(1, &vehicles, &mut junctions, &topology);
        let runtime = junctions["J1"].runtime();
        assert_eq!(runtime.mode, ControlMode::Preempt);
        // Closest same-tick contender claims
        assert_eq!(runtime.preempt_vehicle.as_deref(), Some("ambulance_2"));
        assert_eq!(coordinator.preempt_events(), 1);
        // The others are queued with their wait recorded
        assert_eq!(
            coordinator.track("ambulance_1").unwrap().wait_start.get("J1"),
            Some(&1)
        );
        assert_eq!(
            coordinator.track("fire_1").unwrap().wait_start.get("J1"),
            Some(&1)
        );
    }

    #[test]
    fn test_non_approaching_vehicle_ignored() {
        let (mut junctions, topology) = world(&[("J1", 0.0)]);
        let mut coordinator = EmergencyCoordinator::new(CoordinatorSettings::default());
        // Eastbound but already east of the junction: receding
        let vehicles = vec![eastbound("ambulance_1", 80.0)];
        coordinator.update(1, &vehicles, &mut junctions, &topology);
        assert!(junctions["J1"].runtime().preempt_vehicle.is_none());
        assert_eq!(junctions["J1"].runtime().mode, ControlMode::Density);
    }

    #[test]
    fn test_detection_requires_rsu_coverage() {
        let (mut junctions, _) = world(&[("J1", 0.0)]);
        // Topology without any RSU: nothing is ever detected
        let empty = NetworkTopology::from_parts(vec![], vec![], HashMap::new()).unwrap();
        let mut coordinator = EmergencyCoordinator::new(CoordinatorSettings::default());
        coordinator.update(1, &[eastbound("ambulance_1", -100.0)], &mut junctions, &empty);
        assert_eq!(coordinator.active_tracks(), 0);
        assert!(junctions["J1"].runtime().preempt_vehicle.is_none());
    }

    #[test]
    fn test_preempt_extension_at_deadline() {
        let (mut junctions, topology) = world(&[("J1", 0.0)]);
        let settings = CoordinatorSettings {
            preempt_duration_s: 4.0,
            ..CoordinatorSettings::default()
        };
        let mut coordinator = EmergencyCoordinator::new(settings);
        // Crawling forward, still inside the band at the deadline
        for tick in 1..=5u64 {
            let x = -140.0 + tick as f64;
            coordinator.update(tick, &[eastbound("ambulance_1", x)], &mut junctions, &topology);
        }
        let runtime = junctions["J1"].runtime();
        assert_eq!(runtime.preempt_vehicle.as_deref(), Some("ambulance_1"));
        // Claimed at tick 1 with deadline 5, extended at tick 5 to 9
        assert_eq!(runtime.preempt_deadline, Some(9));
        // Extension re-issues, it does not count as a new activation
        assert_eq!(coordinator.preempt_events(), 1);
    }

    #[test]
    fn test_instances_are_independent() {
        let (mut junctions_a, topology) = world(&[("J1", 0.0)]);
        let (mut junctions_b, _) = world(&[("J1", 0.0)]);
        let mut first = EmergencyCoordinator::new(CoordinatorSettings::default());
        let mut second = EmergencyCoordinator::new(CoordinatorSettings::default());
        first.update(1, &[eastbound("ambulance_1", -100.0)], &mut junctions_a, &topology);
        second.update(1, &[], &mut junctions_b, &topology);
        assert_eq!(first.preempt_events(), 1);
        assert_eq!(second.preempt_events(), 0);
        assert!(second.last_override_tick().is_none());
    }

    #[test]
    fn test_approach_features_keep_nearest() {
        let (mut junctions, topology) = world(&[("J1", 0.0)]);
        let mut coordinator = EmergencyCoordinator::new(CoordinatorSettings::default());
        let vehicles = vec![
            eastbound("ambulance_1", -220.0),
            eastbound("ambulance_2", -180.0),
        ];
        let features = coordinator.update(1, &vehicles, &mut junctions, &topology);
        let east = features["J1"].get(Cardinal::East).unwrap();
        assert!((east.distance_m - 180.0).abs() < 1e-9);
    }
}
