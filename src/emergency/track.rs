use crate::agents::{Vehicle, VehicleID};
use crate::geom::Point;
use crate::topology::{Cardinal, JunctionID};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Per-(vehicle, junction) preemption state.
///
/// Transitions are driven purely by the current distance band and the
/// approach flag; there is no dwell requirement. `PassThrough` collapses
/// into `Cleared` within the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackState {
    /// Not yet evaluated against this junction.
    #[default]
    Unseen,
    Far,
    RlActivate,
    /// Holding or queued for preemption.
    Preempt,
    PassThrough,
    /// Past the junction; the served set blocks re-triggering.
    Cleared,
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrackState::Unseen => "unseen",
            TrackState::Far => "far",
            TrackState::RlActivate => "rl_activate",
            TrackState::Preempt => "preempt",
            TrackState::PassThrough => "pass_through",
            TrackState::Cleared => "cleared",
        };
        write!(f, "{}", s)
    }
}

/// Coordinator-owned state of one active emergency vehicle.
///
/// Created on first detection inside any RSU's coverage; destroyed after
/// two consecutive ticks without the simulator reporting the vehicle.
#[derive(Debug, Clone)]
pub struct EmergencyTrack {
    pub vehicle_id: VehicleID,
    pub first_seen_tick: u64,
    /// Position from the latest snapshot.
    pub last_position: Point,
    /// Position from the previous snapshot, for movement-derived direction.
    pub prev_position: Option<Point>,
    pub speed: f64,
    pub heading: f64,
    pub lane_id: String,
    pub edge_id: String,
    pub route_edges: Vec<String>,
    /// Consecutive ticks the simulator did not report the vehicle.
    pub missing_ticks: u32,
    /// Junctions this vehicle already cleared during its active track.
    pub served_junctions: HashSet<JunctionID>,
    /// Tick the vehicle started waiting at a junction it is queued for.
    pub wait_start: HashMap<JunctionID, u64>,
    states: HashMap<JunctionID, TrackState>,
}

impl EmergencyTrack {
    /// Creates a track from the first observation of a vehicle.
    pub fn new(vehicle: &Vehicle, tick: u64) -> Self {
        EmergencyTrack {
            vehicle_id: vehicle.id.clone(),
            first_seen_tick: tick,
            last_position: vehicle.position,
            prev_position: None,
            speed: vehicle.speed,
            heading: vehicle.heading,
            lane_id: vehicle.lane_id.clone(),
            edge_id: vehicle.edge_id.clone(),
            route_edges: vehicle.route.clone(),
            missing_ticks: 0,
            served_junctions: HashSet::new(),
            wait_start: HashMap::new(),
            states: HashMap::new(),
        }
    }

    /// Folds a fresh snapshot into the track.
    pub fn observe(&mut self, vehicle: &Vehicle) {
        self.prev_position = Some(self.last_position);
        self.last_position = vehicle.position;
        self.speed = vehicle.speed;
        self.heading = vehicle.heading;
        self.lane_id = vehicle.lane_id.clone();
        self.edge_id = vehicle.edge_id.clone();
        self.route_edges = vehicle.route.clone();
        self.missing_ticks = 0;
    }

    /// Counts one tick without a report.
    pub fn mark_missing(&mut self) {
        self.missing_ticks += 1;
    }

    /// Travel direction, determined in priority order: movement-derived
    /// displacement, lane/edge-id tokens, heading quadrant.
    pub fn travel_direction(&self) -> Option<Cardinal> {
        if let Some(prev) = &self.prev_position {
            let (dx, dy) = self.last_position.delta_from(prev);
            if let Some(cardinal) = Cardinal::from_movement(dx, dy) {
                return Some(cardinal);
            }
        }
        if let Some(cardinal) = Cardinal::from_lane_tokens(&self.lane_id) {
            return Some(cardinal);
        }
        if let Some(cardinal) = Cardinal::from_lane_tokens(&self.edge_id) {
            return Some(cardinal);
        }
        Some(Cardinal::from_heading(self.heading))
    }

    /// State of this vehicle relative to a junction.
    pub fn state_for(&self, junction_id: &str) -> TrackState {
        self.states.get(junction_id).copied().unwrap_or_default()
    }

    pub fn set_state(&mut self, junction_id: &str, state: TrackState) {
        self.states.insert(junction_id.to_string(), state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{EmergencyMatcher, VehicleKind};
    use crate::geom::new_point;

    fn vehicle(id: &str, x: f64, y: f64, heading: f64, lane: &str) -> Vehicle {
        Vehicle {
            id: id.to_string(),
            kind: VehicleKind::Emergency,
            position: new_point(x, y),
            speed: 12.0,
            heading,
            lane_id: lane.to_string(),
            edge_id: lane.split('_').next().unwrap_or(lane).to_string(),
            route: Vec::new(),
        }
    }

    #[test]
    fn test_movement_direction_wins() {
        let mut track = EmergencyTrack::new(&vehicle("amb", 0.0, 0.0, 90.0, "lane_0"), 1);
        // Moved 10 m east; heading says north, movement wins
        track.observe(&vehicle("amb", 10.0, 0.0, 90.0, "lane_0"));
        assert_eq!(track.travel_direction(), Some(Cardinal::East));
    }

    #[test]
    fn test_lane_tokens_beat_heading() {
        // No movement sample yet: lane token decides
        let track = EmergencyTrack::new(&vehicle("amb", 0.0, 0.0, 90.0, "ramp_toW_0"), 1);
        assert_eq!(track.travel_direction(), Some(Cardinal::West));
    }

    #[test]
    fn test_heading_fallback() {
        let track = EmergencyTrack::new(&vehicle("amb", 0.0, 0.0, 270.0, "lane_0"), 1);
        assert_eq!(track.travel_direction(), Some(Cardinal::South));
    }

    #[test]
    fn test_small_displacement_falls_through() {
        let mut track = EmergencyTrack::new(&vehicle("amb", 0.0, 0.0, 0.0, "lane_0"), 1);
        // 2 m displacement is below the movement threshold; heading decides
        track.observe(&vehicle("amb", 0.0, 2.0, 0.0, "lane_0"));
        assert_eq!(track.travel_direction(), Some(Cardinal::East));
    }

    #[test]
    fn test_observe_resets_missing() {
        let raw = vehicle("amb", 0.0, 0.0, 0.0, "lane_0");
        let mut track = EmergencyTrack::new(&raw, 1);
        track.mark_missing();
        track.mark_missing();
        assert_eq!(track.missing_ticks, 2);
        track.observe(&raw);
        assert_eq!(track.missing_ticks, 0);
    }

    #[test]
    fn test_classifier_roundtrip() {
        let matcher = EmergencyMatcher::default();
        assert_eq!(matcher.classify("amb_1", "ambulance"), VehicleKind::Emergency);
    }
}
