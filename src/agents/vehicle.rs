use crate::client::VehicleSnapshot;
use crate::geom::Point;
use lazy_static::lazy_static;
use std::fmt;

pub type VehicleID = String; // Alias for VehicleID

lazy_static! {
    /// Default id/type substrings marking a vehicle as an emergency one.
    /// Matches the naming convention of common SUMO emergency scenarios.
    static ref DEFAULT_EMERGENCY_KEYWORDS: Vec<String> = vec![
        "emergency".to_string(),
        "ambulance".to_string(),
        "fire".to_string(),
        "police".to_string(),
    ];
}

/// Classification of a simulated vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleKind {
    /// Regular traffic.
    Normal,
    /// Priority vehicle eligible for signal preemption and long-range V2I.
    Emergency,
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VehicleKind::Normal => "normal",
            VehicleKind::Emergency => "emergency",
        };
        write!(f, "{}", s)
    }
}

/// Per-tick snapshot of one vehicle as reported by the simulator.
///
/// Rebuilt from scratch every tick; only the `id` is stable across ticks.
#[derive(Debug, Clone)]
pub struct Vehicle {
    /// Stable identifier assigned by the simulator.
    pub id: VehicleID,
    /// Normal or emergency, per [`EmergencyMatcher`].
    pub kind: VehicleKind,
    /// Position in the simulator plane (metres).
    pub position: Point,
    /// Current speed, m/s (non-negative).
    pub speed: f64,
    /// Heading in degrees, 0 = east, counter-clockwise positive
    /// (simulator convention passed through).
    pub heading: f64,
    /// Identifier of the currently occupied lane.
    pub lane_id: String,
    /// Identifier of the currently occupied edge.
    pub edge_id: String,
    /// Remaining route as a list of edge ids.
    pub route: Vec<String>,
}

impl Vehicle {
    /// Builds a classified [`Vehicle`] from a raw simulator snapshot.
    ///
    /// # Arguments
    /// * `raw` - The untyped snapshot pulled from the simulator client.
    /// * `matcher` - The emergency classification predicate.
    pub fn from_snapshot(raw: VehicleSnapshot, matcher: &EmergencyMatcher) -> Self {
        let kind = matcher.classify(&raw.id, &raw.vehicle_type);
        Vehicle {
            id: raw.id,
            kind,
            position: Point::new(raw.x, raw.y),
            speed: raw.speed.max(0.0),
            heading: raw.heading,
            lane_id: raw.lane_id,
            edge_id: raw.edge_id,
            route: raw.route,
        }
    }

    /// Returns true for emergency vehicles.
    pub fn is_emergency(&self) -> bool {
        self.kind == VehicleKind::Emergency
    }
}

/// Pure predicate deciding whether a vehicle is "emergency-like" from its
/// id and declared type.
///
/// The simulator has no first-class emergency flag; scenarios mark priority
/// vehicles through naming (`ambulance_1`, type `emergency_truck`, ...).
/// The substring list is configuration, not hard-coded, so scenarios with
/// other conventions can extend it.
#[derive(Debug, Clone)]
pub struct EmergencyMatcher {
    keywords: Vec<String>,
}

impl EmergencyMatcher {
    /// Creates a matcher from a keyword list. Keywords are matched
    /// case-insensitively against both the vehicle id and its declared type.
    ///
    /// # Arguments
    /// * `keywords` - Substrings marking a vehicle as emergency; an empty
    ///   list classifies every vehicle as [`VehicleKind::Normal`].
    pub fn new(keywords: Vec<String>) -> Self {
        let keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
        EmergencyMatcher { keywords }
    }

    /// Classifies a vehicle by id and declared type.
    ///
    /// # Example
    /// ```
    /// use vanet_cosim_core::agents::{EmergencyMatcher, VehicleKind};
    /// let matcher = EmergencyMatcher::default();
    /// assert_eq!(matcher.classify("veh_9", "FireTruck"), VehicleKind::Emergency);
    /// ```
    pub fn classify(&self, id: &str, vehicle_type: &str) -> VehicleKind {
        let id = id.to_lowercase();
        let vehicle_type = vehicle_type.to_lowercase();
        for keyword in &self.keywords {
            if id.contains(keyword.as_str()) || vehicle_type.contains(keyword.as_str()) {
                return VehicleKind::Emergency;
            }
        }
        VehicleKind::Normal
    }
}

impl Default for EmergencyMatcher {
    /// Matcher with the default keyword set
    /// {"emergency", "ambulance", "fire", "police"}.
    fn default() -> Self {
        EmergencyMatcher {
            keywords: DEFAULT_EMERGENCY_KEYWORDS.clone(),
        }
    }
}
