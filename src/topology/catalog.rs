use crate::geom::{Point, new_point};
use crate::topology::direction::Cardinal;
use crate::topology::junction::{JunctionID, LaneID};
use crate::topology::rsu::{DEFAULT_COVERAGE_RADIUS_M, Rsu, RsuID};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Error types for catalog loading and validation. All of them are fatal
/// at startup - a run never starts on a malformed catalog.
#[derive(Debug)]
pub enum TopologyError {
    /// The catalog file could not be read.
    Io { path: String, details: String },
    /// The catalog file is not valid JSON or misses required fields.
    Parse { path: String, details: String },
    /// Two junction entries share an id.
    DuplicateJunction(JunctionID),
    /// Two RSU entries share an id.
    DuplicateRsu(RsuID),
    /// An RSU declares a tier outside 1..=3.
    BadRsuTier { id: RsuID, tier: u8 },
    /// An RSU declares a non-positive coverage radius.
    BadCoverageRadius { id: RsuID, radius: f64 },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::Io { path, details } => {
                write!(f, "Can't read catalog '{}': {}", path, details)
            }
            TopologyError::Parse { path, details } => {
                write!(f, "Can't parse catalog '{}': {}", path, details)
            }
            TopologyError::DuplicateJunction(id) => {
                write!(f, "Duplicate junction id '{}' in catalog", id)
            }
            TopologyError::DuplicateRsu(id) => {
                write!(f, "Duplicate RSU id '{}' in catalog", id)
            }
            TopologyError::BadRsuTier { id, tier } => {
                write!(f, "RSU '{}' declares tier {} outside 1..=3", id, tier)
            }
            TopologyError::BadCoverageRadius { id, radius } => {
                write!(f, "RSU '{}' declares non-positive coverage radius {}", id, radius)
            }
        }
    }
}

impl std::error::Error for TopologyError {}

/// Static site information of one junction: position and the lane feeding
/// each signal position, in program order.
#[derive(Debug, Clone)]
pub struct JunctionSite {
    pub id: JunctionID,
    pub position: Point,
    pub signal_lanes: Vec<LaneID>,
}

#[derive(Debug, Deserialize)]
struct JunctionFile {
    junctions: Vec<JunctionEntry>,
    #[serde(default)]
    lane_directions: HashMap<String, Cardinal>,
}

#[derive(Debug, Deserialize)]
struct JunctionEntry {
    id: String,
    x: f64,
    y: f64,
    #[serde(default)]
    signal_lanes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RsuFile {
    rsus: Vec<RsuEntry>,
}

#[derive(Debug, Deserialize)]
struct RsuEntry {
    id: String,
    x: f64,
    y: f64,
    tier: u8,
    #[serde(default = "default_coverage_radius")]
    coverage_radius: f64,
}

fn default_coverage_radius() -> f64 {
    DEFAULT_COVERAGE_RADIUS_M
}

/// Immutable catalog of junction sites, RSU placements and the
/// lane → approach-direction mapping. Loaded once at startup; every other
/// component receives read-only views.
///
/// # Example
/// ```
/// use vanet_cosim_core::topology::{NetworkTopology, JunctionSite, Cardinal};
/// use vanet_cosim_core::geom::new_point;
///
/// let topology = NetworkTopology::from_parts(
///     vec![JunctionSite {
///         id: "J1".to_string(),
///         position: new_point(0.0, 0.0),
///         signal_lanes: vec!["e_in_0".to_string()],
///     }],
///     vec![],
///     [("e_in_0".to_string(), Cardinal::East)].into_iter().collect(),
/// ).unwrap();
/// assert_eq!(topology.direction_for_lane("e_in_0"), Some(Cardinal::East));
/// ```
#[derive(Debug)]
pub struct NetworkTopology {
    junctions: IndexMap<JunctionID, JunctionSite>,
    rsus: IndexMap<RsuID, Rsu>,
    lane_directions: HashMap<LaneID, Cardinal>,
}

impl NetworkTopology {
    /// Loads and validates both catalog files.
    ///
    /// # Arguments
    /// * `junction_path` - JSON with `junctions` and `lane_directions`.
    /// * `rsu_path` - JSON with `rsus`.
    pub fn from_files<P: AsRef<Path>>(junction_path: P, rsu_path: P) -> Result<Self, TopologyError> {
        let junction_file: JunctionFile = read_json(junction_path.as_ref())?;
        let rsu_file: RsuFile = read_json(rsu_path.as_ref())?;

        let sites = junction_file
            .junctions
            .into_iter()
            .map(|entry| JunctionSite {
                id: entry.id,
                position: new_point(entry.x, entry.y),
                signal_lanes: entry.signal_lanes,
            })
            .collect();
        let mut rsus = Vec::with_capacity(rsu_file.rsus.len());
        for entry in rsu_file.rsus {
            if !(1..=3).contains(&entry.tier) {
                return Err(TopologyError::BadRsuTier {
                    id: entry.id,
                    tier: entry.tier,
                });
            }
            if entry.coverage_radius <= 0.0 {
                return Err(TopologyError::BadCoverageRadius {
                    id: entry.id,
                    radius: entry.coverage_radius,
                });
            }
            rsus.push(
                Rsu::new(entry.id)
                    .with_position(new_point(entry.x, entry.y))
                    .with_tier(entry.tier)
                    .with_coverage_radius(entry.coverage_radius)
                    .build(),
            );
        }
        Self::from_parts(sites, rsus, junction_file.lane_directions)
    }

    /// Builds a catalog from already-constructed parts. Used by tests and
    /// embedders that assemble topology programmatically.
    pub fn from_parts(
        sites: Vec<JunctionSite>,
        rsus: Vec<Rsu>,
        lane_directions: HashMap<LaneID, Cardinal>,
    ) -> Result<Self, TopologyError> {
        let mut junction_map = IndexMap::with_capacity(sites.len());
        for site in sites {
            if junction_map.contains_key(&site.id) {
                return Err(TopologyError::DuplicateJunction(site.id));
            }
            junction_map.insert(site.id.clone(), site);
        }
        let mut rsu_map = IndexMap::with_capacity(rsus.len());
        for rsu in rsus {
            let id = rsu.get_id().clone();
            if rsu_map.contains_key(&id) {
                return Err(TopologyError::DuplicateRsu(id));
            }
            rsu_map.insert(id, rsu);
        }
        Ok(NetworkTopology {
            junctions: junction_map,
            rsus: rsu_map,
            lane_directions,
        })
    }

    /// Site information for a junction, if the catalog knows it.
    pub fn site(&self, id: &str) -> Option<&JunctionSite> {
        self.junctions.get(id)
    }

    /// All junction sites in catalog order.
    pub fn sites(&self) -> impl Iterator<Item = &JunctionSite> {
        self.junctions.values()
    }

    /// All roadside units in catalog order.
    pub fn rsus(&self) -> impl Iterator<Item = &Rsu> {
        self.rsus.values()
    }

    pub fn rsu_count(&self) -> usize {
        self.rsus.len()
    }

    /// Approach direction of a lane: the explicit mapping first, the
    /// lane-token heuristic as fallback.
    pub fn direction_for_lane(&self, lane_id: &str) -> Option<Cardinal> {
        self.lane_directions
            .get(lane_id)
            .copied()
            .or_else(|| Cardinal::from_lane_tokens(lane_id))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, TopologyError> {
    let contents = std::fs::read_to_string(path).map_err(|e| TopologyError::Io {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| TopologyError::Parse {
        path: path.display().to_string(),
        details: e.to_string(),
    })
}
