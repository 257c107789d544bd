use crate::geom::Point;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Displacement below which movement-derived direction is inconclusive.
pub const MIN_MOVEMENT_M: f64 = 5.0;

lazy_static! {
    /// Lane/edge id substrings hinting the travel direction. Short tokens
    /// are matched case-sensitively ("_E" must not match "_e" lanes named
    /// after edges like "left_e"), word tokens case-insensitively.
    static ref LANE_TOKENS: Vec<(Cardinal, Vec<&'static str>)> = vec![
        (Cardinal::East, vec!["_E", "toE", "east"]),
        (Cardinal::West, vec!["_W", "toW", "west"]),
        (Cardinal::North, vec!["_N", "toN", "north"]),
        (Cardinal::South, vec!["_S", "toS", "south"]),
    ];
}

/// An approach direction: the cardinal a vehicle travels towards.
///
/// The simulator's angle convention is 0° = east, counter-clockwise
/// positive; quadrants are centred on the cardinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinal {
    North,
    South,
    East,
    West,
}

impl Cardinal {
    /// All cardinals in the fixed observation order (N, S, E, W).
    pub const ALL: [Cardinal; 4] = [
        Cardinal::North,
        Cardinal::South,
        Cardinal::East,
        Cardinal::West,
    ];

    /// Position of this cardinal in [`Cardinal::ALL`].
    pub fn index(self) -> usize {
        match self {
            Cardinal::North => 0,
            Cardinal::South => 1,
            Cardinal::East => 2,
            Cardinal::West => 3,
        }
    }

    /// Movement-derived direction from a per-tick displacement.
    ///
    /// Returns `None` when the dominant axis moved less than
    /// [`MIN_MOVEMENT_M`]; ties go to the x axis.
    pub fn from_movement(dx: f64, dy: f64) -> Option<Cardinal> {
        if dx.abs().max(dy.abs()) < MIN_MOVEMENT_M {
            return None;
        }
        if dx.abs() >= dy.abs() {
            if dx > 0.0 { Some(Cardinal::East) } else { Some(Cardinal::West) }
        } else if dy > 0.0 {
            Some(Cardinal::North)
        } else {
            Some(Cardinal::South)
        }
    }

    /// Lane-id heuristic: scans for direction tokens in a lane or edge id.
    ///
    /// # Example
    /// ```
    /// use vanet_cosim_core::topology::Cardinal;
    /// assert_eq!(Cardinal::from_lane_tokens("approach_E_0"), Some(Cardinal::East));
    /// assert_eq!(Cardinal::from_lane_tokens("NorthAve_in_1"), Some(Cardinal::North));
    /// assert_eq!(Cardinal::from_lane_tokens("ring_0"), None);
    /// ```
    pub fn from_lane_tokens(lane_id: &str) -> Option<Cardinal> {
        let lowered = lane_id.to_lowercase();
        for (cardinal, tokens) in LANE_TOKENS.iter() {
            for token in tokens {
                // Tokens carrying an uppercase marker are matched verbatim
                let hit = if token.chars().any(|c| c.is_ascii_uppercase()) {
                    lane_id.contains(token)
                } else {
                    lowered.contains(token)
                };
                if hit {
                    return Some(*cardinal);
                }
            }
        }
        None
    }

    /// Heading-angle fallback: buckets the angle into 90° quadrants
    /// centred on the cardinals (0° east, 90° north, 180° west, 270° south).
    pub fn from_heading(heading_deg: f64) -> Cardinal {
        let normalized = heading_deg.rem_euclid(360.0);
        if normalized < 45.0 || normalized >= 315.0 {
            Cardinal::East
        } else if normalized < 135.0 {
            Cardinal::North
        } else if normalized < 225.0 {
            Cardinal::West
        } else {
            Cardinal::South
        }
    }

    /// Whether a vehicle travelling in this direction is approaching the
    /// junction: travelling east approaches only while still west of it,
    /// and symmetrically for the other cardinals.
    pub fn approaching(self, vehicle: &Point, junction: &Point) -> bool {
        match self {
            Cardinal::East => vehicle.x < junction.x,
            Cardinal::West => vehicle.x > junction.x,
            Cardinal::North => vehicle.y < junction.y,
            Cardinal::South => vehicle.y > junction.y,
        }
    }
}

impl fmt::Display for Cardinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cardinal::North => "north",
            Cardinal::South => "south",
            Cardinal::East => "east",
            Cardinal::West => "west",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::new_point;

    #[test]
    fn test_from_movement_dominant_axis() {
        assert_eq!(Cardinal::from_movement(8.0, 1.0), Some(Cardinal::East));
        assert_eq!(Cardinal::from_movement(-6.0, 2.0), Some(Cardinal::West));
        assert_eq!(Cardinal::from_movement(1.0, 9.0), Some(Cardinal::North));
        assert_eq!(Cardinal::from_movement(-2.0, -7.0), Some(Cardinal::South));
    }

    #[test]
    fn test_from_movement_below_threshold() {
        assert_eq!(Cardinal::from_movement(4.9, 3.0), None);
        assert_eq!(Cardinal::from_movement(0.0, 0.0), None);
        // Exactly at the threshold counts
        assert_eq!(Cardinal::from_movement(5.0, 0.0), Some(Cardinal::East));
    }

    #[test]
    fn test_from_heading_quadrants() {
        assert_eq!(Cardinal::from_heading(0.0), Cardinal::East);
        assert_eq!(Cardinal::from_heading(44.9), Cardinal::East);
        assert_eq!(Cardinal::from_heading(45.0), Cardinal::North);
        assert_eq!(Cardinal::from_heading(90.0), Cardinal::North);
        assert_eq!(Cardinal::from_heading(180.0), Cardinal::West);
        assert_eq!(Cardinal::from_heading(270.0), Cardinal::South);
        assert_eq!(Cardinal::from_heading(315.0), Cardinal::East);
        assert_eq!(Cardinal::from_heading(-45.0), Cardinal::East);
        assert_eq!(Cardinal::from_heading(450.0), Cardinal::North);
    }

    #[test]
    fn test_lane_tokens() {
        assert_eq!(Cardinal::from_lane_tokens("edge_E_0"), Some(Cardinal::East));
        assert_eq!(Cardinal::from_lane_tokens("toW_ramp_1"), Some(Cardinal::West));
        assert_eq!(Cardinal::from_lane_tokens("SouthBridge_2"), Some(Cardinal::South));
        assert_eq!(Cardinal::from_lane_tokens("center_loop_0"), None);
    }

    #[test]
    fn test_approaching() {
        let junction = new_point(100.0, 100.0);
        // Eastbound vehicle west of the junction approaches it
        assert!(Cardinal::East.approaching(&new_point(40.0, 100.0), &junction));
        assert!(!Cardinal::East.approaching(&new_point(160.0, 100.0), &junction));
        assert!(Cardinal::North.approaching(&new_point(100.0, 20.0), &junction));
        assert!(Cardinal::South.approaching(&new_point(100.0, 180.0), &junction));
        assert!(Cardinal::West.approaching(&new_point(130.0, 100.0), &junction));
    }
}
