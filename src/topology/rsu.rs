use crate::geom::{Point, new_point};
use std::fmt;

pub type RsuID = String; // Alias for RsuID

/// Default wireless coverage radius of a roadside unit, metres.
pub const DEFAULT_COVERAGE_RADIUS_M: f64 = 300.0;

/// A roadside unit: a fixed wireless endpoint at or near a junction.
///
/// The tier (1-3) describes the unit's compute class; tier 1 units sit at
/// major junctions, tier 3 are lightweight relays. The core treats the
/// tier as opaque metadata carried into metrics and logs.
#[derive(Debug, Clone)]
pub struct Rsu {
    /// RSU identifier.
    id: RsuID,
    /// Mounting position in the simulator plane.
    position: Point,
    /// Compute tier, 1 through 3.
    tier: u8,
    /// Wireless coverage radius in metres.
    coverage_radius: f64,
}

impl Rsu {
    /// Creates a new `RsuBuilder` for constructing an `Rsu`.
    ///
    /// # Arguments
    /// * `id` - The identifier for the roadside unit.
    pub fn new(id: RsuID) -> RsuBuilder {
        RsuBuilder {
            rsu: Rsu {
                id,
                position: new_point(0.0, 0.0),
                tier: 1,
                coverage_radius: DEFAULT_COVERAGE_RADIUS_M,
            },
        }
    }

    /// Returns the unique identifier (ID) of the roadside unit
    pub fn get_id(&self) -> &RsuID {
        &self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn tier(&self) -> u8 {
        self.tier
    }

    pub fn coverage_radius(&self) -> f64 {
        self.coverage_radius
    }

    /// Whether the given point lies inside this unit's coverage disc.
    pub fn covers(&self, point: &Point) -> bool {
        self.position.distance_to(point) <= self.coverage_radius
    }
}

impl fmt::Display for Rsu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RSU '{}' at {} [tier: {}, coverage: {:.0}m]",
            self.id, self.position, self.tier, self.coverage_radius
        )
    }
}

/// A builder for constructing `Rsu` instances.
pub struct RsuBuilder {
    rsu: Rsu,
}

impl RsuBuilder {
    /// Sets the mounting position for the unit.
    pub fn with_position(mut self, position: Point) -> Self {
        self.rsu.position = position;
        self
    }

    /// Sets the compute tier (1 through 3).
    pub fn with_tier(mut self, tier: u8) -> Self {
        self.rsu.tier = tier;
        self
    }

    /// Sets the coverage radius in metres.
    pub fn with_coverage_radius(mut self, radius: f64) -> Self {
        self.rsu.coverage_radius = radius;
        self
    }

    /// Builds the final `Rsu` object.
    pub fn build(self) -> Rsu {
        self.rsu
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage() {
        let rsu = Rsu::new("rsu_J1".to_string())
            .with_position(new_point(0.0, 0.0))
            .with_tier(2)
            .build();
        assert!(rsu.covers(&new_point(299.0, 0.0)));
        // The boundary is inclusive
        assert!(rsu.covers(&new_point(300.0, 0.0)));
        assert!(!rsu.covers(&new_point(300.1, 0.0)));
    }
}
