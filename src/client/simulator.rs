use std::fmt;

/// Custom error types for simulator client operations.
#[derive(Debug, Clone)]
pub enum ClientError {
    /// The simulator closed the connection or the session is not running.
    ConnectionClosed,
    /// A blocking call did not complete within the configured per-call timeout.
    Timeout { seconds: f64 },
    /// Malformed or unexpected reply from the simulator.
    Protocol(String),
    /// No traffic light with the given id exists in the loaded network.
    UnknownTrafficLight(String),
    /// No lane with the given id exists in the loaded network.
    UnknownLane(String),
    /// `set_phase` was called with an index outside the program.
    PhaseOutOfRange {
        tl_id: String,
        index: usize,
        phases: usize,
    },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::ConnectionClosed => {
                write!(f, "Simulator connection is closed")
            }
            ClientError::Timeout { seconds } => {
                write!(f, "Simulator call timed out after {}s", seconds)
            }
            ClientError::Protocol(details) => {
                write!(f, "Simulator protocol error: {}", details)
            }
            ClientError::UnknownTrafficLight(tl_id) => {
                write!(f, "Unknown traffic light '{}'", tl_id)
            }
            ClientError::UnknownLane(lane_id) => {
                write!(f, "Unknown lane '{}'", lane_id)
            }
            ClientError::PhaseOutOfRange { tl_id, index, phases } => {
                write!(
                    f,
                    "Phase index {} out of range for traffic light '{}' with {} phases",
                    index, tl_id, phases
                )
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl ClientError {
    /// Whether this error kind must abort the tick loop.
    ///
    /// Protocol-level failures (lost connection, timeout, malformed reply)
    /// are unrecoverable; entity-level failures (unknown id, bad phase
    /// index) are isolated to the entity that caused them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionClosed | ClientError::Timeout { .. } | ClientError::Protocol(_)
        )
    }
}

/// Untyped per-tick vehicle state as the simulator reports it.
///
/// Classification into normal/emergency happens later, in
/// [`Vehicle::from_snapshot`](crate::agents::Vehicle::from_snapshot).
#[derive(Debug, Clone)]
pub struct VehicleSnapshot {
    pub id: String,
    /// Declared vehicle type (e.g. "passenger", "emergency_truck").
    pub vehicle_type: String,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    /// Degrees, 0 = east, counter-clockwise positive.
    pub heading: f64,
    pub lane_id: String,
    pub edge_id: String,
    pub route: Vec<String>,
}

/// Per-tick traffic light state as the simulator reports it.
#[derive(Debug, Clone)]
pub struct TrafficLightSnapshot {
    pub id: String,
    /// The full signal program: one state string per phase.
    pub phases: Vec<String>,
    pub current_phase_index: usize,
    /// Seconds elapsed in the current phase.
    pub time_in_phase: f64,
}

/// Operation contract of the external microscopic traffic simulator.
///
/// All operations are synchronous; failures surface as [`ClientError`].
/// Implementations are not required to be thread-safe - the tick loop is
/// the only caller.
pub trait SimulatorClient {
    /// Configures the per-call timeout the transport enforces on blocking
    /// operations. Implementations without a transport (mocks) ignore it.
    fn set_step_timeout(&mut self, _seconds: f64) -> Result<(), ClientError> {
        Ok(())
    }

    /// Advances the simulator by one step and returns the new tick number.
    fn step(&mut self) -> Result<u64, ClientError>;

    /// Enumerates all currently active vehicles.
    fn vehicles(&mut self) -> Result<Vec<VehicleSnapshot>, ClientError>;

    /// Enumerates all traffic lights with their programs and elapsed phase time.
    fn traffic_lights(&mut self) -> Result<Vec<TrafficLightSnapshot>, ClientError>;

    /// Number of vehicles currently on the given lane.
    fn lane_vehicle_count(&mut self, lane_id: &str) -> Result<u32, ClientError>;

    /// Number of vehicles halting (speed below the simulator's halt
    /// threshold) on the given lane.
    fn lane_halting_count(&mut self, lane_id: &str) -> Result<u32, ClientError>;

    /// Forces the given traffic light to the phase at `index`.
    ///
    /// Re-setting the current index is a no-op in the simulator.
    fn set_phase(&mut self, tl_id: &str, index: usize) -> Result<(), ClientError>;

    /// Sets the remaining duration of the current phase. Advisory; the
    /// controller refreshes it every tick.
    fn set_phase_duration(&mut self, tl_id: &str, seconds: f64) -> Result<(), ClientError>;

    /// Closes the simulator session. Further calls fail with
    /// [`ClientError::ConnectionClosed`].
    fn close(&mut self) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds() {
        assert!(ClientError::ConnectionClosed.is_fatal());
        assert!(ClientError::Timeout { seconds: 30.0 }.is_fatal());
        assert!(ClientError::Protocol("truncated reply".to_string()).is_fatal());
        assert!(!ClientError::UnknownLane("e1_0".to_string()).is_fatal());
        assert!(
            !ClientError::PhaseOutOfRange {
                tl_id: "J1".to_string(),
                index: 9,
                phases: 4
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_display() {
        let err = ClientError::PhaseOutOfRange {
            tl_id: "J1".to_string(),
            index: 9,
            phases: 4,
        };
        assert_eq!(
            err.to_string(),
            "Phase index 9 out of range for traffic light 'J1' with 4 phases"
        );
    }
}
