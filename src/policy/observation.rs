//! Observation vector schema for RL-controlled junctions.
//!
//! The vector layout is fixed and position-stable:
//!
//! 1. For each cardinal (N, S, E, W): `[queue_norm, halting, density]`
//! 2. One-hot of the current phase index over the phase count
//! 3. `time_in_phase / max_green`, clipped to [0, 1]
//! 4. For each cardinal (N, S, E, W):
//!    `[approaching_flag, distance/proximity_threshold, eta/max_green]`,
//!    both ratios clipped to [0, 1]; saturated (1.0) when no emergency
//!    approaches from that cardinal
//!
//! The total length is `25 + phase_count` and is published at startup;
//! a loaded policy must accept it for every controlled junction.

use crate::emergency::ApproachFeatures;
use crate::signal::LaneOccupancy;
use crate::topology::{Cardinal, Junction};

/// Saturation flow used to normalise queue lengths: vehicles one lane can
/// discharge per second of green.
pub const LANE_SERVICE_RATE_VPS: f64 = 0.5;

/// Observation length for a junction with `phase_count` phases.
///
/// # Example
/// ```
/// use vanet_cosim_core::policy::observation_len;
/// assert_eq!(observation_len(4), 29);
/// ```
pub fn observation_len(phase_count: usize) -> usize {
    // 4 cardinals x 3 traffic features + one-hot + elapsed + 4 x 3 emergency features
    12 + phase_count + 1 + 12
}

/// Builds the observation vector for one junction.
///
/// # Arguments
/// * `junction` - The junction under RL control.
/// * `occupancy` - Per-lane counts sampled this tick.
/// * `features` - Nearest approaching emergency per cardinal (coordinator
///   output for this junction; empty when none).
/// * `max_green_s` - Timing bound used for normalisation.
/// * `proximity_threshold_m` - RL-Activate band outer radius, the distance
///   normaliser.
pub fn build_observation(
    junction: &Junction,
    occupancy: &LaneOccupancy,
    features: &ApproachFeatures,
    max_green_s: f64,
    proximity_threshold_m: f64,
) -> Vec<f64> {
    let phase_count = junction.phases().len();
    let mut observation = Vec::with_capacity(observation_len(phase_count));

    // Traffic state per cardinal, aggregated over the lanes serving it
    for cardinal in Cardinal::ALL {
        let mut queue = 0u32;
        let mut halting = 0u32;
        let mut lanes = 0u32;
        for (signal_index, lane_id) in junction.signal_lanes().iter().enumerate() {
            if junction.direction_at(signal_index) == Some(cardinal) {
                queue += occupancy.vehicles(lane_id);
                halting += occupancy.halting(lane_id);
                lanes += 1;
            }
        }
        let queue_norm = if max_green_s > 0.0 {
            (queue as f64 / (max_green_s * LANE_SERVICE_RATE_VPS)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let density = if lanes > 0 {
            (queue as f64 + 0.5 * halting as f64) / lanes as f64
        } else {
            0.0
        };
        observation.push(queue_norm);
        observation.push(halting as f64);
        observation.push(density);
    }

    // Current phase one-hot
    for index in 0..phase_count {
        observation.push(if index == junction.current_phase_index() { 1.0 } else { 0.0 });
    }

    // Elapsed phase time
    observation.push((junction.time_in_phase() / max_green_s).clamp(0.0, 1.0));

    // Emergency presence per cardinal; absent approaches saturate at 1.0
    for cardinal in Cardinal::ALL {
        match features.get(cardinal) {
            Some(approach) => {
                let distance_ratio = (approach.distance_m / proximity_threshold_m).clamp(0.0, 1.0);
                let eta_s = if approach.speed_mps > 0.1 {
                    approach.distance_m / approach.speed_mps
                } else {
                    f64::INFINITY
                };
                let eta_ratio = (eta_s / max_green_s).clamp(0.0, 1.0);
                observation.push(1.0);
                observation.push(distance_ratio);
                observation.push(eta_ratio);
            }
            None => {
                observation.push(0.0);
                observation.push(1.0);
                observation.push(1.0);
            }
        }
    }

    observation
}
