use vanet_cosim_core::client::MockSimulatorClient;
use vanet_cosim_core::config::SimConfig;
use vanet_cosim_core::geom::new_point;
use vanet_cosim_core::simulation::Session;
use vanet_cosim_core::topology::{Cardinal, JunctionSite, NetworkTopology};
use std::collections::HashMap;

const PROGRAM: [&str; 4] = ["rrGG", "rryy", "GGrr", "yyrr"];

fn cross_topology() -> NetworkTopology {
    let lane_directions = [
        ("n_in_0".to_string(), Cardinal::North),
        ("n_in_1".to_string(), Cardinal::North),
        ("e_in_0".to_string(), Cardinal::East),
        ("e_in_1".to_string(), Cardinal::East),
    ]
    .into_iter()
    .collect();
    NetworkTopology::from_parts(
        vec![JunctionSite {
            id: "J1".to_string(),
            position: new_point(0.0, 0.0),
            signal_lanes: vec![
                "n_in_0".to_string(),
                "n_in_1".to_string(),
                "e_in_0".to_string(),
                "e_in_1".to_string(),
            ],
        }],
        vec![],
        lane_directions,
    )
    .unwrap()
}

fn simulator() -> MockSimulatorClient {
    let mut sim = MockSimulatorClient::new();
    sim.add_traffic_light("J1", PROGRAM.to_vec());
    sim
}

/// Overloaded green holds to the max-green cap, then cycles through the
/// following yellow into the cross phase.
#[test]
fn test_density_holds_overloaded_green_to_cap() {
    let mut sim = simulator();
    // Phase 0 shows green to the east lanes; load them heavily
    sim.set_lane_counts("e_in_0", 12, 0);
    sim.set_lane_counts("e_in_1", 11, 0);
    sim.force_light_state("J1", 0, 10.0);

    let mut session = Session::new(sim, SimConfig::default(), cross_topology()).unwrap();

    // time_in_phase runs 11..=44 across 34 holds, then hits the cap
    for _ in 0..34 {
        session.step().unwrap();
        let junction = session.junction("J1").unwrap();
        assert_eq!(junction.current_phase_index(), 0);
        assert!(junction.time_in_phase() <= 45.0);
    }
    session.step().unwrap();
    assert_eq!(session.junction("J1").unwrap().current_phase_index(), 1);

    // Yellow runs exactly three seconds, then the cross direction gets green
    session.step().unwrap();
    session.step().unwrap();
    assert_eq!(session.junction("J1").unwrap().current_phase_index(), 1);
    session.step().unwrap();
    assert_eq!(session.junction("J1").unwrap().current_phase_index(), 2);
}

/// An empty green ends as soon as min-green is served.
#[test]
fn test_empty_green_advances_at_min_green() {
    let mut sim = simulator();
    sim.force_light_state("J1", 0, 0.0);
    let mut session = Session::new(sim, SimConfig::default(), cross_topology()).unwrap();

    for _ in 0..9 {
        session.step().unwrap();
        assert_eq!(session.junction("J1").unwrap().current_phase_index(), 0);
    }
    session.step().unwrap();
    assert_eq!(session.junction("J1").unwrap().current_phase_index(), 1);
}

/// Every green phase observed over a long run respects the min/max green
/// bounds (one-tick tolerance).
#[test]
fn test_green_hold_bounds_over_run() {
    let mut sim = simulator();
    sim.set_lane_counts("e_in_0", 6, 2);
    sim.set_lane_counts("n_in_0", 4, 1);
    let mut session = Session::new(sim, SimConfig::default(), cross_topology()).unwrap();

    let mut last_phase = 0usize;
    let mut green_hold = 0.0f64;
    for _ in 0..300 {
        let state = session.step().unwrap();
        let junction = &state.junctions[0];
        if junction.phase_index != last_phase {
            let was_green = PROGRAM[last_phase].contains(['G', 'g']);
            if was_green {
                assert!(
                    green_hold >= 10.0 - 1.0 && green_hold <= 45.0 + 1.0,
                    "green phase {} held {}s",
                    last_phase,
                    green_hold
                );
            }
            last_phase = junction.phase_index;
        }
        green_hold = junction.time_in_phase;
    }
}

/// A mismatched phase override faults only its junction; the rest of the
/// junctions run and the summary counts the fault.
#[test]
fn test_phase_override_mismatch_faults_single_junction() {
    let mut sim = MockSimulatorClient::new();
    // J1 declares six signals, J2 four
    sim.add_traffic_light("J1", vec!["GGGrrr", "yyyrrr", "rrrGGG", "rrryyy"]);
    sim.add_traffic_light("J2", PROGRAM.to_vec());

    let mut config = SimConfig {
        max_ticks: 20,
        ..SimConfig::default()
    };
    // Length four against J1's six-signal program
    config
        .phase_overrides
        .insert("J1".to_string(), "GGrr".to_string());

    let topology = NetworkTopology::from_parts(vec![], vec![], HashMap::new()).unwrap();
    let mut session = Session::new(sim, config, topology).unwrap();
    assert!(session.junction("J1").unwrap().is_faulted());
    assert!(!session.junction("J2").unwrap().is_faulted());

    let summary = session.run().unwrap();
    assert_eq!(summary.run.faulted_junctions, 1);
    assert_eq!(summary.run.ticks, 20);
}

/// A matching override is accepted and steers preempt target selection.
#[test]
fn test_phase_override_matching_length_accepted() {
    let sim = simulator();
    let mut config = SimConfig::default();
    config
        .phase_overrides
        .insert("J1".to_string(), "GGrr".to_string());
    let session = Session::new(sim, config, cross_topology()).unwrap();
    let junction = session.junction("J1").unwrap();
    assert!(!junction.is_faulted());
    // "GGrr" is phase 2 of the program; it wins over the direction rule
    assert_eq!(junction.preempt_phase_for(Cardinal::East), Some(2));
}

/// A simulator-side command rejection mid-run faults the junction and the
/// loop keeps going.
#[test]
fn test_command_rejection_is_isolated() {
    let mut sim = simulator();
    sim.force_light_state("J1", 0, 8.0);
    sim.reject_phase_commands("J1");
    let mut session = Session::new(sim, SimConfig::default(), cross_topology()).unwrap();

    // Still under min green: hold, no phase command, no fault
    session.step().unwrap();
    assert!(!session.junction("J1").unwrap().is_faulted());
    session.step().unwrap();
    assert!(session.junction("J1").unwrap().is_faulted());
    // Subsequent ticks keep running without commands
    for _ in 0..5 {
        session.step().unwrap();
    }
    assert_eq!(session.faulted_junctions(), 1);
}
