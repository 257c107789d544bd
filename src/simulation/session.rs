use crate::agents::{EmergencyMatcher, Vehicle};
use crate::client::{ClientError, SimulatorClient};
use crate::config::{ConfigError, SimConfig};
use crate::emergency::{ApproachFeatures, EmergencyCoordinator};
use crate::bridge::NetworkBridge;
use crate::metrics::{MetricsCsvWriter, RunSummary, write_summary};
use crate::policy::{LinearPolicy, Policy, PolicyError, observation_len};
use crate::signal::controller::{AdaptiveSignalController, ControllerError, LaneOccupancy};
use crate::signal::{Phase, PhaseError};
use crate::simulation::states::{JunctionTickState, TickState};
use crate::topology::{Junction, JunctionError, JunctionID, NetworkTopology, TopologyError};
use crate::verbose::{
    EVENT_EPOCH_FLUSH, EVENT_JUNCTION_FAULT, EVENT_METRICS_IO, EVENT_POLICY_LOAD,
    EVENT_SESSION_CLOSE, EVENT_SESSION_CREATE, EVENT_TICK,
};
use crate::{log_detailed, log_main};
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Custom error types for `Session`. The fatal kinds of the error design:
/// configuration and catalog problems abort startup, simulator protocol
/// problems abort the loop, policy problems abort whichever phase hit them.
#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    Topology(TopologyError),
    /// A junction program from the simulator or catalog failed validation.
    Junction(JunctionError),
    /// Protocol-level simulator failure; the loop aborts after a
    /// best-effort close.
    Simulator(ClientError),
    Policy(PolicyError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(err) => write!(f, "Configuration error: {}", err),
            SessionError::Topology(err) => write!(f, "Topology error: {}", err),
            SessionError::Junction(err) => write!(f, "Junction error: {}", err),
            SessionError::Simulator(err) => write!(f, "Simulator error: {}", err),
            SessionError::Policy(err) => write!(f, "Policy error: {}", err),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        SessionError::Config(err)
    }
}

impl From<TopologyError> for SessionError {
    fn from(err: TopologyError) -> Self {
        SessionError::Topology(err)
    }
}

impl From<ClientError> for SessionError {
    fn from(err: ClientError) -> Self {
        SessionError::Simulator(err)
    }
}

impl From<PolicyError> for SessionError {
    fn from(err: PolicyError) -> Self {
        SessionError::Policy(err)
    }
}

/// Output sinks of a session. All optional: a sink left `None` simply
/// skips that output, which tests use to run fully in memory.
#[derive(Default)]
pub struct SessionSinks {
    pub packets: Option<Box<dyn Write>>,
    pub metrics: Option<Box<dyn Write>>,
    pub summary: Option<Box<dyn Write>>,
}

impl SessionSinks {
    /// No outputs; everything stays in memory.
    pub fn none() -> Self {
        SessionSinks::default()
    }

    /// File sinks at the paths named by the configuration.
    pub fn from_config(config: &SimConfig) -> Result<Self, SessionError> {
        let open = |path: &str| -> Result<Box<dyn Write>, SessionError> {
            let file = File::create(path).map_err(|e| {
                SessionError::Config(ConfigError::Io {
                    path: path.to_string(),
                    details: e.to_string(),
                })
            })?;
            Ok(Box::new(file))
        };
        Ok(SessionSinks {
            packets: Some(open(&config.packets_path)?),
            metrics: Some(open(&config.metrics_path)?),
            summary: Some(open(&config.summary_path)?),
        })
    }
}

/// Session - representation of one co-simulation run wiring the simulator
/// client to the control plane and the network model.
pub struct Session<C: SimulatorClient> {
    /// Unique session identifier
    id: Uuid,
    client: C,
    config: SimConfig,
    topology: NetworkTopology,
    junctions: IndexMap<JunctionID, Junction>,
    controller: AdaptiveSignalController,
    coordinator: EmergencyCoordinator,
    bridge: NetworkBridge,
    matcher: EmergencyMatcher,
    metrics_writer: Option<MetricsCsvWriter<Box<dyn Write>>>,
    summary_sink: Option<Box<dyn Write>>,
    /// Simulation info - number of ticks executed
    tick: u64,
    /// External stop flag, set by the embedding driver's signal handler
    stop: Arc<AtomicBool>,
}

impl<C: SimulatorClient> Session<C> {
    /// Creates a session without output sinks (in-memory run).
    pub fn new(client: C, config: SimConfig, topology: NetworkTopology) -> Result<Self, SessionError> {
        Self::with_sinks(client, config, topology, SessionSinks::none())
    }

    /// Creates a session with the given output sinks.
    ///
    /// Startup order: validate configuration, load the policy snapshot if
    /// the mode needs one, pull the signal programs from the simulator,
    /// join them with the catalog, apply phase overrides (the phase-size
    /// guard), and publish the observation length to the policy.
    pub fn with_sinks(
        mut client: C,
        config: SimConfig,
        topology: NetworkTopology,
        sinks: SessionSinks,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        client.set_step_timeout(config.step_timeout_s)?;

        let matcher = EmergencyMatcher::new(config.emergency_keywords.clone());
        let policy = Self::load_policy(&config)?;
        let mut junctions = Self::build_junctions(&mut client, &topology)?;
        Self::apply_phase_overrides(&config, &mut junctions);
        Self::check_policy_dimensions(policy.as_deref(), &junctions)?;

        let controller = AdaptiveSignalController::new(
            config.signal_timing(),
            policy,
            config.proximity_threshold_m,
        );
        let coordinator = EmergencyCoordinator::new(config.coordinator_settings());
        let bridge = Self::build_bridge(&config, sinks.packets);
        let metrics_writer = sinks.metrics.and_then(|sink| match MetricsCsvWriter::new(sink) {
            Ok(writer) => Some(writer),
            Err(err) => {
                tracing::warn!(event = EVENT_METRICS_IO, error = %err, "metrics sink disabled");
                None
            }
        });

        let session = Session {
            id: Uuid::new_v4(),
            client,
            config,
            topology,
            junctions,
            controller,
            coordinator,
            bridge,
            matcher,
            metrics_writer,
            summary_sink: sinks.summary,
            tick: 0,
            stop: Arc::new(AtomicBool::new(false)),
        };
        log_main!(
            EVENT_SESSION_CREATE,
            "session created",
            session = session.id.to_string().as_str(),
            junctions = session.junctions.len(),
            rsus = session.topology.rsu_count(),
            mode = session.config.mode.to_string().as_str()
        );
        Ok(session)
    }

    fn load_policy(config: &SimConfig) -> Result<Option<Box<dyn Policy>>, SessionError> {
        if !config.mode.requires_policy() {
            return Ok(None);
        }
        // validate() guarantees the path is present in RL modes
        let Some(path) = &config.policy_snapshot_path else {
            return Err(SessionError::Config(ConfigError::MissingPolicy {
                mode: config.mode,
            }));
        };
        let policy = LinearPolicy::from_snapshot(path)?;
        log_main!(
            EVENT_POLICY_LOAD,
            "policy snapshot loaded",
            path = path.as_str(),
            obs_dim = policy.observation_dim(),
            actions = policy.action_count()
        );
        Ok(Some(Box::new(policy)))
    }

    /// Joins the simulator's signal programs with the catalog sites into
    /// live junctions.
    fn build_junctions(
        client: &mut C,
        topology: &NetworkTopology,
    ) -> Result<IndexMap<JunctionID, Junction>, SessionError> {
        let mut junctions = IndexMap::new();
        for snapshot in client.traffic_lights()? {
            let phases = snapshot
                .phases
                .iter()
                .map(|p| Phase::parse(p))
                .collect::<Result<Vec<_>, PhaseError>>()
                .map_err(|e| {
                    SessionError::Simulator(ClientError::Protocol(format!(
                        "traffic light '{}' reports a malformed phase: {}",
                        snapshot.id, e
                    )))
                })?;
            let mut builder = Junction::new(snapshot.id.clone()).with_phases(phases);
            if let Some(site) = topology.site(&snapshot.id) {
                let directions = site
                    .signal_lanes
                    .iter()
                    .map(|lane| topology.direction_for_lane(lane))
                    .collect();
                builder = builder
                    .with_position(site.position)
                    .with_signal_lanes(site.signal_lanes.clone())
                    .with_signal_directions(directions);
            } else {
                log_detailed!(
                    EVENT_SESSION_CREATE,
                    "traffic light missing from the junction catalog",
                    junction = snapshot.id.as_str()
                );
            }
            let mut junction = builder.build().map_err(SessionError::Junction)?;
            junction.sync_phase(snapshot.current_phase_index, snapshot.time_in_phase, 0.0);
            junctions.insert(snapshot.id, junction);
        }
        Ok(junctions)
    }

    /// The startup phase-size guard: an override whose length deviates
    /// from the junction's program marks that junction Faulted with one
    /// warning; the other junctions run normally.
    fn apply_phase_overrides(config: &SimConfig, junctions: &mut IndexMap<JunctionID, Junction>) {
        for (junction_id, override_str) in &config.phase_overrides {
            let Some(junction) = junctions.get_mut(junction_id) else {
                tracing::warn!(
                    event = EVENT_JUNCTION_FAULT,
                    junction = junction_id.as_str(),
                    "phase override names an unknown junction"
                );
                continue;
            };
            if override_str.len() != junction.signal_count() {
                tracing::warn!(
                    event = EVENT_JUNCTION_FAULT,
                    junction = junction_id.as_str(),
                    override_len = override_str.len(),
                    program_len = junction.signal_count(),
                    "phase override length mismatch, junction runs the simulator program"
                );
                junction.set_faulted();
                continue;
            }
            // Characters were validated with the configuration
            if let Ok(phase) = Phase::parse(override_str) {
                junction.set_preempt_override(phase);
            }
        }
    }

    /// Publishes the observation length and refuses to start when the
    /// loaded policy does not accept it for every controlled junction.
    fn check_policy_dimensions(
        policy: Option<&dyn Policy>,
        junctions: &IndexMap<JunctionID, Junction>,
    ) -> Result<(), SessionError> {
        let Some(policy) = policy else {
            return Ok(());
        };
        for (junction_id, junction) in junctions {
            if junction.is_faulted() {
                continue;
            }
            let expected = observation_len(junction.phases().len());
            if policy.observation_dim() != expected {
                tracing::error!(
                    event = EVENT_POLICY_LOAD,
                    junction = junction_id.as_str(),
                    published = expected,
                    policy = policy.observation_dim(),
                    "policy rejects the published observation length"
                );
                return Err(SessionError::Policy(PolicyError::DimensionMismatch {
                    expected,
                    actual: policy.observation_dim(),
                }));
            }
        }
        Ok(())
    }

    fn build_bridge(config: &SimConfig, packet_sink: Option<Box<dyn Write>>) -> NetworkBridge {
        NetworkBridge::new(
            config.link_model(),
            config.seed,
            config.metrics_epoch_ticks,
            packet_sink,
        )
    }

    /// Gets the unique session identifier
    pub fn get_id(&self) -> Uuid {
        self.id
    }

    /// Gets the current tick count
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Shared stop flag; setting it ends the loop after the current tick.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Read access to a junction's bookkeeping.
    pub fn junction(&self, junction_id: &str) -> Option<&Junction> {
        self.junctions.get(junction_id)
    }

    /// Read access to the coordinator (tracks, served sets, event counts).
    pub fn coordinator(&self) -> &EmergencyCoordinator {
        &self.coordinator
    }

    /// Read access to the bridge (last packets, population counts).
    pub fn bridge(&self) -> &NetworkBridge {
        &self.bridge
    }

    /// Mutable access to the simulator client, used by scenario drivers
    /// to script the mock between ticks.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn faulted_junctions(&self) -> usize {
        self.junctions.values().filter(|j| j.is_faulted()).count()
    }

    /// Executes one tick in the strict component sequence.
    pub fn step(&mut self) -> Result<TickState, SessionError> {
        let tick = self.client.step()?;
        self.tick = tick;

        // Snapshot pull
        let vehicles: Vec<Vehicle> = self
            .client
            .vehicles()?
            .into_iter()
            .map(|raw| Vehicle::from_snapshot(raw, &self.matcher))
            .collect();
        for light in self.client.traffic_lights()? {
            if let Some(junction) = self.junctions.get_mut(&light.id) {
                junction.sync_phase(light.current_phase_index, light.time_in_phase, 1.0);
            }
        }
        let occupancy = self.sample_lanes()?;

        log_detailed!(
            EVENT_TICK,
            "tick snapshot",
            tick = tick,
            vehicles = vehicles.len()
        );

        // Coordinator writes runtime modes; controller reads them
        let features = self
            .coordinator
            .update(tick, &vehicles, &mut self.junctions, &self.topology);

        let empty_features = ApproachFeatures::default();
        let mut decisions = Vec::new();
        for (junction_id, junction) in self.junctions.iter_mut() {
            let junction_features = features.get(junction_id).unwrap_or(&empty_features);
            match self.controller.control_junction(
                junction,
                &occupancy,
                junction_features,
                &mut self.client,
            ) {
                Ok(Some(decision)) => decisions.push((junction_id.clone(), decision)),
                Ok(None) => {}
                Err(ControllerError::Client(err)) => return Err(SessionError::Simulator(err)),
                Err(ControllerError::Policy(err)) => return Err(SessionError::Policy(err)),
            }
        }

        // Network sweep and epoch rollup
        let epoch_record = self.bridge.step(tick, &vehicles, &self.topology);
        if let Some(record) = &epoch_record {
            log_detailed!(
                EVENT_EPOCH_FLUSH,
                "epoch record",
                tick = record.tick,
                pdr = record.pdr
            );
            if let Some(writer) = self.metrics_writer.as_mut() {
                if let Err(err) = writer.write_record(record) {
                    tracing::warn!(
                        event = EVENT_METRICS_IO,
                        error = %err,
                        "metrics stream disabled after write failure"
                    );
                    self.metrics_writer = None;
                }
            }
        }

        let junction_states = self
            .junctions
            .values()
            .map(|junction| JunctionTickState {
                id: junction.get_id().clone(),
                phase_index: junction.current_phase_index(),
                time_in_phase: junction.time_in_phase(),
                mode: junction.runtime().mode,
                faulted: junction.is_faulted(),
            })
            .collect();

        Ok(TickState {
            tick,
            vehicles,
            junctions: junction_states,
            decisions,
            epoch_record,
        })
    }

    /// Samples per-lane counts for every lane feeding a non-faulted
    /// junction. Unknown-lane rejections are entity-level: the lane reads
    /// as empty and the run continues.
    fn sample_lanes(&mut self) -> Result<LaneOccupancy, SessionError> {
        let mut lanes: IndexSet<String> = IndexSet::new();
        for junction in self.junctions.values() {
            if junction.is_faulted() {
                continue;
            }
            for lane in junction.signal_lanes() {
                lanes.insert(lane.clone());
            }
        }
        let mut occupancy = LaneOccupancy::new();
        for lane in &lanes {
            let vehicles = match self.client.lane_vehicle_count(lane) {
                Ok(count) => count,
                Err(err) if err.is_fatal() => return Err(SessionError::Simulator(err)),
                Err(_) => 0,
            };
            let halting = match self.client.lane_halting_count(lane) {
                Ok(count) => count,
                Err(err) if err.is_fatal() => return Err(SessionError::Simulator(err)),
                Err(_) => 0,
            };
            occupancy.insert(lane, vehicles, halting);
        }
        Ok(occupancy)
    }

    /// Runs ticks until `max_ticks`, the stop flag, or a fatal error.
    ///
    /// The graceful path flushes metrics, writes the summary and closes
    /// the client; the fatal path still best-effort closes and attempts
    /// the summary before surfacing the error.
    pub fn run(&mut self) -> Result<RunSummary, SessionError> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            match self.step() {
                Ok(state) => {
                    if state.tick >= self.config.max_ticks {
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "fatal error, aborting the run");
                    let _ = self.shutdown();
                    return Err(err);
                }
            }
        }
        Ok(self.shutdown())
    }

    /// Flushes metrics, writes the final summary and closes the client.
    fn shutdown(&mut self) -> RunSummary {
        if let Err(err) = self.bridge.finish() {
            tracing::warn!(event = EVENT_METRICS_IO, error = %err, "packet flush failed");
        }
        if let Some(writer) = self.metrics_writer.as_mut() {
            if let Err(err) = writer.flush() {
                tracing::warn!(event = EVENT_METRICS_IO, error = %err, "metrics flush failed");
            }
        }
        let summary = self.bridge.run_summary(
            self.tick,
            &self.config.mode.to_string(),
            self.faulted_junctions(),
            self.coordinator.preempt_events(),
        );
        if let Some(sink) = self.summary_sink.as_mut() {
            if let Err(err) = write_summary(sink, &summary) {
                tracing::warn!(event = EVENT_METRICS_IO, error = %err, "summary write failed");
            }
        }
        if let Err(err) = self.client.close() {
            tracing::warn!(error = %err, "simulator close failed");
        }
        log_main!(
            EVENT_SESSION_CLOSE,
            "session closed",
            session = self.id.to_string().as_str(),
            ticks = self.tick,
            preempt_events = self.coordinator.preempt_events()
        );
        summary
    }
}
