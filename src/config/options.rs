use crate::emergency::{BandThresholds, CoordinatorSettings};
use crate::radio::LinkModel;
use crate::signal::{Phase, SignalTiming};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Error types for configuration loading and validation. All fatal at
/// startup.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io { path: String, details: String },
    /// The configuration file is not valid JSON.
    Parse { path: String, details: String },
    /// An option value is outside its legal range.
    OutOfRange { option: String, details: String },
    /// An RL mode was requested without a policy snapshot.
    MissingPolicy { mode: RunMode },
    /// A phase override contains characters outside the phase alphabet.
    BadPhaseOverride { junction: String, details: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, details } => {
                write!(f, "Can't read configuration '{}': {}", path, details)
            }
            ConfigError::Parse { path, details } => {
                write!(f, "Can't parse configuration '{}': {}", path, details)
            }
            ConfigError::OutOfRange { option, details } => {
                write!(f, "Configuration option '{}' out of range: {}", option, details)
            }
            ConfigError::MissingPolicy { mode } => {
                write!(
                    f,
                    "Mode '{}' requires 'policy_snapshot_path' but none is configured",
                    mode
                )
            }
            ConfigError::BadPhaseOverride { junction, details } => {
                write!(f, "Phase override for junction '{}' is invalid: {}", junction, details)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Global signal-control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Every junction runs the density scheduler.
    Density,
    /// Every junction runs under the policy.
    Rl,
    /// Junctions run under the policy while any emergency is tracked,
    /// density otherwise.
    Hybrid,
    /// Each junction switches to the policy while an approaching emergency
    /// is inside the RL-Activate band.
    Proximity,
}

impl RunMode {
    /// Whether this mode can query the policy and therefore needs a
    /// snapshot at startup.
    pub fn requires_policy(self) -> bool {
        !matches!(self, RunMode::Density)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunMode::Density => "density",
            RunMode::Rl => "rl",
            RunMode::Hybrid => "hybrid",
            RunMode::Proximity => "proximity",
        };
        write!(f, "{}", s)
    }
}

fn default_emergency_keywords() -> Vec<String> {
    vec![
        "emergency".to_string(),
        "ambulance".to_string(),
        "fire".to_string(),
        "police".to_string(),
    ]
}

/// All recognised run options. Every field has a default, so a partial
/// configuration file only overrides what it names.
///
/// # Example
/// ```
/// use vanet_cosim_core::config::SimConfig;
///
/// let config = SimConfig::default();
/// assert_eq!(config.min_green_s, 10.0);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Global signal-control mode.
    pub mode: RunMode,
    /// RL-Activate band outer radius, metres.
    pub proximity_threshold_m: f64,
    /// Preempt band outer radius, metres.
    pub emergency_detection_m: f64,
    /// PassThrough band radius, metres.
    pub emergency_passthrough_m: f64,
    pub min_green_s: f64,
    pub max_green_s: f64,
    pub yellow_s: f64,
    /// Advisory green extension while density stays high, seconds.
    pub extension_step_s: f64,
    pub density_low: f64,
    pub density_high: f64,
    /// Global rate limit between preempt commands, seconds.
    pub override_cooldown_s: f64,
    /// Default preempt hold, seconds.
    pub preempt_duration_s: f64,
    pub short_range_m: f64,
    pub long_range_m: f64,
    /// Rollup cadence in ticks.
    pub metrics_epoch_ticks: u64,
    pub junction_topology_path: Option<String>,
    pub rsu_catalog_path: Option<String>,
    /// Required for any mode other than `density`.
    pub policy_snapshot_path: Option<String>,
    pub seed: u64,
    pub max_ticks: u64,
    /// Per-call simulator timeout, seconds, enforced by the client transport.
    pub step_timeout_s: f64,
    /// Id/type substrings classifying a vehicle as emergency.
    pub emergency_keywords: Vec<String>,
    /// Per-junction preferred preempt phase strings; lengths are checked
    /// against each junction's program at startup.
    pub phase_overrides: HashMap<String, String>,
    pub packets_path: String,
    pub metrics_path: String,
    pub summary_path: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            mode: RunMode::Density,
            proximity_threshold_m: 250.0,
            emergency_detection_m: 150.0,
            emergency_passthrough_m: 30.0,
            min_green_s: 10.0,
            max_green_s: 45.0,
            yellow_s: 3.0,
            extension_step_s: 3.0,
            density_low: 3.0,
            density_high: 10.0,
            override_cooldown_s: 3.0,
            preempt_duration_s: 10.0,
            short_range_m: 300.0,
            long_range_m: 1000.0,
            metrics_epoch_ticks: 1,
            junction_topology_path: None,
            rsu_catalog_path: None,
            policy_snapshot_path: None,
            seed: 0,
            max_ticks: 1000,
            step_timeout_s: 30.0,
            emergency_keywords: default_emergency_keywords(),
            phase_overrides: HashMap::new(),
            packets_path: "v2i_packets.csv".to_string(),
            metrics_path: "v2i_metrics.csv".to_string(),
            summary_path: "integrated_simulation_results.json".to_string(),
        }
    }
}

impl SimConfig {
    /// Loads a configuration file and validates it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path_str.clone(),
            details: e.to_string(),
        })?;
        let config: SimConfig = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path_str,
            details: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Range-checks every option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("min_green_s", self.min_green_s),
            ("yellow_s", self.yellow_s),
            ("extension_step_s", self.extension_step_s),
            ("preempt_duration_s", self.preempt_duration_s),
            ("short_range_m", self.short_range_m),
            ("long_range_m", self.long_range_m),
            ("emergency_passthrough_m", self.emergency_passthrough_m),
            ("step_timeout_s", self.step_timeout_s),
        ];
        for (option, value) in positive {
            if value <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    option: option.to_string(),
                    details: format!("{} must be positive", value),
                });
            }
        }
        if self.max_green_s <= self.min_green_s {
            return Err(ConfigError::OutOfRange {
                option: "max_green_s".to_string(),
                details: format!(
                    "max green {} must exceed min green {}",
                    self.max_green_s, self.min_green_s
                ),
            });
        }
        if self.density_low < 0.0 || self.density_high <= self.density_low {
            return Err(ConfigError::OutOfRange {
                option: "density_high".to_string(),
                details: format!(
                    "thresholds must satisfy 0 <= low < high, got {} and {}",
                    self.density_low, self.density_high
                ),
            });
        }
        if self.emergency_detection_m <= self.emergency_passthrough_m {
            return Err(ConfigError::OutOfRange {
                option: "emergency_detection_m".to_string(),
                details: format!(
                    "preempt radius {} must exceed pass-through radius {}",
                    self.emergency_detection_m, self.emergency_passthrough_m
                ),
            });
        }
        if self.proximity_threshold_m <= self.emergency_detection_m {
            return Err(ConfigError::OutOfRange {
                option: "proximity_threshold_m".to_string(),
                details: format!(
                    "RL-activate radius {} must exceed preempt radius {}",
                    self.proximity_threshold_m, self.emergency_detection_m
                ),
            });
        }
        if self.override_cooldown_s < 0.0 {
            return Err(ConfigError::OutOfRange {
                option: "override_cooldown_s".to_string(),
                details: "cooldown must be non-negative".to_string(),
            });
        }
        if self.metrics_epoch_ticks == 0 {
            return Err(ConfigError::OutOfRange {
                option: "metrics_epoch_ticks".to_string(),
                details: "epoch must span at least one tick".to_string(),
            });
        }
        if self.mode.requires_policy() && self.policy_snapshot_path.is_none() {
            return Err(ConfigError::MissingPolicy { mode: self.mode });
        }
        for (junction, override_str) in &self.phase_overrides {
            if let Err(err) = Phase::parse(override_str) {
                return Err(ConfigError::BadPhaseOverride {
                    junction: junction.clone(),
                    details: err.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Signal timing tunables for the controller.
    pub fn signal_timing(&self) -> SignalTiming {
        SignalTiming {
            min_green_s: self.min_green_s,
            max_green_s: self.max_green_s,
            yellow_s: self.yellow_s,
            extension_step_s: self.extension_step_s,
            density_low: self.density_low,
            density_high: self.density_high,
        }
    }

    /// Distance band radii for the coordinator.
    pub fn band_thresholds(&self) -> BandThresholds {
        BandThresholds {
            passthrough_m: self.emergency_passthrough_m,
            preempt_m: self.emergency_detection_m,
            rl_activate_m: self.proximity_threshold_m,
        }
    }

    /// Coordinator tunables (one tick = one second).
    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            bands: self.band_thresholds(),
            cooldown_ticks: self.override_cooldown_s.round().max(0.0) as u64,
            preempt_duration_s: self.preempt_duration_s,
            redetect_clearance_m: 200.0,
            missing_tick_limit: 2,
            run_mode: self.mode,
        }
    }

    /// Wireless link model with the configured radii.
    pub fn link_model(&self) -> LinkModel {
        LinkModel::new(self.short_range_m, self.long_range_m)
    }
}
