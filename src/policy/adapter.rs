use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Error types for policy loading and evaluation. Loading errors are fatal
/// at startup in RL modes.
#[derive(Debug, Clone)]
pub enum PolicyError {
    /// The snapshot file could not be read.
    SnapshotIo { path: String, details: String },
    /// The snapshot file is not a valid policy snapshot.
    SnapshotMalformed { path: String, details: String },
    /// The observation handed to `act` does not match the policy's input
    /// dimension.
    DimensionMismatch { expected: usize, actual: usize },
    /// The snapshot declares an empty action space.
    EmptyActionSpace,
    /// An RL decision was requested but no policy is loaded.
    NotLoaded,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::SnapshotIo { path, details } => {
                write!(f, "Can't read policy snapshot '{}': {}", path, details)
            }
            PolicyError::SnapshotMalformed { path, details } => {
                write!(f, "Malformed policy snapshot '{}': {}", path, details)
            }
            PolicyError::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Observation length {} does not match the policy input dimension {}",
                    actual, expected
                )
            }
            PolicyError::EmptyActionSpace => {
                write!(f, "Policy snapshot declares an empty action space")
            }
            PolicyError::NotLoaded => {
                write!(f, "RL decision requested but no policy is loaded")
            }
        }
    }
}

impl std::error::Error for PolicyError {}

/// The RL hook contract: one action index for one flattened observation.
///
/// Action semantics are owned by the caller; the signal controller maps
/// the returned index onto a junction's program by `action mod phases`,
/// so any action cardinality degrades to a legal phase.
pub trait Policy {
    /// Selects an action for the observation.
    fn act(&mut self, observation: &[f64]) -> Result<usize, PolicyError>;

    /// Input dimension this policy accepts.
    fn observation_dim(&self) -> usize;

    /// Size of the action space `[0, action_count)`.
    fn action_count(&self) -> usize;
}

#[derive(Debug, Deserialize)]
struct PolicySnapshot {
    obs_dim: usize,
    actions: usize,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

/// Linear policy snapshot adapter.
///
/// The snapshot is a JSON file with an `actions × obs_dim` weight matrix
/// and a bias vector; `act` scores every action as `wᵢ·obs + bᵢ` and
/// returns the argmax (lowest index on ties). This is the narrow adapter
/// through which trained policies enter the core - training itself, richer
/// architectures and their serialisation live outside.
///
/// Snapshot format:
/// ```json
/// { "obs_dim": 29, "actions": 4,
///   "weights": [[0.0, ...], [0.0, ...], [0.0, ...], [0.0, ...]],
///   "bias": [0.0, 0.0, 0.0, 0.0] }
/// ```
#[derive(Debug, Clone)]
pub struct LinearPolicy {
    obs_dim: usize,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl LinearPolicy {
    /// Loads and validates a snapshot file.
    ///
    /// # Arguments
    /// * `path` - Path to the JSON snapshot.
    ///
    /// # Returns
    /// The policy, or a [`PolicyError`] naming the file and the defect.
    pub fn from_snapshot<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let path_str = path.as_ref().display().to_string();
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| PolicyError::SnapshotIo {
            path: path_str.clone(),
            details: e.to_string(),
        })?;
        let snapshot: PolicySnapshot =
            serde_json::from_str(&contents).map_err(|e| PolicyError::SnapshotMalformed {
                path: path_str.clone(),
                details: e.to_string(),
            })?;
        Self::from_parts(snapshot, &path_str)
    }

    fn from_parts(snapshot: PolicySnapshot, path: &str) -> Result<Self, PolicyError> {
        if snapshot.actions == 0 {
            return Err(PolicyError::EmptyActionSpace);
        }
        if snapshot.weights.len() != snapshot.actions || snapshot.bias.len() != snapshot.actions {
            return Err(PolicyError::SnapshotMalformed {
                path: path.to_string(),
                details: format!(
                    "expected {} weight rows and biases, found {} and {}",
                    snapshot.actions,
                    snapshot.weights.len(),
                    snapshot.bias.len()
                ),
            });
        }
        for (row_index, row) in snapshot.weights.iter().enumerate() {
            if row.len() != snapshot.obs_dim {
                return Err(PolicyError::SnapshotMalformed {
                    path: path.to_string(),
                    details: format!(
                        "weight row {} has length {}, expected obs_dim {}",
                        row_index,
                        row.len(),
                        snapshot.obs_dim
                    ),
                });
            }
        }
        Ok(LinearPolicy {
            obs_dim: snapshot.obs_dim,
            weights: snapshot.weights,
            bias: snapshot.bias,
        })
    }
}

impl Policy for LinearPolicy {
    fn act(&mut self, observation: &[f64]) -> Result<usize, PolicyError> {
        if observation.len() != self.obs_dim {
            return Err(PolicyError::DimensionMismatch {
                expected: self.obs_dim,
                actual: observation.len(),
            });
        }
        let mut best_action = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (action, (row, bias)) in self.weights.iter().zip(&self.bias).enumerate() {
            let score: f64 = row.iter().zip(observation).map(|(w, x)| w * x).sum::<f64>() + bias;
            if score > best_score {
                best_score = score;
                best_action = action;
            }
        }
        Ok(best_action)
    }

    fn observation_dim(&self) -> usize {
        self.obs_dim
    }

    fn action_count(&self) -> usize {
        self.weights.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(obs_dim: usize, actions: usize) -> PolicySnapshot {
        PolicySnapshot {
            obs_dim,
            actions,
            weights: vec![vec![0.0; obs_dim]; actions],
            bias: vec![0.0; actions],
        }
    }

    #[test]
    fn test_argmax_lowest_index_on_ties() {
        let mut policy = LinearPolicy::from_parts(snapshot(3, 4), "test").unwrap();
        assert_eq!(policy.act(&[1.0, 2.0, 3.0]).unwrap(), 0);
    }

    #[test]
    fn test_argmax_picks_highest_score() {
        let mut raw = snapshot(2, 3);
        raw.weights[2] = vec![1.0, 1.0];
        raw.bias[1] = 0.5;
        let mut policy = LinearPolicy::from_parts(raw, "test").unwrap();
        assert_eq!(policy.act(&[1.0, 1.0]).unwrap(), 2);
        assert_eq!(policy.act(&[0.0, 0.0]).unwrap(), 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut policy = LinearPolicy::from_parts(snapshot(3, 2), "test").unwrap();
        let err = policy.act(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            PolicyError::DimensionMismatch { expected: 3, actual: 1 }
        ));
    }

    #[test]
    fn test_malformed_shapes_rejected() {
        let mut raw = snapshot(3, 2);
        raw.weights[1] = vec![0.0; 2];
        assert!(matches!(
            LinearPolicy::from_parts(raw, "test"),
            Err(PolicyError::SnapshotMalformed { .. })
        ));
        assert!(matches!(
            LinearPolicy::from_parts(snapshot(3, 0), "test"),
            Err(PolicyError::EmptyActionSpace)
        ));
    }
}
