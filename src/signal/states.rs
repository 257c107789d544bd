use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

/// Custom error types for phase string handling.
#[derive(Debug, Clone)]
pub enum PhaseError {
    /// Indicates that the phase string contains a character outside {G,g,y,r}.
    InvalidSignalChar { character: char, phase: String },
    /// Indicates an empty phase string.
    EmptyPhase,
}

impl fmt::Display for PhaseError {
    /// Formats the error message for `PhaseError`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseError::InvalidSignalChar { character, phase } => {
                write!(f, "Invalid signal character '{}' in phase '{}'", character, phase)
            }
            PhaseError::EmptyPhase => {
                write!(f, "Phase string is empty")
            }
        }
    }
}

impl std::error::Error for PhaseError {}

lazy_static! {
    static ref SIGNAL_CONVERTER: HashMap<char, SignalState> = {
        let mut m = HashMap::new();
        m.insert('r', SignalState::Red);
        m.insert('y', SignalState::Yellow);
        m.insert('g', SignalState::Green);
        m.insert('G', SignalState::GreenPriority);
        m
    };
}

/// Represents the state of a single signal position within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalState {
    /// Red light - vehicles must stop.
    Red,
    /// Amber (yellow) light - vehicles prepare to stop.
    Yellow,
    /// Permitted green - vehicles may pass when the junction is clear.
    Green,
    /// Protected green - vehicles pass with priority.
    GreenPriority,
}

impl SignalState {
    /// Converts a state character to a `SignalState`.
    ///
    /// # Arguments
    /// * `signal_char` - One of `r`, `y`, `g`, `G`.
    ///
    /// # Returns
    /// A `Result` with the corresponding `SignalState`, or an error for any
    /// character outside the phase alphabet.
    pub fn from_char(signal_char: char) -> Result<Self, PhaseError> {
        SIGNAL_CONVERTER
            .get(&signal_char)
            .copied()
            .ok_or(PhaseError::InvalidSignalChar {
                character: signal_char,
                phase: signal_char.to_string(),
            })
    }

    /// Protected and permitted green are semantically equivalent for
    /// density computation and preempt targeting.
    pub fn is_green(self) -> bool {
        matches!(self, SignalState::Green | SignalState::GreenPriority)
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let signal_char = match self {
            SignalState::Red => 'r',
            SignalState::Yellow => 'y',
            SignalState::Green => 'g',
            SignalState::GreenPriority => 'G',
        };
        write!(f, "{}", signal_char)
    }
}

/// One validated phase of a junction's signal program.
///
/// A phase is a fixed-length string of per-signal state characters; the
/// length equals the junction's controlled-signal count and is constant
/// across the whole program.
///
/// # Example
/// ```
/// use vanet_cosim_core::signal::Phase;
///
/// let green = Phase::parse("GGrr").unwrap();
/// assert_eq!(green.green_indices(), vec![0, 1]);
/// assert!(!green.is_yellow());
///
/// let yellow = Phase::parse("yyrr").unwrap();
/// assert!(yellow.is_yellow());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    raw: String,
    states: Vec<SignalState>,
}

impl Phase {
    /// Parses and validates a phase string.
    ///
    /// # Arguments
    /// * `phase_str` - The per-signal state string, alphabet {G,g,y,r}.
    pub fn parse(phase_str: &str) -> Result<Self, PhaseError> {
        if phase_str.is_empty() {
            return Err(PhaseError::EmptyPhase);
        }
        let mut states = Vec::with_capacity(phase_str.len());
        for character in phase_str.chars() {
            let state =
                SIGNAL_CONVERTER
                    .get(&character)
                    .copied()
                    .ok_or(PhaseError::InvalidSignalChar {
                        character,
                        phase: phase_str.to_string(),
                    })?;
            states.push(state);
        }
        Ok(Phase {
            raw: phase_str.to_string(),
            states,
        })
    }

    /// Number of controlled signals in this phase.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The raw state string as declared by the simulator.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed per-signal states in program order.
    pub fn states(&self) -> &[SignalState] {
        &self.states
    }

    /// Signal positions that show green (protected or permitted).
    pub fn green_indices(&self) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_green())
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether the given signal position shows green.
    pub fn is_green_at(&self, index: usize) -> bool {
        self.states.get(index).is_some_and(|s| s.is_green())
    }

    /// A clearance phase: at least one yellow signal and no green anywhere.
    /// Phases mixing greens with yellows are treated as green phases.
    pub fn is_yellow(&self) -> bool {
        let has_yellow = self.states.iter().any(|s| *s == SignalState::Yellow);
        has_yellow && !self.has_green()
    }

    /// Whether any signal in this phase shows green.
    pub fn has_green(&self) -> bool {
        self.states.iter().any(|s| s.is_green())
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signal_valid() {
        assert_eq!(SignalState::from_char('r').unwrap(), SignalState::Red);
        assert_eq!(SignalState::from_char('y').unwrap(), SignalState::Yellow);
        assert_eq!(SignalState::from_char('g').unwrap(), SignalState::Green);
        assert_eq!(SignalState::from_char('G').unwrap(), SignalState::GreenPriority);
    }

    #[test]
    fn test_parse_signal_invalid() {
        let result = SignalState::from_char('z');
        assert!(result.is_err());
    }

    #[test]
    fn test_phase_parse() {
        let phase = Phase::parse("Ggry").unwrap();
        assert_eq!(phase.len(), 4);
        assert_eq!(phase.green_indices(), vec![0, 1]);
        assert!(phase.is_green_at(0));
        assert!(!phase.is_green_at(2));
    }

    #[test]
    fn test_phase_parse_invalid() {
        let result = Phase::parse("GGxr");
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Invalid signal character 'x' in phase 'GGxr'"
        );
        assert!(Phase::parse("").is_err());
    }

    #[test]
    fn test_yellow_classification() {
        assert!(Phase::parse("yyrr").unwrap().is_yellow());
        assert!(!Phase::parse("GGrr").unwrap().is_yellow());
        // Mixed green + yellow counts as a green phase
        assert!(!Phase::parse("Gyrr").unwrap().is_yellow());
        // All-red is neither yellow nor green
        let all_red = Phase::parse("rrrr").unwrap();
        assert!(!all_red.is_yellow());
        assert!(!all_red.has_green());
    }
}
