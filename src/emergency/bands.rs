use std::fmt;

/// Distance band radii, metres. Inner boundaries are closed: a vehicle at
/// exactly the pass-through radius is in PassThrough, one at exactly the
/// preempt radius is in Preempt.
#[derive(Debug, Clone)]
pub struct BandThresholds {
    /// PassThrough radius (release + mark served).
    pub passthrough_m: f64,
    /// Preempt band outer radius.
    pub preempt_m: f64,
    /// RL-Activate band outer radius.
    pub rl_activate_m: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        BandThresholds {
            passthrough_m: 30.0,
            preempt_m: 150.0,
            rl_activate_m: 250.0,
        }
    }
}

/// Distance band of a vehicle relative to one junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistanceBand {
    /// At the junction: release preemption and mark the junction served.
    PassThrough,
    /// Close enough to claim the junction.
    Preempt,
    /// Proximity mode switches the junction's controller to RL here.
    RlActivate,
    /// No effect.
    Far,
}

impl DistanceBand {
    /// Classifies a distance against the band radii.
    ///
    /// # Example
    /// ```
    /// use vanet_cosim_core::emergency::{BandThresholds, DistanceBand};
    ///
    /// let bands = BandThresholds::default();
    /// assert_eq!(DistanceBand::classify(150.0, &bands), DistanceBand::Preempt);
    /// assert_eq!(DistanceBand::classify(30.0, &bands), DistanceBand::PassThrough);
    /// ```
    pub fn classify(distance_m: f64, thresholds: &BandThresholds) -> DistanceBand {
        if distance_m <= thresholds.passthrough_m {
            DistanceBand::PassThrough
        } else if distance_m <= thresholds.preempt_m {
            DistanceBand::Preempt
        } else if distance_m <= thresholds.rl_activate_m {
            DistanceBand::RlActivate
        } else {
            DistanceBand::Far
        }
    }
}

impl fmt::Display for DistanceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DistanceBand::PassThrough => "pass_through",
            DistanceBand::Preempt => "preempt",
            DistanceBand::RlActivate => "rl_activate",
            DistanceBand::Far => "far",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries_closed_inward() {
        let bands = BandThresholds::default();
        // Exactly 30 m is PassThrough
        assert_eq!(DistanceBand::classify(30.0, &bands), DistanceBand::PassThrough);
        assert_eq!(DistanceBand::classify(30.1, &bands), DistanceBand::Preempt);
        // Exactly 150 m is Preempt
        assert_eq!(DistanceBand::classify(150.0, &bands), DistanceBand::Preempt);
        assert_eq!(DistanceBand::classify(150.1, &bands), DistanceBand::RlActivate);
        assert_eq!(DistanceBand::classify(250.0, &bands), DistanceBand::RlActivate);
        assert_eq!(DistanceBand::classify(250.1, &bands), DistanceBand::Far);
        assert_eq!(DistanceBand::classify(0.0, &bands), DistanceBand::PassThrough);
    }

    #[test]
    fn test_custom_thresholds() {
        let bands = BandThresholds {
            passthrough_m: 20.0,
            preempt_m: 200.0,
            rl_activate_m: 500.0,
        };
        assert_eq!(DistanceBand::classify(25.0, &bands), DistanceBand::Preempt);
        assert_eq!(DistanceBand::classify(450.0, &bands), DistanceBand::RlActivate);
    }
}
