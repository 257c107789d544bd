use rand::Rng;
use rand_distr::StandardNormal;
use std::fmt;

/// Default short-range (DSRC-like) radius, metres.
pub const DEFAULT_SHORT_RANGE_M: f64 = 300.0;
/// Default long-range (cellular) radius, metres.
pub const DEFAULT_LONG_RANGE_M: f64 = 1000.0;

/// Gaussian jitter applied to every delivered packet's latency, ms.
const JITTER_SIGMA_MS: f64 = 2.0;
/// Latency floor after jitter, ms.
const MIN_LATENCY_MS: f64 = 1.0;

// Short-range delivery band: quadratic falloff clamped to [0.92, 0.98]
const SHORT_ATTENUATION: f64 = 0.06;
const SHORT_P_MIN: f64 = 0.92;
const SHORT_P_MAX: f64 = 0.98;
// Latency ramps linearly 20 -> 50 ms across the range
const SHORT_LATENCY_BASE_MS: f64 = 20.0;
const SHORT_LATENCY_SPAN_MS: f64 = 30.0;

// Long-range delivery band: quadratic falloff clamped to [0.95, 0.99]
const LONG_ATTENUATION: f64 = 0.04;
const LONG_P_MIN: f64 = 0.95;
const LONG_P_MAX: f64 = 0.99;
// Latency ramps linearly 15 -> 30 ms across the range
const LONG_LATENCY_BASE_MS: f64 = 15.0;
const LONG_LATENCY_SPAN_MS: f64 = 15.0;

/// The two modelled channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// DSRC-like broadcast channel, V2V beacons and regular V2I.
    ShortRange,
    /// Cellular uplink, used when an emergency vehicle talks to an RSU.
    LongRange,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkKind::ShortRange => "short_range",
            LinkKind::LongRange => "long_range",
        };
        write!(f, "{}", s)
    }
}

/// Result of one transmission attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkOutcome {
    pub delivered: bool,
    /// Present exactly when `delivered` is true, and then always >= 1 ms.
    pub latency_ms: Option<f64>,
}

impl LinkOutcome {
    fn lost() -> Self {
        LinkOutcome {
            delivered: false,
            latency_ms: None,
        }
    }
}

/// Pure analytic link model: (distance, kind) -> (delivery probability,
/// base latency). Randomness enters only through the RNG handed into
/// [`LinkModel::attempt`], which the bridge owns, so runs are reproducible
/// under a fixed seed.
#[derive(Debug, Clone)]
pub struct LinkModel {
    short_range_m: f64,
    long_range_m: f64,
}

impl LinkModel {
    /// Creates a model with the given channel radii.
    ///
    /// # Arguments
    /// * `short_range_m` - Short-range radius (default 300 m).
    /// * `long_range_m` - Long-range radius (default 1000 m).
    pub fn new(short_range_m: f64, long_range_m: f64) -> Self {
        LinkModel {
            short_range_m,
            long_range_m,
        }
    }

    pub fn short_range_m(&self) -> f64 {
        self.short_range_m
    }

    pub fn long_range_m(&self) -> f64 {
        self.long_range_m
    }

    /// Effective radius of the given channel.
    pub fn range_of(&self, kind: LinkKind) -> f64 {
        match kind {
            LinkKind::ShortRange => self.short_range_m,
            LinkKind::LongRange => self.long_range_m,
        }
    }

    /// Delivery probability at `distance`. Zero at or beyond the channel
    /// radius; inside it, a quadratic falloff clamped to the channel's
    /// empirical band (short: [0.92, 0.98], long: [0.95, 0.99]).
    ///
    /// # Example
    /// ```
    /// use vanet_cosim_core::radio::{LinkKind, LinkModel};
    ///
    /// let model = LinkModel::default();
    /// assert_eq!(model.delivery_probability(LinkKind::ShortRange, 10.0), 0.98);
    /// assert_eq!(model.delivery_probability(LinkKind::ShortRange, 300.0), 0.0);
    /// ```
    pub fn delivery_probability(&self, kind: LinkKind, distance: f64) -> f64 {
        let range = self.range_of(kind);
        if distance >= range {
            return 0.0;
        }
        let ratio = distance / range;
        match kind {
            LinkKind::ShortRange => {
                (1.0 - ratio * ratio * SHORT_ATTENUATION).clamp(SHORT_P_MIN, SHORT_P_MAX)
            }
            LinkKind::LongRange => {
                (1.0 - ratio * ratio * LONG_ATTENUATION).clamp(LONG_P_MIN, LONG_P_MAX)
            }
        }
    }

    /// Jitter-free base latency at `distance`, ms. Linear across the
    /// channel radius: short-range 20 -> 50 ms, long-range 15 -> 30 ms.
    pub fn base_latency_ms(&self, kind: LinkKind, distance: f64) -> f64 {
        let ratio = distance / self.range_of(kind);
        match kind {
            LinkKind::ShortRange => SHORT_LATENCY_BASE_MS + ratio * SHORT_LATENCY_SPAN_MS,
            LinkKind::LongRange => LONG_LATENCY_BASE_MS + ratio * LONG_LATENCY_SPAN_MS,
        }
    }

    /// Performs one transmission attempt.
    ///
    /// Draws at most two values from `rng`: a uniform for delivery and,
    /// only when delivered, a standard normal for latency jitter. Out of
    /// range attempts draw nothing, keeping the RNG sequence stable.
    pub fn attempt<R: Rng>(&self, kind: LinkKind, distance: f64, rng: &mut R) -> LinkOutcome {
        let probability = self.delivery_probability(kind, distance);
        if probability <= 0.0 {
            return LinkOutcome::lost();
        }
        let draw: f64 = rng.random();
        if draw >= probability {
            return LinkOutcome::lost();
        }
        let jitter: f64 = rng.sample::<f64, _>(StandardNormal) * JITTER_SIGMA_MS;
        let latency = (self.base_latency_ms(kind, distance) + jitter).max(MIN_LATENCY_MS);
        LinkOutcome {
            delivered: true,
            latency_ms: Some(latency),
        }
    }
}

impl Default for LinkModel {
    fn default() -> Self {
        LinkModel::new(DEFAULT_SHORT_RANGE_M, DEFAULT_LONG_RANGE_M)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_probability_out_of_range() {
        let model = LinkModel::default();
        // The boundary itself is out of range
        assert_eq!(model.delivery_probability(LinkKind::ShortRange, 300.0), 0.0);
        assert_eq!(model.delivery_probability(LinkKind::ShortRange, 305.0), 0.0);
        assert_eq!(model.delivery_probability(LinkKind::LongRange, 1000.0), 0.0);
    }

    #[test]
    fn test_probability_band() {
        let model = LinkModel::default();
        // Close range hits the band ceiling
        assert_eq!(model.delivery_probability(LinkKind::ShortRange, 0.0), 0.98);
        // Near the edge: 1 - 0.06*(295/300)^2 ~= 0.942
        let near_edge = model.delivery_probability(LinkKind::ShortRange, 295.0);
        assert!((near_edge - 0.9420).abs() < 1e-3, "got {}", near_edge);
        // Monotone decreasing with distance
        let mut last = f64::INFINITY;
        for d in [0.0, 50.0, 100.0, 200.0, 299.0] {
            let p = model.delivery_probability(LinkKind::ShortRange, d);
            assert!(p <= last);
            last = p;
        }
        // Long range floor
        assert_eq!(model.delivery_probability(LinkKind::LongRange, 999.0), 0.95);
    }

    #[test]
    fn test_latency_ramp() {
        let model = LinkModel::default();
        assert!((model.base_latency_ms(LinkKind::ShortRange, 0.0) - 20.0).abs() < 1e-9);
        assert!((model.base_latency_ms(LinkKind::ShortRange, 150.0) - 35.0).abs() < 1e-9);
        assert!((model.base_latency_ms(LinkKind::ShortRange, 300.0) - 50.0).abs() < 1e-9);
        assert!((model.base_latency_ms(LinkKind::LongRange, 500.0) - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_attempt_invariants() {
        let model = LinkModel::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5_000 {
            let outcome = model.attempt(LinkKind::ShortRange, 250.0, &mut rng);
            match outcome.latency_ms {
                Some(latency) => {
                    assert!(outcome.delivered);
                    assert!(latency >= 1.0);
                }
                None => assert!(!outcome.delivered),
            }
        }
    }

    #[test]
    fn test_attempt_out_of_range_never_delivers() {
        let model = LinkModel::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let outcome = model.attempt(LinkKind::ShortRange, 305.0, &mut rng);
            assert!(!outcome.delivered);
            assert!(outcome.latency_ms.is_none());
        }
    }

    #[test]
    fn test_empirical_pdr_matches_curve() {
        let model = LinkModel::default();
        let mut rng = StdRng::seed_from_u64(42);
        for distance in [50.0, 200.0, 295.0] {
            let expected = model.delivery_probability(LinkKind::ShortRange, distance);
            let attempts = 10_000;
            let mut delivered = 0;
            for _ in 0..attempts {
                if model.attempt(LinkKind::ShortRange, distance, &mut rng).delivered {
                    delivered += 1;
                }
            }
            let empirical = delivered as f64 / attempts as f64;
            assert!(
                (empirical - expected).abs() < 0.01,
                "distance {}: empirical {} vs expected {}",
                distance,
                empirical,
                expected
            );
        }
    }
}
