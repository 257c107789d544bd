use crate::bridge::Packet;
use serde::Serialize;

/// Application payload assumed per beacon/packet when deriving throughput,
/// bytes. Matches a typical CAM-style safety message.
pub const BEACON_PAYLOAD_BYTES: u64 = 200;

/// One rolled-up epoch of network metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochRecord {
    pub tick: u64,
    /// Delivered / sent over the epoch; 0 when nothing was sent.
    pub pdr: f64,
    /// Mean latency over delivered packets, ms; 0 when nothing delivered.
    pub avg_latency_ms: f64,
    pub emergency_pdr: f64,
    pub emergency_avg_latency_ms: f64,
    pub active_vehicles: usize,
    pub emergency_count: usize,
}

#[derive(Debug, Clone, Default)]
struct Counters {
    sent: u64,
    delivered: u64,
    latency_sum_ms: f64,
    emergency_sent: u64,
    emergency_delivered: u64,
    emergency_latency_sum_ms: f64,
}

impl Counters {
    fn record(&mut self, packet: &Packet) {
        self.sent += 1;
        if packet.emergency {
            self.emergency_sent += 1;
        }
        if packet.delivered {
            self.delivered += 1;
            let latency = packet.latency_ms.unwrap_or_default();
            self.latency_sum_ms += latency;
            if packet.emergency {
                self.emergency_delivered += 1;
                self.emergency_latency_sum_ms += latency;
            }
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn mean(sum: f64, count: u64) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Final run summary, serialised to `integrated_simulation_results.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub combined: CombinedSummary,
    pub emergency: EmergencySummary,
    pub vehicles: VehiclesSummary,
    pub run: RunInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct CombinedSummary {
    pub overall_pdr: f64,
    pub average_delay_ms: f64,
    pub throughput_mbps: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmergencySummary {
    pub success_rate: f64,
    pub average_delay_ms: f64,
    pub total_events: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehiclesSummary {
    pub total_seen: usize,
    pub emergency_seen: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub ticks: u64,
    pub seed: u64,
    pub mode: String,
    pub faulted_junctions: usize,
}

/// Epoch and whole-run counters. The bridge records every packet here;
/// [`MetricsAccumulator::finish_epoch`] rolls the epoch window into an
/// [`EpochRecord`] and resets it, run totals keep accumulating.
#[derive(Debug, Default)]
pub struct MetricsAccumulator {
    epoch: Counters,
    totals: Counters,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        MetricsAccumulator::default()
    }

    /// Folds one packet into the epoch and run counters.
    pub fn record(&mut self, packet: &Packet) {
        self.epoch.record(packet);
        self.totals.record(packet);
    }

    /// Sent/delivered totals over the whole run so far.
    pub fn total_sent(&self) -> u64 {
        self.totals.sent
    }

    pub fn total_delivered(&self) -> u64 {
        self.totals.delivered
    }

    /// Closes the current epoch window and returns its record.
    pub fn finish_epoch(
        &mut self,
        tick: u64,
        active_vehicles: usize,
        emergency_count: usize,
    ) -> EpochRecord {
        let record = EpochRecord {
            tick,
            pdr: ratio(self.epoch.delivered, self.epoch.sent),
            avg_latency_ms: mean(self.epoch.latency_sum_ms, self.epoch.delivered),
            emergency_pdr: ratio(self.epoch.emergency_delivered, self.epoch.emergency_sent),
            emergency_avg_latency_ms: mean(
                self.epoch.emergency_latency_sum_ms,
                self.epoch.emergency_delivered,
            ),
            active_vehicles,
            emergency_count,
        };
        self.epoch = Counters::default();
        record
    }

    /// Builds the final run summary from the run totals.
    ///
    /// Throughput assumes [`BEACON_PAYLOAD_BYTES`] per delivered packet
    /// over the run's simulated duration (one tick = one second).
    #[allow(clippy::too_many_arguments)]
    pub fn run_summary(
        &self,
        ticks: u64,
        seed: u64,
        mode: &str,
        faulted_junctions: usize,
        total_events: u64,
        total_seen: usize,
        emergency_seen: usize,
    ) -> RunSummary {
        let throughput_mbps = if ticks == 0 {
            0.0
        } else {
            (self.totals.delivered * BEACON_PAYLOAD_BYTES * 8) as f64 / (ticks as f64 * 1e6)
        };
        RunSummary {
            combined: CombinedSummary {
                overall_pdr: ratio(self.totals.delivered, self.totals.sent),
                average_delay_ms: mean(self.totals.latency_sum_ms, self.totals.delivered),
                throughput_mbps,
            },
            emergency: EmergencySummary {
                success_rate: ratio(self.totals.emergency_delivered, self.totals.emergency_sent),
                average_delay_ms: mean(
                    self.totals.emergency_latency_sum_ms,
                    self.totals.emergency_delivered,
                ),
                total_events,
            },
            vehicles: VehiclesSummary {
                total_seen,
                emergency_seen,
            },
            run: RunInfo {
                ticks,
                seed,
                mode: mode.to_string(),
                faulted_junctions,
            },
        }
    }
}
