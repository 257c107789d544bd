//! # Metrics Module
//!
//! In-memory counters fed by the bridge, per-epoch rollup records, and the
//! persisted outputs: streamed packet rows, epoch CSV, and the final JSON
//! summary.
//!
//! ## Memory model
//!
//! Every counter is O(1); packet rows are write-and-forget through the
//! streaming writer. The only unbounded state is the set of distinct
//! vehicle ids seen, kept for the run summary.
//!
//! ## Persisted outputs
//!
//! - `v2i_packets.csv` - `tick,tx_id,rx_id,link_kind,delivered,latency_ms`
//! - `v2i_metrics.csv` - epoch rollups
//! - `integrated_simulation_results.json` - fixed four-section summary
//!
//! Write failures are logged and never stop the accumulators; the final
//! summary is still attempted at shutdown.
pub mod accumulator;
pub mod writers;

pub use accumulator::{
    CombinedSummary, EmergencySummary, EpochRecord, MetricsAccumulator, RunInfo, RunSummary,
    VehiclesSummary,
};
pub use writers::{MetricsCsvWriter, MetricsError, PacketCsvWriter, SharedBuffer, write_summary};
