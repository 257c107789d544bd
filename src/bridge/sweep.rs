use crate::agents::{Vehicle, VehicleID};
use crate::bridge::packet::Packet;
use crate::bridge::spatial::UniformGrid;
use crate::metrics::{EpochRecord, MetricsAccumulator, MetricsError, PacketCsvWriter, RunSummary};
use crate::radio::{LinkKind, LinkModel};
use crate::topology::NetworkTopology;
use crate::verbose::{EVENT_METRICS_IO, EVENT_PACKET_SWEEP, EVENT_VEHICLE_GONE};
use crate::{log_all, log_detailed};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::io::Write;

/// Per-tick network orchestrator.
///
/// Owns the link model, the run's single seeded PRNG, the packet stream
/// and the metric accumulators. One [`NetworkBridge::step`] per tick
/// attempts every eligible transmission, streams the packet rows and
/// returns the epoch record when the rollup window closes.
pub struct NetworkBridge {
    link_model: LinkModel,
    rng: StdRng,
    seed: u64,
    epoch_ticks: u64,
    packet_writer: Option<PacketCsvWriter<Box<dyn Write>>>,
    accumulator: MetricsAccumulator,
    /// Ids reported in the previous tick, for departure detection.
    last_seen: HashSet<VehicleID>,
    /// Distinct ids ever reported, for the run summary.
    total_seen: HashSet<VehicleID>,
    emergency_seen: HashSet<VehicleID>,
    /// The current tick's packets; replaced wholesale every tick.
    last_packets: Vec<Packet>,
}

impl NetworkBridge {
    /// Creates a bridge.
    ///
    /// # Arguments
    /// * `link_model` - The wireless model.
    /// * `seed` - PRNG seed; fixed seed + identical inputs reproduce the
    ///   packet stream byte for byte.
    /// * `epoch_ticks` - Rollup cadence (1 = per-tick records).
    /// * `packet_sink` - Optional sink for `v2i_packets.csv` rows.
    pub fn new(
        link_model: LinkModel,
        seed: u64,
        epoch_ticks: u64,
        packet_sink: Option<Box<dyn Write>>,
    ) -> Self {
        let packet_writer = packet_sink.and_then(|sink| match PacketCsvWriter::new(sink) {
            Ok(writer) => Some(writer),
            Err(err) => {
                // A failing packet sink must not stop the run
                tracing::warn!(
                    event = EVENT_METRICS_IO,
                    error = %err,
                    "packet sink disabled"
                );
                None
            }
        });
        NetworkBridge {
            link_model,
            rng: StdRng::seed_from_u64(seed),
            seed,
            epoch_ticks: epoch_ticks.max(1),
            packet_writer,
            accumulator: MetricsAccumulator::new(),
            last_seen: HashSet::new(),
            total_seen: HashSet::new(),
            emergency_seen: HashSet::new(),
            last_packets: Vec::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Packets attempted in the most recent tick.
    pub fn last_packets(&self) -> &[Packet] {
        &self.last_packets
    }

    pub fn total_seen(&self) -> usize {
        self.total_seen.len()
    }

    pub fn emergency_seen(&self) -> usize {
        self.emergency_seen.len()
    }

    /// Runs the wireless sweep for one tick.
    ///
    /// For every vehicle in snapshot order: one directed V2V beacon to
    /// each other vehicle within short range, then one V2I packet to each
    /// RSU within the applicable range (long range when the transmitter is
    /// an emergency vehicle). Returns the epoch record when `tick` closes
    /// a rollup window.
    pub fn step(
        &mut self,
        tick: u64,
        vehicles: &[Vehicle],
        topology: &NetworkTopology,
    ) -> Option<EpochRecord> {
        self.track_population(vehicles);

        let positions: Vec<_> = vehicles.iter().map(|v| v.position).collect();
        let grid = UniformGrid::build(self.link_model.short_range_m(), &positions);
        let mut packets = Vec::new();

        for (tx_index, tx) in vehicles.iter().enumerate() {
            // V2V beacons
            for rx_index in grid.neighbors(&tx.position) {
                if rx_index == tx_index {
                    continue;
                }
                let rx = &vehicles[rx_index];
                let distance = tx.position.distance_to(&rx.position);
                if distance > self.link_model.short_range_m() {
                    continue;
                }
                let outcome = self.link_model.attempt(LinkKind::ShortRange, distance, &mut self.rng);
                packets.push(Packet {
                    tick,
                    tx_id: tx.id.clone(),
                    rx_id: rx.id.clone(),
                    kind: LinkKind::ShortRange,
                    emergency: tx.is_emergency(),
                    delivered: outcome.delivered,
                    latency_ms: outcome.latency_ms,
                });
            }
            // V2I packets
            for rsu in topology.rsus() {
                let kind = if tx.is_emergency() {
                    LinkKind::LongRange
                } else {
                    LinkKind::ShortRange
                };
                let distance = tx.position.distance_to(&rsu.position());
                if distance > self.link_model.range_of(kind) {
                    continue;
                }
                let outcome = self.link_model.attempt(kind, distance, &mut self.rng);
                packets.push(Packet {
                    tick,
                    tx_id: tx.id.clone(),
                    rx_id: rsu.get_id().clone(),
                    kind,
                    emergency: tx.is_emergency(),
                    delivered: outcome.delivered,
                    latency_ms: outcome.latency_ms,
                });
            }
        }

        for packet in &packets {
            self.accumulator.record(packet);
            log_all!(
                EVENT_PACKET_SWEEP,
                "packet attempt",
                tx = packet.tx_id.as_str(),
                rx = packet.rx_id.as_str(),
                delivered = packet.delivered
            );
        }
        self.stream_packets(&packets);
        self.last_packets = packets;

        if tick % self.epoch_ticks == 0 {
            let emergency_count = vehicles.iter().filter(|v| v.is_emergency()).count();
            Some(
                self.accumulator
                    .finish_epoch(tick, vehicles.len(), emergency_count),
            )
        } else {
            None
        }
    }

    /// Streams rows to the packet CSV. A failing sink is logged once and
    /// disabled; aggregation continues.
    fn stream_packets(&mut self, packets: &[Packet]) {
        let Some(writer) = self.packet_writer.as_mut() else {
            return;
        };
        for packet in packets {
            if let Err(err) = writer.write_packet(packet) {
                tracing::warn!(
                    event = EVENT_METRICS_IO,
                    error = %err,
                    "packet stream disabled after write failure"
                );
                self.packet_writer = None;
                return;
            }
        }
    }

    /// Maintains the seen-id sets and logs departures (the
    /// vehicle-disappeared cleanup on the bridge side).
    fn track_population(&mut self, vehicles: &[Vehicle]) {
        let current: HashSet<VehicleID> = vehicles.iter().map(|v| v.id.clone()).collect();
        for gone in self.last_seen.difference(&current) {
            log_detailed!(
                EVENT_VEHICLE_GONE,
                "vehicle left the simulation",
                vehicle = gone.as_str()
            );
        }
        for vehicle in vehicles {
            if self.total_seen.insert(vehicle.id.clone()) && vehicle.is_emergency() {
                self.emergency_seen.insert(vehicle.id.clone());
            }
        }
        self.last_seen = current;
    }

    /// Flushes the packet stream. Called once at shutdown.
    pub fn finish(&mut self) -> Result<(), MetricsError> {
        if let Some(writer) = self.packet_writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Builds the final run summary from the accumulated totals.
    pub fn run_summary(
        &self,
        ticks: u64,
        mode: &str,
        faulted_junctions: usize,
        total_events: u64,
    ) -> RunSummary {
        self.accumulator.run_summary(
            ticks,
            self.seed,
            mode,
            faulted_junctions,
            total_events,
            self.total_seen.len(),
            self.emergency_seen.len(),
        )
    }
}
