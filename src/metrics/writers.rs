use crate::bridge::Packet;
use crate::metrics::accumulator::{EpochRecord, RunSummary};
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Error types for metrics persistence. These are never fatal to the run:
/// the session logs them and the accumulators continue.
#[derive(Debug)]
pub enum MetricsError {
    /// Writing a CSV row or flushing failed.
    Io { target: String, details: String },
    /// Serialising the JSON summary failed.
    Serialize { details: String },
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::Io { target, details } => {
                write!(f, "Metrics write to {} failed: {}", target, details)
            }
            MetricsError::Serialize { details } => {
                write!(f, "Summary serialisation failed: {}", details)
            }
        }
    }
}

impl std::error::Error for MetricsError {}

fn io_error(target: &str, err: impl fmt::Display) -> MetricsError {
    MetricsError::Io {
        target: target.to_string(),
        details: err.to_string(),
    }
}

/// Streaming writer for `v2i_packets.csv`.
///
/// Rows are written in attempt order, one per transmission; latency is
/// formatted with millisecond precision to three decimals and left empty
/// for undelivered packets, so the file is byte-reproducible for a fixed
/// seed.
pub struct PacketCsvWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PacketCsvWriter<W> {
    /// Wraps the sink and writes the header row.
    pub fn new(sink: W) -> Result<Self, MetricsError> {
        let mut writer = csv::Writer::from_writer(sink);
        writer
            .write_record(["tick", "tx_id", "rx_id", "link_kind", "delivered", "latency_ms"])
            .map_err(|e| io_error("v2i_packets.csv", e))?;
        Ok(PacketCsvWriter { writer })
    }

    /// Appends one packet row.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<(), MetricsError> {
        let latency = match packet.latency_ms {
            Some(latency) => format!("{:.3}", latency),
            None => String::new(),
        };
        self.writer
            .write_record([
                packet.tick.to_string(),
                packet.tx_id.clone(),
                packet.rx_id.clone(),
                packet.kind.to_string(),
                if packet.delivered { "1" } else { "0" }.to_string(),
                latency,
            ])
            .map_err(|e| io_error("v2i_packets.csv", e))
    }

    pub fn flush(&mut self) -> Result<(), MetricsError> {
        self.writer.flush().map_err(|e| io_error("v2i_packets.csv", e))
    }
}

/// Streaming writer for `v2i_metrics.csv` epoch rollups.
pub struct MetricsCsvWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> MetricsCsvWriter<W> {
    /// Wraps the sink and writes the header row.
    pub fn new(sink: W) -> Result<Self, MetricsError> {
        let mut writer = csv::Writer::from_writer(sink);
        writer
            .write_record([
                "tick",
                "pdr",
                "avg_latency_ms",
                "emergency_pdr",
                "emergency_avg_latency_ms",
                "active_vehicles",
                "emergency_count",
            ])
            .map_err(|e| io_error("v2i_metrics.csv", e))?;
        Ok(MetricsCsvWriter { writer })
    }

    /// Appends one epoch record.
    pub fn write_record(&mut self, record: &EpochRecord) -> Result<(), MetricsError> {
        self.writer
            .write_record([
                record.tick.to_string(),
                format!("{:.4}", record.pdr),
                format!("{:.3}", record.avg_latency_ms),
                format!("{:.4}", record.emergency_pdr),
                format!("{:.3}", record.emergency_avg_latency_ms),
                record.active_vehicles.to_string(),
                record.emergency_count.to_string(),
            ])
            .map_err(|e| io_error("v2i_metrics.csv", e))
    }

    pub fn flush(&mut self) -> Result<(), MetricsError> {
        self.writer.flush().map_err(|e| io_error("v2i_metrics.csv", e))
    }
}

/// Serialises the final run summary as pretty-printed JSON.
pub fn write_summary<W: Write>(sink: &mut W, summary: &RunSummary) -> Result<(), MetricsError> {
    serde_json::to_writer_pretty(&mut *sink, summary).map_err(|e| MetricsError::Serialize {
        details: e.to_string(),
    })?;
    sink.write_all(b"\n")
        .map_err(|e| io_error("integrated_simulation_results.json", e))
}

/// Clonable in-memory sink for capturing writer output in tests and
/// embedders that post-process metrics instead of persisting them.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        SharedBuffer::default()
    }

    /// Snapshot of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().map(|buf| buf.clone()).unwrap_or_default()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.inner.lock() {
            Ok(mut inner) => {
                inner.extend_from_slice(buf);
                Ok(buf.len())
            }
            Err(_) => Err(std::io::Error::other("shared buffer poisoned")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::LinkKind;

    #[test]
    fn test_packet_rows() {
        let buffer = SharedBuffer::new();
        let mut writer = PacketCsvWriter::new(buffer.clone()).unwrap();
        writer
            .write_packet(&Packet {
                tick: 3,
                tx_id: "amb_1".to_string(),
                rx_id: "rsu_J1".to_string(),
                kind: LinkKind::LongRange,
                emergency: true,
                delivered: true,
                latency_ms: Some(17.25),
            })
            .unwrap();
        writer
            .write_packet(&Packet {
                tick: 3,
                tx_id: "veh_2".to_string(),
                rx_id: "veh_3".to_string(),
                kind: LinkKind::ShortRange,
                emergency: false,
                delivered: false,
                latency_ms: None,
            })
            .unwrap();
        writer.flush().unwrap();

        let contents = String::from_utf8(buffer.contents()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "tick,tx_id,rx_id,link_kind,delivered,latency_ms"
        );
        assert_eq!(lines.next().unwrap(), "3,amb_1,rsu_J1,long_range,1,17.250");
        // Undelivered packets record no latency
        assert_eq!(lines.next().unwrap(), "3,veh_2,veh_3,short_range,0,");
    }

    #[test]
    fn test_metrics_rows() {
        let buffer = SharedBuffer::new();
        let mut writer = MetricsCsvWriter::new(buffer.clone()).unwrap();
        writer
            .write_record(&EpochRecord {
                tick: 10,
                pdr: 0.95,
                avg_latency_ms: 24.5,
                emergency_pdr: 1.0,
                emergency_avg_latency_ms: 18.0,
                active_vehicles: 42,
                emergency_count: 1,
            })
            .unwrap();
        writer.flush().unwrap();

        let contents = String::from_utf8(buffer.contents()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "tick,pdr,avg_latency_ms,emergency_pdr,emergency_avg_latency_ms,active_vehicles,emergency_count"
        );
        assert_eq!(lines.next().unwrap(), "10,0.9500,24.500,1.0000,18.000,42,1");
    }

    #[test]
    fn test_summary_shape() {
        use crate::metrics::MetricsAccumulator;
        let accumulator = MetricsAccumulator::new();
        let summary = accumulator.run_summary(10, 7, "density", 0, 0, 0, 0);
        let mut buffer = Vec::new();
        write_summary(&mut buffer, &summary).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert!(parsed["combined"]["overall_pdr"].is_number());
        assert!(parsed["emergency"]["total_events"].is_number());
        assert_eq!(parsed["run"]["seed"], 7);
        assert_eq!(parsed["run"]["mode"], "density");
    }
}
