use crate::radio::LinkKind;
use std::fmt;

/// One attempted transmission, V2V or V2I. Transient: the bridge keeps the
/// current tick's packets only until their metrics are aggregated and the
/// CSV row is streamed out.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Tick the packet was emitted.
    pub tick: u64,
    /// Transmitting vehicle.
    pub tx_id: String,
    /// Receiving vehicle or RSU.
    pub rx_id: String,
    pub kind: LinkKind,
    /// Whether the transmitter is an emergency vehicle.
    pub emergency: bool,
    pub delivered: bool,
    /// Present exactly when delivered.
    pub latency_ms: Option<f64>,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[tick {} {} -> {} via {}: {}]",
            self.tick,
            self.tx_id,
            self.rx_id,
            self.kind,
            if self.delivered { "delivered" } else { "lost" }
        )
    }
}
