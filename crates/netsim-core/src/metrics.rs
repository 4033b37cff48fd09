use std::any::Any;
use std::collections::HashMap;

use netsim_types::{FlowId, LinkId};
use serde::Serialize;

/// Passive observer over simulated outcomes. Every method is a pure append:
/// nothing a `Metrics` implementation does may feed back into the
/// simulation, matching the split between `SystemContext`-style student
/// calls and how the simulator happens to record them.
pub trait Metrics: Send {
    fn record_buffer_occupancy(&mut self, _link: &LinkId, _packets: usize, _t: f64) {}
    fn record_packet_loss(&mut self, _link: &LinkId, _t: f64) {}
    fn record_link_rate(&mut self, _link: &LinkId, _bits: u64, _t: f64) {}
    fn record_flow_rate(&mut self, _flow: &FlowId, _bits: u64, _t: f64) {}
    fn record_window_size(&mut self, _flow: &FlowId, _w: f64, _t: f64) {}
    fn record_rtt(&mut self, _flow: &FlowId, _rtt: f64, _t: f64) {}

    /// Lets a caller downcast back to a concrete sink (e.g. the CLI pulling
    /// an `InMemoryMetrics` report out of a finished `Kernel`).
    fn as_any(&self) -> &dyn Any;
}

/// Discards everything. The default for unit tests that don't care about
/// recorded series.
pub struct NullMetrics;

impl Metrics for NullMetrics {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Appends every sample to an in-memory, time-indexed series keyed by name,
/// serializable as-is for a CLI JSON report.
#[derive(Default, Serialize)]
pub struct InMemoryMetrics {
    pub buffer_occupancy: HashMap<String, Vec<(f64, usize)>>,
    pub packet_loss: HashMap<String, Vec<f64>>,
    pub link_rate: HashMap<String, Vec<(f64, u64)>>,
    pub flow_rate: HashMap<String, Vec<(f64, u64)>>,
    pub window_size: HashMap<String, Vec<(f64, f64)>>,
    pub rtt: HashMap<String, Vec<(f64, f64)>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metrics for InMemoryMetrics {
    fn record_buffer_occupancy(&mut self, link: &LinkId, packets: usize, t: f64) {
        self.buffer_occupancy
            .entry(link.to_string())
            .or_default()
            .push((t, packets));
    }

    fn record_packet_loss(&mut self, link: &LinkId, t: f64) {
        self.packet_loss.entry(link.to_string()).or_default().push(t);
    }

    fn record_link_rate(&mut self, link: &LinkId, bits: u64, t: f64) {
        self.link_rate
            .entry(link.to_string())
            .or_default()
            .push((t, bits));
    }

    fn record_flow_rate(&mut self, flow: &FlowId, bits: u64, t: f64) {
        self.flow_rate
            .entry(flow.to_string())
            .or_default()
            .push((t, bits));
    }

    fn record_window_size(&mut self, flow: &FlowId, w: f64, t: f64) {
        self.window_size
            .entry(flow.to_string())
            .or_default()
            .push((t, w));
    }

    fn record_rtt(&mut self, flow: &FlowId, rtt: f64, t: f64) {
        self.rtt.entry(flow.to_string()).or_default().push((t, rtt));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_metrics_accumulate_series() {
        let mut m = InMemoryMetrics::new();
        let link = LinkId::from("L1");
        m.record_buffer_occupancy(&link, 3, 0.0);
        m.record_buffer_occupancy(&link, 4, 0.1);
        assert_eq!(m.buffer_occupancy["L1"], vec![(0.0, 3), (0.1, 4)]);
    }
}
