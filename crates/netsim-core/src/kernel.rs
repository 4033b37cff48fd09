use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use netsim_types::{FlowId, LinkId, NodeId, Packet};
use tracing::debug;

use crate::flow::FlowState;
use crate::link::Link;
use crate::metrics::Metrics;
use crate::node::Node;

#[derive(Debug)]
pub enum EventKind {
    /// The head of a link's queue finishes serialising onto the wire; pop it
    /// and schedule its arrival after the propagation delay.
    StartPropagation { link: LinkId },
    /// A packet finishes propagating and reaches its destination node.
    Deliver {
        link: LinkId,
        packet: Packet,
        to: NodeId,
    },
    /// A flow's retransmission timer for one packet id fires.
    Timeout { flow: FlowId, packet_id: u64 },
    /// A delay-based flow's periodic window recomputation fires.
    WindowUpdate { flow: FlowId },
    /// A router's periodic distance-vector re-evaluation fires.
    RoutingCycle { router: NodeId },
    /// A flow begins sending at its configured start time.
    FlowStart { flow: FlowId },
}

struct Event {
    time: f64,
    seq: u64,
    kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the smallest time first.
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Owns the virtual clock, the event queue, and every node/link/flow in the
/// simulation. There is exactly one `Kernel` per run and it is the sole
/// owner of everything: nodes, links and flows hold no references to each
/// other, only ids resolved back through the kernel's maps.
pub struct Kernel {
    cur_time: f64,
    queue: BinaryHeap<Event>,
    seq: u64,
    active_flows: usize,

    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) links: HashMap<LinkId, Link>,
    pub(crate) flows: HashMap<FlowId, FlowState>,
    pub(crate) metrics: Box<dyn Metrics>,
}

impl Kernel {
    pub fn new(metrics: Box<dyn Metrics>) -> Self {
        Self {
            cur_time: 0.0,
            queue: BinaryHeap::new(),
            seq: 0,
            active_flows: 0,
            nodes: HashMap::new(),
            links: HashMap::new(),
            flows: HashMap::new(),
            metrics,
        }
    }

    pub fn current_time(&self) -> f64 {
        self.cur_time
    }

    pub fn active_flows(&self) -> usize {
        self.active_flows
    }

    pub fn remaining_events(&self) -> usize {
        self.queue.len()
    }

    pub fn metrics(&self) -> &dyn Metrics {
        self.metrics.as_ref()
    }

    pub(crate) fn register_flow(&mut self) {
        self.active_flows += 1;
    }

    pub(crate) fn complete_flow(&mut self) {
        assert!(self.active_flows > 0, "completing a flow with none active");
        self.active_flows -= 1;
    }

    /// Schedule `kind` to fire `delay` seconds from now. `delay` must be
    /// non-negative: a negative delay is a programming error, not a
    /// recoverable condition.
    pub(crate) fn schedule(&mut self, delay: f64, kind: EventKind) {
        assert!(delay >= 0.0, "scheduled event with negative delay");
        let time = self.cur_time + delay;
        self.queue.push(Event {
            time,
            seq: self.seq,
            kind,
        });
        self.seq += 1;
    }

    /// Process exactly one event. Returns `false` once the queue is empty.
    pub fn step(&mut self) -> bool {
        let event = match self.queue.pop() {
            Some(e) => e,
            None => return false,
        };
        self.cur_time = event.time;
        debug!(time = self.cur_time, kind = ?event.kind_name(), "dispatching event");

        match event.kind {
            EventKind::StartPropagation { link } => self.handle_start_propagation(link),
            EventKind::Deliver { link, packet, to } => self.handle_deliver(link, packet, to),
            EventKind::Timeout { flow, packet_id } => self.handle_timeout(flow, packet_id),
            EventKind::WindowUpdate { flow } => self.handle_window_update(flow),
            EventKind::RoutingCycle { router } => self.handle_routing_cycle(router),
            EventKind::FlowStart { flow } => self.handle_flow_start(flow),
        }
        true
    }

    /// Run until the queue drains, `active_flows` reaches zero, or virtual
    /// time reaches `until` (if given).
    pub fn run(&mut self, until: Option<f64>) {
        loop {
            if self.active_flows == 0 {
                break;
            }
            if let Some(until) = until {
                match self.queue.peek() {
                    Some(e) if e.time > until => break,
                    None => break,
                    _ => {}
                }
            }
            if !self.step() {
                break;
            }
        }
    }
}

impl Event {
    fn kind_name(&self) -> &'static str {
        match &self.kind {
            EventKind::StartPropagation { .. } => "start_propagation",
            EventKind::Deliver { .. } => "deliver",
            EventKind::Timeout { .. } => "timeout",
            EventKind::WindowUpdate { .. } => "window_update",
            EventKind::RoutingCycle { .. } => "routing_cycle",
            EventKind::FlowStart { .. } => "flow_start",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NullMetrics;

    #[test]
    fn events_at_equal_time_fire_in_schedule_order() {
        let mut k = Kernel::new(Box::new(NullMetrics));
        k.register_flow();
        // Two events at the same virtual time must pop in insertion order.
        k.schedule(1.0, EventKind::RoutingCycle { router: "R1".into() });
        k.schedule(1.0, EventKind::RoutingCycle { router: "R2".into() });
        let first = k.queue.pop().unwrap();
        let second = k.queue.pop().unwrap();
        assert!(matches!(
            first.kind,
            EventKind::RoutingCycle { router } if router == NodeId::from("R1")
        ));
        assert!(matches!(
            second.kind,
            EventKind::RoutingCycle { router } if router == NodeId::from("R2")
        ));
    }

    #[test]
    fn negative_delay_panics() {
        let mut k = Kernel::new(Box::new(NullMetrics));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            k.schedule(-1.0, EventKind::RoutingCycle { router: "R1".into() });
        }));
        assert!(result.is_err());
    }
}
