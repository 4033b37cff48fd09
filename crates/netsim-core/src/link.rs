use std::collections::VecDeque;

use netsim_types::{LinkId, NodeId, Packet};
use tracing::{debug, trace, warn};

use crate::kernel::{EventKind, Kernel};

/// A full-duplex point-to-point channel. Packets queued toward either
/// endpoint share one FIFO (see DESIGN.md, Open Question decision 1): the
/// simplification this spec makes is a single transmitter serving both
/// directions rather than two independent per-direction queues.
pub struct Link {
    pub id: LinkId,
    pub capacity_bps: f64,
    pub prop_delay_s: f64,
    pub max_buffer_bits: f64,
    pub endpoints: (NodeId, NodeId),

    queue: VecDeque<(Packet, NodeId)>,
    buffered_bits: f64,
}

impl Link {
    pub fn new(
        id: LinkId,
        capacity_bps: f64,
        prop_delay_s: f64,
        max_buffer_bits: f64,
        endpoints: (NodeId, NodeId),
    ) -> Self {
        Self {
            id,
            capacity_bps,
            prop_delay_s,
            max_buffer_bits,
            endpoints,
            queue: VecDeque::new(),
            buffered_bits: 0.0,
        }
    }

    pub fn buffered_bits(&self) -> f64 {
        self.buffered_bits
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn other_endpoint(&self, from: &NodeId) -> NodeId {
        let (a, b) = &self.endpoints;
        if from == a {
            b.clone()
        } else if from == b {
            a.clone()
        } else {
            panic!("packet enqueued on link {} from non-endpoint {}", self.id, from);
        }
    }

    /// Current per-bit queueing delay contribution used by the router cost
    /// function: bits buffered divided by capacity.
    pub fn queueing_delay_s(&self) -> f64 {
        self.buffered_bits / self.capacity_bps
    }
}

impl Kernel {
    /// Attempt to enqueue `packet` from `from` onto `link_id`, heading to the
    /// link's other endpoint. Drops the packet on buffer overflow.
    pub fn link_enqueue(&mut self, link_id: LinkId, packet: Packet, from: NodeId) {
        let link = self
            .links
            .get_mut(&link_id)
            .unwrap_or_else(|| panic!("enqueue onto unknown link {}", link_id));
        let dest = link.other_endpoint(&from);

        if link.buffered_bits + packet.size_bits as f64 > link.max_buffer_bits {
            warn!(link = %link_id, packet_id = packet.packet_id, "dropping packet: buffer full");
            self.metrics.record_packet_loss(&link_id, self.current_time());
            return;
        }

        link.buffered_bits += packet.size_bits as f64;
        let occupancy_packets = link.queue.len() + 1;
        self.metrics
            .record_buffer_occupancy(&link_id, occupancy_packets, self.current_time());

        let was_empty = link.queue.is_empty();
        link.queue.push_back((packet, dest));
        if was_empty {
            self.begin_transmission(link_id);
        }
    }

    fn begin_transmission(&mut self, link_id: LinkId) {
        let link = self.links.get(&link_id).expect("link vanished");
        let (packet, _) = link.queue.front().expect("begin_transmission on empty link");
        let serialize_delay = packet.size_bits as f64 / link.capacity_bps;
        self.schedule(serialize_delay, EventKind::StartPropagation { link: link_id });
    }

    pub(crate) fn handle_start_propagation(&mut self, link_id: LinkId) {
        let (packet, dest, prop_delay, remaining, occupancy_packets) = {
            let link = self.links.get_mut(&link_id).expect("link vanished");
            let (packet, dest) = link
                .queue
                .pop_front()
                .expect("start_propagation on empty link");
            link.buffered_bits -= packet.size_bits as f64;
            let remaining = !link.queue.is_empty();
            (packet, dest, link.prop_delay_s, remaining, link.queue.len())
        };

        self.metrics
            .record_buffer_occupancy(&link_id, occupancy_packets, self.current_time());

        trace!(link = %link_id, packet_id = packet.packet_id, "propagating packet");
        self.schedule(
            prop_delay,
            EventKind::Deliver {
                link: link_id.clone(),
                packet,
                to: dest,
            },
        );

        if remaining {
            self.begin_transmission(link_id);
        }
    }

    pub(crate) fn handle_deliver(&mut self, link_id: LinkId, packet: Packet, to: NodeId) {
        self.metrics
            .record_link_rate(&link_id, packet.size_bits, self.current_time());
        debug!(link = %link_id, to = %to, packet_id = packet.packet_id, kind = ?packet.kind, "packet delivered");
        self.dispatch_to_node(to, link_id, packet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NullMetrics;
    use netsim_types::FlowId;

    fn make_kernel() -> Kernel {
        let mut k = Kernel::new(Box::new(NullMetrics));
        let link = Link::new(
            "L1".into(),
            1_000_000.0,
            0.01,
            8192.0,
            ("A".into(), "B".into()),
        );
        k.links.insert("L1".into(), link);
        k.nodes.insert("A".into(), crate::node::Node::Host(crate::node::host::Host::new("A".into())));
        k.nodes.insert("B".into(), crate::node::Node::Host(crate::node::host::Host::new("B".into())));
        k
    }

    fn data_packet(id: u64, size_bits: u64) -> Packet {
        Packet::new_data(id, FlowId(0), "A".into(), "B".into(), size_bits, 0.0)
    }

    #[test]
    fn buffer_exactly_full_is_accepted() {
        let mut k = make_kernel();
        k.link_enqueue("L1".into(), data_packet(0, 8192), "A".into());
        let link = &k.links["L1"];
        assert_eq!(link.queue_len(), 1);
    }

    #[test]
    fn one_bit_over_capacity_is_dropped() {
        let mut k = make_kernel();
        k.link_enqueue("L1".into(), data_packet(0, 8193), "A".into());
        let link = &k.links["L1"];
        assert_eq!(link.queue_len(), 0);
        assert_eq!(link.buffered_bits(), 0.0);
    }

    #[test]
    fn second_packet_queues_behind_first() {
        let mut k = make_kernel();
        k.link_enqueue("L1".into(), data_packet(0, 4096), "A".into());
        k.link_enqueue("L1".into(), data_packet(1, 4096), "A".into());
        let link = &k.links["L1"];
        assert_eq!(link.queue_len(), 2);
        assert_eq!(link.buffered_bits(), 8192.0);
    }

    #[test]
    #[should_panic(expected = "non-endpoint")]
    fn enqueue_from_non_endpoint_panics() {
        let mut k = make_kernel();
        k.link_enqueue("L1".into(), data_packet(0, 100), "C".into());
    }

    #[test]
    fn full_pipeline_delivers_packet() {
        let mut k = make_kernel();
        k.link_enqueue("L1".into(), data_packet(0, 8192), "A".into());
        // StartPropagation, Deliver. A host with no matching flow will panic
        // on delivery of a Data packet to an unregistered flow, which is
        // expected here -- so only drive the transmission half.
        assert!(k.step());
        let link = &k.links["L1"];
        assert_eq!(link.queue_len(), 0);
        assert_eq!(k.remaining_events(), 1); // the pending Deliver
    }
}
