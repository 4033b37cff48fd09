use std::collections::HashSet;

use netsim_types::{FlowId, LinkId, NodeId, Packet, PacketKind};

use crate::kernel::Kernel;
use crate::node::Node;

/// A single-link endpoint that owns a set of flows. Data-plane logic lives
/// on `Kernel` (see `Kernel::dispatch_to_node`); this struct is just the
/// node's attachment state.
pub struct Host {
    pub node_id: NodeId,
    pub link: Option<LinkId>,
    pub flows: HashSet<FlowId>,
}

impl Host {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            link: None,
            flows: HashSet::new(),
        }
    }
}

impl Kernel {
    pub fn add_host(&mut self, node_id: NodeId) {
        self.nodes
            .insert(node_id.clone(), Node::Host(Host::new(node_id)));
    }

    pub fn attach_host_link(&mut self, node_id: &NodeId, link_id: LinkId) {
        match self.nodes.get_mut(node_id) {
            Some(Node::Host(h)) => h.link = Some(link_id),
            _ => panic!("attach_host_link: {} is not a host", node_id),
        }
    }

    pub fn add_link(&mut self, link: crate::link::Link) {
        let id = link.id.clone();
        self.links.insert(id, link);
    }

    pub fn register_flow_on_host(&mut self, node_id: &NodeId, flow_id: FlowId) {
        match self.nodes.get_mut(node_id) {
            Some(Node::Host(h)) => {
                h.flows.insert(flow_id);
            }
            _ => panic!("register_flow_on_host: {} is not a host", node_id),
        }
    }

    /// Route a delivered packet to its destination node: a host dispatches
    /// it to the owning flow, a router either forwards it or folds it into
    /// the routing control plane.
    pub(crate) fn dispatch_to_node(&mut self, to: NodeId, via_link: LinkId, packet: Packet) {
        let node = self
            .nodes
            .get(&to)
            .unwrap_or_else(|| panic!("packet delivered to unknown node {}", to));

        match node {
            Node::Host(host) => {
                assert!(
                    host.flows.contains(&packet.flow_id),
                    "host {} received packet for unknown flow {}",
                    to,
                    packet.flow_id
                );
                assert_eq!(
                    packet.dest, to,
                    "packet delivered to host {} addressed elsewhere",
                    to
                );
                match packet.kind {
                    PacketKind::Data => self.flow_receive_data(packet),
                    PacketKind::Ack => self.flow_receive_ack(packet),
                    PacketKind::Routing => {
                        panic!("host {} received a routing packet", to)
                    }
                }
            }
            Node::Router(_) => {
                if packet.is_routing() {
                    self.router_receive_routing_packet(to, via_link, packet);
                } else {
                    self.router_forward(to, packet);
                }
            }
        }
    }
}
