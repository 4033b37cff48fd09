use serde::{Deserialize, Serialize};
use std::fmt;

/// Flat string namespace for node identity. Wrapped rather than a bare
/// `String` so a host id and a router id can't be silently swapped at a
/// call site that expects one or the other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub String);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LinkId {
    fn from(s: &str) -> Self {
        LinkId(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowId(pub u64);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketKind {
    Data,
    Ack,
    Routing,
}

/// A single packet in flight. Immutable once created; a retransmission is a
/// fresh `Packet` with the same `packet_id` and `flow_id`, not a mutation of
/// the original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    pub packet_id: u64,
    pub flow_id: FlowId,
    pub src: NodeId,
    pub dest: NodeId,
    pub size_bits: u64,
    /// Virtual time at which the packet was originally emitted by its
    /// sender. For an ack, this is copied from the data packet being
    /// acknowledged so the sender can recover its rtt.
    pub timestamp: f64,
    pub kind: PacketKind,
    /// Present only for `PacketKind::Routing`: the advertising router's
    /// current routing table, `dest -> (via_link, cost)`.
    pub routing_table: Option<Vec<(NodeId, LinkId, f64)>>,
}

impl Packet {
    pub fn new_data(
        packet_id: u64,
        flow_id: FlowId,
        src: NodeId,
        dest: NodeId,
        size_bits: u64,
        timestamp: f64,
    ) -> Self {
        Self {
            packet_id,
            flow_id,
            src,
            dest,
            size_bits,
            timestamp,
            kind: PacketKind::Data,
            routing_table: None,
        }
    }

    pub fn new_ack(
        packet_id: u64,
        flow_id: FlowId,
        src: NodeId,
        dest: NodeId,
        size_bits: u64,
        timestamp: f64,
    ) -> Self {
        Self {
            packet_id,
            flow_id,
            src,
            dest,
            size_bits,
            timestamp,
            kind: PacketKind::Ack,
            routing_table: None,
        }
    }

    pub fn new_routing(
        flow_id: FlowId,
        src: NodeId,
        dest: NodeId,
        size_bits: u64,
        timestamp: f64,
        routing_table: Vec<(NodeId, LinkId, f64)>,
    ) -> Self {
        Self {
            packet_id: 0,
            flow_id,
            src,
            dest,
            size_bits,
            timestamp,
            kind: PacketKind::Routing,
            routing_table: Some(routing_table),
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self.kind, PacketKind::Ack)
    }

    pub fn is_routing(&self) -> bool {
        matches!(self.kind, PacketKind::Routing)
    }
}
