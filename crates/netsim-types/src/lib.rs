pub mod config;
pub mod error;
pub mod packet;
pub mod topology;

pub use config::{ALPHA, GAMMA, REROUTE_PERIOD_S, TIMEOUT_DELAY_S, WINDOW_UPDATE_PERIOD_S};
pub use error::TopologyError;
pub use packet::{FlowId, LinkId, NodeId, Packet, PacketKind};
pub use topology::{FlowSpec, HostSpec, LinkSpec, NetworkSpec, Protocol, RouterSpec, TopologySpec};
