use thiserror::Error;

use crate::packet::{LinkId, NodeId};

/// Configuration-time failures: a malformed or inconsistent topology file.
/// These are fatal at load time and are never produced once a `Kernel` is
/// running.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("link {link} refers to unknown node {node}")]
    UnknownNode { link: LinkId, node: NodeId },

    #[error("node {node} refers to unknown link {link}")]
    UnknownLink { node: NodeId, link: LinkId },

    #[error("flow {flow} refers to unknown host {node}")]
    UnknownHost { flow: String, node: NodeId },

    #[error("link {link} must have exactly two endpoints, got {count}")]
    LinkEndpointCount { link: LinkId, count: usize },

    #[error("{field} on {item} must be positive, got {value}")]
    NonPositiveField {
        item: String,
        field: &'static str,
        value: f64,
    },

    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    #[error("duplicate link id {0}")]
    DuplicateLink(LinkId),

    #[error("failed to parse topology JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read topology file: {0}")]
    Io(#[from] std::io::Error),
}
