use std::collections::HashSet;
use std::fs;
use std::path::Path;

use netsim_core::{DelayPolicy, InMemoryMetrics, Kernel, Link, Metrics, RenoPolicy};
use netsim_types::config::units::{kb_to_bits, mb_to_bits, mbps_to_bps, ms_to_s};
use netsim_types::{FlowId, LinkId, NodeId, Protocol, TopologyError, TopologySpec};
use tracing::info;

/// Load a JSON topology file and build a fully wired `Kernel` from it,
/// using `InMemoryMetrics` as the observer. Fails with a `TopologyError`
/// before any `Kernel` state is touched if validation finds a problem.
pub fn load_topology_file(path: &Path) -> Result<Kernel, TopologyError> {
    let content = fs::read_to_string(path)?;
    load_topology_str(&content)
}

pub fn load_topology_str(content: &str) -> Result<Kernel, TopologyError> {
    let spec: TopologySpec = serde_json::from_str(content)?;
    build_kernel(spec, Box::new(InMemoryMetrics::new()))
}

/// Build a `Kernel` from an already-parsed topology, with a caller-supplied
/// metrics sink (the CLI uses `InMemoryMetrics`; tests often use
/// `NullMetrics`).
pub fn build_kernel(spec: TopologySpec, metrics: Box<dyn Metrics>) -> Result<Kernel, TopologyError> {
    validate(&spec)?;

    let net = spec.network;
    let mut kernel = Kernel::new(metrics);

    for host in &net.hosts {
        kernel.add_host(NodeId::from(host.id.as_str()));
    }
    for router in &net.routers {
        kernel.add_router(NodeId::from(router.id.as_str()));
    }

    for link in &net.links {
        let capacity_bps = mbps_to_bps(link.rate);
        let prop_delay_s = ms_to_s(link.delay);
        let max_buffer_bits = kb_to_bits(link.buffer_size);
        let (a, b) = &link.nodes;
        kernel.add_link(Link::new(
            LinkId::from(link.id.as_str()),
            capacity_bps,
            prop_delay_s,
            max_buffer_bits,
            (NodeId::from(a.as_str()), NodeId::from(b.as_str())),
        ));
    }

    for host in &net.hosts {
        kernel.attach_host_link(&NodeId::from(host.id.as_str()), LinkId::from(host.link.as_str()));
    }
    for router in &net.routers {
        let node_id = NodeId::from(router.id.as_str());
        for link_id in &router.links {
            kernel.attach_router_link(&node_id, LinkId::from(link_id.as_str()));
        }
    }
    for router in &net.routers {
        kernel.start_routing(NodeId::from(router.id.as_str()));
    }

    for (idx, flow) in net.flows.iter().enumerate() {
        let flow_id = FlowId(idx as u64 + 1);
        let total_bits = mb_to_bits(flow.data_amt);
        let policy: Box<dyn netsim_core::CongestionPolicy> = match flow.protocol {
            Protocol::Reno => Box::new(RenoPolicy::new()),
            Protocol::FastDelay => Box::new(DelayPolicy::new()),
        };
        info!(flow = %flow.id, protocol = ?flow.protocol, "loaded flow");
        kernel.add_flow(
            flow_id,
            NodeId::from(flow.src.as_str()),
            NodeId::from(flow.dest.as_str()),
            total_bits,
            flow.starting_time,
            policy,
        );
    }

    Ok(kernel)
}

fn validate(spec: &TopologySpec) -> Result<(), TopologyError> {
    let net = &spec.network;
    let mut node_ids: HashSet<&str> = HashSet::new();
    let mut link_ids: HashSet<&str> = HashSet::new();

    for host in &net.hosts {
        if !node_ids.insert(host.id.as_str()) {
            return Err(TopologyError::DuplicateNode(NodeId::from(host.id.as_str())));
        }
    }
    for router in &net.routers {
        if !node_ids.insert(router.id.as_str()) {
            return Err(TopologyError::DuplicateNode(NodeId::from(router.id.as_str())));
        }
    }

    for link in &net.links {
        if !link_ids.insert(link.id.as_str()) {
            return Err(TopologyError::DuplicateLink(LinkId::from(link.id.as_str())));
        }
        let (a, b) = &link.nodes;
        if a == b {
            return Err(TopologyError::LinkEndpointCount {
                link: LinkId::from(link.id.as_str()),
                count: 1,
            });
        }
        for node in [a.as_str(), b.as_str()] {
            if !node_ids.contains(node) {
                return Err(TopologyError::UnknownNode {
                    link: LinkId::from(link.id.as_str()),
                    node: NodeId::from(node),
                });
            }
        }
        for (field, value) in [
            ("buffer_size", link.buffer_size),
            ("delay", link.delay),
            ("rate", link.rate),
        ] {
            if value <= 0.0 {
                return Err(TopologyError::NonPositiveField {
                    item: link.id.clone(),
                    field,
                    value,
                });
            }
        }
    }

    for host in &net.hosts {
        if !link_ids.contains(host.link.as_str()) {
            return Err(TopologyError::UnknownLink {
                node: NodeId::from(host.id.as_str()),
                link: LinkId::from(host.link.as_str()),
            });
        }
    }
    for router in &net.routers {
        for link_id in &router.links {
            if !link_ids.contains(link_id.as_str()) {
                return Err(TopologyError::UnknownLink {
                    node: NodeId::from(router.id.as_str()),
                    link: LinkId::from(link_id.as_str()),
                });
            }
        }
    }

    for flow in &net.flows {
        for node in [flow.src.as_str(), flow.dest.as_str()] {
            if !node_ids.contains(node) {
                return Err(TopologyError::UnknownHost {
                    flow: flow.id.clone(),
                    node: NodeId::from(node),
                });
            }
        }
        if flow.data_amt <= 0.0 {
            return Err(TopologyError::NonPositiveField {
                item: flow.id.clone(),
                field: "data_amt",
                value: flow.data_amt,
            });
        }
        if flow.starting_time < 0.0 {
            return Err(TopologyError::NonPositiveField {
                item: flow.id.clone(),
                field: "starting_time",
                value: flow.starting_time,
            });
        }
    }

    Ok(())
}
