use std::collections::HashMap;

use netsim_types::config::REROUTE_PERIOD_S;
use netsim_types::{FlowId, LinkId, NodeId, Packet, PacketKind};
use tracing::{debug, info};

use crate::kernel::{EventKind, Kernel};
use crate::node::Node;

const INFINITY: f64 = f64::INFINITY;

/// Distance-vector routing state for one router. Data-plane forwarding and
/// the control-plane cycle both live on `Kernel` (this struct is the
/// per-node table storage only), mirroring the split used for `Host`.
pub struct Router {
    pub node_id: NodeId,
    pub links: Vec<LinkId>,
    /// `dest -> (chosen outgoing link, total cost)`.
    pub routing_table: HashMap<NodeId, (LinkId, f64)>,
    /// `dest -> (link -> tentative cost via that link)`.
    pub cost_table: HashMap<NodeId, HashMap<LinkId, f64>>,
    /// Last computed cost of each adjacent link.
    pub adj_link_costs: HashMap<LinkId, f64>,
    first_cycle: bool,
}

impl Router {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            links: Vec::new(),
            routing_table: HashMap::new(),
            cost_table: HashMap::new(),
            adj_link_costs: HashMap::new(),
            first_cycle: true,
        }
    }
}

impl Kernel {
    pub fn add_router(&mut self, node_id: NodeId) {
        self.nodes
            .insert(node_id.clone(), Node::Router(Router::new(node_id)));
    }

    /// Attach `link_id` to router `node_id`. Seeds `adj_link_costs` from the
    /// link's static propagation delay so a routing packet arriving before
    /// this router's own first control-plane cycle still has a well-defined
    /// adjacency cost to add.
    pub fn attach_router_link(&mut self, node_id: &NodeId, link_id: LinkId) {
        let prop_delay = self
            .links
            .get(&link_id)
            .unwrap_or_else(|| panic!("attach_router_link: unknown link {}", link_id))
            .prop_delay_s;

        let router = match self.nodes.get_mut(node_id) {
            Some(Node::Router(r)) => r,
            _ => panic!("attach_router_link: {} is not a router", node_id),
        };
        router.links.push(link_id.clone());
        router.adj_link_costs.insert(link_id, prop_delay);
    }

    pub fn start_routing(&mut self, node_id: NodeId) {
        self.schedule(0.0, EventKind::RoutingCycle { router: node_id });
    }

    /// Take `link_id` out of router `node_id`'s adjacency, as if the
    /// physical link had gone down: drops it from `links` and
    /// `adj_link_costs`, drops any learned distance-vector entry that was
    /// reached via it, then forces an immediate routing-table recompute and
    /// re-advertises if the table changed. Does not touch the `Link` itself
    /// or the other endpoint's adjacency; call this on both routers of a
    /// removed link to model it going down symmetrically.
    pub fn disable_router_link(&mut self, node_id: &NodeId, link_id: &LinkId) {
        {
            let router = match self.nodes.get_mut(node_id) {
                Some(Node::Router(r)) => r,
                _ => panic!("disable_router_link: {} is not a router", node_id),
            };
            router.links.retain(|l| l != link_id);
            router.adj_link_costs.remove(link_id);
            for costs in router.cost_table.values_mut() {
                costs.remove(link_id);
            }
        }
        self.recompute_routing_table(node_id);
        self.send_routing_packets(node_id);
    }

    /// Current chosen next hop for `dest` at router `node_id`, if known.
    pub fn router_route(&self, node_id: &NodeId, dest: &NodeId) -> Option<(LinkId, f64)> {
        match self.nodes.get(node_id) {
            Some(Node::Router(r)) => r.routing_table.get(dest).cloned(),
            _ => None,
        }
    }

    fn cost_of_link(&self, link_id: &LinkId) -> f64 {
        let link = &self.links[link_id];
        link.prop_delay_s
            + link.prop_delay_s * link.queue_len() as f64
            + link.buffered_bits() / link.capacity_bps
    }

    fn neighbour_via(&self, node_id: &NodeId, link_id: &LinkId) -> NodeId {
        let link = &self.links[link_id];
        let (a, b) = &link.endpoints;
        if a == node_id {
            b.clone()
        } else {
            a.clone()
        }
    }

    fn is_router(&self, node_id: &NodeId) -> bool {
        matches!(self.nodes.get(node_id), Some(Node::Router(_)))
    }

    pub(crate) fn handle_routing_cycle(&mut self, node_id: NodeId) {
        let links: Vec<LinkId> = match self.nodes.get(&node_id) {
            Some(Node::Router(r)) => r.links.clone(),
            _ => panic!("routing cycle fired for non-router {}", node_id),
        };

        let new_costs: HashMap<LinkId, f64> = links
            .iter()
            .map(|l| (l.clone(), self.cost_of_link(l)))
            .collect();

        {
            let router = match self.nodes.get_mut(&node_id) {
                Some(Node::Router(r)) => r,
                _ => unreachable!(),
            };

            if router.first_cycle {
                for link_id in &links {
                    let neighbour = {
                        let link = &self.links[link_id];
                        let (a, b) = &link.endpoints;
                        if *a == node_id { b.clone() } else { a.clone() }
                    };
                    router
                        .cost_table
                        .entry(neighbour)
                        .or_default()
                        .insert(link_id.clone(), new_costs[link_id]);
                }
                router.first_cycle = false;
            } else {
                for costs in router.cost_table.values_mut() {
                    for (link_id, cost) in costs.iter_mut() {
                        if let Some(&new_cost) = new_costs.get(link_id) {
                            let delta = new_cost - router.adj_link_costs[link_id];
                            *cost += delta;
                        }
                    }
                }
            }
            router.adj_link_costs = new_costs;
        }

        self.recompute_routing_table(&node_id);
        self.send_routing_packets(&node_id);

        self.schedule(REROUTE_PERIOD_S, EventKind::RoutingCycle { router: node_id });
    }

    fn recompute_routing_table(&mut self, node_id: &NodeId) -> bool {
        let router = match self.nodes.get_mut(node_id) {
            Some(Node::Router(r)) => r,
            _ => unreachable!(),
        };

        let mut new_table: HashMap<NodeId, (LinkId, f64)> = HashMap::new();
        for (dest, costs) in &router.cost_table {
            if dest == node_id {
                continue;
            }
            let mut best: Option<(LinkId, f64)> = None;
            for (link_id, cost) in costs {
                if *cost == INFINITY {
                    continue;
                }
                best = match best {
                    None => Some((link_id.clone(), *cost)),
                    Some((best_link, best_cost)) => {
                        if *cost < best_cost || (*cost == best_cost && *link_id < best_link) {
                            Some((link_id.clone(), *cost))
                        } else {
                            Some((best_link, best_cost))
                        }
                    }
                };
            }
            if let Some(entry) = best {
                new_table.insert(dest.clone(), entry);
            }
        }

        let changed = new_table != router.routing_table;
        if changed {
            info!(router = %node_id, "routing table changed");
        }
        router.routing_table = new_table;
        changed
    }

    fn send_routing_packets(&mut self, node_id: &NodeId) {
        let (links, snapshot): (Vec<LinkId>, Vec<(NodeId, LinkId, f64)>) = match self.nodes.get(node_id)
        {
            Some(Node::Router(r)) => (
                r.links.clone(),
                r.routing_table
                    .iter()
                    .map(|(dest, (link, cost))| (dest.clone(), link.clone(), *cost))
                    .collect(),
            ),
            _ => unreachable!(),
        };

        for link_id in links {
            let neighbour = self.neighbour_via(node_id, &link_id);
            if !self.is_router(&neighbour) {
                continue;
            }
            let size = netsim_types::config::ROUTING_SIZE_BITS;
            let packet = Packet::new_routing(
                FlowId(0),
                node_id.clone(),
                neighbour,
                size,
                self.current_time(),
                snapshot.clone(),
            );
            debug!(router = %node_id, link = %link_id, "sending routing packet");
            self.link_enqueue(link_id, packet, node_id.clone());
        }
    }

    pub(crate) fn router_receive_routing_packet(
        &mut self,
        node_id: NodeId,
        via_link: LinkId,
        packet: Packet,
    ) {
        let payload = packet
            .routing_table
            .expect("routing packet without a routing table payload");
        let adj_cost = {
            let router = match self.nodes.get(&node_id) {
                Some(Node::Router(r)) => r,
                _ => panic!("routing packet delivered to non-router {}", node_id),
            };
            router.adj_link_costs[&via_link]
        };

        {
            let router = match self.nodes.get_mut(&node_id) {
                Some(Node::Router(r)) => r,
                _ => unreachable!(),
            };
            for (dest, sender_link, sender_cost) in payload {
                if dest == node_id {
                    continue;
                }
                // Poison reverse: the sender reaches `dest` through us.
                let effective_cost = if sender_link == via_link {
                    INFINITY
                } else {
                    sender_cost + adj_cost
                };
                router
                    .cost_table
                    .entry(dest)
                    .or_default()
                    .insert(via_link.clone(), effective_cost);
            }
        }

        if self.recompute_routing_table(&node_id) {
            self.send_routing_packets(&node_id);
        }
    }

    pub(crate) fn router_forward(&mut self, node_id: NodeId, packet: Packet) {
        let link_id = {
            let router = match self.nodes.get(&node_id) {
                Some(Node::Router(r)) => r,
                _ => panic!("forward requested at non-router {}", node_id),
            };
            router
                .routing_table
                .get(&packet.dest)
                .unwrap_or_else(|| {
                    panic!(
                        "router {} has no route to {} for packet {}",
                        node_id, packet.dest, packet.packet_id
                    )
                })
                .0
                .clone()
        };
        debug_assert_ne!(packet.kind, PacketKind::Routing);
        self.link_enqueue(link_id, packet, node_id);
    }
}
