pub mod delay;
pub mod reno;

pub use delay::DelayPolicy;
pub use reno::RenoPolicy;

use std::collections::{BTreeSet, HashSet};

use netsim_types::config::{ACK_SIZE_BITS, DATA_SIZE_BITS, TIMEOUT_DELAY_S};
use netsim_types::{FlowId, NodeId, Packet};
use tracing::{debug, info};

use crate::kernel::{EventKind, Kernel};

/// What a congestion policy hook asks the kernel to do, in place of
/// performing the side effect itself. Hooks only ever see `&mut FlowCommon`,
/// never the kernel, so anything beyond adjusting shared flow state comes
/// back out through this value for `Kernel` to execute.
#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyOutcome {
    /// Retransmit this packet id immediately.
    pub retransmit: Option<u64>,
}

/// Shared transport state, independent of which congestion policy drives it.
pub struct FlowCommon {
    pub flow_id: FlowId,
    pub src: NodeId,
    pub dest: NodeId,
    pub num_packets: u64,
    pub start_time: f64,

    pub window_size: f64,
    pub first_unacked: u64,
    pub unacked: BTreeSet<u64>,
    pub dup_counter: u32,
    pub canceled_timeouts: HashSet<u64>,
    pub ssthreshold: f64,

    pub next_to_send: u64,
    pub last_rtt: f64,
    pub base_rtt: f64,

    /// Receiver side: ids still expected but not yet delivered.
    pub unreceived: BTreeSet<u64>,
}

impl FlowCommon {
    fn new(flow_id: FlowId, src: NodeId, dest: NodeId, num_packets: u64, start_time: f64) -> Self {
        Self {
            flow_id,
            src,
            dest,
            num_packets,
            start_time,
            window_size: 1.0,
            first_unacked: 0,
            unacked: BTreeSet::new(),
            dup_counter: 0,
            canceled_timeouts: HashSet::new(),
            ssthreshold: f64::INFINITY,
            next_to_send: 0,
            last_rtt: f64::INFINITY,
            base_rtt: f64::INFINITY,
            unreceived: (0..num_packets).collect(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.first_unacked >= self.num_packets
    }
}

/// Hooks a congestion-control policy supplies. Shared ack/timeout plumbing
/// lives in `Kernel`'s flow methods below; only the four window-control
/// decisions differ between Reno and the delay-based variant.
pub trait CongestionPolicy: Send {
    /// A new cumulative ack advanced `first_unacked`.
    fn on_new_ack(&mut self, common: &mut FlowCommon) -> PolicyOutcome;
    /// The third consecutive duplicate ack on `first_unacked` arrived.
    /// Returns `None` if the policy does not act on triple-dup at all.
    fn on_triple_dup(&mut self, common: &mut FlowCommon) -> Option<PolicyOutcome>;
    /// The retransmission timer for some in-flight packet fired.
    fn on_timeout_event(&mut self, common: &mut FlowCommon);
    /// Current pacing window, in packets. May differ from `window_size`
    /// (Reno inflates it during fast recovery).
    fn effective_window(&self, common: &FlowCommon) -> f64;
    /// Whether this policy drives its own window from a periodic timer
    /// independent of ack arrival (the delay-based policy does).
    fn periodic_update(&self) -> bool {
        false
    }
    /// Fired by the periodic window-update timer, for policies that opt
    /// into one via `periodic_update`. No-op for ack-driven policies.
    fn on_periodic_tick(&mut self, _common: &mut FlowCommon) {}
}

pub struct FlowState {
    pub common: FlowCommon,
    pub policy: Box<dyn CongestionPolicy>,
}

impl Kernel {
    #[allow(clippy::too_many_arguments)]
    pub fn add_flow(
        &mut self,
        flow_id: FlowId,
        src: NodeId,
        dest: NodeId,
        total_bits: f64,
        start_time: f64,
        policy: Box<dyn CongestionPolicy>,
    ) {
        let num_packets = (total_bits / DATA_SIZE_BITS as f64).ceil() as u64;
        self.register_flow_on_host(&src, flow_id);
        self.register_flow_on_host(&dest, flow_id);
        let common = FlowCommon::new(flow_id, src, dest, num_packets, start_time);
        let periodic = policy.periodic_update();
        self.flows.insert(flow_id, FlowState { common, policy });
        self.register_flow();
        self.schedule(start_time, EventKind::FlowStart { flow: flow_id });
        if periodic {
            self.schedule(
                start_time + netsim_types::config::WINDOW_UPDATE_PERIOD_S,
                EventKind::WindowUpdate { flow: flow_id },
            );
        }
    }

    pub(crate) fn handle_flow_start(&mut self, flow_id: FlowId) {
        self.flow_send_window(flow_id);
    }

    /// Enforce the flow's congestion window: create and transmit fresh
    /// packets for ids in `[first_unacked, num_packets)` not already in
    /// flight, up to `effective_window`.
    pub(crate) fn flow_send_window(&mut self, flow_id: FlowId) {
        let (src, dest, link_via) = {
            let flow = &self.flows[&flow_id];
            (flow.common.src.clone(), flow.common.dest.clone(), self.host_link(&flow.common.src))
        };

        loop {
            let flow = self.flows.get_mut(&flow_id).expect("flow vanished");
            let limit = flow.policy.effective_window(&flow.common).floor() as u64;
            if flow.common.unacked.len() as u64 >= limit {
                break;
            }
            if flow.common.next_to_send >= flow.common.num_packets {
                break;
            }
            let id = flow.common.next_to_send;
            if flow.common.unacked.contains(&id) {
                flow.common.next_to_send += 1;
                continue;
            }
            flow.common.unacked.insert(id);
            flow.common.next_to_send += 1;
            let time = self.current_time();
            self.metrics.record_window_size(&flow_id, flow.policy.effective_window(&flow.common), time);

            let packet = Packet::new_data(id, flow_id, src.clone(), dest.clone(), DATA_SIZE_BITS, time);
            self.metrics.record_flow_rate(&flow_id, DATA_SIZE_BITS, time);
            self.link_enqueue(link_via.clone(), packet, src.clone());
            self.schedule(TIMEOUT_DELAY_S, EventKind::Timeout { flow: flow_id, packet_id: id });
        }
    }

    fn retransmit(&mut self, flow_id: FlowId, packet_id: u64) {
        let (src, dest, link_via) = {
            let flow = &self.flows[&flow_id];
            (flow.common.src.clone(), flow.common.dest.clone(), self.host_link(&flow.common.src))
        };
        let time = self.current_time();
        let packet = Packet::new_data(packet_id, flow_id, src.clone(), dest, DATA_SIZE_BITS, time);
        debug!(flow = %flow_id, packet_id, "retransmitting");
        self.link_enqueue(link_via, packet, src);
        // The pre-existing timeout for this packet id was already marked in
        // `canceled_timeouts` by the caller; leave that mark alone so the
        // still-pending original timeout event consumes it and is ignored.
        // This freshly scheduled timeout starts with a clean slate.
        let flow = self.flows.get_mut(&flow_id).expect("flow vanished");
        flow.common.unacked.insert(packet_id);
        self.schedule(TIMEOUT_DELAY_S, EventKind::Timeout { flow: flow_id, packet_id });
    }

    pub(crate) fn flow_receive_ack(&mut self, packet: Packet) {
        let flow_id = packet.flow_id;
        let rtt = self.current_time() - packet.timestamp;
        self.metrics.record_rtt(&flow_id, rtt, self.current_time());

        let (outcome, completed) = {
            let flow = self.flows.get_mut(&flow_id).expect("ack for unknown flow");
            flow.common.last_rtt = rtt;
            flow.common.base_rtt = flow.common.base_rtt.min(rtt);

            if packet.packet_id > flow.common.first_unacked {
                flow.common.first_unacked = packet.packet_id;
                let outcome = flow.policy.on_new_ack(&mut flow.common);
                flow.common.unacked.retain(|id| *id >= flow.common.first_unacked);
                let completed = flow.common.is_complete();
                (Some(outcome), completed)
            } else if packet.packet_id == flow.common.first_unacked {
                flow.common.dup_counter += 1;
                let mut outcome = None;
                if flow.common.dup_counter == 3 {
                    outcome = flow.policy.on_triple_dup(&mut flow.common);
                    if outcome.is_some() {
                        flow.common.canceled_timeouts.insert(flow.common.first_unacked);
                    }
                }
                (outcome, false)
            } else {
                (None, false)
            }
        };

        if let Some(outcome) = outcome {
            if let Some(id) = outcome.retransmit {
                self.retransmit(flow_id, id);
            }
        }

        if completed {
            info!(flow = %flow_id, "flow complete");
            self.complete_flow();
        }

        self.flow_send_window(flow_id);
    }

    pub(crate) fn handle_timeout(&mut self, flow_id: FlowId, packet_id: u64) {
        let flow = self.flows.get_mut(&flow_id).expect("timeout for unknown flow");
        if flow.common.canceled_timeouts.remove(&packet_id) {
            return;
        }
        if !flow.common.unacked.contains(&packet_id) {
            return;
        }
        flow.policy.on_timeout_event(&mut flow.common);
        flow.common.unacked.clear();
        flow.common.next_to_send = flow.common.first_unacked;
        self.flow_send_window(flow_id);
    }

    pub(crate) fn handle_window_update(&mut self, flow_id: FlowId) {
        let still_running = match self.flows.get_mut(&flow_id) {
            Some(flow) if !flow.common.is_complete() => {
                flow.policy.on_periodic_tick(&mut flow.common);
                let time = self.current_time();
                let w = flow.policy.effective_window(&flow.common);
                self.metrics.record_window_size(&flow_id, w, time);
                true
            }
            _ => false,
        };
        if !still_running {
            return;
        }
        self.flow_send_window(flow_id);
        if self.flows.get(&flow_id).map(|f| !f.common.is_complete()).unwrap_or(false) {
            self.schedule(
                netsim_types::config::WINDOW_UPDATE_PERIOD_S,
                EventKind::WindowUpdate { flow: flow_id },
            );
        }
    }

    pub(crate) fn flow_receive_data(&mut self, packet: Packet) {
        let flow_id = packet.flow_id;
        let flow = self.flows.get_mut(&flow_id).expect("data for unknown flow");
        flow.common.unreceived.remove(&packet.packet_id);
        let ack_id = flow
            .common
            .unreceived
            .iter()
            .next()
            .copied()
            .unwrap_or(flow.common.num_packets);

        let (src, dest) = (flow.common.dest.clone(), flow.common.src.clone());
        let link_via = self.host_link(&src);
        let ack = Packet::new_ack(ack_id, flow_id, src.clone(), dest, ACK_SIZE_BITS, packet.timestamp);
        self.link_enqueue(link_via, ack, src);
    }

    fn host_link(&self, node_id: &NodeId) -> netsim_types::LinkId {
        match self.nodes.get(node_id) {
            Some(crate::node::Node::Host(h)) => h
                .link
                .clone()
                .unwrap_or_else(|| panic!("host {} has no attached link", node_id)),
            _ => panic!("{} is not a host", node_id),
        }
    }
}
