use netsim_types::config::{ALPHA, GAMMA};

use super::{CongestionPolicy, FlowCommon, PolicyOutcome};

/// Delay-based (FAST-TCP-style) congestion control. The window is driven
/// entirely by a periodic timer comparing `last_rtt` against `base_rtt`;
/// ack arrival only updates rtt bookkeeping and keeps the pipe full.
#[derive(Default)]
pub struct DelayPolicy;

impl DelayPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl CongestionPolicy for DelayPolicy {
    fn on_new_ack(&mut self, _common: &mut FlowCommon) -> PolicyOutcome {
        PolicyOutcome::default()
    }

    fn on_triple_dup(&mut self, _common: &mut FlowCommon) -> Option<PolicyOutcome> {
        None
    }

    fn on_timeout_event(&mut self, _common: &mut FlowCommon) {
        // Retransmission happens via the shared `send_window` path once
        // `unacked` is cleared by the caller; the window itself is left
        // alone for the next periodic tick to adjust.
    }

    fn effective_window(&self, common: &FlowCommon) -> f64 {
        common.window_size
    }

    fn periodic_update(&self) -> bool {
        true
    }

    fn on_periodic_tick(&mut self, common: &mut FlowCommon) {
        if common.last_rtt.is_finite() {
            let w = common.window_size;
            let queue_free = common.base_rtt / common.last_rtt * w + ALPHA;
            let target = (1.0 - GAMMA) * w + GAMMA * queue_free;
            common.window_size = (2.0 * w).min(target);
        }
    }
}
