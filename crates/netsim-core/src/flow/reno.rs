use super::{CongestionPolicy, FlowCommon, PolicyOutcome};

/// Loss-based congestion control: slow start, congestion avoidance, fast
/// retransmit on triple duplicate ack, and Reno-style fast recovery with
/// partial-ack handling.
#[derive(Default)]
pub struct RenoPolicy {
    fast_recovery: bool,
    first_partial_ack: u64,
    last_partial_ack: u64,
}

impl RenoPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    fn baseline_new_ack(&mut self, common: &mut FlowCommon) {
        if common.window_size < common.ssthreshold {
            common.window_size += 1.0;
        } else {
            common.window_size += 1.0 / common.window_size.floor().max(1.0);
        }
        common.dup_counter = 0;
    }
}

impl CongestionPolicy for RenoPolicy {
    fn on_new_ack(&mut self, common: &mut FlowCommon) -> PolicyOutcome {
        if self.fast_recovery {
            if common.first_unacked <= self.last_partial_ack {
                // Partial ack: another hole in the original recovery window.
                let garbage_collected = common
                    .unacked
                    .iter()
                    .take_while(|id| **id < common.first_unacked)
                    .count() as u32;
                common.dup_counter = common.dup_counter.saturating_sub(garbage_collected);
                common.canceled_timeouts.insert(common.first_unacked);
                return PolicyOutcome {
                    retransmit: Some(common.first_unacked),
                };
            }
            self.fast_recovery = false;
            common.window_size = common.ssthreshold.ceil();
            common.dup_counter = 0;
        }

        self.baseline_new_ack(common);
        PolicyOutcome::default()
    }

    fn on_triple_dup(&mut self, common: &mut FlowCommon) -> Option<PolicyOutcome> {
        if self.fast_recovery || common.window_size < common.ssthreshold {
            // Already recovering, or still in slow start: not eligible.
            return None;
        }
        common.ssthreshold = (common.window_size / 2.0).max(1.0);
        common.window_size = 1.0;
        self.fast_recovery = true;
        self.last_partial_ack = *common.unacked.iter().max().unwrap_or(&common.first_unacked);
        self.first_partial_ack = *common.unacked.iter().min().unwrap_or(&common.first_unacked);
        Some(PolicyOutcome {
            retransmit: Some(common.first_unacked),
        })
    }

    fn on_timeout_event(&mut self, common: &mut FlowCommon) {
        common.ssthreshold = (common.window_size / 2.0).max(1.0);
        common.window_size = 1.0;
        common.dup_counter = 0;
        self.fast_recovery = false;
        self.first_partial_ack = 0;
        self.last_partial_ack = 0;
    }

    fn effective_window(&self, common: &FlowCommon) -> f64 {
        if self.fast_recovery {
            common.window_size + common.dup_counter as f64
        } else {
            common.window_size
        }
    }
}
