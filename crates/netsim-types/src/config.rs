/// Simulation-wide constants: fixed packet sizes and protocol timing, not
/// overridable per run or per scenario.
pub const DATA_SIZE_BITS: u64 = 8192;
pub const ACK_SIZE_BITS: u64 = 512;
pub const ROUTING_SIZE_BITS: u64 = 1024;

/// Sender retransmission timer.
pub const TIMEOUT_DELAY_S: f64 = 1.0;

/// Period between router distance-vector re-evaluation cycles.
pub const REROUTE_PERIOD_S: f64 = 5.0;

/// Period between delay-based congestion window recomputations.
pub const WINDOW_UPDATE_PERIOD_S: f64 = 0.020;

/// Delay-based (FAST-TCP-style) smoothing factor.
pub const GAMMA: f64 = 0.5;

/// Delay-based (FAST-TCP-style) additive term.
pub const ALPHA: f64 = 15.0;

/// Unit conversions applied when loading a JSON topology (see
/// `netsim-topology`).
pub mod units {
    pub fn kb_to_bits(kb: f64) -> f64 {
        kb * 8000.0
    }

    pub fn ms_to_s(ms: f64) -> f64 {
        ms * 0.001
    }

    pub fn mbps_to_bps(mbps: f64) -> f64 {
        mbps * 1_000_000.0
    }

    pub fn mb_to_bits(mb: f64) -> f64 {
        mb * 8.0 * 1_000_000.0
    }
}
