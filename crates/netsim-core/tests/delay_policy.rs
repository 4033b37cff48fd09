use netsim_core::{DelayPolicy, InMemoryMetrics, Kernel, Link};
use netsim_types::{FlowId, LinkId, NodeId, ALPHA};

/// S5: a single delay-based flow over one bottleneck link settles near the
/// alpha equilibrium once `last_rtt` tracks `base_rtt`, and the window trace
/// is bounded and non-oscillating once it gets there.
#[test]
fn single_delay_flow_converges_near_alpha_equilibrium() {
    let mut k = Kernel::new(Box::new(InMemoryMetrics::new()));
    k.add_host("H1".into());
    k.add_host("H2".into());
    k.add_link(Link::new(
        LinkId::from("L1"),
        50_000_000.0,
        0.005,
        10_000_000.0,
        (NodeId::from("H1"), NodeId::from("H2")),
    ));
    k.attach_host_link(&"H1".into(), "L1".into());
    k.attach_host_link(&"H2".into(), "L1".into());

    k.add_flow(
        FlowId(1),
        "H1".into(),
        "H2".into(),
        50_000_000.0 * 8.0,
        0.0,
        Box::new(DelayPolicy::new()),
    );

    k.run(None);

    assert_eq!(k.active_flows(), 0, "flow should have completed");

    let report = k
        .metrics()
        .as_any()
        .downcast_ref::<InMemoryMetrics>()
        .expect("kernel was built with InMemoryMetrics");

    let windows = &report.window_size["F1"];
    let rtts = &report.rtt["F1"];
    assert!(windows.len() > 50, "expected a long-running window trace");
    assert!(rtts.len() > 50, "expected a long-running rtt trace");

    // Look at the tail of the run, after the window has had time to settle.
    let tail_len = windows.len() / 10;
    let window_tail: Vec<f64> = windows[windows.len() - tail_len..].iter().map(|(_, w)| *w).collect();
    let rtt_tail: Vec<f64> = rtts[rtts.len() - tail_len..].iter().map(|(_, r)| *r).collect();

    let tail_mean = window_tail.iter().sum::<f64>() / window_tail.len() as f64;
    let tail_min = window_tail.iter().cloned().fold(f64::INFINITY, f64::min);
    let tail_max = window_tail.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(
        (tail_max - tail_min) <= 0.10 * tail_mean,
        "window trace should be non-oscillating within 10% near equilibrium, got min={tail_min} max={tail_max} mean={tail_mean}"
    );

    let base_rtt = rtts.iter().map(|(_, r)| *r).fold(f64::INFINITY, f64::min);
    let last_rtt_mean = rtt_tail.iter().sum::<f64>() / rtt_tail.len() as f64;
    let equilibrium = ALPHA / (1.0 - base_rtt / last_rtt_mean);
    assert!(
        (tail_mean - equilibrium).abs() <= 0.4 * equilibrium,
        "window should settle near the alpha equilibrium {equilibrium}, got {tail_mean}"
    );
}
