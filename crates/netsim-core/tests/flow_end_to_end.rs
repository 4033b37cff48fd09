use netsim_core::{InMemoryMetrics, Kernel, Link, RenoPolicy};
use netsim_types::{FlowId, LinkId, NodeId};

fn two_host_kernel(rate_bps: f64, buffer_bits: f64) -> Kernel {
    let mut k = Kernel::new(Box::new(InMemoryMetrics::new()));
    k.add_host("H1".into());
    k.add_host("H2".into());
    k.add_link(Link::new(
        LinkId::from("L1"),
        rate_bps,
        0.01,
        buffer_bits,
        (NodeId::from("H1"), NodeId::from("H2")),
    ));
    k.attach_host_link(&"H1".into(), "L1".into());
    k.attach_host_link(&"H2".into(), "L1".into());
    k
}

/// S1: a single Reno flow over an ample link delivers every packet with no
/// loss.
#[test]
fn single_flow_no_loss_delivers_all_packets() {
    let mut k = two_host_kernel(10_000_000.0, 64.0 * 8000.0);
    k.add_flow(
        FlowId(1),
        "H1".into(),
        "H2".into(),
        1_000_000.0 * 8.0,
        0.0,
        Box::new(RenoPolicy::new()),
    );

    k.run(None);

    assert_eq!(k.active_flows(), 0);

    let report = k
        .metrics()
        .as_any()
        .downcast_ref::<InMemoryMetrics>()
        .expect("kernel was built with InMemoryMetrics");
    assert_eq!(report.flow_rate["F1"].len(), 977);
    assert!(report.packet_loss.get("L1").is_none());
}

/// S2/S3: a tight bottleneck buffer forces loss and retransmission (either
/// via triple duplicate ack or via timeout, depending on receiver ack
/// timing); the flow must still complete.
#[test]
fn tight_buffer_forces_retransmission_but_still_completes() {
    let mut k = two_host_kernel(1_000_000.0, 8.0 * 8000.0);
    k.add_flow(
        FlowId(1),
        "H1".into(),
        "H2".into(),
        200_000.0 * 8.0,
        0.0,
        Box::new(RenoPolicy::new()),
    );

    k.run(None);

    assert_eq!(k.active_flows(), 0);
}
