use netsim_core::{Kernel, Link, NullMetrics};
use netsim_types::{LinkId, NodeId};

fn add_link(k: &mut Kernel, id: &str, a: &str, b: &str, rate_bps: f64, delay_s: f64, buf_bits: f64) {
    k.add_link(Link::new(
        LinkId::from(id),
        rate_bps,
        delay_s,
        buf_bits,
        (NodeId::from(a), NodeId::from(b)),
    ));
}

/// S4: a square of four equal-cost routers with a host on two opposite
/// corners converges to a consistent shortest path after a couple of
/// reroute cycles.
#[test]
fn square_topology_converges_to_consistent_routes() {
    let mut k = Kernel::new(Box::new(NullMetrics));
    k.add_host("H1".into());
    k.add_host("H2".into());
    for r in ["R1", "R2", "R3", "R4"] {
        k.add_router(r.into());
    }

    add_link(&mut k, "Lh1", "H1", "R1", 1_000_000.0, 0.01, 1_000_000.0);
    add_link(&mut k, "Lh2", "H2", "R3", 1_000_000.0, 0.01, 1_000_000.0);
    add_link(&mut k, "L12", "R1", "R2", 1_000_000.0, 0.01, 1_000_000.0);
    add_link(&mut k, "L23", "R2", "R3", 1_000_000.0, 0.01, 1_000_000.0);
    add_link(&mut k, "L14", "R1", "R4", 1_000_000.0, 0.01, 1_000_000.0);
    add_link(&mut k, "L43", "R4", "R3", 1_000_000.0, 0.01, 1_000_000.0);

    k.attach_host_link(&"H1".into(), "Lh1".into());
    k.attach_host_link(&"H2".into(), "Lh2".into());
    k.attach_router_link(&"R1".into(), "Lh1".into());
    k.attach_router_link(&"R1".into(), "L12".into());
    k.attach_router_link(&"R1".into(), "L14".into());
    k.attach_router_link(&"R2".into(), "L12".into());
    k.attach_router_link(&"R2".into(), "L23".into());
    k.attach_router_link(&"R3".into(), "Lh2".into());
    k.attach_router_link(&"R3".into(), "L23".into());
    k.attach_router_link(&"R3".into(), "L43".into());
    k.attach_router_link(&"R4".into(), "L14".into());
    k.attach_router_link(&"R4".into(), "L43".into());

    for r in ["R1", "R2", "R3", "R4"] {
        k.start_routing(r.into());
    }

    // Drive two full reroute periods worth of cycles. No flows are active,
    // so `run` would exit immediately on the active-flow check; step the
    // routing events directly instead.
    // Multi-hop convergence cascades through several rounds of
    // receive-recompute-resend before the next real reroute cycle; run
    // enough steps to let that cascade settle without waiting 5s of
    // virtual time for another full cycle.
    for _ in 0..300 {
        if !k.step() {
            break;
        }
        if k.current_time() > 1.0 {
            break;
        }
    }

    // R1 must have settled on a route to H2 via one of the two equal-cost
    // paths (through R2 or through R4).
    let route = k
        .router_route(&"R1".into(), &"H2".into())
        .expect("R1 should have a route to H2");
    assert!(route.0 == LinkId::from("L12") || route.0 == LinkId::from("L14"));
}

/// S6: poison reverse prevents a count-to-infinity loop. Three routers in a
/// line (R1-R2-R3) with a host on each end converge normally; the R2-R3 leg
/// is then cut, and R1/R2 must never settle into a two-node loop bouncing
/// traffic for H3 back and forth across L12.
#[test]
fn poison_reverse_prevents_routing_loop() {
    // H1 - R1 - R2 - R3 - H3
    let mut k = Kernel::new(Box::new(NullMetrics));
    k.add_host("H1".into());
    k.add_host("H3".into());
    k.add_router("R1".into());
    k.add_router("R2".into());
    k.add_router("R3".into());

    add_link(&mut k, "Lh1", "H1", "R1", 1_000_000.0, 0.01, 1_000_000.0);
    add_link(&mut k, "L12", "R1", "R2", 1_000_000.0, 0.01, 1_000_000.0);
    add_link(&mut k, "L23", "R2", "R3", 1_000_000.0, 0.01, 1_000_000.0);
    add_link(&mut k, "Lh3", "R3", "H3", 1_000_000.0, 0.01, 1_000_000.0);

    k.attach_host_link(&"H1".into(), "Lh1".into());
    k.attach_host_link(&"H3".into(), "Lh3".into());
    k.attach_router_link(&"R1".into(), "Lh1".into());
    k.attach_router_link(&"R1".into(), "L12".into());
    k.attach_router_link(&"R2".into(), "L12".into());
    k.attach_router_link(&"R2".into(), "L23".into());
    k.attach_router_link(&"R3".into(), "L23".into());
    k.attach_router_link(&"R3".into(), "Lh3".into());

    k.start_routing("R1".into());
    k.start_routing("R2".into());
    k.start_routing("R3".into());

    let run_until = |k: &mut Kernel, deadline: f64| {
        for _ in 0..500 {
            if !k.step() {
                break;
            }
            if k.current_time() > deadline {
                break;
            }
        }
    };

    run_until(&mut k, 1.0);

    // Before the cut, R1's only route to H3 is via R2 across L12, and R2's
    // only route to H3 is via R3 across L23.
    let r1_route = k
        .router_route(&"R1".into(), &"H3".into())
        .expect("R1 should route to H3 via R2");
    assert_eq!(r1_route.0, LinkId::from("L12"));
    let r2_route = k
        .router_route(&"R2".into(), &"H3".into())
        .expect("R2 should route to H3 via R3");
    assert_eq!(r2_route.0, LinkId::from("L23"));

    // Cut the R2-R3 leg, as the spec's S6 scenario does, and let the
    // distance-vector cascade settle.
    k.disable_router_link(&"R2".into(), &"L23".into());
    k.disable_router_link(&"R3".into(), &"L23".into());
    run_until(&mut k, 3.0);

    // R2 no longer has any path to H3: poison reverse means R1's own
    // advertisement of its (now equally stale) route to H3 arrives back at
    // R2 over L12 with cost +infinity, since R1 reaches H3 through R2 over
    // that very link. R2 must never adopt L12 (i.e. R1) as its next hop for
    // H3, and R1 and R2 must never both point at each other across L12 for
    // H3 -- the count-to-infinity loop this scenario exists to rule out.
    let r1_route_after = k.router_route(&"R1".into(), &"H3".into());
    let r2_route_after = k.router_route(&"R2".into(), &"H3".into());
    assert_ne!(
        r2_route_after.map(|(link, _)| link),
        Some(LinkId::from("L12")),
        "R2 must not route to H3 back through R1 across L12"
    );
    let mutual_loop = matches!(
        (&r1_route_after, &r2_route_after),
        (Some((l1, _)), Some((l2, _))) if *l1 == LinkId::from("L12") && *l2 == LinkId::from("L12")
    );
    assert!(!mutual_loop, "R1 and R2 must not bounce H3 traffic across L12");
}
