use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::net::{DataRate, DeliverPacket, ErrorUnit, NetWorld};
use crate::sim::{SimTime, Simulator};
use crate::topo::point_to_point::{ErrorModelOpts, PointToPointOpts, build_point_to_point};

#[test]
fn point_to_point_assigns_ipv4_addresses_and_links_both_ways() {
    let mut world = NetWorld::default();
    let topo = build_point_to_point(&mut world, &PointToPointOpts::default());

    assert_eq!(topo.addr0, IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1)));
    assert_eq!(topo.addr1, IpAddr::V4(Ipv4Addr::new(10, 1, 1, 2)));
    assert_eq!(world.net.node_by_addr(topo.addr1), Some(topo.n1));
    assert_eq!(world.net.node_addr(topo.n0, false), Some(topo.addr0));
    assert_eq!(world.net.node_addr(topo.n0, true), None);

    assert_eq!(world.net.link_between(topo.n0, topo.n1), Some(topo.forward));
    assert_eq!(world.net.link_between(topo.n1, topo.n0), Some(topo.reverse));
    let fwd = world.net.link(topo.forward).expect("forward link");
    assert_eq!(fwd.rate, DataRate::from_mbps(5));
    assert_eq!(fwd.latency, SimTime::from_millis(2));
    assert!(fwd.error_model.is_none());
}

#[test]
fn point_to_point_ipv6_and_error_model() {
    let mut world = NetWorld::default();
    let topo = build_point_to_point(
        &mut world,
        &PointToPointOpts {
            ipv6: true,
            rx_error: Some(ErrorModelOpts {
                rate: 0.00001,
                unit: ErrorUnit::Byte,
                seed: 3,
            }),
            ..PointToPointOpts::default()
        },
    );

    assert_eq!(
        topo.addr1,
        IpAddr::V6(Ipv6Addr::new(0x2001, 1, 0, 0, 0, 0, 0, 2))
    );
    assert_eq!(world.net.node_addr(topo.n1, true), Some(topo.addr1));
    assert_eq!(world.net.node_addr(topo.n1, false), None);
    assert!(
        world
            .net
            .link(topo.forward)
            .expect("forward link")
            .error_model
            .is_some()
    );
    assert!(
        world
            .net
            .link(topo.reverse)
            .expect("reverse link")
            .error_model
            .is_none()
    );
}

#[test]
fn point_to_point_route_delivers_packet_end_to_end() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let topo = build_point_to_point(&mut world, &PointToPointOpts::default());

    let route = world.net.direct_route(topo.n0, topo.n1).expect("route");
    let pkt = world.net.make_packet(1, 1500, route);
    sim.schedule(
        SimTime::ZERO,
        DeliverPacket {
            to: topo.n0,
            via: None,
            pkt,
        },
    );
    sim.run(&mut world);

    assert_eq!(world.net.stats.delivered_pkts, 1);
    assert_eq!(world.net.stats.delivered_bytes, 1500);
    // 1500 B at 5 Mbps = 2.4 ms serialization, plus 2 ms propagation.
    assert_eq!(sim.now(), SimTime::from_micros(4_400));
}
