use crate::net::{DataRate, DeliverPacket, ErrorUnit, NetWorld, RateErrorModel};
use crate::queue::{DropTailQueue, QueueLimit};
use crate::sim::{SimTime, Simulator};
use crate::test::SharedBuf;
use crate::trace::TraceSink;

fn two_hosts(world: &mut NetWorld) -> (crate::net::NodeId, crate::net::NodeId, crate::net::LinkId) {
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    let link = world
        .net
        .connect(h0, h1, SimTime::from_millis(1), DataRate::from_mbps(1));
    world
        .net
        .connect(h1, h0, SimTime::from_millis(1), DataRate::from_mbps(1));
    (h0, h1, link)
}

#[test]
fn busy_link_queues_then_tail_drops() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let (h0, h1, link) = two_hosts(&mut world);
    world
        .net
        .set_link_queue(link, Box::new(DropTailQueue::new(QueueLimit::Packets(2))));

    for _ in 0..5 {
        let route = world.net.direct_route(h0, h1).expect("route");
        let pkt = world.net.make_packet(1, 1000, route);
        sim.schedule(
            SimTime::ZERO,
            DeliverPacket {
                to: h0,
                via: None,
                pkt,
            },
        );
    }
    sim.run(&mut world);

    // One on the wire, two queued, two dropped.
    assert_eq!(world.net.stats.queue_drops, 2);
    assert_eq!(world.net.stats.delivered_pkts, 3);
    // Three back-to-back 8 ms serializations plus 1 ms propagation.
    assert_eq!(sim.now(), SimTime::from_millis(25));
}

#[test]
fn receive_error_model_drops_are_traced_not_delivered() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let (h0, h1, link) = two_hosts(&mut world);
    world
        .net
        .set_error_model(link, Box::new(RateErrorModel::new(1.0, ErrorUnit::Packet, 1)));
    let buf = SharedBuf::default();
    world.net.tracer.set_drop_sink(TraceSink::boxed(buf.clone()));

    let route = world.net.direct_route(h0, h1).expect("route");
    let pkt = world.net.make_packet(4, 125, route);
    sim.schedule(
        SimTime::ZERO,
        DeliverPacket {
            to: h0,
            via: None,
            pkt,
        },
    );
    sim.run(&mut world);

    assert_eq!(world.net.stats.rx_drops, 1);
    assert_eq!(world.net.stats.delivered_pkts, 0);
    assert_eq!(world.net.tracer.rx_drops(), 1);
    // 125 B at 1 Mbps = 1 ms, plus 1 ms propagation.
    assert_eq!(buf.lines(), vec!["0.002\tpkt=0 flow=4 size=125 0->1".to_string()]);
}

#[test]
fn direct_route_requires_a_link() {
    let mut world = NetWorld::default();
    let a = world.net.add_host("a");
    let b = world.net.add_host("b");
    let c = world.net.add_host("c");
    world
        .net
        .connect(a, b, SimTime::from_millis(1), DataRate::from_mbps(1));

    assert_eq!(world.net.direct_route(a, b), Some(vec![a, b]));
    assert_eq!(world.net.direct_route(b, a), None);
    assert_eq!(world.net.direct_route(a, c), None);
    assert_eq!(world.net.direct_route(a, a), None);
}
