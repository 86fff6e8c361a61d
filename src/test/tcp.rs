use std::net::SocketAddr;

use crate::net::{ErrorModel, NetWorld, Packet, Socket, SocketError, TcpSegment, Transport};
use crate::proto::TcpSocket;
use crate::proto::tcp::TcpConfig;
use crate::sim::{SimTime, Simulator};
use crate::test::SharedBuf;
use crate::topo::point_to_point::{PointToPoint, PointToPointOpts, build_point_to_point};
use crate::trace::TraceSink;

/// Drops the first data segment carrying `seq`, then lets everything through.
#[derive(Debug)]
struct DropSeqOnce {
    seq: u64,
    dropped: bool,
}

impl ErrorModel for DropSeqOnce {
    fn is_corrupt(&mut self, pkt: &Packet) -> bool {
        match pkt.transport {
            Transport::Tcp(TcpSegment::Data { seq, .. }) if seq == self.seq && !self.dropped => {
                self.dropped = true;
                true
            }
            _ => false,
        }
    }
}

fn setup(opts: &PointToPointOpts) -> (Simulator, NetWorld, PointToPoint, SocketAddr) {
    let sim = Simulator::default();
    let mut world = NetWorld::default();
    let topo = build_point_to_point(&mut world, opts);
    world.net.tcp.set_config(TcpConfig {
        mss: 536,
        init_cwnd_bytes: 536,
        ..TcpConfig::default()
    });
    let sink = SocketAddr::new(topo.addr1, 8080);
    world.net.tcp.listen(sink);
    (sim, world, topo, sink)
}

fn connected(sim: &mut Simulator, world: &mut NetWorld, topo: &PointToPoint, sink: SocketAddr) -> TcpSocket {
    let mut sock = TcpSocket::new(topo.n0);
    let local = sock.bind_v4(&mut world.net).expect("bind");
    assert_eq!(local.ip(), topo.addr0);
    sock.connect(sink, sim, &mut world.net).expect("connect");
    sock
}

#[test]
fn bulk_send_is_fully_delivered_and_cwnd_grows() {
    let (mut sim, mut world, topo, sink) = setup(&PointToPointOpts::default());
    let buf = SharedBuf::default();
    world.net.tracer.set_cwnd_sink(TraceSink::boxed(buf.clone()));

    let mut sock = connected(&mut sim, &mut world, &topo, sink);
    assert_eq!(sock.send(&[0u8; 10_000], &mut sim, &mut world.net), Ok(10_000));
    sim.run(&mut world);

    assert_eq!(world.net.tcp.listener_rx_bytes(sink), Some(10_000));
    let conn = world
        .net
        .tcp
        .get(sock.conn_id().expect("conn"))
        .expect("conn state");
    assert_eq!(conn.bytes_written(), 10_000);
    assert_eq!(conn.bytes_acked(), 10_000);
    assert_eq!(conn.bytes_received(), 10_000);
    assert_eq!(conn.retransmits(), 0);
    assert!(conn.is_drained());
    assert!(conn.cwnd_bytes() > 536);

    // Slow start: first change doubles the initial window.
    let lines = buf.lines();
    assert!(!lines.is_empty());
    let first: Vec<&str> = lines[0].split('\t').collect();
    assert_eq!(first[1..], ["536", "1072"]);
    assert_eq!(world.net.tracer.cwnd_changes(), lines.len() as u64);

    // Nothing left to do: the retransmission timer is cancelled once drained.
    assert_eq!(sim.pending_events(), 0);
}

#[test]
fn lost_segment_is_retransmitted() {
    let (mut sim, mut world, topo, sink) = setup(&PointToPointOpts::default());
    world.net.set_error_model(
        topo.forward,
        Box::new(DropSeqOnce {
            seq: 536 * 4,
            dropped: false,
        }),
    );

    let mut sock = connected(&mut sim, &mut world, &topo, sink);
    sock.send(&[0u8; 536 * 20], &mut sim, &mut world.net)
        .expect("send");
    sim.run(&mut world);

    assert_eq!(world.net.stats.rx_drops, 1);
    assert_eq!(world.net.tcp.listener_rx_bytes(sink), Some(536 * 20));
    let conn = world
        .net
        .tcp
        .get(sock.conn_id().expect("conn"))
        .expect("conn state");
    assert!(conn.retransmits() >= 1);
    assert!(conn.is_drained());
}

#[test]
fn connect_to_port_without_listener_is_refused() {
    let (mut sim, mut world, topo, _sink) = setup(&PointToPointOpts::default());
    let mut sock = TcpSocket::new(topo.n0);
    sock.bind_v4(&mut world.net).expect("bind");
    let peer = SocketAddr::new(topo.addr1, 9);
    assert_eq!(
        sock.connect(peer, &mut sim, &mut world.net),
        Err(SocketError::ConnectionRefused(peer))
    );
    assert!(sock.conn_id().is_none());
}

#[test]
fn connect_requires_bind_and_matching_family() {
    let (mut sim, mut world, topo, sink) = setup(&PointToPointOpts::default());
    let mut sock = TcpSocket::new(topo.n0);
    assert_eq!(
        sock.connect(sink, &mut sim, &mut world.net),
        Err(SocketError::NotBound)
    );

    let local = sock.bind_v4(&mut world.net).expect("bind");
    let v6_peer: SocketAddr = "[2001:1::2]:8080".parse().expect("addr");
    assert_eq!(
        sock.connect(v6_peer, &mut sim, &mut world.net),
        Err(SocketError::AddressFamilyMismatch {
            local,
            peer: v6_peer
        })
    );
}

#[test]
fn bind_errors() {
    let (_sim, mut world, topo, _sink) = setup(&PointToPointOpts::default());
    let mut sock = TcpSocket::new(topo.n0);
    assert_eq!(
        sock.bind_v6(&mut world.net),
        Err(SocketError::AddressUnavailable { family: "IPv6" })
    );
    assert_eq!(sock.local_addr(), None);
    let local = sock.bind_v4(&mut world.net).expect("bind");
    assert_eq!(sock.local_addr(), Some(local));
    assert_eq!(
        sock.bind_v4(&mut world.net),
        Err(SocketError::AlreadyBound(local))
    );

    // Each socket gets its own ephemeral port.
    let mut other = TcpSocket::new(topo.n0);
    let other_local = other.bind_v4(&mut world.net).expect("bind");
    assert_ne!(other_local.port(), local.port());
}

#[test]
fn ipv6_connection_delivers() {
    let (mut sim, mut world, topo, sink) = setup(&PointToPointOpts {
        ipv6: true,
        ..PointToPointOpts::default()
    });
    let mut sock = TcpSocket::new(topo.n0);
    assert!(sock.bind_v6(&mut world.net).expect("bind").is_ipv6());
    sock.connect(sink, &mut sim, &mut world.net).expect("connect");
    sock.send(&[0u8; 2_000], &mut sim, &mut world.net)
        .expect("send");
    sim.run(&mut world);
    assert_eq!(world.net.tcp.listener_rx_bytes(sink), Some(2_000));
}

#[test]
fn send_before_connect_and_after_close() {
    let (mut sim, mut world, topo, sink) = setup(&PointToPointOpts::default());
    let mut sock = TcpSocket::new(topo.n0);
    sock.bind_v4(&mut world.net).expect("bind");
    assert_eq!(
        sock.send(&[0u8; 10], &mut sim, &mut world.net),
        Err(SocketError::NotConnected)
    );

    sock.connect(sink, &mut sim, &mut world.net).expect("connect");
    sock.close(&mut sim, &mut world.net).expect("close");
    sock.close(&mut sim, &mut world.net).expect("close twice");
    assert!(sock.is_closed());
    assert_eq!(
        sock.send(&[0u8; 10], &mut sim, &mut world.net),
        Err(SocketError::Closed)
    );
    assert_eq!(sock.bind_v4(&mut world.net), Err(SocketError::Closed));
    assert!(
        world
            .net
            .tcp
            .get(sock.conn_id().expect("conn"))
            .expect("conn state")
            .is_closed()
    );
}

#[test]
fn writes_beyond_send_buffer_are_rejected() {
    let (mut sim, mut world, topo, sink) = setup(&PointToPointOpts::default());
    world.net.tcp.set_config(TcpConfig {
        mss: 536,
        init_cwnd_bytes: 536,
        snd_buf_bytes: 4_000,
        ..TcpConfig::default()
    });
    let mut sock = connected(&mut sim, &mut world, &topo, sink);

    sock.send(&[0u8; 3_000], &mut sim, &mut world.net)
        .expect("fits");
    assert_eq!(
        sock.send(&[0u8; 1_040], &mut sim, &mut world.net),
        Err(SocketError::SendBufferFull {
            buffered: 3_000,
            capacity: 4_000
        })
    );

    // Once acknowledged, the buffer frees up again.
    sim.run(&mut world);
    sock.send(&[0u8; 1_040], &mut sim, &mut world.net)
        .expect("fits after drain");
}

#[test]
fn tail_loss_recovers_through_rto() {
    let (mut sim, mut world, topo, sink) = setup(&PointToPointOpts::default());
    world.net.tcp.set_config(TcpConfig {
        mss: 536,
        init_cwnd_bytes: 536 * 10,
        ..TcpConfig::default()
    });
    // Last of three segments: no later data, so no duplicate ACKs.
    world.net.set_error_model(
        topo.forward,
        Box::new(DropSeqOnce {
            seq: 1072,
            dropped: false,
        }),
    );

    let mut sock = connected(&mut sim, &mut world, &topo, sink);
    sock.send(&[0u8; 536 * 3], &mut sim, &mut world.net)
        .expect("send");
    sim.run(&mut world);

    let conn = world
        .net
        .tcp
        .get(sock.conn_id().expect("conn"))
        .expect("conn state");
    assert_eq!(conn.retransmits(), 1);
    assert!(conn.is_drained());
    assert_eq!(world.net.tcp.listener_rx_bytes(sink), Some(536 * 3));
    // Timer fires one initial RTO after the last new ACK.
    assert!(sim.now() > SimTime::from_secs(1));
    // Collapsed to one segment, then one slow-start step on the retransmission's ACK.
    assert_eq!(conn.ssthresh_bytes(), 1072);
    assert_eq!(conn.cwnd_bytes(), 1072);
}
