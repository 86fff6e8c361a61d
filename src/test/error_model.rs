use crate::net::{ErrorModel, ErrorUnit, NodeId, Packet, RateErrorModel, Transport};

fn pkt(size_bytes: u32) -> Packet {
    Packet {
        id: 0,
        flow_id: 0,
        size_bytes,
        route: vec![NodeId(0), NodeId(1)],
        hop: 1,
        transport: Transport::None,
    }
}

#[test]
fn zero_rate_never_drops() {
    let mut m = RateErrorModel::new(0.0, ErrorUnit::Byte, 1);
    assert!((0..1_000).all(|_| !m.is_corrupt(&pkt(1500))));
}

#[test]
fn unit_rate_per_packet_always_drops() {
    let mut m = RateErrorModel::new(1.0, ErrorUnit::Packet, 1);
    assert!((0..100).all(|_| m.is_corrupt(&pkt(40))));
}

#[test]
fn rate_is_clamped_to_a_probability() {
    assert_eq!(RateErrorModel::new(7.0, ErrorUnit::Packet, 1).rate(), 1.0);
    assert_eq!(RateErrorModel::new(-1.0, ErrorUnit::Packet, 1).rate(), 0.0);
}

#[test]
fn per_byte_and_per_bit_probabilities_compound_over_size() {
    let byte = RateErrorModel::new(0.5, ErrorUnit::Byte, 1);
    assert_eq!(byte.packet_error_probability(1), 0.5);
    assert_eq!(byte.packet_error_probability(2), 0.75);

    let bit = RateErrorModel::new(0.5, ErrorUnit::Bit, 1);
    assert_eq!(bit.packet_error_probability(1), 1.0 - 0.5f64.powi(8));

    let packet = RateErrorModel::new(0.25, ErrorUnit::Packet, 1);
    assert_eq!(packet.packet_error_probability(9_000), 0.25);
}

#[test]
fn same_seed_gives_same_drop_pattern() {
    let mut a = RateErrorModel::new(0.3, ErrorUnit::Packet, 42);
    let mut b = RateErrorModel::new(0.3, ErrorUnit::Packet, 42);
    let pa: Vec<bool> = (0..200).map(|_| a.is_corrupt(&pkt(100))).collect();
    let pb: Vec<bool> = (0..200).map(|_| b.is_corrupt(&pkt(100))).collect();
    assert_eq!(pa, pb);
    assert!(pa.iter().any(|&d| d));
    assert!(pa.iter().any(|&d| !d));
}
