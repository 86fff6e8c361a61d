//! 点到点拓扑构建
//!
//! 拓扑结构：n0 <-> n1（单条全双工链路，默认 5 Mbps / 2 ms）

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::net::{DataRate, ErrorUnit, LinkId, NetWorld, NodeId, RateErrorModel};
use crate::queue::{DEFAULT_QUEUE_PKTS, DropTailQueue, QueueLimit};
use crate::sim::SimTime;

/// 接收端错误模型参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorModelOpts {
    pub rate: f64,
    pub unit: ErrorUnit,
    pub seed: u64,
}

/// 点到点拓扑配置选项
#[derive(Debug, Clone)]
pub struct PointToPointOpts {
    pub data_rate: DataRate,
    pub delay: SimTime,
    /// 每个方向出口队列的深度（包个数）
    pub queue_pkts: u64,
    /// 使用 IPv6 地址（2001:1::/64）而非 IPv4（10.1.1.0/24）
    pub ipv6: bool,
    /// 安装在 n1 接收端的错误模型
    pub rx_error: Option<ErrorModelOpts>,
}

impl Default for PointToPointOpts {
    fn default() -> Self {
        Self {
            data_rate: DataRate::from_mbps(5),
            delay: SimTime::from_millis(2),
            queue_pkts: DEFAULT_QUEUE_PKTS,
            ipv6: false,
            rx_error: None,
        }
    }
}

/// 构建结果
#[derive(Debug, Clone)]
pub struct PointToPoint {
    pub n0: NodeId,
    pub n1: NodeId,
    pub addr0: IpAddr,
    pub addr1: IpAddr,
    /// n0 -> n1
    pub forward: LinkId,
    /// n1 -> n0
    pub reverse: LinkId,
}

/// 构建点到点拓扑并分配地址
pub fn build_point_to_point(world: &mut NetWorld, opts: &PointToPointOpts) -> PointToPoint {
    let n0 = world.net.add_host("n0");
    let n1 = world.net.add_host("n1");

    let forward = world.net.connect(n0, n1, opts.delay, opts.data_rate);
    let reverse = world.net.connect(n1, n0, opts.delay, opts.data_rate);
    for link in [forward, reverse] {
        world.net.set_link_queue(
            link,
            Box::new(DropTailQueue::new(QueueLimit::Packets(opts.queue_pkts))),
        );
    }

    let (addr0, addr1) = if opts.ipv6 {
        (
            IpAddr::V6(Ipv6Addr::new(0x2001, 1, 0, 0, 0, 0, 0, 1)),
            IpAddr::V6(Ipv6Addr::new(0x2001, 1, 0, 0, 0, 0, 0, 2)),
        )
    } else {
        (
            IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1)),
            IpAddr::V4(Ipv4Addr::new(10, 1, 1, 2)),
        )
    };
    world.net.assign_addr(n0, addr0);
    world.net.assign_addr(n1, addr1);

    if let Some(em) = opts.rx_error {
        world
            .net
            .set_error_model(forward, Box::new(RateErrorModel::new(em.rate, em.unit, em.seed)));
    }

    PointToPoint {
        n0,
        n1,
        addr0,
        addr1,
        forward,
        reverse,
    }
}
