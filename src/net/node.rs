//! 节点类型
//!
//! 定义网络节点 trait 与主机实现。

use std::net::IpAddr;

use super::id::NodeId;
use super::network::Network;
use super::packet::Packet;
use crate::sim::Simulator;
use tracing::{debug, trace};

/// 节点接口
pub trait Node {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    /// 节点上配置的 IP 地址
    fn addrs(&self) -> &[IpAddr];

    /// 为节点增加一个 IP 地址
    fn add_addr(&mut self, addr: IpAddr);

    /// 处理到达的数据包
    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network);
}

/// 主机节点
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
    addrs: Vec<IpAddr>,
}

impl Host {
    /// 创建新主机
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            addrs: Vec::new(),
        }
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn addrs(&self) -> &[IpAddr] {
        &self.addrs
    }

    fn add_addr(&mut self, addr: IpAddr) {
        if !self.addrs.contains(&addr) {
            self.addrs.push(addr);
        }
    }

    #[tracing::instrument(skip(self, pkt, sim, net), fields(node_name = %self.name(), node_id = ?self.id(), pkt_id = pkt.id, flow_id = pkt.flow_id))]
    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        debug!("🖥️  Host 处理数据包");
        trace!(dst = ?pkt.dst(), hop = pkt.hop, "数据包信息");

        if pkt.has_next() {
            debug!("未到达目的地，继续转发");
            net.forward_from(self.id, pkt, sim);
        } else {
            net.on_delivered(self.id, pkt, sim);
        }
    }
}
