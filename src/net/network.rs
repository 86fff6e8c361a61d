//! 网络拓扑管理
//!
//! 定义网络拓扑结构，包含节点、链路、地址、数据包转发和统计信息。

use std::collections::HashMap;
use std::net::IpAddr;

use super::data_rate::DataRate;
use super::deliver_packet::DeliverPacket;
use super::error_model::ErrorModel;
use super::id::{LinkId, NodeId};
use super::link::Link;
use super::link_ready::LinkReady;
use super::node::{Host, Node};
use super::packet::Packet;
use super::stats::Stats;
use super::transport::Transport;
use crate::proto::tcp::TcpStack;
use crate::queue::PacketQueue;
use crate::sim::{SimTime, Simulator};
use crate::trace::Tracer;
use tracing::{debug, trace, warn};

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    addrs: HashMap<IpAddr, NodeId>,
    next_pkt_id: u64,
    pub tcp: TcpStack,
    pub tracer: Tracer,
    pub stats: Stats,
}

impl Network {
    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Box::new(Host::new(id, name))));
        id
    }

    /// 为节点分配 IP 地址（同一地址只能属于一个节点，后者覆盖前者）
    pub fn assign_addr(&mut self, node: NodeId, addr: IpAddr) {
        if let Some(Some(n)) = self.nodes.get_mut(node.0) {
            n.add_addr(addr);
            self.addrs.insert(addr, node);
        }
    }

    /// 按地址查找节点
    pub fn node_by_addr(&self, addr: IpAddr) -> Option<NodeId> {
        self.addrs.get(&addr).copied()
    }

    /// 节点上第一个指定协议族的地址
    pub fn node_addr(&self, node: NodeId, v6: bool) -> Option<IpAddr> {
        let n = self.nodes.get(node.0)?.as_ref()?;
        n.addrs().iter().copied().find(|a| a.is_ipv6() == v6)
    }

    /// 连接两个节点（创建单向链路）
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        rate: DataRate,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(Link::new(from, to, latency, rate));
        self.edges.insert((from, to), id);
        id
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    pub fn link_between(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.edges.get(&(from, to)).copied()
    }

    /// 替换链路出口队列
    pub fn set_link_queue(&mut self, id: LinkId, queue: Box<dyn PacketQueue>) {
        if let Some(link) = self.links.get_mut(id.0) {
            link.queue = queue;
        }
    }

    /// 在链路接收端安装错误模型
    pub fn set_error_model(&mut self, id: LinkId, model: Box<dyn ErrorModel>) {
        if let Some(link) = self.links.get_mut(id.0) {
            link.error_model = Some(model);
        }
    }

    /// 两个直连节点之间的路径。不做多跳路由：没有直连链路时返回 None。
    pub fn direct_route(&self, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
        if src == dst {
            return None;
        }
        self.edges.contains_key(&(src, dst)).then(|| vec![src, dst])
    }

    /// 创建数据包
    pub fn make_packet(&mut self, flow_id: u64, size_bytes: u32, route: Vec<NodeId>) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet {
            id,
            flow_id,
            size_bytes,
            route,
            hop: 0,
            transport: Transport::None,
        }
    }

    /// 将数据包交付给节点处理；先经过到达链路的接收端错误模型。
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, to = %to))]
    pub fn deliver(&mut self, to: NodeId, via: Option<LinkId>, pkt: Packet, sim: &mut Simulator) {
        if let Some(link) = via.and_then(|id| self.links.get_mut(id.0)) {
            if let Some(model) = link.error_model.as_mut() {
                if model.is_corrupt(&pkt) {
                    self.stats.rx_drops += 1;
                    debug!(rx_drops = self.stats.rx_drops, "💥 接收端丢包");
                    self.tracer.on_rx_drop(sim.now(), &pkt);
                    return;
                }
            }
        }

        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let Some(mut node) = self.nodes.get_mut(to.0).and_then(Option::take) else {
            warn!(%to, "目标节点不存在或正忙，丢弃数据包");
            return;
        };
        trace!(node_name = %node.name(), "取出节点");

        node.on_packet(pkt, sim, self);

        trace!("节点处理完成，放回节点");
        self.nodes[to.0] = Some(node);
    }

    /// 从指定节点转发数据包：链路空闲则立即发送，否则进入出口队列。
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, from = %from, hop = pkt.hop))]
    pub fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        let Some(to) = pkt.next() else {
            warn!("数据包没有下一跳，丢弃");
            return;
        };
        let Some(link_id) = self.link_between(from, to) else {
            warn!(%to, "没有直连链路，丢弃数据包");
            return;
        };

        let link = &mut self.links[link_id.0];
        if link.busy || !link.queue.is_empty() {
            match link.queue.enqueue(pkt) {
                Ok(()) => {
                    trace!(
                        link_id = ?link_id,
                        queue_len = link.queue.len(),
                        queue_bytes = link.queue.bytes(),
                        "链路忙，入队"
                    );
                }
                Err(dropped) => {
                    self.stats.queue_drops += 1;
                    debug!(
                        link_id = ?link_id,
                        pkt_id = dropped.id,
                        queue_drops = self.stats.queue_drops,
                        "🗑️  出口队列已满，尾丢弃"
                    );
                }
            }
            return;
        }

        self.transmit(link_id, pkt, sim);
    }

    /// 在链路上串行化发送一个 packet，并调度到达与链路就绪事件。
    fn transmit(&mut self, link_id: LinkId, pkt: Packet, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        let now = sim.now();
        let tx_time = link.tx_time(pkt.size_bytes);
        let depart = now.saturating_add(tx_time);
        let arrive = depart.saturating_add(link.latency);
        link.busy = true;
        let to = link.to;

        trace!(
            now = ?now,
            tx_time = ?tx_time,
            depart = ?depart,
            arrive = ?arrive,
            "计算传输时间"
        );

        sim.schedule(
            arrive,
            DeliverPacket {
                to,
                via: Some(link_id),
                pkt: pkt.advance(),
            },
        );
        sim.schedule(depart, LinkReady { link_id });
    }

    /// 链路完成一次发送：取出队首继续发送，否则置为空闲。
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let Some(link) = self.links.get_mut(link_id.0) else {
            return;
        };
        link.busy = false;
        if let Some(pkt) = link.queue.dequeue() {
            self.transmit(link_id, pkt, sim);
        }
    }
}
