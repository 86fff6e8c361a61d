//! 数据包交付事件
//!
//! 定义网络模拟中的数据包交付事件。

use super::id::{LinkId, NodeId};
use super::net_world::net_world;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};
use tracing::{debug, trace};

/// 事件：把一个 packet 交给某个节点处理。
///
/// `via` 为 packet 到达时经过的链路；接收端错误模型挂在链路上。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub via: Option<LinkId>,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.pkt.id, flow_id = self.pkt.flow_id, to = ?self.to))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, via, pkt } = *self;

        debug!(
            size_bytes = pkt.size_bytes,
            hop = pkt.hop,
            via = ?via,
            now = ?sim.now(),
            "📨 数据包到达节点"
        );

        net_world(world).net.deliver(to, via, pkt, sim);

        trace!("DeliverPacket::execute 完成");
    }
}
