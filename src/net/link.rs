//! 链路类型
//!
//! 定义点到点单向链路：带宽、传播时延、出口队列与可选的接收端错误模型。

use super::data_rate::DataRate;
use super::error_model::ErrorModel;
use super::id::NodeId;
use crate::queue::{DropTailQueue, PacketQueue};
use crate::sim::SimTime;

/// 网络链路
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub latency: SimTime,
    pub rate: DataRate,
    /// 是否正在串行化发送一个 packet（直到对应的 LinkReady 触发）
    pub busy: bool,
    /// 链路上的排队策略（默认 DropTail，容量为 100 个默认大小的包）
    pub queue: Box<dyn PacketQueue>,
    /// 接收端（`to`）的错误模型
    pub error_model: Option<Box<dyn ErrorModel>>,
}

impl Link {
    /// 创建新链路
    pub fn new(from: NodeId, to: NodeId, latency: SimTime, rate: DataRate) -> Self {
        Self {
            from,
            to,
            latency,
            rate,
            busy: false,
            queue: Box::new(DropTailQueue::default()),
            error_model: None,
        }
    }

    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        self.rate.tx_time(bytes as u64)
    }
}
