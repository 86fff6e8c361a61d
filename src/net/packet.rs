//! 数据包类型
//!
//! 定义网络数据包及其相关操作。

use std::fmt;

use super::id::NodeId;
use super::transport::{TcpSegment, Transport};

/// 网络数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub flow_id: u64,
    pub size_bytes: u32,
    pub route: Vec<NodeId>,
    pub hop: usize, // 当前所在节点在 route 中的索引
    pub transport: Transport,
}

impl Packet {
    /// 获取源节点
    pub fn src(&self) -> Option<NodeId> {
        self.route.first().copied()
    }

    /// 获取目标节点
    pub fn dst(&self) -> Option<NodeId> {
        self.route.last().copied()
    }

    /// 获取当前所在节点
    pub fn at(&self) -> Option<NodeId> {
        self.route.get(self.hop).copied()
    }

    /// 检查是否有下一跳
    pub fn has_next(&self) -> bool {
        self.hop + 1 < self.route.len()
    }

    /// 获取下一跳节点（如果有）
    pub fn next(&self) -> Option<NodeId> {
        self.route.get(self.hop + 1).copied()
    }

    /// 前进到下一跳
    pub fn advance(mut self) -> Self {
        self.hop += 1;
        self
    }
}

/// 单行、无制表符的描述，用于丢包 trace。
impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pkt={} flow={} size={}",
            self.id, self.flow_id, self.size_bytes
        )?;
        if let (Some(src), Some(dst)) = (self.src(), self.dst()) {
            write!(f, " {}->{}", src.0, dst.0)?;
        }
        match &self.transport {
            Transport::None => Ok(()),
            Transport::Tcp(TcpSegment::Data { seq, len }) => {
                write!(f, " tcp-data seq={seq} len={len}")
            }
            Transport::Tcp(TcpSegment::Ack { ack }) => write!(f, " tcp-ack ack={ack}"),
        }
    }
}
