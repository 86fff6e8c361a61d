//! 队列策略（Queue disciplines）
//!
//! 点到点设备的出口队列；目前只有 DropTail（尾丢弃）。

use crate::net::Packet;

mod drop_tail;

pub use drop_tail::DropTailQueue;

/// 设备出口队列的默认深度（包个数）
pub const DEFAULT_QUEUE_PKTS: u64 = 100;

/// 队列容量上限。
///
/// 设备队列通常按包个数配置（`MaxSize = 100p`），与包的大小无关；
/// 也可以按字节数限制。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueLimit {
    Packets(u64),
    Bytes(u64),
}

impl Default for QueueLimit {
    fn default() -> Self {
        QueueLimit::Packets(DEFAULT_QUEUE_PKTS)
    }
}

impl QueueLimit {
    /// 当前占用 `len` 个包 / `bytes` 字节时，能否再放入 `size` 字节的包
    pub fn admits(self, len: usize, bytes: u64, size: u64) -> bool {
        match self {
            QueueLimit::Packets(max) => (len as u64) < max,
            QueueLimit::Bytes(max) => bytes.saturating_add(size) <= max,
        }
    }
}

/// Packet 队列抽象
pub trait PacketQueue: std::fmt::Debug {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet>;
    /// 出队：按队列策略返回下一个 packet
    fn dequeue(&mut self) -> Option<Packet>;

    fn len(&self) -> usize;
    fn bytes(&self) -> u64;
    fn limit(&self) -> QueueLimit;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
