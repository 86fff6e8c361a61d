//! DropTail（尾丢弃）队列
//!
//! 先进先出；放不下时丢弃新到的包，已排队的包不受影响。

use std::collections::VecDeque;

use tracing::trace;

use super::{PacketQueue, QueueLimit};
use crate::net::Packet;

#[derive(Debug, Default)]
pub struct DropTailQueue {
    limit: QueueLimit,
    cur_bytes: u64,
    q: VecDeque<Packet>,
}

impl DropTailQueue {
    pub fn new(limit: QueueLimit) -> Self {
        Self {
            limit,
            cur_bytes: 0,
            q: VecDeque::new(),
        }
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        let size = pkt.size_bytes as u64;
        if !self.limit.admits(self.q.len(), self.cur_bytes, size) {
            trace!(pkt_id = pkt.id, limit = ?self.limit, len = self.q.len(), "队列已满");
            return Err(pkt);
        }
        self.cur_bytes += size;
        self.q.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Packet> {
        let pkt = self.q.pop_front()?;
        self.cur_bytes -= pkt.size_bytes as u64;
        Some(pkt)
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn bytes(&self) -> u64 {
        self.cur_bytes
    }

    fn limit(&self) -> QueueLimit {
        self.limit
    }
}
