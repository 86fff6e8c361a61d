//! 堆中的一个待执行事件
//!
//! 以 `(at, id)` 排序：时间早的先执行，同一时刻按调度顺序（`EventId` 单调递增）执行。

use super::event::{Event, EventId};
use super::time::SimTime;
use std::cmp::Ordering;

pub struct ScheduledEvent {
    pub(crate) at: SimTime,
    /// 调度时分配的句柄；取消与查询都用它
    pub(crate) id: EventId,
    pub(crate) ev: Box<dyn Event>,
}

impl ScheduledEvent {
    fn key(&self) -> (SimTime, EventId) {
        (self.at, self.id)
    }
}

// BinaryHeap 是大顶堆，这里反转比较结果，让最小的 (at, id) 位于堆顶。
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledEvent {}
