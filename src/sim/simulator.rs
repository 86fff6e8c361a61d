//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列，并支持取消已调度事件。

use super::event::{Event, EventId};
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
///
/// 取消采用惰性删除：被取消的事件仍留在堆中，出队时若已不在 `pending`
/// 集合里则直接跳过。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_id: u64,
    q: BinaryHeap<ScheduledEvent>,
    pending: HashSet<EventId>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 调度事件在指定时间执行（早于当前时间的请求按当前时间处理）
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        let id = EventId(self.next_id);
        let at = at.max(self.now);
        trace!(now = ?self.now, ?id, "调度事件");

        self.next_id = self.next_id.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at,
            id,
            ev: Box::new(ev),
        });
        self.pending.insert(id);

        debug!(queue_size = self.q.len(), "事件已加入队列");
        id
    }

    /// 调度事件在 `delay` 之后执行
    pub fn schedule_after<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev)
    }

    /// 取消尚未执行的事件。
    ///
    /// 返回是否确实取消了一个等待中的事件；对已执行或已取消的事件调用是无操作。
    pub fn cancel(&mut self, id: EventId) -> bool {
        let removed = self.pending.remove(&id);
        trace!(?id, removed, "取消事件");
        removed
    }

    /// 事件是否仍在等待执行
    pub fn is_pending(&self, id: EventId) -> bool {
        self.pending.contains(&id)
    }

    /// 队列中等待执行的事件数（不含已取消的）
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while self.q.peek().is_some_and(|top| top.at <= until) {
            let Some(item) = self.q.pop() else {
                break;
            };
            if !self.pending.remove(&item.id) {
                trace!(id = ?item.id, "跳过已取消事件");
                continue;
            }
            self.now = item.at;
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0u64;
        while let Some(item) = self.q.pop() {
            if !self.pending.remove(&item.id) {
                trace!(id = ?item.id, "跳过已取消事件");
                continue;
            }
            event_count += 1;
            self.now = item.at;

            debug!(
                event_num = event_count,
                now = ?self.now,
                id = ?item.id,
                remaining_queue = self.q.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
