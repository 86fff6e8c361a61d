//! 应用层
//!
//! 应用安装在 `AppTable`（一个按 `AppId` 索引的 arena）中，生命周期由调度器上的
//! `AppStart` / `AppStop` / `AppSend` 事件驱动。应用返回的错误记录为 `AppFault`，
//! 不会中断仿真中的其他实体。

mod events;
mod paced_source;

use tracing::warn;

use crate::net::Network;
use crate::sim::{EventId, SimTime, Simulator};

pub use events::{AppStart, AppStop};
pub(crate) use events::AppSend;
pub use paced_source::{AppError, PacedSource, PacedSourceConfig};

/// 应用标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AppId(pub usize);

/// 应用在某个仿真时刻返回的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFault {
    pub app: AppId,
    pub at: SimTime,
    pub error: AppError,
}

#[derive(Debug, Default)]
pub struct AppTable {
    slots: Vec<Option<PacedSource>>,
    faults: Vec<AppFault>,
}

impl AppTable {
    /// 安装应用并返回其 id
    pub fn install(&mut self, mut app: PacedSource) -> AppId {
        let id = AppId(self.slots.len());
        app.set_id(id);
        self.slots.push(Some(app));
        id
    }

    pub fn get(&self, id: AppId) -> Option<&PacedSource> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: AppId) -> Option<&mut PacedSource> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// 调度应用在 `start` 启动、在 `stop` 停止
    pub fn schedule_lifecycle(
        &self,
        sim: &mut Simulator,
        app: AppId,
        start: SimTime,
        stop: SimTime,
    ) -> (EventId, EventId) {
        let s = sim.schedule(start, AppStart { app });
        let t = sim.schedule(stop, AppStop { app });
        (s, t)
    }

    pub fn faults(&self) -> &[AppFault] {
        &self.faults
    }

    /// 取出应用执行 `f`，再放回；错误记录为 fault。
    pub(crate) fn with_app<F>(&mut self, id: AppId, sim: &mut Simulator, net: &mut Network, f: F)
    where
        F: FnOnce(&mut PacedSource, &mut Simulator, &mut Network) -> Result<(), AppError>,
    {
        let Some(mut app) = self.slots.get_mut(id.0).and_then(Option::take) else {
            warn!(app = ?id, "应用不存在，忽略事件");
            return;
        };
        if let Err(error) = f(&mut app, sim, net) {
            warn!(app = ?id, now = ?sim.now(), %error, "应用出错");
            self.faults.push(AppFault {
                app: id,
                at: sim.now(),
                error,
            });
        }
        self.slots[id.0] = Some(app);
    }
}
