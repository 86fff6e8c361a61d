//! 应用生命周期事件
//!
//! 事件只携带 `AppId`；执行时从 `NetWorld::apps` 取出对应应用。

use super::AppId;
use super::paced_source::PacedSource;
use crate::net::net_world;
use crate::sim::{Event, Simulator, World};

/// 在指定时间启动应用
#[derive(Debug)]
pub struct AppStart {
    pub app: AppId,
}

/// 在指定时间停止应用
#[derive(Debug)]
pub struct AppStop {
    pub app: AppId,
}

/// 应用自调度的下一次发送
#[derive(Debug)]
pub(crate) struct AppSend {
    pub(crate) app: AppId,
}

impl Event for AppStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AppStart { app } = *self;
        let w = net_world(world);
        w.apps.with_app(app, sim, &mut w.net, PacedSource::start);
    }
}

impl Event for AppStop {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AppStop { app } = *self;
        let w = net_world(world);
        w.apps.with_app(app, sim, &mut w.net, PacedSource::stop);
    }
}

impl Event for AppSend {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AppSend { app } = *self;
        let w = net_world(world);
        w.apps.with_app(app, sim, &mut w.net, PacedSource::send_packet);
    }
}
