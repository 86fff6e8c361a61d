//! 网络世界实现
//!
//! 定义网络仿真的世界（World）实现，持有网络拓扑与已安装的应用。

use super::network::Network;
use crate::app::AppTable;
use crate::sim::{World, downcast_world};
use std::any::Any;

/// 默认的网络世界：持有 Network 与应用表。
#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
    pub apps: AppTable,
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// 事件执行时取回 NetWorld。
pub(crate) fn net_world(world: &mut dyn World) -> &mut NetWorld {
    downcast_world::<NetWorld>(world).expect("world must be NetWorld")
}
