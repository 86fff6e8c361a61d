//! 世界 trait
//!
//! 事件执行时拿到的是 `&mut dyn World`，需要的话再还原成具体类型。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：持有事件要操作的全部业务状态（网络、应用表等）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每执行完一个事件后调用
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}

/// 把 `&mut dyn World` 还原成具体的世界类型；类型不符时返回 None。
pub fn downcast_world<W: World>(world: &mut dyn World) -> Option<&mut W> {
    world.as_any_mut().downcast_mut::<W>()
}
