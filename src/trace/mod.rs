//! Trace 输出
//!
//! 两个纯观测回调：拥塞窗口变化与接收端丢包。它们只向 sink 追加一行，
//! 不触碰调度器、套接字或应用状态。

mod sink;
mod tracer;

use std::io::Write;

use tracing::{debug, info};

use crate::net::Packet;
use crate::sim::SimTime;

pub use sink::{TraceError, TraceSink};
pub use tracer::Tracer;

/// 记录一次拥塞窗口变化：`<time>\t<old>\t<new>`
pub fn cwnd_change<W: Write>(
    sink: &mut TraceSink<W>,
    now: SimTime,
    old: u64,
    new: u64,
) -> Result<(), TraceError> {
    debug!(t = now.as_secs_f64(), old, new, "cwnd");
    sink.append(now, &[&old, &new])
}

/// 记录一次接收端丢包：`<time>\t<packet>`
pub fn rx_drop<W: Write>(sink: &mut TraceSink<W>, now: SimTime, pkt: &Packet) -> Result<(), TraceError> {
    info!(t = now.as_secs_f64(), pkt_id = pkt.id, "RxDrop");
    sink.append(now, &[pkt])
}
