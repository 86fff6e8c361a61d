//! 网络持有的 trace 挂载点
//!
//! TCP 栈在拥塞窗口变化时、链路在接收端丢包时调用这里；写 trace 失败只记录日志，
//! 不会影响仿真本身。

use std::io::Write;

use tracing::warn;

use super::sink::{TraceError, TraceSink};
use super::{cwnd_change, rx_drop};
use crate::net::Packet;
use crate::proto::tcp::TcpConnId;
use crate::sim::SimTime;

#[derive(Debug, Default)]
pub struct Tracer {
    cwnd: Option<TraceSink<Box<dyn Write>>>,
    drops: Option<TraceSink<Box<dyn Write>>>,
    cwnd_changes: u64,
    rx_drops: u64,
    write_errors: u64,
}

impl Tracer {
    pub fn set_cwnd_sink(&mut self, sink: TraceSink<Box<dyn Write>>) {
        self.cwnd = Some(sink);
    }

    pub fn set_drop_sink(&mut self, sink: TraceSink<Box<dyn Write>>) {
        self.drops = Some(sink);
    }

    pub fn take_cwnd_sink(&mut self) -> Option<TraceSink<Box<dyn Write>>> {
        self.cwnd.take()
    }

    /// 观测到的拥塞窗口变化次数（无论是否挂了 sink）
    pub fn cwnd_changes(&self) -> u64 {
        self.cwnd_changes
    }

    /// 观测到的接收端丢包次数
    pub fn rx_drops(&self) -> u64 {
        self.rx_drops
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    pub(crate) fn on_cwnd_change(&mut self, now: SimTime, conn: TcpConnId, old: u64, new: u64) {
        self.cwnd_changes += 1;
        let Some(sink) = self.cwnd.as_mut() else {
            return;
        };
        if let Err(e) = cwnd_change(sink, now, old, new) {
            self.write_errors += 1;
            warn!(conn, error = %e, "写 cwnd trace 失败");
        }
    }

    pub(crate) fn on_rx_drop(&mut self, now: SimTime, pkt: &Packet) {
        self.rx_drops += 1;
        let Some(sink) = self.drops.as_mut() else {
            return;
        };
        if let Err(e) = rx_drop(sink, now, pkt) {
            self.write_errors += 1;
            warn!(pkt_id = pkt.id, error = %e, "写丢包 trace 失败");
        }
    }

    /// 刷新所有 sink
    pub fn flush(&mut self) -> Result<(), TraceError> {
        if let Some(sink) = self.cwnd.as_mut() {
            sink.flush()?;
        }
        if let Some(sink) = self.drops.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}
