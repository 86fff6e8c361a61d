//! 定速发包应用
//!
//! 启动后以固定速率向已连接的套接字写入定长数据包，直到发满预算或被停止。
//! 发送间隔只由 `packet_size * 8 / data_rate` 决定，不感知传输层的拥塞控制。

use std::net::SocketAddr;

use thiserror::Error;
use tracing::{debug, info, trace};

use super::AppId;
use super::AppSend;
use crate::net::{DataRate, Network, Socket, SocketError};
use crate::sim::{EventId, SimTime, Simulator};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfiguration {
        field: &'static str,
        reason: &'static str,
    },
    #[error("application has not been set up")]
    NotConfigured,
    #[error("application is already running")]
    DoubleStart,
    #[error("cannot reconfigure a running application")]
    ReconfigureWhileRunning,
    #[error("application is already configured")]
    AlreadyConfigured,
    #[error("transport error: {0}")]
    Transport(#[from] SocketError),
}

/// 定速发包应用的参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacedSourceConfig {
    pub peer: SocketAddr,
    /// 每个包的字节数
    pub packet_size: u32,
    /// 总共发送的包数
    pub packet_budget: u64,
    pub data_rate: DataRate,
}

impl PacedSourceConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.packet_size == 0 {
            return Err(AppError::InvalidConfiguration {
                field: "packet_size",
                reason: "must be positive",
            });
        }
        if self.packet_budget == 0 {
            return Err(AppError::InvalidConfiguration {
                field: "packet_budget",
                reason: "must be positive",
            });
        }
        if self.data_rate.is_zero() {
            return Err(AppError::InvalidConfiguration {
                field: "data_rate",
                reason: "must be positive",
            });
        }
        Ok(())
    }

    /// 相邻两次发送之间的间隔
    pub fn interval(&self) -> SimTime {
        self.data_rate.interval(self.packet_size as u64)
    }
}

/// Paced packet source.
///
/// Created empty, configured once with [`PacedSource::setup`], then driven by
/// `AppStart` / `AppSend` / `AppStop` events through the [`super::AppTable`].
#[derive(Debug, Default)]
pub struct PacedSource {
    id: AppId,
    socket: Option<Box<dyn Socket>>,
    cfg: Option<PacedSourceConfig>,
    pending_send: Option<EventId>,
    running: bool,
    packets_sent: u64,
}

impl PacedSource {
    pub fn id(&self) -> AppId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: AppId) {
        self.id = id;
    }

    pub fn config(&self) -> Option<&PacedSourceConfig> {
        self.cfg.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn pending_send(&self) -> Option<EventId> {
        self.pending_send
    }

    /// 绑定套接字与发送参数；不产生任何网络活动。只能配置一次。
    pub fn setup(&mut self, socket: Box<dyn Socket>, cfg: PacedSourceConfig) -> Result<(), AppError> {
        if self.running {
            return Err(AppError::ReconfigureWhileRunning);
        }
        if self.socket.is_some() {
            return Err(AppError::AlreadyConfigured);
        }
        cfg.validate()?;
        debug!(app = ?self.id, peer = %cfg.peer, packet_size = cfg.packet_size, packet_budget = cfg.packet_budget, data_rate = %cfg.data_rate, "配置定速发包应用");
        self.socket = Some(socket);
        self.cfg = Some(cfg);
        Ok(())
    }

    /// 启动：按对端地址族绑定、连接，然后立即发送第一个包。
    #[tracing::instrument(skip(self, sim, net), fields(app = ?self.id))]
    pub fn start(&mut self, sim: &mut Simulator, net: &mut Network) -> Result<(), AppError> {
        if self.running {
            return Err(AppError::DoubleStart);
        }
        let (Some(socket), Some(cfg)) = (self.socket.as_mut(), self.cfg.as_ref()) else {
            return Err(AppError::NotConfigured);
        };

        self.running = true;
        self.packets_sent = 0;

        let peer = cfg.peer;
        let connected = if peer.is_ipv4() {
            socket.bind_v4(net)
        } else {
            socket.bind_v6(net)
        }
        .and_then(|_| socket.connect(peer, sim, net));
        if let Err(e) = connected {
            self.running = false;
            return Err(e.into());
        }

        info!(peer = %peer, now = ?sim.now(), "🚀 应用启动");
        self.send_packet(sim, net)
    }

    /// 停止：取消待发事件并关闭套接字。可重复调用。
    #[tracing::instrument(skip(self, sim, net), fields(app = ?self.id))]
    pub fn stop(&mut self, sim: &mut Simulator, net: &mut Network) -> Result<(), AppError> {
        let was_running = self.running;
        self.running = false;
        if let Some(ev) = self.pending_send.take() {
            sim.cancel(ev);
        }
        if let Some(socket) = self.socket.as_mut() {
            socket.close(sim, net)?;
        }
        if was_running {
            info!(packets_sent = self.packets_sent, now = ?sim.now(), "🛑 应用停止");
        }
        Ok(())
    }

    /// 发送一个包；未达到预算时调度下一次发送。
    ///
    /// 由 `start` 同步调用一次，之后由 `AppSend` 事件调用。停止后触发的事件什么都不做。
    /// 进入时取消尚未触发的下一次发送，保证任何时刻至多一个待发事件。
    pub(crate) fn send_packet(&mut self, sim: &mut Simulator, net: &mut Network) -> Result<(), AppError> {
        if let Some(ev) = self.pending_send.take() {
            sim.cancel(ev);
        }
        if !self.running {
            trace!(app = ?self.id, "应用未运行，忽略发送");
            return Ok(());
        }
        let (Some(socket), Some(cfg)) = (self.socket.as_mut(), self.cfg.as_ref()) else {
            self.running = false;
            return Err(AppError::NotConfigured);
        };
        if self.packets_sent >= cfg.packet_budget {
            return Ok(());
        }

        let payload = vec![0u8; cfg.packet_size as usize];
        if let Err(e) = socket.send(&payload, sim, net) {
            self.running = false;
            return Err(e.into());
        }
        self.packets_sent += 1;
        trace!(app = ?self.id, packets_sent = self.packets_sent, now = ?sim.now(), "发送一个包");

        if self.packets_sent < cfg.packet_budget {
            self.schedule_tx(sim);
        } else {
            debug!(app = ?self.id, packets_sent = self.packets_sent, "发送预算已用完");
        }
        Ok(())
    }

    fn schedule_tx(&mut self, sim: &mut Simulator) {
        if !self.running {
            return;
        }
        let Some(cfg) = self.cfg.as_ref() else {
            return;
        };
        let next = cfg.interval();
        self.pending_send = Some(sim.schedule_after(next, AppSend { app: self.id }));
    }
}
