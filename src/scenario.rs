//! 点到点拥塞窗口实验
//!
//! n0 上的定速发包应用通过 TCP 向 n1 上的监听端口发送数据；记录拥塞窗口变化与
//! n1 接收端的丢包。
//!
//! ```text
//!     n0 (10.1.1.1)                n1 (10.1.1.2)
//!   PacedSource ── TCP ──────────▶ listener :8080
//!        └──────── 5 Mbps, 2 ms ──────┘   (RateErrorModel)
//! ```

use std::net::SocketAddr;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::app::{AppError, AppId, PacedSource, PacedSourceConfig};
use crate::config::{ConfigError, ScenarioConfig};
use crate::net::NetWorld;
use crate::proto::TcpSocket;
use crate::proto::tcp::{TcpConfig, TcpConn};
use crate::sim::Simulator;
use crate::topo::point_to_point::{ErrorModelOpts, PointToPoint, PointToPointOpts, build_point_to_point};
use crate::trace::{TraceError, TraceSink};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Trace(#[from] TraceError),
}

/// 一次运行的汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub final_time_s: f64,
    pub packets_sent: u64,
    pub bytes_written: u64,
    pub bytes_acked: u64,
    pub sink_rx_bytes: u64,
    pub delivered_pkts: u64,
    pub queue_drops: u64,
    pub rx_drops: u64,
    pub retransmits: u64,
    pub cwnd_changes: u64,
    pub final_cwnd_bytes: Option<u64>,
    pub trace_write_errors: u64,
    pub faults: Vec<String>,
}

/// 组装好的实验：调度器、世界、拓扑与应用
pub struct Scenario {
    pub sim: Simulator,
    pub world: NetWorld,
    pub topo: PointToPoint,
    pub app: AppId,
    pub sink: SocketAddr,
    cfg: ScenarioConfig,
}

impl Scenario {
    pub fn build(cfg: &ScenarioConfig) -> Result<Self, ScenarioError> {
        cfg.validate()?;

        let sim = Simulator::default();
        let mut world = NetWorld::default();

        let rx_error = (cfg.error_rate > 0.0).then_some(ErrorModelOpts {
            rate: cfg.error_rate,
            unit: cfg.error_unit,
            seed: cfg.seed,
        });
        let topo = build_point_to_point(
            &mut world,
            &PointToPointOpts {
                data_rate: cfg.link_rate,
                delay: cfg.link_delay(),
                queue_pkts: cfg.queue_pkts,
                ipv6: cfg.ipv6,
                rx_error,
            },
        );

        let mss = cfg.mss as u64;
        world.net.tcp.set_config(TcpConfig {
            mss: cfg.mss,
            init_cwnd_bytes: cfg.init_cwnd_pkts.max(1).saturating_mul(mss),
            snd_buf_bytes: cfg.snd_buf_bytes,
            ..TcpConfig::default()
        });

        let sink = SocketAddr::new(topo.addr1, cfg.sink_port);
        world.net.tcp.listen(sink);

        let mut source = PacedSource::default();
        source.setup(
            Box::new(TcpSocket::new(topo.n0)),
            PacedSourceConfig {
                peer: sink,
                packet_size: cfg.packet_size,
                packet_budget: cfg.packets,
                data_rate: cfg.data_rate,
            },
        )?;
        let app = world.apps.install(source);

        let mut scenario = Self {
            sim,
            world,
            topo,
            app,
            sink,
            cfg: cfg.clone(),
        };
        scenario
            .world
            .apps
            .schedule_lifecycle(&mut scenario.sim, app, cfg.start(), cfg.stop());
        Ok(scenario)
    }

    pub fn set_cwnd_sink(&mut self, sink: TraceSink) {
        self.world.net.tracer.set_cwnd_sink(sink);
    }

    pub fn set_drop_sink(&mut self, sink: TraceSink) {
        self.world.net.tracer.set_drop_sink(sink);
    }

    /// 运行到配置的结束时间
    pub fn run(&mut self) {
        info!(
            link_rate = %self.cfg.link_rate,
            data_rate = %self.cfg.data_rate,
            packets = self.cfg.packets,
            until_ms = self.cfg.until_ms,
            "▶️  点到点实验开始"
        );
        let until = self.cfg.until();
        self.sim.run_until(until, &mut self.world);
    }

    /// 实验中的 TCP 连接（应用启动前不存在）
    pub fn conn(&self) -> Option<&TcpConn> {
        self.world.net.tcp.conns().find(|c| c.peer == self.sink)
    }

    pub fn report(&self) -> ScenarioReport {
        let net = &self.world.net;
        let conn = self.conn();
        let faults = self
            .world
            .apps
            .faults()
            .iter()
            .map(|f| format!("{:.6}s app {}: {}", f.at.as_secs_f64(), f.app.0, f.error))
            .collect();
        ScenarioReport {
            final_time_s: self.sim.now().as_secs_f64(),
            packets_sent: self
                .world
                .apps
                .get(self.app)
                .map_or(0, PacedSource::packets_sent),
            bytes_written: conn.map_or(0, TcpConn::bytes_written),
            bytes_acked: conn.map_or(0, TcpConn::bytes_acked),
            sink_rx_bytes: net.tcp.listener_rx_bytes(self.sink).unwrap_or(0),
            delivered_pkts: net.stats.delivered_pkts,
            queue_drops: net.stats.queue_drops,
            rx_drops: net.stats.rx_drops,
            retransmits: conn.map_or(0, TcpConn::retransmits),
            cwnd_changes: net.tracer.cwnd_changes(),
            final_cwnd_bytes: conn.map(TcpConn::cwnd_bytes),
            trace_write_errors: net.tracer.write_errors(),
            faults,
        }
    }
}

/// 组装并运行一次实验，trace 写入给定 sink。
pub fn run(
    cfg: &ScenarioConfig,
    cwnd: Option<TraceSink>,
    drops: Option<TraceSink>,
) -> Result<ScenarioReport, ScenarioError> {
    let mut scenario = Scenario::build(cfg)?;
    if let Some(sink) = cwnd {
        scenario.set_cwnd_sink(sink);
    }
    if let Some(sink) = drops {
        scenario.set_drop_sink(sink);
    }
    scenario.run();
    scenario.world.net.tracer.flush()?;

    let report = scenario.report();
    info!(
        packets_sent = report.packets_sent,
        sink_rx_bytes = report.sink_rx_bytes,
        rx_drops = report.rx_drops,
        cwnd_changes = report.cwnd_changes,
        "✅ 点到点实验完成"
    );
    Ok(report)
}
