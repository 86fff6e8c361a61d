//! 点到点 TCP 拥塞窗口实验
//!
//! n0 上的定速发包应用经 5 Mbps / 2 ms 链路向 n1 发送 TCP 数据，n1 接收端按错误率丢包；
//! 拥塞窗口变化与接收端丢包分别写入两个 trace 文件。

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use cwnd_sim::config::ScenarioConfig;
use cwnd_sim::net::{DataRate, ErrorUnit};
use cwnd_sim::scenario;
use cwnd_sim::trace::TraceSink;

#[derive(Debug, Parser)]
#[command(name = "congestion", about = "点到点仿真：n0->n1 定速应用驱动的单流 TCP，记录 cwnd 与丢包")]
struct Args {
    /// JSON 场景文件；给出时替代下面所有仿真参数（输出路径除外）
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// 应用发送速率（例如 1Mbps）
    #[arg(long, default_value = "1Mbps")]
    data_rate: DataRate,

    /// 点到点链路带宽
    #[arg(long, default_value = "5Mbps")]
    link_rate: DataRate,

    /// 单向链路传播时延（微秒）
    #[arg(long, default_value_t = 2_000)]
    link_delay_us: u64,

    /// 应用每个包的字节数
    #[arg(long, default_value_t = 1040)]
    packet_size: u32,

    /// 应用发送的包数
    #[arg(long, default_value_t = 1000)]
    packets: u64,

    /// 应用启动时间（毫秒）
    #[arg(long, default_value_t = 1_000)]
    start_ms: u64,

    /// 应用停止时间（毫秒）
    #[arg(long, default_value_t = 20_000)]
    stop_ms: u64,

    /// 仿真运行到多少毫秒
    #[arg(long, default_value_t = 20_000)]
    until_ms: u64,

    /// n1 接收端错误率；0 表示不丢包
    #[arg(long, default_value_t = 0.00001)]
    error_rate: f64,

    /// 错误率的单位
    #[arg(long, value_enum, default_value_t = ErrorUnit::Byte)]
    error_unit: ErrorUnit,

    /// 错误模型随机种子
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// 设备出口队列深度（包个数）
    #[arg(long, default_value_t = 100)]
    queue_pkts: u64,

    /// MSS（每个 TCP 数据段载荷大小，字节）
    #[arg(long, default_value_t = 536)]
    mss: u32,

    /// 初始 cwnd（单位：MSS 个数）
    #[arg(long, default_value_t = 1)]
    init_cwnd_pkts: u64,

    /// TCP 发送缓冲区（字节）
    #[arg(long, default_value_t = 131_072)]
    snd_buf_bytes: u64,

    /// 使用 IPv6 地址
    #[arg(long, default_value_t = false)]
    ipv6: bool,

    /// n1 上的监听端口
    #[arg(long, default_value_t = 8080)]
    sink_port: u16,

    /// 拥塞窗口 trace 输出
    #[arg(long, default_value = "congestion.cwnd")]
    cwnd_trace: PathBuf,

    /// 接收端丢包 trace 输出
    #[arg(long, default_value = "congestion.drops")]
    drop_trace: PathBuf,

    /// 输出 JSON 汇总；不填则不生成
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

impl Args {
    fn scenario_config(&self) -> ScenarioConfig {
        ScenarioConfig {
            link_rate: self.link_rate,
            link_delay_us: self.link_delay_us,
            queue_pkts: self.queue_pkts,
            ipv6: self.ipv6,
            error_rate: self.error_rate,
            error_unit: self.error_unit,
            seed: self.seed,
            sink_port: self.sink_port,
            packet_size: self.packet_size,
            packets: self.packets,
            data_rate: self.data_rate,
            start_ms: self.start_ms,
            stop_ms: self.stop_ms,
            until_ms: self.until_ms,
            mss: self.mss,
            init_cwnd_pkts: self.init_cwnd_pkts,
            snd_buf_bytes: self.snd_buf_bytes,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = match &args.scenario {
        Some(path) => ScenarioConfig::load(path)?,
        None => args.scenario_config(),
    };

    let cwnd = TraceSink::create(&args.cwnd_trace)?;
    let drops = TraceSink::create(&args.drop_trace)?;
    let report = scenario::run(&cfg, Some(cwnd), Some(drops))?;

    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)?;
        eprintln!("wrote summary to {}", path.display());
    }

    println!(
        "done @ {:.3}s\n  app: packets_sent={}, faults={}\n  tcp: written_bytes={}, acked_bytes={}, retransmits={}, final_cwnd={:?}, cwnd_changes={}\n  sink: rx_bytes={}\n  net: delivered_pkts={}, queue_drops={}, rx_drops={}",
        report.final_time_s,
        report.packets_sent,
        report.faults.len(),
        report.bytes_written,
        report.bytes_acked,
        report.retransmits,
        report.final_cwnd_bytes,
        report.cwnd_changes,
        report.sink_rx_bytes,
        report.delivered_pkts,
        report.queue_drops,
        report.rx_drops,
    );
    Ok(())
}
