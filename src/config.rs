//! 场景配置
//!
//! 一次点到点拥塞窗口实验的全部参数；可由 JSON 文件加载（缺省字段取默认值），
//! 也可由命令行参数构造。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::{DataRate, ErrorUnit};
use crate::sim::SimTime;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid scenario: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// 点到点链路带宽
    pub link_rate: DataRate,
    /// 单向传播时延（微秒）
    pub link_delay_us: u64,
    /// 设备出口队列深度（包个数）
    pub queue_pkts: u64,
    pub ipv6: bool,

    /// 接收端错误率（0 表示不安装错误模型）
    pub error_rate: f64,
    pub error_unit: ErrorUnit,
    pub seed: u64,

    /// 接收端监听端口
    pub sink_port: u16,
    /// 应用每个包的字节数
    pub packet_size: u32,
    /// 应用发送的包数
    pub packets: u64,
    /// 应用发送速率
    pub data_rate: DataRate,
    pub start_ms: u64,
    pub stop_ms: u64,
    /// 仿真运行到多少毫秒
    pub until_ms: u64,

    /// TCP 段载荷大小
    pub mss: u32,
    /// 初始 cwnd（MSS 个数）
    pub init_cwnd_pkts: u64,
    /// 发送缓冲区（字节）
    pub snd_buf_bytes: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            link_rate: DataRate::from_mbps(5),
            link_delay_us: 2_000,
            queue_pkts: 100,
            ipv6: false,
            error_rate: 0.00001,
            error_unit: ErrorUnit::Byte,
            seed: 1,
            sink_port: 8080,
            packet_size: 1040,
            packets: 1000,
            data_rate: DataRate::from_mbps(1),
            start_ms: 1_000,
            stop_ms: 20_000,
            until_ms: 20_000,
            mss: 536,
            init_cwnd_pkts: 1,
            snd_buf_bytes: 128 * 1024,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl ScenarioConfig {
    /// 从 JSON 文件加载并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_json(&raw)?;
        Ok(cfg)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.link_rate.is_zero() {
            return Err(invalid("link_rate", "must be positive"));
        }
        if self.data_rate.is_zero() {
            return Err(invalid("data_rate", "must be positive"));
        }
        if self.packet_size == 0 {
            return Err(invalid("packet_size", "must be positive"));
        }
        if self.packets == 0 {
            return Err(invalid("packets", "must be positive"));
        }
        if self.mss == 0 {
            return Err(invalid("mss", "must be positive"));
        }
        if self.queue_pkts == 0 {
            return Err(invalid("queue_pkts", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(invalid(
                "error_rate",
                format!("must be within [0, 1], got {}", self.error_rate),
            ));
        }
        if self.stop_ms < self.start_ms {
            return Err(invalid(
                "stop_ms",
                format!("{} is before start_ms {}", self.stop_ms, self.start_ms),
            ));
        }
        Ok(())
    }

    pub fn link_delay(&self) -> SimTime {
        SimTime::from_micros(self.link_delay_us)
    }

    pub fn start(&self) -> SimTime {
        SimTime::from_millis(self.start_ms)
    }

    pub fn stop(&self) -> SimTime {
        SimTime::from_millis(self.stop_ms)
    }

    pub fn until(&self) -> SimTime {
        SimTime::from_millis(self.until_ms)
    }
}
