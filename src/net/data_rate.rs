//! 数据速率
//!
//! `DataRate` 以 bit/s 表示链路带宽或应用发送速率，支持 `"5Mbps"` 这类字符串形式。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::SimTime;

/// 数据速率（bit/s）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataRate {
    bps: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateParseError {
    #[error("empty data rate")]
    Empty,
    #[error("invalid number in data rate {0:?}")]
    Number(String),
    #[error("unknown data rate unit {0:?} (expected bps, kbps, Mbps or Gbps)")]
    Unit(String),
    #[error("data rate {0:?} overflows u64 bit/s")]
    Overflow(String),
}

impl DataRate {
    pub const fn from_bps(bps: u64) -> Self {
        Self { bps }
    }

    pub const fn from_kbps(kbps: u64) -> Self {
        Self {
            bps: kbps.saturating_mul(1_000),
        }
    }

    pub const fn from_mbps(mbps: u64) -> Self {
        Self {
            bps: mbps.saturating_mul(1_000_000),
        }
    }

    pub const fn from_gbps(gbps: u64) -> Self {
        Self {
            bps: gbps.saturating_mul(1_000_000_000),
        }
    }

    pub const fn bps(self) -> u64 {
        self.bps
    }

    pub const fn is_zero(self) -> bool {
        self.bps == 0
    }

    /// 以该速率发送 `bytes` 字节所需的时间。
    ///
    /// ceil(bytes*8 / bps) 秒 -> 纳秒；速率为 0 时返回一个极大值。
    pub fn tx_time(self, bytes: u64) -> SimTime {
        if self.bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        self.nanos_for(bytes, self.bps as u128 - 1)
    }

    /// 以该速率发送 `bytes` 字节的理想间隔，四舍五入到纳秒。
    ///
    /// 用于应用层的发送间隔；链路串行化时间用 [`DataRate::tx_time`]。
    pub fn interval(self, bytes: u64) -> SimTime {
        if self.bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        self.nanos_for(bytes, self.bps as u128 / 2)
    }

    /// (bytes*8*1e9 + bias) / bps
    fn nanos_for(self, bytes: u64, bias: u128) -> SimTime {
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128) + bias) / self.bps as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}

impl FromStr for DataRate {
    type Err = RateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RateParseError::Empty);
        }
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: f64 = num
            .parse()
            .map_err(|_| RateParseError::Number(s.to_string()))?;
        let scale = match unit.trim() {
            "" | "bps" | "b/s" => 1.0,
            "kbps" | "Kbps" | "kb/s" => 1e3,
            "Mbps" | "mbps" | "Mb/s" => 1e6,
            "Gbps" | "gbps" | "Gb/s" => 1e9,
            other => return Err(RateParseError::Unit(other.to_string())),
        };
        let bps = (value * scale).round();
        if bps >= u64::MAX as f64 {
            return Err(RateParseError::Overflow(s.to_string()));
        }
        Ok(Self { bps: bps as u64 })
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bps = self.bps;
        if bps != 0 && bps % 1_000_000_000 == 0 {
            write!(f, "{}Gbps", bps / 1_000_000_000)
        } else if bps != 0 && bps % 1_000_000 == 0 {
            write!(f, "{}Mbps", bps / 1_000_000)
        } else if bps != 0 && bps % 1_000 == 0 {
            write!(f, "{}kbps", bps / 1_000)
        } else {
            write!(f, "{bps}bps")
        }
    }
}

impl TryFrom<String> for DataRate {
    type Error = RateParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DataRate> for String {
    fn from(r: DataRate) -> Self {
        r.to_string()
    }
}
