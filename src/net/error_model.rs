//! 接收端错误模型
//!
//! 在链路接收端按给定错误率丢弃（视为损坏）数据包，用于在 TCP 流中制造丢包。

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::packet::Packet;

/// 错误率作用的单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ErrorUnit {
    Bit,
    #[default]
    Byte,
    Packet,
}

/// 错误模型抽象
pub trait ErrorModel: fmt::Debug {
    /// 该包是否在接收时损坏（应被丢弃）
    fn is_corrupt(&mut self, pkt: &Packet) -> bool;
}

/// 按比率随机丢包的错误模型（可复现：由种子决定）。
#[derive(Debug)]
pub struct RateErrorModel {
    rate: f64,
    unit: ErrorUnit,
    rng: StdRng,
}

impl RateErrorModel {
    pub fn new(rate: f64, unit: ErrorUnit, seed: u64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            unit,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// 单个包被判定损坏的概率：1 - (1 - rate)^units
    pub(crate) fn packet_error_probability(&self, size_bytes: u32) -> f64 {
        let units = match self.unit {
            ErrorUnit::Packet => return self.rate,
            ErrorUnit::Byte => size_bytes as f64,
            ErrorUnit::Bit => size_bytes as f64 * 8.0,
        };
        (1.0 - (1.0 - self.rate).powf(units)).clamp(0.0, 1.0)
    }
}

impl ErrorModel for RateErrorModel {
    fn is_corrupt(&mut self, pkt: &Packet) -> bool {
        let p = self.packet_error_probability(pkt.size_bytes);
        if p <= 0.0 {
            return false;
        }
        self.rng.gen_bool(p)
    }
}
