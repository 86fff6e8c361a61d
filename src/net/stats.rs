//! 统计信息
//!
//! 定义网络仿真统计数据结构。

/// 网络统计信息
#[derive(Debug, Default, Clone)]
pub struct Stats {
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    /// 出口队列溢出（尾丢弃）
    pub queue_drops: u64,
    /// 接收端错误模型丢弃
    pub rx_drops: u64,
}
