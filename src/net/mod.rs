//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件，如节点、链路、数据包、地址和套接字抽象。

// 子模块声明
mod data_rate;
mod deliver_packet;
mod error_model;
mod id;
mod link;
mod link_ready;
mod net_world;
mod network;
mod network_proto;
mod node;
mod packet;
mod socket;
mod stats;
mod transport;

// 重新导出公共接口
pub use data_rate::{DataRate, RateParseError};
pub use deliver_packet::DeliverPacket;
pub use error_model::{ErrorModel, ErrorUnit, RateErrorModel};
pub use id::{LinkId, NodeId};
pub use link::Link;
pub use link_ready::LinkReady;
pub use net_world::NetWorld;
pub(crate) use net_world::net_world;
pub use network::Network;
pub use node::{Host, Node};
pub use packet::Packet;
pub use socket::{Socket, SocketError};
pub use stats::Stats;
pub use transport::{TcpSegment, Transport};
