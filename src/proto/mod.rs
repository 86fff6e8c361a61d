//! 传输层/协议模块
//!
//! 包含 TCP 的简化实现（用于仿真实验）以及基于它的流式套接字。

pub mod tcp;
mod tcp_socket;

pub use tcp_socket::TcpSocket;

// Transport tag types live in `net::transport`.
