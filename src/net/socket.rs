//! Transport socket abstraction used by applications.
//!
//! Applications only see this trait; the concrete stream socket lives in
//! `proto::tcp`. Every operation receives the simulator and the network
//! explicitly, so a socket never holds references into the world.

use std::fmt;
use std::net::SocketAddr;

use thiserror::Error;

use super::Network;
use crate::sim::Simulator;

/// Socket-level failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SocketError {
    #[error("socket is already bound to {0}")]
    AlreadyBound(SocketAddr),
    #[error("socket is not bound")]
    NotBound,
    #[error("node has no {family} address to bind to")]
    AddressUnavailable { family: &'static str },
    #[error("cannot connect {local} to {peer}: address family mismatch")]
    AddressFamilyMismatch { local: SocketAddr, peer: SocketAddr },
    #[error("connection refused by {0}")]
    ConnectionRefused(SocketAddr),
    #[error("no route to {0}")]
    NoRoute(SocketAddr),
    #[error("socket is not connected")]
    NotConnected,
    #[error("socket is closed")]
    Closed,
    #[error("send buffer full ({buffered} of {capacity} bytes in use)")]
    SendBufferFull { buffered: u64, capacity: u64 },
}

/// Minimal stream-socket API for applications.
pub trait Socket: fmt::Debug {
    /// Bind to an IPv4 address of the owning node (ephemeral port).
    fn bind_v4(&mut self, net: &mut Network) -> Result<SocketAddr, SocketError>;
    /// Bind to an IPv6 address of the owning node (ephemeral port).
    fn bind_v6(&mut self, net: &mut Network) -> Result<SocketAddr, SocketError>;
    fn connect(
        &mut self,
        peer: SocketAddr,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SocketError>;
    /// Queue `payload` for transmission; returns the number of bytes accepted.
    fn send(
        &mut self,
        payload: &[u8],
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<usize, SocketError>;
    /// Close the socket. Closing twice is not an error.
    fn close(&mut self, sim: &mut Simulator, net: &mut Network) -> Result<(), SocketError>;
}
