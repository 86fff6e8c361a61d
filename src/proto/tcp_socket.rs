//! Stream socket backed by the simplified TCP stack.

use std::net::SocketAddr;

use tracing::{debug, info};

use super::tcp::{TcpConn, TcpConnId};
use crate::net::{Network, NodeId, Socket, SocketError};
use crate::sim::Simulator;

/// A TCP socket owned by an application running on `node`.
///
/// Connecting assumes an established connection (no handshake is modelled);
/// it only checks that a listener exists at the peer and that the two nodes
/// share a direct link in both directions.
#[derive(Debug)]
pub struct TcpSocket {
    node: NodeId,
    local: Option<SocketAddr>,
    conn: Option<TcpConnId>,
    closed: bool,
}

impl TcpSocket {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            local: None,
            conn: None,
            closed: false,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local
    }

    /// Connection backing this socket, once connected.
    pub fn conn_id(&self) -> Option<TcpConnId> {
        self.conn
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn bind(&mut self, net: &mut Network, v6: bool) -> Result<SocketAddr, SocketError> {
        if self.closed {
            return Err(SocketError::Closed);
        }
        if let Some(local) = self.local {
            return Err(SocketError::AlreadyBound(local));
        }
        let family = if v6 { "IPv6" } else { "IPv4" };
        let ip = net
            .node_addr(self.node, v6)
            .ok_or(SocketError::AddressUnavailable { family })?;
        let local = net.tcp.alloc_ephemeral(ip);
        debug!(node = %self.node, %local, "socket bound");
        self.local = Some(local);
        Ok(local)
    }
}

impl Socket for TcpSocket {
    fn bind_v4(&mut self, net: &mut Network) -> Result<SocketAddr, SocketError> {
        self.bind(net, false)
    }

    fn bind_v6(&mut self, net: &mut Network) -> Result<SocketAddr, SocketError> {
        self.bind(net, true)
    }

    fn connect(
        &mut self,
        peer: SocketAddr,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<(), SocketError> {
        if self.closed {
            return Err(SocketError::Closed);
        }
        let local = self.local.ok_or(SocketError::NotBound)?;
        if local.is_ipv4() != peer.is_ipv4() {
            return Err(SocketError::AddressFamilyMismatch { local, peer });
        }
        if !net.tcp.is_listening(peer) {
            return Err(SocketError::ConnectionRefused(peer));
        }
        let dst = net
            .node_by_addr(peer.ip())
            .ok_or(SocketError::NoRoute(peer))?;
        let route = net
            .direct_route(self.node, dst)
            .filter(|_| net.direct_route(dst, self.node).is_some())
            .ok_or(SocketError::NoRoute(peer))?;

        let id = net.tcp.next_conn_id();
        let cfg = net.tcp.config().clone();
        net.tcp.insert(TcpConn::new(id, local, peer, route, cfg));
        self.conn = Some(id);
        info!(conn_id = id, %local, %peer, now = ?sim.now(), "🔗 TCP 连接建立");
        Ok(())
    }

    fn send(
        &mut self,
        payload: &[u8],
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<usize, SocketError> {
        if self.closed {
            return Err(SocketError::Closed);
        }
        let id = self.conn.ok_or(SocketError::NotConnected)?;

        // 规避同时借用 `net` 与 `net.tcp`
        let mut tcp = std::mem::take(&mut net.tcp);
        let result = tcp.app_send(id, payload.len() as u64, sim, net);
        net.tcp = tcp;
        result.map(|n| n as usize)
    }

    fn close(&mut self, _sim: &mut Simulator, net: &mut Network) -> Result<(), SocketError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(id) = self.conn {
            net.tcp.close(id);
        }
        Ok(())
    }
}
