//! TCP（简化版）协议实现
//!
//! 目标：支持一个点到点 TCP 拥塞窗口实验所需的最小功能：
//! - 字节流发送缓冲区（应用写入多少就发多少）
//! - 数据段/ACK 段，接收端缓存乱序段并发送累计 ACK
//! - Reno 风格的拥塞控制（慢启动 + AIMD，含 3 dupACK 快速重传与 NewReno 式部分确认）
//! - 超时重传（每连接一个可取消的 RTO 定时器，指数退避）
//!
//! 注意：这是仿真用途的“极简 TCP”，不实现握手/窗口通告/选择确认/RTT 估计等。
//! 每次拥塞窗口变化都会报告给 `Network::tracer`。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};

use tracing::{debug, info, trace};

use crate::net::{Network, NodeId, SocketError, TcpSegment, Transport, net_world};
use crate::sim::{Event, EventId, SimTime, Simulator, World};

/// 一个 TCP 连接的唯一标识（复用 `flow_id` 的语义）。
pub type TcpConnId = u64;

/// 临时端口起点
const EPHEMERAL_PORT_START: u16 = 49153;

#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// MSS（数据段载荷大小，字节）
    pub mss: u32,
    /// TCP/IP 头部开销（字节）；ACK 包大小即为该值
    pub header_bytes: u32,
    /// 初始 cwnd（字节）
    pub init_cwnd_bytes: u64,
    /// 初始 ssthresh（字节）
    pub init_ssthresh_bytes: u64,
    /// 初始 RTO
    pub init_rto: SimTime,
    /// 最小 RTO
    pub min_rto: SimTime,
    /// 最大 RTO（用于退避上限）
    pub max_rto: SimTime,
    /// 发送缓冲区大小（字节）：已写入但未被确认的数据上限
    pub snd_buf_bytes: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        let mss = 1460;
        Self {
            mss,
            header_bytes: 40,
            init_cwnd_bytes: (mss as u64).saturating_mul(10),
            init_ssthresh_bytes: u64::MAX / 2,
            init_rto: SimTime::from_secs(1),
            min_rto: SimTime::from_millis(200),
            max_rto: SimTime::from_secs(60),
            snd_buf_bytes: 128 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TcpConn {
    pub id: TcpConnId,
    pub src: NodeId,
    pub dst: NodeId,
    pub local: SocketAddr,
    pub peer: SocketAddr,
    pub fwd_route: Vec<NodeId>,
    pub rev_route: Vec<NodeId>,
    pub cfg: TcpConfig,

    // sender
    app_bytes: u64,
    next_seq: u64,
    last_acked: u64,
    cwnd_bytes: u64,
    ssthresh_bytes: u64,
    dup_acks: u32,
    /// 快速恢复中：`recover` 为进入恢复时的 next_seq
    recover: Option<u64>,
    rto: SimTime,
    rto_timer: Option<EventId>,
    inflight: BTreeMap<u64, u32>, // seq -> len
    closed: bool,

    // receiver
    rcv_nxt: u64,
    ooo: BTreeMap<u64, u32>,

    // stats
    retransmits: u64,
}

impl TcpConn {
    pub fn new(
        id: TcpConnId,
        local: SocketAddr,
        peer: SocketAddr,
        fwd_route: Vec<NodeId>,
        cfg: TcpConfig,
    ) -> Self {
        let mut rev_route = fwd_route.clone();
        rev_route.reverse();
        let src = fwd_route.first().copied().unwrap_or(NodeId(0));
        let dst = fwd_route.last().copied().unwrap_or(src);
        let rto = cfg.init_rto.max(cfg.min_rto);
        let cwnd = cfg.init_cwnd_bytes.max(cfg.mss as u64);
        let ssthresh = cfg.init_ssthresh_bytes.max(cfg.mss as u64);
        Self {
            id,
            src,
            dst,
            local,
            peer,
            fwd_route,
            rev_route,
            cfg,
            app_bytes: 0,
            next_seq: 0,
            last_acked: 0,
            cwnd_bytes: cwnd,
            ssthresh_bytes: ssthresh,
            dup_acks: 0,
            recover: None,
            rto,
            rto_timer: None,
            inflight: BTreeMap::new(),
            closed: false,
            rcv_nxt: 0,
            ooo: BTreeMap::new(),
            retransmits: 0,
        }
    }

    pub fn cwnd_bytes(&self) -> u64 {
        self.cwnd_bytes
    }

    pub fn ssthresh_bytes(&self) -> u64 {
        self.ssthresh_bytes
    }

    /// 应用累计写入的字节数
    pub fn bytes_written(&self) -> u64 {
        self.app_bytes
    }

    pub fn bytes_acked(&self) -> u64 {
        self.last_acked
    }

    /// 接收端按序收到的字节数
    pub fn bytes_received(&self) -> u64 {
        self.rcv_nxt
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 所有写入的数据都已被确认
    pub fn is_drained(&self) -> bool {
        self.last_acked >= self.app_bytes
    }

    fn inflight_bytes(&self) -> u64 {
        self.inflight.values().map(|&len| len as u64).sum()
    }

    fn earliest_unacked(&self) -> Option<(u64, u32)> {
        self.inflight.iter().next().map(|(&s, &l)| (s, l))
    }
}

#[derive(Debug)]
pub struct TcpStack {
    cfg: TcpConfig,
    conns: HashMap<TcpConnId, TcpConn>,
    /// 监听地址 -> 已按序收到的字节数
    listeners: HashMap<SocketAddr, u64>,
    bound: HashSet<SocketAddr>,
    next_conn_id: TcpConnId,
    next_port: u16,
}

impl Default for TcpStack {
    fn default() -> Self {
        Self {
            cfg: TcpConfig::default(),
            conns: HashMap::new(),
            listeners: HashMap::new(),
            bound: HashSet::new(),
            next_conn_id: 1,
            next_port: EPHEMERAL_PORT_START,
        }
    }
}

impl TcpStack {
    /// 新连接使用的配置
    pub fn config(&self) -> &TcpConfig {
        &self.cfg
    }

    pub fn set_config(&mut self, cfg: TcpConfig) {
        self.cfg = cfg;
    }

    /// 在 `addr` 上接受连接（类似 packet sink）
    pub fn listen(&mut self, addr: SocketAddr) {
        self.listeners.entry(addr).or_insert(0);
        self.bound.insert(addr);
    }

    pub fn is_listening(&self, addr: SocketAddr) -> bool {
        self.listeners.contains_key(&addr)
    }

    /// 某个监听地址累计按序收到的字节数
    pub fn listener_rx_bytes(&self, addr: SocketAddr) -> Option<u64> {
        self.listeners.get(&addr).copied()
    }

    /// 为 `ip` 分配一个未占用的临时端口
    pub(crate) fn alloc_ephemeral(&mut self, ip: IpAddr) -> SocketAddr {
        loop {
            let port = self.next_port;
            self.next_port = if self.next_port == u16::MAX {
                EPHEMERAL_PORT_START
            } else {
                self.next_port + 1
            };
            let addr = SocketAddr::new(ip, port);
            if self.bound.insert(addr) {
                return addr;
            }
        }
    }

    pub(crate) fn next_conn_id(&mut self) -> TcpConnId {
        let id = self.next_conn_id;
        self.next_conn_id = self.next_conn_id.wrapping_add(1);
        id
    }

    pub fn insert(&mut self, conn: TcpConn) {
        self.conns.insert(conn.id, conn);
    }

    pub fn get(&self, id: TcpConnId) -> Option<&TcpConn> {
        self.conns.get(&id)
    }

    pub fn get_mut(&mut self, id: TcpConnId) -> Option<&mut TcpConn> {
        self.conns.get_mut(&id)
    }

    pub fn conns(&self) -> impl Iterator<Item = &TcpConn> {
        self.conns.values()
    }

    /// 应用写入 `len` 字节；超出发送缓冲区时整体拒绝。
    pub(crate) fn app_send(
        &mut self,
        id: TcpConnId,
        len: u64,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Result<u64, SocketError> {
        let Some(conn) = self.conns.get_mut(&id) else {
            return Err(SocketError::NotConnected);
        };
        if conn.closed {
            return Err(SocketError::Closed);
        }
        let buffered = conn.app_bytes.saturating_sub(conn.last_acked);
        let capacity = conn.cfg.snd_buf_bytes;
        if buffered.saturating_add(len) > capacity {
            return Err(SocketError::SendBufferFull { buffered, capacity });
        }
        conn.app_bytes = conn.app_bytes.saturating_add(len);
        trace!(conn_id = id, len, buffered = buffered + len, "应用写入");
        self.send_data_if_possible(id, sim, net);
        Ok(len)
    }

    /// 关闭连接的发送方向：不再接受新数据，已写入的数据照常发完。
    pub(crate) fn close(&mut self, id: TcpConnId) {
        if let Some(conn) = self.conns.get_mut(&id) {
            conn.closed = true;
            debug!(conn_id = id, unacked = conn.app_bytes - conn.last_acked.min(conn.app_bytes), "关闭连接");
        }
    }

    fn set_cwnd(conn: &mut TcpConn, new: u64, now: SimTime, net: &mut Network) {
        let old = conn.cwnd_bytes;
        if old == new {
            return;
        }
        conn.cwnd_bytes = new;
        net.tracer.on_cwnd_change(now, conn.id, old, new);
    }

    /// 重启 RTO 定时器：取消旧的，若仍有未确认数据则重新调度。
    fn restart_rto(conn: &mut TcpConn, sim: &mut Simulator) {
        if let Some(t) = conn.rto_timer.take() {
            sim.cancel(t);
        }
        if !conn.inflight.is_empty() {
            conn.rto_timer = Some(sim.schedule_after(conn.rto, TcpRto { conn_id: conn.id }));
        }
    }

    fn send_segment(conn: &TcpConn, seq: u64, len: u32, sim: &mut Simulator, net: &mut Network) {
        let size = len.saturating_add(conn.cfg.header_bytes);
        let mut pkt = net.make_packet(conn.id, size, conn.fwd_route.clone());
        pkt.transport = Transport::Tcp(TcpSegment::Data { seq, len });
        net.forward_from(conn.src, pkt, sim);
    }

    pub(crate) fn send_data_if_possible(&mut self, id: TcpConnId, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };

        // 发送窗口：inflight bytes < cwnd
        let mut avail = conn.cwnd_bytes.saturating_sub(conn.inflight_bytes());
        let arm_timer = conn.inflight.is_empty();
        let mut sent_any = false;

        while avail > 0 && conn.next_seq < conn.app_bytes {
            let remain = conn.app_bytes - conn.next_seq;
            let len = (conn.cfg.mss as u64).min(remain).min(avail) as u32;
            if len == 0 {
                break;
            }
            let seq = conn.next_seq;
            conn.next_seq = conn.next_seq.saturating_add(len as u64);
            avail = avail.saturating_sub(len as u64);

            conn.inflight.insert(seq, len);
            Self::send_segment(conn, seq, len, sim, net);
            sent_any = true;
        }

        if sent_any && (arm_timer || conn.rto_timer.is_none()) {
            Self::restart_rto(conn, sim);
        }
    }

    fn send_ack(&self, id: TcpConnId, ack: u64, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get(&id) else {
            return;
        };
        let mut pkt = net.make_packet(conn.id, conn.cfg.header_bytes, conn.rev_route.clone());
        pkt.transport = Transport::Tcp(TcpSegment::Ack { ack });
        net.forward_from(conn.dst, pkt, sim);
    }

    pub fn on_tcp_segment(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        seg: TcpSegment,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        match seg {
            TcpSegment::Data { seq, len } => self.on_data(conn_id, at, seq, len, sim, net),
            TcpSegment::Ack { ack } => self.on_ack(conn_id, at, ack, sim, net),
        }
    }

    fn on_data(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        seq: u64,
        len: u32,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if at != conn.dst {
            return;
        }

        let before = conn.rcv_nxt;
        if seq == conn.rcv_nxt {
            conn.rcv_nxt = conn.rcv_nxt.saturating_add(len as u64);
            // 合并已缓存的乱序段
            while let Some(l) = conn.ooo.remove(&conn.rcv_nxt) {
                conn.rcv_nxt = conn.rcv_nxt.saturating_add(l as u64);
            }
        } else if seq > conn.rcv_nxt {
            conn.ooo.entry(seq).or_insert(len);
        }
        // 已确认过的旧段：什么都不做，只回累计 ACK
        let rcv_nxt = conn.rcv_nxt;
        conn.ooo.retain(|&s, _| s >= rcv_nxt);

        let delivered = conn.rcv_nxt - before;
        if delivered > 0 {
            if let Some(rx) = self.listeners.get_mut(&conn.peer) {
                *rx = rx.saturating_add(delivered);
            }
        }

        // 无论是否乱序，都发累计 ACK（dupACK 体现为 ack 不前进）
        let ack = conn.rcv_nxt;
        self.send_ack(conn_id, ack, sim, net);
    }

    fn on_ack(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        ack: u64,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if at != conn.src {
            return;
        }
        let now = sim.now();
        let mss = conn.cfg.mss as u64;

        if ack > conn.last_acked {
            conn.dup_acks = 0;
            let newly_acked = ack - conn.last_acked;
            conn.last_acked = ack;
            conn.rto = conn.cfg.init_rto.max(conn.cfg.min_rto);

            // 移除已确认段
            while let Some((s, len)) = conn.earliest_unacked() {
                if s.saturating_add(len as u64) <= ack {
                    conn.inflight.remove(&s);
                } else {
                    break;
                }
            }

            match conn.recover {
                Some(recover) if ack < recover => {
                    // 部分确认：立即重传下一个缺口，保持在快速恢复中
                    if let Some((s, len)) = conn.earliest_unacked() {
                        conn.retransmits += 1;
                        Self::send_segment(conn, s, len, sim, net);
                    }
                    let deflated = conn
                        .cwnd_bytes
                        .saturating_sub(newly_acked)
                        .saturating_add(mss)
                        .max(mss);
                    Self::set_cwnd(conn, deflated, now, net);
                }
                Some(_) => {
                    // 完全确认：退出快速恢复，cwnd 回到 ssthresh
                    conn.recover = None;
                    let ssthresh = conn.ssthresh_bytes;
                    Self::set_cwnd(conn, ssthresh, now, net);
                }
                None => {
                    // 拥塞控制：慢启动 / 拥塞避免（极简）
                    let new = if conn.cwnd_bytes < conn.ssthresh_bytes {
                        conn.cwnd_bytes.saturating_add(newly_acked.min(mss))
                    } else {
                        // AIMD：每个 ACK 让 cwnd 以 mss^2/cwnd 增长（至少 +1）
                        let inc = (mss.saturating_mul(mss) / conn.cwnd_bytes.max(1)).max(1);
                        conn.cwnd_bytes.saturating_add(inc)
                    };
                    Self::set_cwnd(conn, new, now, net);
                }
            }

            Self::restart_rto(conn, sim);
            self.send_data_if_possible(conn_id, sim, net);
        } else if ack == conn.last_acked && !conn.inflight.is_empty() {
            conn.dup_acks = conn.dup_acks.saturating_add(1);
            let dup = conn.dup_acks;
            if dup == 3 && conn.recover.is_none() {
                // 快速重传：重传 earliest unacked
                if let Some((seq0, len)) = conn.earliest_unacked() {
                    let flight = conn.inflight_bytes();
                    conn.ssthresh_bytes = (flight / 2).max(2 * mss);
                    conn.recover = Some(conn.next_seq);
                    let new = conn.ssthresh_bytes.saturating_add(3 * mss);
                    Self::set_cwnd(conn, new, now, net);
                    conn.retransmits += 1;
                    info!(conn_id, seq = seq0, "⚡ 3 dupACK，快速重传");
                    Self::send_segment(conn, seq0, len, sim, net);
                }
            } else if dup > 3 && conn.recover.is_some() {
                // 快速恢复：每个额外 dupACK 增加 cwnd 一个 MSS
                let new = conn.cwnd_bytes.saturating_add(mss);
                Self::set_cwnd(conn, new, now, net);
                self.send_data_if_possible(conn_id, sim, net);
            }
        }
    }

    /// RTO 到期：回到慢启动，重传最早未确认段，并退避定时器。
    pub(crate) fn on_rto(&mut self, conn_id: TcpConnId, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        conn.rto_timer = None;
        let Some((seq, len)) = conn.earliest_unacked() else {
            return;
        };

        let now = sim.now();
        let mss = conn.cfg.mss as u64;
        conn.ssthresh_bytes = (conn.inflight_bytes() / 2).max(2 * mss);
        Self::set_cwnd(conn, mss, now, net);
        conn.dup_acks = 0;
        conn.recover = None;
        conn.rto = SimTime((conn.rto.0.saturating_mul(2)).min(conn.cfg.max_rto.0));
        conn.retransmits += 1;

        info!(conn_id, seq, rto = ?conn.rto, "⏰ RTO 超时重传");
        Self::send_segment(conn, seq, len, sim, net);
        Self::restart_rto(conn, sim);
    }
}

/// TCP RTO 事件：由连接的定时器调度，被取消时不会执行
#[derive(Debug)]
pub struct TcpRto {
    pub conn_id: TcpConnId,
}

impl Event for TcpRto {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpRto { conn_id } = *self;
        let w = net_world(world);

        // 规避同时借用 `w.net` 与 `w.net.tcp`
        let mut tcp = std::mem::take(&mut w.net.tcp);
        tcp.on_rto(conn_id, sim, &mut w.net);
        w.net.tcp = tcp;
    }
}
