//! 内存模拟协议栈
//!
//! 用于 CLI 的 `--simulate` 演练模式和测试。可以预置邻近设备、拒绝连接的目标、
//! 句柄打开失败和发送失败，并记录所有发送的数据包。
//!
//! inquiry 总是返回全部预置设备，不受 `max_responses` 限制。

use super::{
    ChannelHandle, ChannelKind, ControlChannel, HostError, HostStack, InquiryResult, Link,
    truncate_name,
};
use crate::address::BdAddr;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SimulatedPeer {
    pub address: BdAddr,
    /// `None` 表示名称读取失败
    pub name: Option<String>,
    pub rssi: i16,
}

/// 一次成功发送的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    pub address: BdAddr,
    pub port: u16,
    pub kind: ChannelKind,
    pub len: usize,
    pub first_byte: Option<u8>,
}

#[derive(Default)]
struct SimState {
    peers: Vec<SimulatedPeer>,
    refused: HashSet<BdAddr>,
    fail_open: Option<ChannelKind>,
    send_budget: Option<usize>,
    open_handles: HashMap<ChannelKind, usize>,
    open_links: usize,
    connects: Vec<(BdAddr, u16)>,
    sent: Vec<SentPacket>,
    inquiries: Vec<bool>,
}

/// 可克隆的模拟协议栈，克隆体共享同一份状态
#[derive(Clone, Default)]
pub struct SimulatedHost {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        // 模拟状态没有跨越 panic 的不变量，直接取回内部数据
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn with_peer(self, address: BdAddr, name: Option<&str>, rssi: i16) -> Self {
        self.state().peers.push(SimulatedPeer {
            address,
            name: name.map(str::to_string),
            rssi,
        });
        self
    }

    /// 对该地址的所有连接都会被拒绝
    pub fn refuse(self, address: BdAddr) -> Self {
        self.state().refused.insert(address);
        self
    }

    /// 打开指定类型的句柄时失败
    pub fn fail_open(self, kind: ChannelKind) -> Self {
        self.state().fail_open = Some(kind);
        self
    }

    /// 前 `n` 次发送成功，之后全部失败
    pub fn fail_send_after(self, n: usize) -> Self {
        self.state().send_budget = Some(n);
        self
    }

    /// 当前未释放的句柄和连接总数
    pub fn open_handles(&self) -> usize {
        let state = self.state();
        state.open_handles.values().sum::<usize>() + state.open_links
    }

    pub fn open_handles_of(&self, kind: ChannelKind) -> usize {
        self.state().open_handles.get(&kind).copied().unwrap_or(0)
    }

    pub fn open_links(&self) -> usize {
        self.state().open_links
    }

    pub fn connects(&self) -> Vec<(BdAddr, u16)> {
        self.state().connects.clone()
    }

    pub fn sent_packets(&self) -> Vec<SentPacket> {
        self.state().sent.clone()
    }

    /// 每次 inquiry 的 `flush_cache` 参数
    pub fn inquiries(&self) -> Vec<bool> {
        self.state().inquiries.clone()
    }

    fn open(&self, kind: ChannelKind) -> Result<(), HostError> {
        let mut state = self.state();
        if state.fail_open == Some(kind) {
            return Err(HostError::Unavailable(format!("{kind:?} channel")));
        }
        *state.open_handles.entry(kind).or_default() += 1;
        Ok(())
    }

    fn release(&self, kind: ChannelKind) {
        if let Some(count) = self.state().open_handles.get_mut(&kind) {
            *count = count.saturating_sub(1);
        }
    }
}

#[async_trait]
impl HostStack for SimulatedHost {
    async fn open_control(&self) -> Result<Box<dyn ControlChannel>, HostError> {
        self.open(ChannelKind::Control)?;
        Ok(Box::new(SimControl { host: self.clone() }))
    }

    async fn open_packet_channel(&self) -> Result<Box<dyn ChannelHandle>, HostError> {
        self.open(ChannelKind::Packet)?;
        Ok(Box::new(SimChannel {
            host: self.clone(),
            kind: ChannelKind::Packet,
        }))
    }

    async fn open_stream_channel(&self) -> Result<Box<dyn ChannelHandle>, HostError> {
        self.open(ChannelKind::Stream)?;
        Ok(Box::new(SimChannel {
            host: self.clone(),
            kind: ChannelKind::Stream,
        }))
    }
}

struct SimControl {
    host: SimulatedHost,
}

impl Drop for SimControl {
    fn drop(&mut self) {
        self.host.release(ChannelKind::Control);
    }
}

#[async_trait]
impl ControlChannel for SimControl {
    async fn inquiry(
        &self,
        _max_responses: usize,
        _timeout: Duration,
        flush_cache: bool,
    ) -> Result<Vec<InquiryResult>, HostError> {
        let mut state = self.host.state();
        state.inquiries.push(flush_cache);
        Ok(state
            .peers
            .iter()
            .map(|p| InquiryResult {
                address: p.address,
                rssi: p.rssi,
            })
            .collect())
    }

    async fn read_remote_name(
        &self,
        address: BdAddr,
        max_len: usize,
    ) -> Result<String, HostError> {
        let name = self
            .host
            .state()
            .peers
            .iter()
            .find(|p| p.address == address)
            .and_then(|p| p.name.clone());
        name.map(|n| truncate_name(n, max_len))
            .ok_or_else(|| HostError::NotFound(format!("no name for {address}")))
    }
}

struct SimChannel {
    host: SimulatedHost,
    kind: ChannelKind,
}

impl Drop for SimChannel {
    fn drop(&mut self) {
        self.host.release(self.kind);
    }
}

#[async_trait]
impl ChannelHandle for SimChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn connect(&self, address: BdAddr, port: u16) -> Result<Box<dyn Link>, HostError> {
        let mut state = self.host.state();
        state.connects.push((address, port));
        if state.refused.contains(&address) {
            return Err(HostError::Refused(format!("{address} port {port}")));
        }
        state.open_links += 1;
        drop(state);

        Ok(Box::new(SimLink {
            host: self.host.clone(),
            address,
            port,
            kind: self.kind,
        }))
    }
}

struct SimLink {
    host: SimulatedHost,
    address: BdAddr,
    port: u16,
    kind: ChannelKind,
}

impl Drop for SimLink {
    fn drop(&mut self) {
        let mut state = self.host.state();
        state.open_links = state.open_links.saturating_sub(1);
    }
}

#[async_trait]
impl Link for SimLink {
    async fn send(&mut self, data: &[u8]) -> Result<usize, HostError> {
        let mut state = self.host.state();
        if let Some(budget) = state.send_budget.as_mut() {
            if *budget == 0 {
                return Err(HostError::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionReset,
                )));
            }
            *budget -= 1;
        }
        state.sent.push(SentPacket {
            address: self.address,
            port: self.port,
            kind: self.kind,
            len: data.len(),
            first_byte: data.first().copied(),
        });
        Ok(data.len())
    }
}
