//! BlueZ 协议栈实现
//!
//! 控制通道使用 bluer (BlueZ D-Bus)，L2CAP/RFCOMM 通道直接使用内核 socket。
//!
//! BlueZ 没有 `IREQ_CACHE_FLUSH` 的等价物，`flush_cache` 通过在扫描前
//! 移除未配对且未连接的缓存设备实现。

use super::{
    ChannelHandle, ChannelKind, ControlChannel, HostError, HostStack, InquiryResult, Link,
    truncate_name,
};
use crate::address::BdAddr;
use async_trait::async_trait;
use bluer::{AdapterEvent, AddressType, DiscoveryFilter, DiscoveryTransport};
use futures_util::StreamExt;
use log::{debug, info, trace, warn};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// 单次远端名称读取的超时
const NAME_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BluezHost {
    adapter_name: Option<String>,
}

impl BluezHost {
    /// `adapter_name` 为 `None` 时使用默认适配器
    pub fn new(adapter_name: Option<String>) -> Self {
        Self { adapter_name }
    }
}

#[async_trait]
impl HostStack for BluezHost {
    async fn open_control(&self) -> Result<Box<dyn ControlChannel>, HostError> {
        let session = bluer::Session::new().await?;
        let adapter = match &self.adapter_name {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };

        debug!("Powering on adapter '{}'", adapter.name());
        adapter
            .set_powered(true)
            .await
            .map_err(|e| HostError::Unavailable(format!("{}: {e}", adapter.name())))?;

        Ok(Box::new(BluezControl {
            _session: session,
            adapter,
        }))
    }

    async fn open_packet_channel(&self) -> Result<Box<dyn ChannelHandle>, HostError> {
        let socket = bluer::l2cap::Socket::<bluer::l2cap::SeqPacket>::new_seq_packet()?;
        Ok(Box::new(L2capHandle { _probe: socket }))
    }

    async fn open_stream_channel(&self) -> Result<Box<dyn ChannelHandle>, HostError> {
        let socket = bluer::rfcomm::Socket::new()?;
        Ok(Box::new(RfcommHandle { _probe: socket }))
    }
}

struct BluezControl {
    _session: bluer::Session,
    adapter: bluer::Adapter,
}

impl BluezControl {
    async fn flush_cache(&self) -> Result<(), HostError> {
        let cached = self.adapter.device_addresses().await?;
        debug!("Flushing inquiry cache ({} cached device(s))", cached.len());
        for addr in cached {
            let device = match self.adapter.device(addr) {
                Ok(device) => device,
                Err(e) => {
                    trace!("Skipping cached device {}: {}", addr, e);
                    continue;
                }
            };
            if !evictable(device.is_paired().await, device.is_connected().await) {
                continue;
            }
            if let Err(e) = self.adapter.remove_device(addr).await {
                trace!("Failed to drop cached device {}: {}", addr, e);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ControlChannel for BluezControl {
    async fn inquiry(
        &self,
        max_responses: usize,
        timeout: Duration,
        flush_cache: bool,
    ) -> Result<Vec<InquiryResult>, HostError> {
        if flush_cache {
            self.flush_cache().await?;
        }

        let filter = DiscoveryFilter {
            transport: DiscoveryTransport::BrEdr,
            ..Default::default()
        };
        self.adapter.set_discovery_filter(filter).await?;

        let mut discoverer = self.adapter.discover_devices().await?;
        let mut collector = InquiryCollector::new(max_responses);

        info!("Starting inquiry for {} seconds", timeout.as_secs());

        let timeout_fut = tokio::time::sleep(timeout);
        tokio::pin!(timeout_fut);

        while !collector.is_full() {
            tokio::select! {
                () = &mut timeout_fut => break,
                event = discoverer.next() => {
                    match event {
                        Some(AdapterEvent::DeviceAdded(addr)) => {
                            if !collector.is_new(addr) {
                                continue;
                            }
                            let rssi = match self.adapter.device(addr) {
                                Ok(device) => device.rssi().await,
                                Err(e) => Err(e),
                            };
                            collector.push(addr, rssi);
                        }
                        None => break,
                        _ => {}
                    }
                }
            }
        }

        let results = collector.into_results();
        info!("Inquiry complete: {} response(s)", results.len());
        Ok(results)
    }

    async fn read_remote_name(
        &self,
        address: BdAddr,
        max_len: usize,
    ) -> Result<String, HostError> {
        let device = self.adapter.device(address.into())?;
        let name = tokio::time::timeout(NAME_TIMEOUT, device.name())
            .await
            .map_err(|_| HostError::Timeout)??;

        match name {
            Some(name) => Ok(truncate_name(name, max_len)),
            None => Err(HostError::NotFound(format!("no name for {address}"))),
        }
    }
}

/// 缓存设备只有在确认未配对且未连接时才移除，属性读取失败的设备保留
fn evictable<E: fmt::Display>(paired: Result<bool, E>, connected: Result<bool, E>) -> bool {
    match (paired, connected) {
        (Ok(paired), Ok(connected)) => !paired && !connected,
        (Err(e), _) | (_, Err(e)) => {
            trace!("Keeping cached device, property read failed: {}", e);
            false
        }
    }
}

/// inquiry 结果收集：按地址去重，数量不超过上限
///
/// 读不到属性的设备（例如在事件之后立即消失）被跳过，不影响其余结果。
struct InquiryCollector {
    max: usize,
    seen: HashSet<bluer::Address>,
    results: Vec<InquiryResult>,
}

impl InquiryCollector {
    fn new(max: usize) -> Self {
        Self {
            max,
            seen: HashSet::new(),
            results: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.results.len() >= self.max
    }

    fn is_new(&mut self, addr: bluer::Address) -> bool {
        self.seen.insert(addr)
    }

    fn push<E: fmt::Display>(&mut self, addr: bluer::Address, rssi: Result<Option<i16>, E>) {
        match rssi {
            Ok(rssi) => {
                let rssi = rssi.unwrap_or(0);
                debug!("Inquiry result: addr={}, rssi={}", addr, rssi);
                self.results.push(InquiryResult {
                    address: addr.into(),
                    rssi,
                });
            }
            Err(e) => trace!("Skipping {}: {}", addr, e),
        }
    }

    fn into_results(self) -> Vec<InquiryResult> {
        self.results
    }
}

struct L2capHandle {
    _probe: bluer::l2cap::Socket<bluer::l2cap::SeqPacket>,
}

#[async_trait]
impl ChannelHandle for L2capHandle {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Packet
    }

    async fn connect(&self, address: BdAddr, port: u16) -> Result<Box<dyn Link>, HostError> {
        let target = bluer::l2cap::SocketAddr::new(address.into(), AddressType::BrEdr, port);
        let seq = bluer::l2cap::SeqPacket::connect(target)
            .await
            .map_err(|e| HostError::Refused(format!("{address} psm {port}: {e}")))?;
        Ok(Box::new(L2capLink { seq }))
    }
}

struct L2capLink {
    seq: bluer::l2cap::SeqPacket,
}

#[async_trait]
impl Link for L2capLink {
    async fn send(&mut self, data: &[u8]) -> Result<usize, HostError> {
        Ok(self.seq.send(data).await?)
    }
}

struct RfcommHandle {
    _probe: bluer::rfcomm::Socket,
}

#[async_trait]
impl ChannelHandle for RfcommHandle {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Stream
    }

    async fn connect(&self, address: BdAddr, port: u16) -> Result<Box<dyn Link>, HostError> {
        let channel = u8::try_from(port)
            .map_err(|_| HostError::Refused(format!("RFCOMM channel {port} out of range")))?;
        let target = bluer::rfcomm::SocketAddr::new(address.into(), channel);
        let stream = bluer::rfcomm::Stream::connect(target)
            .await
            .map_err(|e| HostError::Refused(format!("{address} channel {channel}: {e}")))?;
        Ok(Box::new(RfcommLink { stream }))
    }
}

struct RfcommLink {
    stream: bluer::rfcomm::Stream,
}

#[async_trait]
impl Link for RfcommLink {
    async fn send(&mut self, data: &[u8]) -> Result<usize, HostError> {
        let written = self.stream.write(data).await?;
        if written == 0 {
            warn!("RFCOMM peer closed the stream");
        }
        Ok(written)
    }
}
