//! 主机蓝牙协议栈接口
//!
//! 传输管理器只通过这里的 trait 访问协议栈：
//!
//! - **ControlChannel**: 本地适配器控制通道（inquiry、远端名称读取）
//! - **ChannelHandle**: 面向连接的 L2CAP 通道 / RFCOMM 流通道，按 6 字节地址和端口连接
//! - **Link**: 已建立的连接，仅用于发送
//!
//! 所有句柄在 drop 时释放。

pub mod bluez;
pub mod simulated;

use crate::address::BdAddr;
use async_trait::async_trait;
use std::time::Duration;

pub use bluez::BluezHost;
pub use simulated::SimulatedHost;

/// HCI 远端名称的最大长度
pub const MAX_NAME_LEN: usize = 248;

/// 协议栈错误
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Bluetooth adapter unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Connection refused: {0}")]
    Refused(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("BlueZ error: {0}")]
    Bluez(#[from] bluer::Error),
}

/// inquiry 返回的一条结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InquiryResult {
    pub address: BdAddr,
    pub rssi: i16,
}

/// 通道类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Control,
    /// L2CAP SEQPACKET
    Packet,
    /// RFCOMM
    Stream,
}

#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// 发起 inquiry，`flush_cache` 为 true 时忽略缓存中的旧设备
    async fn inquiry(
        &self,
        max_responses: usize,
        timeout: Duration,
        flush_cache: bool,
    ) -> Result<Vec<InquiryResult>, HostError>;

    /// 读取远端名称，结果不超过 `max_len` 字节
    async fn read_remote_name(&self, address: BdAddr, max_len: usize)
    -> Result<String, HostError>;
}

#[async_trait]
pub trait ChannelHandle: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn connect(&self, address: BdAddr, port: u16) -> Result<Box<dyn Link>, HostError>;
}

#[async_trait]
pub trait Link: Send {
    async fn send(&mut self, data: &[u8]) -> Result<usize, HostError>;
}

/// 协议栈入口，负责打开三个传输句柄
#[async_trait]
pub trait HostStack: Send + Sync {
    async fn open_control(&self) -> Result<Box<dyn ControlChannel>, HostError>;

    async fn open_packet_channel(&self) -> Result<Box<dyn ChannelHandle>, HostError>;

    async fn open_stream_channel(&self) -> Result<Box<dyn ChannelHandle>, HostError>;
}

/// 按 UTF-8 字符边界截断到 `max_len` 字节
pub fn truncate_name(mut name: String, max_len: usize) -> String {
    if name.len() > max_len {
        let mut end = max_len;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}
