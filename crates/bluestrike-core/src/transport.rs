//! 传输管理器
//!
//! 持有三个传输句柄（适配器控制通道、L2CAP 通道、RFCOMM 流通道），
//! 所有访问句柄的操作都先获取同一把锁，并发调用方排队而不是交错执行。
//!
//! 句柄只在一次成功的 [`TransportManager::init`] 与下一次
//! [`TransportManager::cleanup`] 之间有效。

use crate::address::BdAddr;
use crate::diagnostics::Diagnostics;
use crate::error::{BtError, Result};
use crate::host::{ChannelHandle, ChannelKind, ControlChannel, HostStack, Link};
use log::warn;
use std::sync::Arc;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

pub struct TransportHandles {
    pub control: Box<dyn ControlChannel>,
    pub packet: Box<dyn ChannelHandle>,
    pub stream: Box<dyn ChannelHandle>,
}

impl TransportHandles {
    pub fn channel(&self, kind: ChannelKind) -> Option<&dyn ChannelHandle> {
        match kind {
            ChannelKind::Packet => Some(self.packet.as_ref()),
            ChannelKind::Stream => Some(self.stream.as_ref()),
            ChannelKind::Control => None,
        }
    }
}

pub struct TransportManager {
    host: Arc<dyn HostStack>,
    handles: Mutex<Option<TransportHandles>>,
}

impl TransportManager {
    pub fn new(host: Arc<dyn HostStack>) -> Self {
        Self {
            host,
            handles: Mutex::new(None),
        }
    }

    /// 打开三个句柄
    ///
    /// 任一句柄打开失败时，本次已打开的句柄全部释放并返回通用错误。
    /// 已初始化时先释放旧句柄再重新打开。
    pub async fn init(&self, diag: &Diagnostics) -> Result<()> {
        let mut guard = self.handles.lock().await;

        if guard.take().is_some() {
            diag.debug(1, format_args!("Re-initializing transport, old handles released"));
        }

        let handles = self.acquire_all(diag).await?;
        *guard = Some(handles);

        diag.debug(1, format_args!("Bluetooth transport initialized"));
        Ok(())
    }

    async fn acquire_all(&self, diag: &Diagnostics) -> Result<TransportHandles> {
        // 提前返回时，已打开的句柄随局部变量一起 drop
        let control = self.host.open_control().await.map_err(|e| {
            diag.debug(0, format_args!("Unable to open control channel: {e}"));
            BtError::general(format!("control channel: {e}"))
        })?;

        let packet = self.host.open_packet_channel().await.map_err(|e| {
            diag.debug(0, format_args!("Unable to open L2CAP channel: {e}"));
            BtError::general(format!("L2CAP channel: {e}"))
        })?;

        let stream = self.host.open_stream_channel().await.map_err(|e| {
            diag.debug(0, format_args!("Unable to open RFCOMM channel: {e}"));
            BtError::general(format!("RFCOMM channel: {e}"))
        })?;

        Ok(TransportHandles {
            control,
            packet,
            stream,
        })
    }

    /// 释放所有句柄，可重复调用。返回调用前是否处于打开状态
    pub async fn cleanup(&self) -> bool {
        self.handles.lock().await.take().is_some()
    }

    pub async fn is_open(&self) -> bool {
        self.handles.lock().await.is_some()
    }

    /// 获取锁并返回有效句柄，未初始化时返回通用错误
    pub async fn acquire(&self) -> Result<MappedMutexGuard<'_, TransportHandles>> {
        let guard = self.handles.lock().await;
        MutexGuard::try_map(guard, Option::as_mut)
            .map_err(|_| BtError::general("Bluetooth transport not initialized"))
    }

    /// 在锁内建立到目标的连接
    pub async fn connect(
        &self,
        kind: ChannelKind,
        address: BdAddr,
        port: u16,
    ) -> Result<Box<dyn Link>> {
        let handles = self.acquire().await?;
        let channel = handles
            .channel(kind)
            .ok_or_else(|| BtError::general(format!("{kind:?} is not a data channel")))?;
        Ok(channel.connect(address, port).await?)
    }

    /// 在锁内发送，传输已被清理时不再发送
    pub async fn send(&self, link: &mut dyn Link, data: &[u8]) -> Result<usize> {
        let _handles = self.acquire().await?;
        link.send(data).await.map_err(|e| {
            warn!("Send of {} bytes failed: {}", data.len(), e);
            BtError::from(e)
        })
    }
}
